//! Process-local registry that keeps instances in memory.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::descriptor::InstanceDescriptor;
use crate::error::RegistryFailure;
use crate::registry::RegistryClient;

/// Instances grouped by `group@@service`, unique by `ip:port:cluster`.
#[derive(Default)]
pub struct InMemoryRegistry {
    inner: DashMap<String, Vec<InstanceDescriptor>>,
}

impl std::fmt::Debug for InMemoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let services: Vec<String> = self.inner.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("InMemoryRegistry")
            .field("instances_count", &self.len())
            .field("services", &services)
            .finish()
    }
}

fn grouped_name(service_name: &str, group_name: &str) -> String {
    format!("{group_name}@@{service_name}")
}

fn same_instance(a: &InstanceDescriptor, b: &InstanceDescriptor) -> bool {
    a.ip == b.ip && a.port == b.port && a.cluster_name == b.cluster_name
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instances of one service, in registration order.
    pub fn instances(&self, service_name: &str, group_name: &str) -> Vec<InstanceDescriptor> {
        self.inner
            .get(&grouped_name(service_name, group_name))
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// Every instance across all services.
    pub fn all_instances(&self) -> Vec<InstanceDescriptor> {
        self.inner
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn add_instance(
        &self,
        service_name: &str,
        group_name: &str,
        instance: &InstanceDescriptor,
    ) -> Result<(), RegistryFailure> {
        let mut stored = instance.clone();
        stored.service_name = service_name.to_string();
        stored.group_name = group_name.to_string();
        if stored.instance_id.is_empty() {
            stored.instance_id = format!(
                "{}#{}#{}#{}",
                stored.ip,
                stored.port,
                stored.cluster_name,
                grouped_name(service_name, group_name)
            );
        }

        let mut list = self
            .inner
            .entry(grouped_name(service_name, group_name))
            .or_default();
        // upsert by address
        if let Some(pos) = list.iter().position(|i| same_instance(i, &stored)) {
            list[pos] = stored;
        } else {
            list.push(stored);
        }
        Ok(())
    }

    async fn remove_instance(
        &self,
        service_name: &str,
        group_name: &str,
        instance: &InstanceDescriptor,
    ) -> Result<(), RegistryFailure> {
        let key = grouped_name(service_name, group_name);
        if let Some(mut list) = self.inner.get_mut(&key) {
            list.retain(|i| !same_instance(i, instance));
        }
        // re-checked under the shard lock; a concurrent add may have refilled it
        self.inner.remove_if(&key, |_, list| list.is_empty());
        Ok(())
    }
}
