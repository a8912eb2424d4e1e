use async_trait::async_trait;
use std::sync::Arc;

use crate::address::LocalAddressResolver;
use crate::descriptor::{DescriptorResolver, InstanceDescriptor};
use crate::error::{LifecycleError, RegistrationError};
use crate::lifecycle::{LifecycleEvent, LifecycleListener};
use crate::registry::RegistryClient;
use crate::settings::DiscoverySettings;

/// Announces the instance once the listener is bound.
pub struct RegistrationCoordinator {
    resolver: DescriptorResolver,
    registry: Arc<dyn RegistryClient>,
}

impl RegistrationCoordinator {
    pub fn new(
        settings: Arc<DiscoverySettings>,
        registry: Arc<dyn RegistryClient>,
        address: Arc<dyn LocalAddressResolver>,
    ) -> Self {
        Self {
            resolver: DescriptorResolver::new(settings, address),
            registry,
        }
    }

    /// Register the instance listening on `bound_port`.
    ///
    /// Returns `Ok(None)` without touching the registry when auto registration is off.
    pub async fn register(
        &self,
        bound_port: u16,
    ) -> Result<Option<InstanceDescriptor>, RegistrationError> {
        if !self.resolver.settings().enabled() {
            tracing::debug!("Auto registration disabled; not registering");
            return Ok(None);
        }

        let descriptor = self.resolver.for_registration(bound_port).map_err(|reason| {
            RegistrationError::InvalidDescriptor {
                service: self.resolver.service_name().to_string(),
                reason,
            }
        })?;

        let service = descriptor.service_name.as_str();
        let group = descriptor.group_name.as_str();
        self.registry
            .add_instance(service, group, &descriptor)
            .await
            .map_err(|source| RegistrationError::Registry {
                service: service.to_string(),
                group: group.to_string(),
                source,
            })?;

        tracing::info!(
            service,
            group,
            ip = %descriptor.ip,
            port = descriptor.port,
            outcome = "registered",
            "Finished auto register service"
        );
        Ok(Some(descriptor))
    }
}

#[async_trait]
impl LifecycleListener for RegistrationCoordinator {
    fn name(&self) -> &'static str {
        "registration"
    }

    async fn on_event(&self, event: &LifecycleEvent) -> Result<(), LifecycleError> {
        if let LifecycleEvent::ListenerReady { port } = *event {
            self.register(port).await?;
        }
        Ok(())
    }
}
