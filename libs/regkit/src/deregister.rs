use async_trait::async_trait;
use std::sync::Arc;

use crate::address::LocalAddressResolver;
use crate::descriptor::{DescriptorResolver, InstanceDescriptor};
use crate::error::{DeregistrationError, LifecycleError};
use crate::lifecycle::{LifecycleEvent, LifecycleListener};
use crate::registry::RegistryClient;
use crate::server::WebServer;
use crate::settings::DiscoverySettings;

/// Withdraws the instance when the application shuts down.
///
/// The descriptor is rebuilt from settings at shutdown, not remembered from
/// registration: an unset port is read from the listener at that moment.
pub struct DeregistrationCoordinator {
    resolver: DescriptorResolver,
    registry: Arc<dyn RegistryClient>,
    server: Arc<dyn WebServer>,
}

impl DeregistrationCoordinator {
    pub fn new(
        settings: Arc<DiscoverySettings>,
        registry: Arc<dyn RegistryClient>,
        address: Arc<dyn LocalAddressResolver>,
        server: Arc<dyn WebServer>,
    ) -> Self {
        Self {
            resolver: DescriptorResolver::new(settings, address),
            registry,
            server,
        }
    }

    pub async fn deregister(&self) -> Result<Option<InstanceDescriptor>, DeregistrationError> {
        if !self.resolver.settings().enabled() {
            tracing::debug!("Auto registration disabled; not deregistering");
            return Ok(None);
        }

        let descriptor = self
            .resolver
            .for_deregistration(self.server.port())
            .map_err(|reason| DeregistrationError::InvalidDescriptor {
                service: self.resolver.service_name().to_string(),
                reason,
            })?;

        let service = descriptor.service_name.as_str();
        let group = descriptor.group_name.as_str();
        self.registry
            .remove_instance(service, group, &descriptor)
            .await
            .map_err(|source| DeregistrationError::Registry {
                service: service.to_string(),
                group: group.to_string(),
                source,
            })?;

        tracing::info!(
            service,
            group,
            ip = %descriptor.ip,
            port = descriptor.port,
            outcome = "deregistered",
            "Finished auto deregister service"
        );
        Ok(Some(descriptor))
    }
}

#[async_trait]
impl LifecycleListener for DeregistrationCoordinator {
    fn name(&self) -> &'static str {
        "deregistration"
    }

    async fn on_event(&self, event: &LifecycleEvent) -> Result<(), LifecycleError> {
        if matches!(event, LifecycleEvent::ContextClosing) {
            self.deregister().await?;
        }
        Ok(())
    }
}
