//! The instance descriptor and the default-resolution rules shared by both
//! coordinators.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::address::LocalAddressResolver;
use crate::error::DescriptorError;
use crate::settings::DiscoverySettings;

pub const DEFAULT_GROUP: &str = "DEFAULT_GROUP";
pub const DEFAULT_CLUSTER: &str = "DEFAULT";

/// Metadata key marking how an instance was registered.
pub const PROVENANCE_KEY: &str = "preserved.register.source";
/// Value of [`PROVENANCE_KEY`] for instances announced when the listener came up.
pub const PROVENANCE_SOURCE: &str = "EMBEDDED_WEB_CONTAINER";

/// One network service instance as seen by a discovery registry.
///
/// Empty `service_name`/`ip` and a zero `port` mean "not configured" and are
/// filled in by [`DescriptorResolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstanceDescriptor {
    pub service_name: String,
    pub group_name: String,
    pub ip: String,
    pub port: u16,
    pub instance_id: String,
    pub metadata: HashMap<String, String>,
    pub weight: f64,
    pub healthy: bool,
    pub ephemeral: bool,
    pub cluster_name: String,
}

impl Default for InstanceDescriptor {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            group_name: DEFAULT_GROUP.to_string(),
            ip: String::new(),
            port: 0,
            instance_id: String::new(),
            metadata: HashMap::new(),
            weight: 1.0,
            healthy: true,
            ephemeral: true,
            cluster_name: DEFAULT_CLUSTER.to_string(),
        }
    }
}

impl InstanceDescriptor {
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group_name = group.into();
        self
    }

    pub fn with_address(mut self, ip: impl Into<String>, port: u16) -> Self {
        self.ip = ip.into();
        self.port = port;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    fn validate(&self) -> Result<(), DescriptorError> {
        if self.ip.is_empty() {
            return Err(DescriptorError::EmptyAddress);
        }
        if self.port == 0 {
            return Err(DescriptorError::ZeroPort);
        }
        Ok(())
    }
}

/// Builds a fresh descriptor per call from the immutable settings template.
#[derive(Clone)]
pub struct DescriptorResolver {
    settings: Arc<DiscoverySettings>,
    address: Arc<dyn LocalAddressResolver>,
}

impl std::fmt::Debug for DescriptorResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorResolver")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl DescriptorResolver {
    pub fn new(settings: Arc<DiscoverySettings>, address: Arc<dyn LocalAddressResolver>) -> Self {
        Self { settings, address }
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    /// Descriptor to announce once the listener is bound to `bound_port`.
    ///
    /// Clears the instance id and stamps the provenance marker.
    pub fn for_registration(&self, bound_port: u16) -> Result<InstanceDescriptor, DescriptorError> {
        let mut d = self.fill(bound_port);
        d.metadata
            .insert(PROVENANCE_KEY.to_string(), PROVENANCE_SOURCE.to_string());
        d.instance_id.clear();
        d.validate()?;
        Ok(d)
    }

    /// Descriptor to withdraw at shutdown; `current_port` is whatever the
    /// listener reports at that moment.
    pub fn for_deregistration(
        &self,
        current_port: u16,
    ) -> Result<InstanceDescriptor, DescriptorError> {
        let d = self.fill(current_port);
        d.validate()?;
        Ok(d)
    }

    /// Service name the descriptor is submitted under, without resolving anything else.
    pub fn service_name(&self) -> &str {
        self.settings.effective_service_name()
    }

    fn fill(&self, port_fallback: u16) -> InstanceDescriptor {
        let mut d = self.settings.template().clone();
        if d.ip.is_empty() {
            d.ip = self.address.current_machine_address();
        }
        if d.port == 0 {
            d.port = port_fallback;
        }
        d.service_name = self.settings.effective_service_name().to_string();
        d
    }
}
