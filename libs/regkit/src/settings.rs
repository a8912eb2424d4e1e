//! Immutable discovery settings shared by both coordinators.

use serde::Deserialize;

use crate::descriptor::InstanceDescriptor;
use crate::error::ConfigError;

/// Name of the module entry holding discovery settings.
pub const MODULE_NAME: &str = "discovery";

/// Already-loaded configuration the core reads from.
pub trait ConfigurationSource: Send + Sync {
    /// Raw per-module entry; the module's settings sit under its `config` key.
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;

    /// Declared application name, empty when not configured.
    fn application_name(&self) -> &str;
}

/// Shape of `modules.discovery.config`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryProperties {
    /// Announce the instance on startup and withdraw it on shutdown.
    pub auto_register: bool,
    /// Descriptor template; unset fields are resolved per call.
    pub register: InstanceDescriptor,
}

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    enabled: bool,
    template: InstanceDescriptor,
    application_name: String,
}

impl DiscoverySettings {
    pub fn new(
        enabled: bool,
        template: InstanceDescriptor,
        application_name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let settings = Self {
            enabled,
            template,
            application_name: application_name.into(),
        };
        // A disabled service never submits a name, so an empty one is harmless.
        if settings.enabled && settings.effective_service_name().is_empty() {
            return Err(ConfigError::MissingServiceName);
        }
        Ok(settings)
    }

    /// Read the `discovery` module entry. A missing entry means disabled.
    pub fn from_source(source: &dyn ConfigurationSource) -> Result<Self, ConfigError> {
        let props = match source
            .get_module_config(MODULE_NAME)
            .and_then(|entry| entry.get("config"))
        {
            Some(raw) => DiscoveryProperties::deserialize(raw).map_err(|e| {
                ConfigError::Invalid {
                    module: MODULE_NAME,
                    source: e,
                }
            })?,
            None => DiscoveryProperties::default(),
        };

        tracing::debug!(
            enabled = props.auto_register,
            service = %props.register.service_name,
            group = %props.register.group_name,
            "Loaded discovery settings"
        );

        Self::new(
            props.auto_register,
            props.register,
            source.application_name(),
        )
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn template(&self) -> &InstanceDescriptor {
        &self.template
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    /// The configured service name verbatim, else the application name.
    pub fn effective_service_name(&self) -> &str {
        if self.template.service_name.is_empty() {
            &self.application_name
        } else {
            &self.template.service_name
        }
    }
}
