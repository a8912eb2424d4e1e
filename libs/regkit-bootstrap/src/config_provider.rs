use crate::config::AppConfig;
use std::sync::Arc;

/// Read-only view over the loaded configuration handed to modules.
pub trait ConfigProvider: Send + Sync {
    /// Raw per-module entry (`modules.<name>`), including its `config` sub-key.
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;

    /// Declared application name; empty when not configured.
    fn application_name(&self) -> &str;
}

/// `ConfigProvider` backed by an `AppConfig`.
#[derive(Debug, Clone)]
pub struct AppConfigProvider(Arc<AppConfig>);

impl AppConfigProvider {
    pub fn new(config: AppConfig) -> Self {
        Self(Arc::new(config))
    }
}

impl ConfigProvider for AppConfigProvider {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.modules.get(module_name)
    }

    fn application_name(&self) -> &str {
        &self.0.application.name
    }
}
