use async_trait::async_trait;

use crate::descriptor::InstanceDescriptor;
use crate::error::RegistryFailure;

/// Client side of a discovery registry.
///
/// Each call is a single attempt; implementations must not retry on their own.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn add_instance(
        &self,
        service_name: &str,
        group_name: &str,
        instance: &InstanceDescriptor,
    ) -> Result<(), RegistryFailure>;

    async fn remove_instance(
        &self,
        service_name: &str,
        group_name: &str,
        instance: &InstanceDescriptor,
    ) -> Result<(), RegistryFailure>;
}
