//! # RegKit - service instance auto-registration
//!
//! Announces a network service instance to a discovery registry once its
//! listener is bound, and withdraws it when the application shuts down.
//!
//! ## Flow
//!
//! - The host emits [`LifecycleEvent::ListenerReady`] with the bound port;
//!   [`RegistrationCoordinator`] resolves a descriptor and calls
//!   [`RegistryClient::add_instance`].
//! - On [`LifecycleEvent::ContextClosing`], [`DeregistrationCoordinator`]
//!   resolves the matching descriptor and calls [`RegistryClient::remove_instance`].
//!
//! Both are gated by the same immutable [`DiscoverySettings`]; when auto
//! registration is off, neither touches the registry.
//!
//! ```rust,ignore
//! let settings = Arc::new(DiscoverySettings::from_source(&config)?);
//! let registry = Arc::new(InMemoryRegistry::new());
//! let handle = ListenerHandle::new();
//! HostRuntime::new(
//!     settings,
//!     registry,
//!     Arc::new(SystemAddressResolver::new()),
//!     Arc::new(handle.clone()),
//!     cancel,
//! )
//! .run(Arc::new(MyListener::new(handle)))
//! .await?;
//! ```

pub mod address;
pub mod deregister;
pub mod descriptor;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod register;
pub mod registry;
pub mod runtime;
pub mod server;
pub mod settings;

pub use address::{FixedAddressResolver, LocalAddressResolver, SystemAddressResolver};
pub use deregister::DeregistrationCoordinator;
pub use descriptor::{
    DescriptorResolver, InstanceDescriptor, DEFAULT_CLUSTER, DEFAULT_GROUP, PROVENANCE_KEY,
    PROVENANCE_SOURCE,
};
pub use error::{
    ConfigError, DeregistrationError, DescriptorError, LifecycleError, OperationKind,
    RegistrationError, RegistryFailure,
};
pub use lifecycle::{
    ready_channel, Lifecycle, LifecycleEvent, LifecycleListener, LifecyclePhase, ReadySignal,
    Runnable,
};
pub use memory::InMemoryRegistry;
pub use register::RegistrationCoordinator;
pub use registry::RegistryClient;
pub use runtime::{HostRuntime, RunOptions, ShutdownOptions};
pub use server::{ListenerHandle, WebServer};
pub use settings::{ConfigurationSource, DiscoveryProperties, DiscoverySettings};
