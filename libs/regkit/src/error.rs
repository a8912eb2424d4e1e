//! Typed failures of the registration lifecycle.
//!
//! Every registry-side failure is attributed to the operation that caused it
//! and keeps the original cause reachable through `source()`.

use crate::lifecycle::LifecyclePhase;

/// Which side of the lifecycle produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Register,
    Deregister,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Register => "register",
            OperationKind::Deregister => "deregister",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a `RegistryClient` reports when a request does not succeed.
#[derive(Debug, thiserror::Error)]
pub enum RegistryFailure {
    #[error("registry rejected the request ({code}): {message}")]
    Rejected { code: u16, message: String },
    #[error("registry unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A resolved descriptor that may not be submitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("instance address is empty")]
    EmptyAddress,
    #[error("instance port is zero")]
    ZeroPort,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("failed to register service '{service}' in group '{group}'")]
    Registry {
        service: String,
        group: String,
        #[source]
        source: RegistryFailure,
    },
    #[error("refusing to register service '{service}'")]
    InvalidDescriptor {
        service: String,
        #[source]
        reason: DescriptorError,
    },
}

impl RegistrationError {
    pub fn operation(&self) -> OperationKind {
        OperationKind::Register
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeregistrationError {
    #[error("failed to deregister service '{service}' from group '{group}'")]
    Registry {
        service: String,
        group: String,
        #[source]
        source: RegistryFailure,
    },
    #[error("refusing to deregister service '{service}'")]
    InvalidDescriptor {
        service: String,
        #[source]
        reason: DescriptorError,
    },
}

impl DeregistrationError {
    pub fn operation(&self) -> OperationKind {
        OperationKind::Deregister
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration for module '{module}'")]
    Invalid {
        module: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("auto registration is enabled but neither a service name nor an application name is configured")]
    MissingServiceName,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Deregistration(#[from] DeregistrationError),
    #[error("illegal lifecycle transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: LifecyclePhase,
        to: LifecyclePhase,
    },
}

impl LifecycleError {
    /// `None` for transition errors, which belong to no registry operation.
    pub fn operation(&self) -> Option<OperationKind> {
        match self {
            LifecycleError::Registration(e) => Some(e.operation()),
            LifecycleError::Deregistration(e) => Some(e.operation()),
            LifecycleError::InvalidTransition { .. } => None,
        }
    }
}
