use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

/// The host's network listener, as far as discovery is concerned.
pub trait WebServer: Send + Sync {
    /// Port the listener is bound to right now; `0` before binding.
    fn port(&self) -> u16;
}

/// Shared port cell: the listener sets it after binding, deregistration reads it.
#[derive(Debug, Clone, Default)]
pub struct ListenerHandle(Arc<AtomicU16>);

impl ListenerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_port(&self, port: u16) {
        self.0.store(port, Ordering::Release);
    }
}

impl WebServer for ListenerHandle {
    fn port(&self) -> u16 {
        self.0.load(Ordering::Acquire)
    }
}
