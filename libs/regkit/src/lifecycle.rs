//! Host lifecycle phases and the listeners reacting to them.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::LifecycleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Starting,
    Ready,
    ShuttingDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The network listener is bound and accepting traffic on `port`.
    ListenerReady { port: u16 },
    /// The application is shutting down.
    ContextClosing,
}

#[async_trait]
pub trait LifecycleListener: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called once per event; listeners ignore events they do not handle.
    async fn on_event(&self, event: &LifecycleEvent) -> Result<(), LifecycleError>;
}

/// Tells the host runtime which port the listener ended up bound to.
pub struct ReadySignal(oneshot::Sender<u16>);

impl ReadySignal {
    pub fn from_sender(tx: oneshot::Sender<u16>) -> Self {
        Self(tx)
    }

    pub fn notify(self, port: u16) {
        let _ = self.0.send(port);
    }
}

/// A channel pair for one listener start.
pub fn ready_channel() -> (ReadySignal, oneshot::Receiver<u16>) {
    let (tx, rx) = oneshot::channel();
    (ReadySignal::from_sender(tx), rx)
}

/// Something the host runs in the background until cancelled, e.g. a network listener.
#[async_trait]
pub trait Runnable: Send + Sync + 'static {
    async fn run(
        self: Arc<Self>,
        cancel: CancellationToken,
        ready: ReadySignal,
    ) -> anyhow::Result<()>;
}

/// Current phase plus the listeners to notify, in subscription order.
pub struct Lifecycle {
    phase: Mutex<LifecyclePhase>,
    listeners: RwLock<Vec<Arc<dyn LifecycleListener>>>,
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.listeners.read().iter().map(|l| l.name()).collect();
        f.debug_struct("Lifecycle")
            .field("phase", &*self.phase.lock())
            .field("listeners", &names)
            .finish()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(LifecyclePhase::Starting),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn LifecycleListener>) {
        self.listeners.write().push(listener);
    }

    pub fn phase(&self) -> LifecyclePhase {
        *self.phase.lock()
    }

    fn transition(&self, to: LifecyclePhase) -> Result<LifecyclePhase, LifecycleError> {
        use LifecyclePhase::*;
        let mut phase = self.phase.lock();
        let from = *phase;
        match (from, to) {
            (Starting, Ready) | (Ready, ShuttingDown) | (Starting, ShuttingDown) => {
                *phase = to;
                tracing::debug!(?from, ?to, "Lifecycle transition");
                Ok(from)
            }
            _ => Err(LifecycleError::InvalidTransition { from, to }),
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn LifecycleListener>> {
        self.listeners.read().clone()
    }

    /// `Starting → Ready`, then deliver `ListenerReady`. Stops at the first failing listener.
    pub async fn notify_ready(&self, port: u16) -> Result<(), LifecycleError> {
        self.transition(LifecyclePhase::Ready)?;
        let event = LifecycleEvent::ListenerReady { port };
        for listener in self.snapshot() {
            listener.on_event(&event).await?;
        }
        Ok(())
    }

    /// Move to `ShuttingDown`, then deliver `ContextClosing` to every listener.
    ///
    /// Nothing is delivered when the host never became ready. All listeners run;
    /// the first error is returned afterwards and later ones are logged.
    pub async fn notify_closing(&self) -> Result<(), LifecycleError> {
        let from = self.transition(LifecyclePhase::ShuttingDown)?;
        if from == LifecyclePhase::Starting {
            tracing::debug!("Host never became ready; skipping closing listeners");
            return Ok(());
        }

        let mut first_err = None;
        for listener in self.snapshot() {
            if let Err(e) = listener.on_event(&LifecycleEvent::ContextClosing).await {
                if first_err.is_none() {
                    first_err = Some(e);
                } else {
                    tracing::error!(listener = listener.name(), error = %e, "Closing listener failed");
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
