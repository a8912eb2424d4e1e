//! Host Runtime - drives one listener through the registration lifecycle
//!
//! Phases: listener start → register → wait → deregister → listener stop.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::address::LocalAddressResolver;
use crate::deregister::DeregistrationCoordinator;
use crate::lifecycle::{ready_channel, Lifecycle, Runnable};
use crate::register::RegistrationCoordinator;
use crate::registry::RegistryClient;
use crate::server::WebServer;
use crate::settings::DiscoverySettings;

/// Owns the lifecycle for a single network listener.
///
/// `web_server` is the listener's own port view; deregistration reads it at
/// shutdown. `cancel` requests shutdown. The listener gets a token of its own,
/// cancelled only after deregistration, so it keeps serving (and reporting its
/// port) while the instance is withdrawn.
pub struct HostRuntime {
    settings: Arc<DiscoverySettings>,
    registry: Arc<dyn RegistryClient>,
    address: Arc<dyn LocalAddressResolver>,
    web_server: Arc<dyn WebServer>,
    cancel: CancellationToken,
    stop_timeout: Option<Duration>,
}

impl HostRuntime {
    pub fn new(
        settings: Arc<DiscoverySettings>,
        registry: Arc<dyn RegistryClient>,
        address: Arc<dyn LocalAddressResolver>,
        web_server: Arc<dyn WebServer>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            settings,
            registry,
            address,
            web_server,
            cancel,
            stop_timeout: None,
        }
    }

    /// Give up waiting for the listener after `timeout` once it has been cancelled.
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = Some(timeout);
        self
    }

    fn build_lifecycle(&self) -> Lifecycle {
        let lifecycle = Lifecycle::new();
        lifecycle.subscribe(Arc::new(RegistrationCoordinator::new(
            self.settings.clone(),
            self.registry.clone(),
            self.address.clone(),
        )));
        lifecycle.subscribe(Arc::new(DeregistrationCoordinator::new(
            self.settings.clone(),
            self.registry.clone(),
            self.address.clone(),
            self.web_server.clone(),
        )));
        lifecycle
    }

    /// Run `listener` until shutdown, registering it once it is bound and
    /// deregistering it before it is stopped.
    ///
    /// A registration failure aborts startup and is returned. A deregistration
    /// failure is logged and shutdown completes.
    pub async fn run<L: Runnable>(self, listener: Arc<L>) -> anyhow::Result<()> {
        let lifecycle = self.build_lifecycle();
        let listener_cancel = CancellationToken::new();
        let (ready, ready_rx) = ready_channel();

        tracing::info!("Phase: listener start");
        let mut task: JoinHandle<anyhow::Result<()>> =
            tokio::spawn(listener.run(listener_cancel.clone(), ready));

        let port = tokio::select! {
            res = ready_rx => match res {
                Ok(port) => port,
                Err(_) => {
                    // The signal was dropped: the listener ended without binding.
                    let res = join_listener(&mut task, None).await;
                    return res.and(Err(anyhow::anyhow!("listener stopped before becoming ready")));
                }
            },
            _ = self.cancel.cancelled() => {
                tracing::info!("Shutdown requested before the listener became ready");
                lifecycle.notify_closing().await?;
                listener_cancel.cancel();
                return join_listener(&mut task, self.stop_timeout).await;
            }
        };

        tracing::info!(port, "Phase: register");
        if let Err(e) = lifecycle.notify_ready(port).await {
            tracing::error!(error = %e, "Registration failed; aborting startup");
            listener_cancel.cancel();
            if let Err(join_err) = join_listener(&mut task, self.stop_timeout).await {
                tracing::warn!(error = %join_err, "Listener failed while stopping");
            }
            return Err(e.into());
        }

        tracing::info!("Phase: wait");
        let early_exit = tokio::select! {
            _ = self.cancel.cancelled() => None,
            res = &mut task => {
                tracing::warn!("Listener stopped before shutdown was requested");
                Some(flatten(res))
            }
        };

        tracing::info!("Phase: deregister");
        if let Err(e) = lifecycle.notify_closing().await {
            tracing::error!(error = %e, "Deregistration failed; continuing shutdown");
        }

        tracing::info!("Phase: listener stop");
        listener_cancel.cancel();
        match early_exit {
            Some(res) => res,
            None => join_listener(&mut task, self.stop_timeout).await,
        }
    }
}

fn flatten(res: Result<anyhow::Result<()>, tokio::task::JoinError>) -> anyhow::Result<()> {
    res.map_err(|e| anyhow::anyhow!("listener task failed: {e}"))?
}

async fn join_listener(
    task: &mut JoinHandle<anyhow::Result<()>>,
    timeout: Option<Duration>,
) -> anyhow::Result<()> {
    match timeout {
        None => flatten(task.await),
        Some(limit) => match tokio::time::timeout(limit, &mut *task).await {
            Ok(res) => flatten(res),
            Err(_) => {
                tracing::warn!(timeout_ms = limit.as_millis() as u64, "Listener did not stop in time; aborting");
                task.abort();
                Ok(())
            }
        },
    }
}
