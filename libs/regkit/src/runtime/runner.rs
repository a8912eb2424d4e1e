//! Runtime runner.
//!
//! Loads the discovery settings, decides how shutdown is triggered, and hands
//! the listener to [`HostRuntime`]. Shutdown can be driven by OS signals, an
//! external `CancellationToken`, or an arbitrary future.

use crate::address::LocalAddressResolver;
use crate::lifecycle::Runnable;
use crate::registry::RegistryClient;
use crate::runtime::{shutdown, HostRuntime};
use crate::server::WebServer;
use crate::settings::{ConfigurationSource, DiscoverySettings};
use std::time::Duration;
use std::{future::Future, pin::Pin, sync::Arc};
use tokio_util::sync::CancellationToken;

/// How the runtime should decide when to stop.
pub enum ShutdownOptions {
    /// Listen for OS signals (Ctrl+C / SIGTERM).
    Signals,
    /// An external `CancellationToken` controls the lifecycle.
    Token(CancellationToken),
    /// An arbitrary future; when it completes, we initiate shutdown.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

/// Options for running the runner.
pub struct RunOptions {
    /// Provider of module config sections and the application name.
    pub config: Arc<dyn ConfigurationSource>,
    /// Registry the instance is announced to.
    pub registry: Arc<dyn RegistryClient>,
    /// Fallback for an unset instance address.
    pub address: Arc<dyn LocalAddressResolver>,
    /// Shutdown strategy.
    pub shutdown: ShutdownOptions,
    /// The listener's port view, read by deregistration at shutdown.
    pub web_server: Arc<dyn WebServer>,
    /// Bound on the listener's graceful stop; `None` waits indefinitely.
    pub stop_timeout: Option<Duration>,
}

/// Full cycle: settings → listener start → register → wait → deregister → stop.
pub async fn run<L: Runnable>(opts: RunOptions, listener: Arc<L>) -> anyhow::Result<()> {
    // 1. Settings first, so a bad config fails before anything is spawned
    let settings = Arc::new(DiscoverySettings::from_source(opts.config.as_ref())?);

    // 2. Prepare cancellation token based on shutdown options
    let cancel = match &opts.shutdown {
        ShutdownOptions::Token(t) => t.clone(),
        _ => CancellationToken::new(),
    };

    // 3. Spawn shutdown waiter (Signals / Future)
    match opts.shutdown {
        ShutdownOptions::Signals => {
            let c = cancel.clone();
            tokio::spawn(async move {
                match shutdown::wait_for_shutdown().await {
                    Ok(()) => {
                        tracing::info!("shutdown: signal received");
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "shutdown: primary waiter failed; falling back to ctrl_c()"
                        );
                        let _ = tokio::signal::ctrl_c().await;
                    }
                }
                c.cancel();
            });
        }
        ShutdownOptions::Future(waiter) => {
            let c = cancel.clone();
            tokio::spawn(async move {
                waiter.await;
                tracing::info!("shutdown: external future completed");
                c.cancel();
            });
        }
        ShutdownOptions::Token(_) => {
            tracing::info!("shutdown: external token will control lifecycle");
        }
    }

    // 4. Hand over to the host runtime
    let mut host = HostRuntime::new(
        settings,
        opts.registry,
        opts.address,
        opts.web_server,
        cancel,
    );
    if let Some(timeout) = opts.stop_timeout {
        host = host.with_stop_timeout(timeout);
    }
    host.run(listener).await
}
