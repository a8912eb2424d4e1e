use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use regkit::{InMemoryRegistry, InstanceDescriptor, ListenerHandle, ReadySignal, Runnable};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// HTTP listener exposing health and the instances known to the local registry.
pub struct HttpListener {
    host: String,
    port: u16,
    registry: Arc<InMemoryRegistry>,
    handle: ListenerHandle,
}

impl HttpListener {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        registry: Arc<InMemoryRegistry>,
        handle: ListenerHandle,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            registry,
            handle,
        }
    }
}

pub fn router(registry: Arc<InMemoryRegistry>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/instances", get(list_instances))
        .with_state(registry)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_instances(
    State(registry): State<Arc<InMemoryRegistry>>,
) -> Json<Vec<InstanceDescriptor>> {
    Json(registry.all_instances())
}

#[async_trait]
impl Runnable for HttpListener {
    /// Bind, report the bound port, serve until cancelled.
    async fn run(self: Arc<Self>, cancel: CancellationToken, ready: ReadySignal) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind((self.host.as_str(), self.port))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {}:{}: {}", self.host, self.port, e))?;
        let addr = listener.local_addr()?;
        self.handle.set_port(addr.port());
        tracing::info!("HTTP server bound on {}", addr);
        ready.notify(addr.port());

        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        };

        axum::serve(listener, router(self.registry.clone()))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}
