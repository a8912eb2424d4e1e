use anyhow::Result;
use tokio::signal;

/// Wait for termination signals (Ctrl+C, SIGTERM)
pub async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    let terminate = async {
        let mut handler = signal::unix::signal(signal::unix::SignalKind::terminate())
            .inspect_err(|e| tracing::error!(%e, "Failed to install SIGTERM handler"))?;
        handler.recv().await;
        Ok::<(), std::io::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<std::io::Result<()>>();

    tokio::select! {
        result = signal::ctrl_c() => {
            result.inspect_err(|e| tracing::error!(%e, "Error handling Ctrl+C signal"))?;
            tracing::info!("Received Ctrl+C signal");
        },
        result = terminate => {
            result?;
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Shutdown signal received, initiating graceful shutdown");
    Ok(())
}
