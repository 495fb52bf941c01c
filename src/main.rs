use std::net::{Ipv4Addr, SocketAddr};

use prometheus_demo::{app, initialize_state};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("starting server");
    let state = initialize_state()?;

    if state.config.process_metrics {
        state.metrics.spawn_process_collector();
    }

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, state.config.port));
    let listener = TcpListener::bind(addr).await.inspect_err(|err| {
        tracing::error!(%addr, error = %err, "cannot bind listener");
    })?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for shutdown signal");
        // Keep serving rather than stopping right away.
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
