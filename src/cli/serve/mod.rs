//! Serve command - runs the HTTP API over a local corpus

use std::path::PathBuf;

use clap::Args;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::api::create_router_with_metrics;
use crate::config::AppConfig;
use crate::infrastructure::logging;
use crate::infrastructure::observability::{init_metrics, init_tracing, shutdown_tracing};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Corpus to search: a .jsonl file, a .txt/.md file or a directory
    #[arg(long)]
    pub corpus: PathBuf,
}

/// Run the API server until Ctrl+C or SIGTERM
pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    let config = super::load_config();
    init_observability(&config);

    let retriever = crate::load_retriever(&config, &args.corpus)?;
    let metrics = init_metrics(&config.observability.metrics);
    let state = crate::create_app_state_with_config(&config, retriever)?;
    let collector = state.collector.clone();
    let app = create_router_with_metrics(state, metrics, &config.observability.metrics.path);

    let addr = super::build_socket_addr(&config)?;
    info!("Starting API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = collector.flush().await {
        error!("Failed to write final metrics: {}", e);
    }
    shutdown_tracing();
    info!("API server shutdown complete");

    Ok(())
}

fn init_observability(config: &AppConfig) {
    init_tracing(
        &logging::LoggingConfig::from(&config.logging),
        &config.observability.tracing,
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
