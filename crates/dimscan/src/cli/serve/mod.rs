//! The `dimscan serve` command: the job engine over HTTP.

mod error;
mod routes;

use clap::Args;
use dimscan_core::{Config, JobEngine};

use routes::{router, AppState};

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind [default: server.host]
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on [default: server.port]
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Execute the serve command. Runs until Ctrl-C or SIGTERM.
pub async fn execute(args: ServeArgs, config: Config) -> anyhow::Result<()> {
    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    tracing::info!(
        output_dir = %config.output_dir().display(),
        history = config.jobs.history_capacity,
        "Reports will be written to the output directory"
    );

    let app = router(AppState {
        engine: JobEngine::new(config),
    });

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {host}:{port}: {e}"))?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
