use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use exeforge_core::{
    load_config, validate_config, BatchCoordinator, ImageIconConverter, JobRunner,
    PyInstallerPackager,
};
use exeforge_server::{api::create_router, logging::init_logging, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long shutdown waits for cancelled jobs to reach a terminal state.
///
/// A tool that prints nothing more never observes the cancellation.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Config errors happen before the subscriber exists
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("EXEFORGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("exeforge.toml"));

    // Load and validate configuration before logging exists
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let _log_guard = init_logging(&config.logging)?;

    info!("exeforge {} starting", VERSION);
    info!("Configuration loaded from {:?}", config_path);
    info!(
        "Packaging tool: {}",
        config.packager.tool_command.join(" ")
    );

    // Build the job pipeline
    let packager = Arc::new(PyInstallerPackager::new(config.packager.clone()));
    let icons = Arc::new(ImageIconConverter::new());
    let mut runner = JobRunner::new(packager, icons);
    if let Some(secs) = config.packager.job_timeout_secs {
        info!("Job timeout: {}s", secs);
        runner = runner.with_timeout(Duration::from_secs(secs));
    }

    let coordinator = BatchCoordinator::new(config.batch.clone(), runner);
    match config.batch.concurrency_limit() {
        Some(limit) => info!("Running at most {} jobs at once", limit),
        None => info!("No limit on concurrent jobs"),
    }

    let state = Arc::new(AppState::new(config.clone(), coordinator));
    let app = create_router(Arc::clone(&state));

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    // Stop the running batch and let every job clean up
    let coordinator = state.coordinator();
    if coordinator.is_busy() {
        if let Err(e) = coordinator.cancel_all().await {
            warn!("Failed to cancel running batch: {}", e);
        }
        info!("Waiting for running jobs to stop...");
        match tokio::time::timeout(SHUTDOWN_GRACE, coordinator.wait_idle()).await {
            Ok(()) => info!("All jobs stopped"),
            Err(_) => warn!(
                "Jobs still running after {}s, exiting anyway",
                SHUTDOWN_GRACE.as_secs()
            ),
        }
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
