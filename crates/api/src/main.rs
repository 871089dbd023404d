use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cloudrender_api::background::requeue_sweep;
use cloudrender_api::config::ServerConfig;
use cloudrender_api::router::build_app_router;
use cloudrender_api::state::AppState;
use cloudrender_api::storage::ArtifactStore;
use cloudrender_db::repositories::JobStatusRepo;
use cloudrender_queue::RedisQueue;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloudrender_api=debug,cloudrender_queue=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let pool = cloudrender_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    cloudrender_db::health_check(&pool)
        .await
        .context("Database health check failed")?;

    cloudrender_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Status vocabulary ---
    let vocabulary = JobStatusRepo::load_vocabulary(&pool)
        .await
        .context("Failed to load job status vocabulary")?;
    tracing::info!(statuses = vocabulary.len(), "Job status vocabulary loaded");

    // --- Dispatch queue ---
    let queue = RedisQueue::connect(&config.redis_url, config.queue_keys.clone())
        .await
        .context("Failed to connect to dispatch queue")?;

    // --- Artifact storage ---
    tokio::fs::create_dir_all(&config.files_input_path)
        .await
        .with_context(|| format!("Failed to create {}", config.files_input_path.display()))?;
    tokio::fs::create_dir_all(&config.files_output_path)
        .await
        .with_context(|| format!("Failed to create {}", config.files_output_path.display()))?;
    let store = ArtifactStore::new(&config.files_input_path, &config.files_output_path);

    // --- App state ---
    let config = Arc::new(config);
    let state = AppState {
        pool,
        config: Arc::clone(&config),
        queue: Arc::new(queue),
        vocabulary: Arc::new(vocabulary),
        store: Arc::new(store),
    };

    // --- Requeue sweep ---
    let cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(requeue_sweep::run(
        state.clone(),
        config.requeue.clone(),
        cancel.clone(),
    ));

    // --- Router ---
    let app = build_app_router(state)?;

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    tracing::info!(%addr, prefix = %config.api_prefix, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(grace, sweep_handle).await.is_err() {
        tracing::warn!("Requeue sweep did not stop within the shutdown timeout");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
