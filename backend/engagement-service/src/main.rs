use std::sync::Arc;

use engagement_service::{
    config::Config,
    services::{AnalyticsReporter, RecomputeService},
    workers::{EngagementWorker, WorkerSettings},
};
use event_ingest::{EventSink, NoopSink, TracingSink};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    }
}

fn build_sink() -> Arc<dyn EventSink> {
    // The real ingestion pipeline is wired in by deployment; until then the
    // tracing sink gives an auditable record of what would be emitted.
    let kind = std::env::var("ANALYTICS_SINK").unwrap_or_else(|_| "tracing".to_string());
    match kind.as_str() {
        "noop" => {
            info!("Using NoopSink for analytics events");
            Arc::new(NoopSink)
        }
        _ => {
            info!("Using TracingSink for analytics events");
            Arc::new(TracingSink)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .with_ansi(true)
        .init();

    info!("Starting Engagement Service...");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        environment = %config.app.env,
        worker_enabled = config.worker.enabled,
        "Configuration loaded"
    );

    // Initialize database pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;
    info!("Database pool initialized");

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Migration failed: {}", e);
        e
    })?;
    info!("Migrations completed successfully");

    // Wire the recompute pipeline
    let reporter = AnalyticsReporter::new(build_sink(), "engagement-service");
    let service = Arc::new(RecomputeService::new(pool.clone(), reporter));

    // Start the queue worker
    let mut worker = EngagementWorker::new(
        service.clone(),
        WorkerSettings::from_config(&config.worker),
    );
    worker.start();

    info!("Engagement service running, waiting for shutdown signal");
    shutdown_signal().await;

    info!("Shutdown signal received, stopping worker...");
    worker.stop().await;
    pool.close().await;
    info!("Engagement service stopped");

    Ok(())
}
