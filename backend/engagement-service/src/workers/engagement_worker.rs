//! Background queue-polling worker.
//!
//! One worker object per process, owning its own shutdown channel; several
//! process instances polling the same queue concurrently is the expected
//! deployment model (claims are optimistic, see `db::job_repo`). Within a
//! process the loop runs on a single timer, so ticks never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::services::RecomputeService;

/// Runtime settings for the polling loop.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// When false, `start` is a no-op (test/ephemeral environments).
    pub enabled: bool,
    pub tick_interval: Duration,
    pub batch_size: i64,
    /// Claim owner recorded on `locked_by`
    pub worker_id: String,
}

impl WorkerSettings {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            enabled: config.enabled,
            tick_interval: Duration::from_secs(config.tick_secs),
            batch_size: config.batch_size,
            worker_id: default_worker_id(),
        }
    }
}

fn default_worker_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("engagement-worker-{}-{}", std::process::id(), &suffix[..8])
}

/// Owns the polling task; constructed and held by the composition root.
pub struct EngagementWorker {
    service: Arc<RecomputeService>,
    settings: WorkerSettings,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl EngagementWorker {
    pub fn new(service: Arc<RecomputeService>, settings: WorkerSettings) -> Self {
        Self {
            service,
            settings,
            shutdown: None,
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawn the polling loop. No-op when the worker is disabled or already
    /// running.
    pub fn start(&mut self) {
        if !self.settings.enabled {
            info!("Engagement worker disabled, not starting");
            return;
        }
        if self.handle.is_some() {
            warn!("Engagement worker already running, ignoring start");
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        let service = self.service.clone();
        let tick_interval = self.settings.tick_interval;
        let batch_size = self.settings.batch_size;
        let worker_id = self.settings.worker_id.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick_interval);
            // A slow tick delays the next one instead of bursting to catch up.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                worker_id = %worker_id,
                tick_secs = tick_interval.as_secs(),
                batch_size = batch_size,
                "Engagement worker started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match service.process_queue_once(batch_size, &worker_id).await {
                            Ok(0) => debug!("No due engagement jobs"),
                            Ok(n) => {
                                info!(processed = n, "Processed engagement jobs");
                                match service.pending_stats().await {
                                    Ok((pending, age_seconds)) => debug!(
                                        pending = pending,
                                        oldest_age_seconds = age_seconds,
                                        "Queue depth after tick"
                                    ),
                                    Err(e) => debug!(error = %e, "Failed to read queue stats"),
                                }
                            }
                            Err(e) => error!(error = %e, "Engagement worker tick failed"),
                        }
                    }
                    _ = rx.changed() => {
                        info!(worker_id = %worker_id, "Engagement worker stopping");
                        break;
                    }
                }
            }
        });

        self.shutdown = Some(tx);
        self.handle = Some(handle);
    }

    /// Signal the loop to stop and wait for it to wind down.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            match tokio::time::timeout(Duration::from_secs(5), handle).await {
                Ok(_) => info!("Engagement worker shut down"),
                Err(_) => warn!("Engagement worker did not shut down within timeout"),
            }
        }
    }
}
