//! Recompute orchestration.
//!
//! One recompute = one transaction per profile: lock the row, aggregate raw
//! signals, re-derive completion and trust score, persist the derived
//! columns, commit, then report diffs to analytics best-effort. The queue
//! path and the synchronous `recompute_now` path share this code, so both
//! are idempotent — recomputing twice with no intervening signal mutations
//! writes identical values.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::db::{engagement_repo, job_repo, profile_repo};
use crate::error::{ServiceError, ServiceResult};
use crate::models::job::{reasons, EngagementJob, EnqueueOptions, JobStatus};
use crate::models::{ProfileRecord, ProfileSnapshot, SnapshotMetrics};
use crate::services::analytics::AnalyticsReporter;
use crate::services::completion;
use crate::services::trust_score::{self, TrustScoreInputs, TrustScoreResult};

/// Derived metrics older than this are considered stale by read paths.
pub const STALENESS_WINDOW_MINS: i64 = 30;

/// Options for a synchronous recompute.
#[derive(Debug, Clone, Default)]
pub struct RecomputeOptions {
    /// Cause recorded on analytics emissions (forces the engagement refresh
    /// event even when counts did not move).
    pub reason: Option<String>,
}

/// Result of one recompute run.
#[derive(Debug, Clone)]
pub struct RecomputeOutcome {
    pub previous: ProfileSnapshot,
    pub next: ProfileSnapshot,
    pub trust: TrustScoreResult,
}

/// Owns the recompute pipeline: aggregation, scoring, persistence, queue
/// processing and analytics reporting.
#[derive(Clone)]
pub struct RecomputeService {
    pool: PgPool,
    reporter: AnalyticsReporter,
}

impl RecomputeService {
    pub fn new(pool: PgPool, reporter: AnalyticsReporter) -> Self {
        Self { pool, reporter }
    }

    /// Schedule a recompute for a profile (merging into an existing pending
    /// job when there is one).
    pub async fn enqueue(
        &self,
        profile_id: Uuid,
        options: &EnqueueOptions,
    ) -> ServiceResult<EngagementJob> {
        job_repo::enqueue(&self.pool, profile_id, options).await
    }

    /// Queue depth and oldest pending age in seconds, for operational
    /// logging from the worker loop.
    pub async fn pending_stats(&self) -> ServiceResult<(i64, i64)> {
        job_repo::pending_stats(&self.pool).await
    }

    /// Whether a profile's derived metrics are due for a refresh.
    pub fn is_stale(record: &ProfileRecord) -> bool {
        match record.engagement_refreshed_at {
            None => true,
            Some(t) => Utc::now() - t > Duration::minutes(STALENESS_WINDOW_MINS),
        }
    }

    /// Opportunistically enqueue a refresh for a stale profile without
    /// blocking the caller (read paths call this on the way out).
    pub fn refresh_if_stale(&self, record: &ProfileRecord) {
        if !Self::is_stale(record) {
            return;
        }
        let pool = self.pool.clone();
        let profile_id = record.id;
        tokio::spawn(async move {
            let options = EnqueueOptions::with_reason(reasons::STALE_READ_REFRESH);
            if let Err(e) = job_repo::enqueue(&pool, profile_id, &options).await {
                warn!(
                    profile_id = %profile_id,
                    error = %e,
                    "Failed to enqueue stale-profile refresh"
                );
            }
        });
    }

    /// Synchronous recompute used by read endpoints that need a guaranteed
    /// fresh value. Surfaces not-found errors to the caller.
    pub async fn recompute_now(
        &self,
        profile_id: Uuid,
        options: &RecomputeOptions,
    ) -> ServiceResult<RecomputeOutcome> {
        let outcome = self.recompute_in_store(profile_id).await?;

        // Fire-and-best-effort: analytics never affects the caller's result.
        self.reporter
            .report_engagement_refresh(&outcome.previous, &outcome.next, options.reason.as_deref())
            .await;
        self.reporter
            .report_trust_score_change(&outcome.previous, &outcome.next)
            .await;

        Ok(outcome)
    }

    /// Claim and execute one batch of due jobs. Returns the number of jobs
    /// claimed and run (successfully or not). Used by the worker loop and by
    /// manual/test triggers.
    pub async fn process_queue_once(&self, limit: i64, worker_id: &str) -> ServiceResult<usize> {
        let claimed = job_repo::claim_batch(&self.pool, limit, worker_id).await?;
        let processed = claimed.len();

        for job in claimed {
            match self.execute_job(&job).await {
                Ok(_) => {
                    job_repo::complete(&self.pool, job.id).await?;
                    debug!(
                        job_id = job.id,
                        profile_id = %job.profile_id,
                        "Recompute job completed"
                    );
                }
                Err(e) => {
                    let status = job_repo::fail_or_retry(&self.pool, &job, &e.to_string()).await?;
                    match status {
                        JobStatus::Failed => error!(
                            job_id = job.id,
                            profile_id = %job.profile_id,
                            attempts = job.attempts,
                            error = %e,
                            "Recompute job failed terminally"
                        ),
                        _ => warn!(
                            job_id = job.id,
                            profile_id = %job.profile_id,
                            attempts = job.attempts,
                            error = %e,
                            "Recompute job failed, rescheduled with backoff"
                        ),
                    }
                }
            }
        }

        Ok(processed)
    }

    /// Run one claimed job. A missing profile here becomes a job failure
    /// (and eventually a terminal `failed` job), not a crash.
    async fn execute_job(&self, job: &EngagementJob) -> ServiceResult<()> {
        let options = RecomputeOptions {
            reason: job.reason.clone(),
        };
        self.recompute_now(job.profile_id, &options).await?;
        Ok(())
    }

    /// The transactional core: lock, aggregate, score, persist.
    async fn recompute_in_store(&self, profile_id: Uuid) -> ServiceResult<RecomputeOutcome> {
        let mut tx = self.pool.begin().await?;

        let record = profile_repo::fetch_for_update(&mut tx, profile_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Profile {} not found", profile_id)))?;

        let counts = engagement_repo::aggregate(&mut tx, profile_id).await?;
        let completion_pct = completion::estimate(&record);
        let now = Utc::now();
        let trust = trust_score::score(&TrustScoreInputs {
            profile: &record,
            completion: completion_pct,
            likes_count: counts.likes,
            followers_count: counts.followers,
            connections_count: record.connections_count,
            now,
        });

        let previous = ProfileSnapshot::from_record(&record);

        // Persist only after the full computation succeeded; a failure above
        // leaves the previous derived values intact.
        profile_repo::apply_recompute(
            &mut tx,
            profile_id,
            &profile_repo::DerivedMetricsUpdate {
                likes_count: counts.likes,
                followers_count: counts.followers,
                profile_completion: completion_pct,
                trust_score: trust.score,
                refreshed_at: now,
            },
        )
        .await?;

        tx.commit().await?;

        let next = ProfileSnapshot::from_record_with_metrics(
            &record,
            SnapshotMetrics {
                trust_score: trust.score,
                trust_score_level: trust.level,
                profile_completion: completion_pct,
                likes_count: counts.likes,
                followers_count: counts.followers,
                connections_count: record.connections_count,
                engagement_refreshed_at: Some(now),
            },
        );

        Ok(RecomputeOutcome {
            previous,
            next,
            trust,
        })
    }
}
