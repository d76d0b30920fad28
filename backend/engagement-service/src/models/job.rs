//! Engagement recompute queue rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Maximum execution attempts before a job goes terminal.
pub const MAX_ATTEMPTS: i32 = 5;

/// Seconds after which a claim is considered abandoned and reclaimable.
pub const LOCK_TIMEOUT_SECS: i64 = 120;

/// Stored `last_error` is truncated to this many characters.
pub const LAST_ERROR_MAX_CHARS: usize = 500;

/// Well-known enqueue reasons.
pub mod reasons {
    pub const APPRECIATION_RECORDED: &str = "appreciation_recorded";
    pub const FOLLOWER_ADDED: &str = "follower_added";
    pub const FOLLOWER_REMOVED: &str = "follower_removed";
    pub const FOLLOWER_STATUS_CHANGED: &str = "follower_status_changed";
    pub const STALE_READ_REFRESH: &str = "stale_read_refresh";
    pub const MANUAL: &str = "manual";
}

/// Queue row lifecycle. A claimed job stays `pending` and is distinguished by
/// its lock fields; there is no separate "running" status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// One "recompute profile X" job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementJob {
    pub id: i64,
    pub profile_id: Uuid,
    pub status: JobStatus,
    pub scheduled_at: DateTime<Utc>,
    /// Higher wins when claiming
    pub priority: i32,
    pub reason: Option<String>,
    pub attempts: i32,
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_by: Option<String>,
    pub last_error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied knobs for `enqueue`.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    pub reason: Option<String>,
    pub priority: i32,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl EnqueueOptions {
    pub fn with_reason(reason: &str) -> Self {
        Self {
            reason: Some(reason.to_string()),
            ..Default::default()
        }
    }
}

/// Exponential backoff for a retry after the given attempt count.
///
/// Strategy: 30s × 2^(attempts−1), capped at 5 minutes
/// - Attempt 1: 30 seconds
/// - Attempt 2: 60 seconds
/// - Attempt 3: 120 seconds
/// - Attempt 4+: 300 seconds (5 minutes)
pub fn retry_backoff(attempts: i32) -> Duration {
    const MAX_BACKOFF_SECS: u64 = 300;

    let exponent = attempts.saturating_sub(1).max(0).min(16) as u32;
    let backoff_secs = 30u64.saturating_mul(2u64.pow(exponent)).min(MAX_BACKOFF_SECS);
    Duration::from_secs(backoff_secs)
}

/// Truncate an execution error for storage in `last_error`.
pub fn truncate_error(message: &str) -> String {
    if message.chars().count() <= LAST_ERROR_MAX_CHARS {
        message.to_string()
    } else {
        message.chars().take(LAST_ERROR_MAX_CHARS).collect()
    }
}
