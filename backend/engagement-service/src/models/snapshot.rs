//! Immutable profile snapshots used for before/after comparison.
//!
//! A snapshot is never persisted; it exists so the analytics reporter can
//! diff the state captured before a recompute against the state after it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::{LaunchpadState, PipelineInsight, ProfileRecord};

/// Discrete trust-score band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Emerging,
    Silver,
    Gold,
    Platinum,
}

impl TrustLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::Emerging => "emerging",
            TrustLevel::Silver => "silver",
            TrustLevel::Gold => "gold",
            TrustLevel::Platinum => "platinum",
        }
    }

    /// Tiering: ≥85 platinum, ≥70 gold, ≥55 silver, else emerging.
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            TrustLevel::Platinum
        } else if score >= 70.0 {
            TrustLevel::Gold
        } else if score >= 55.0 {
            TrustLevel::Silver
        } else {
            TrustLevel::Emerging
        }
    }
}

/// The derived metrics captured in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetrics {
    pub trust_score: f64,
    pub trust_score_level: TrustLevel,
    pub profile_completion: f64,
    pub likes_count: i64,
    pub followers_count: i64,
    pub connections_count: i64,
    pub engagement_refreshed_at: Option<DateTime<Utc>>,
}

/// A normalized, comparable capture of a profile at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub profile_id: Uuid,
    pub user_id: Uuid,
    pub metrics: SnapshotMetrics,
    pub launchpad: LaunchpadState,
    pub volunteer_badges: Vec<String>,
    pub status_flags: Vec<String>,
    pub pipeline_insights: Vec<PipelineInsight>,
}

/// A profile record paired with freshly computed metrics, produced by the
/// recompute path just before the derived columns are written back.
#[derive(Debug, Clone)]
pub struct ProfileOverview {
    pub profile: ProfileRecord,
    pub metrics: SnapshotMetrics,
}

impl ProfileSnapshot {
    /// Snapshot a raw record using its stored derived columns.
    pub fn from_record(record: &ProfileRecord) -> Self {
        let metrics = SnapshotMetrics {
            trust_score: record.trust_score,
            trust_score_level: TrustLevel::from_score(record.trust_score),
            profile_completion: record.profile_completion,
            likes_count: record.likes_count,
            followers_count: record.followers_count,
            connections_count: record.connections_count,
            engagement_refreshed_at: record.engagement_refreshed_at,
        };
        Self::assemble(record, metrics)
    }

    /// Snapshot a raw record with explicit metric overrides.
    pub fn from_record_with_metrics(record: &ProfileRecord, metrics: SnapshotMetrics) -> Self {
        Self::assemble(record, metrics)
    }

    /// Snapshot a live overview (record + freshly computed metrics).
    pub fn from_overview(overview: &ProfileOverview) -> Self {
        Self::assemble(&overview.profile, overview.metrics.clone())
    }

    fn assemble(record: &ProfileRecord, metrics: SnapshotMetrics) -> Self {
        Self {
            profile_id: record.id,
            user_id: record.user_id,
            metrics,
            launchpad: record.launchpad.clone(),
            volunteer_badges: record.volunteer_badges.clone(),
            status_flags: record.status_flags.clone(),
            pipeline_insights: record.pipeline_insights.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_level_bands() {
        assert_eq!(TrustLevel::from_score(0.0), TrustLevel::Emerging);
        assert_eq!(TrustLevel::from_score(54.99), TrustLevel::Emerging);
        assert_eq!(TrustLevel::from_score(55.0), TrustLevel::Silver);
        assert_eq!(TrustLevel::from_score(70.0), TrustLevel::Gold);
        assert_eq!(TrustLevel::from_score(84.99), TrustLevel::Gold);
        assert_eq!(TrustLevel::from_score(85.0), TrustLevel::Platinum);
        assert_eq!(TrustLevel::from_score(100.0), TrustLevel::Platinum);
    }

    #[test]
    fn snapshot_from_record_uses_stored_metrics() {
        let record = ProfileRecord {
            trust_score: 72.5,
            profile_completion: 40.0,
            likes_count: 12,
            followers_count: 3,
            connections_count: 7,
            ..Default::default()
        };
        let snapshot = ProfileSnapshot::from_record(&record);
        assert_eq!(snapshot.metrics.trust_score, 72.5);
        assert_eq!(snapshot.metrics.trust_score_level, TrustLevel::Gold);
        assert_eq!(snapshot.metrics.likes_count, 12);
        assert_eq!(snapshot.metrics.followers_count, 3);
        assert_eq!(snapshot.metrics.connections_count, 7);
    }

    #[test]
    fn snapshot_from_overview_prefers_fresh_metrics() {
        let record = ProfileRecord {
            trust_score: 10.0,
            likes_count: 1,
            ..Default::default()
        };
        let overview = ProfileOverview {
            metrics: SnapshotMetrics {
                trust_score: 56.0,
                trust_score_level: TrustLevel::from_score(56.0),
                profile_completion: 80.0,
                likes_count: 5,
                followers_count: 2,
                connections_count: 0,
                engagement_refreshed_at: Some(Utc::now()),
            },
            profile: record,
        };
        let snapshot = ProfileSnapshot::from_overview(&overview);
        assert_eq!(snapshot.metrics.trust_score, 56.0);
        assert_eq!(snapshot.metrics.trust_score_level, TrustLevel::Silver);
        assert_eq!(snapshot.metrics.likes_count, 5);
    }
}
