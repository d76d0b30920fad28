//! Analytics diff reporter.
//!
//! Compares before/after snapshots and emits delta-bearing events through
//! the ingestion sink. Emission is best-effort: sink failures are logged and
//! never surfaced to the recompute path.

use std::sync::Arc;

use event_ingest::{AnalyticsEvent, EventSink};
use tracing::{debug, warn};

use crate::models::ProfileSnapshot;
use crate::services::targeting::{derive_targeting, TargetingDiff};

/// Trust-score deltas below this are noise unless the tier moved.
pub const TRUST_DELTA_NOISE_THRESHOLD: f64 = 0.05;

const ENTITY_TYPE: &str = "profile";

pub mod events {
    pub const TRUST_SCORE_CHANGED: &str = "profile.trust_score_changed";
    pub const ENGAGEMENT_REFRESHED: &str = "profile.engagement_refreshed";
    pub const TARGETING_CHANGED: &str = "profile.targeting_changed";
}

/// Emits segmentation events derived from snapshot diffs.
#[derive(Clone)]
pub struct AnalyticsReporter {
    sink: Arc<dyn EventSink>,
    source: String,
}

impl AnalyticsReporter {
    pub fn new(sink: Arc<dyn EventSink>, source: impl Into<String>) -> Self {
        Self {
            sink,
            source: source.into(),
        }
    }

    /// Emit a trust-score change event unless the movement is noise.
    ///
    /// Suppressed when |delta| < 0.05 AND the tier label is unchanged.
    pub async fn report_trust_score_change(
        &self,
        previous: &ProfileSnapshot,
        next: &ProfileSnapshot,
    ) {
        let delta = next.metrics.trust_score - previous.metrics.trust_score;
        let tier_changed = previous.metrics.trust_score_level != next.metrics.trust_score_level;

        if delta.abs() < TRUST_DELTA_NOISE_THRESHOLD && !tier_changed {
            debug!(
                profile_id = %next.profile_id,
                delta = delta,
                "Trust score movement below noise threshold, suppressing event"
            );
            return;
        }

        let diff = self.targeting_diff(previous, next);
        let context = serde_json::json!({
            "previous_score": previous.metrics.trust_score,
            "next_score": next.metrics.trust_score,
            "delta": delta,
            "previous_tier": previous.metrics.trust_score_level.as_str(),
            "next_tier": next.metrics.trust_score_level.as_str(),
            "tier_changed": tier_changed,
            "targeting": diff.to_context(),
        });
        self.emit(events::TRUST_SCORE_CHANGED, next, context).await;
    }

    /// Emit an engagement refresh event.
    ///
    /// Suppressed only when both the likes and followers deltas are zero and
    /// no explicit reason was supplied.
    pub async fn report_engagement_refresh(
        &self,
        previous: &ProfileSnapshot,
        next: &ProfileSnapshot,
        reason: Option<&str>,
    ) {
        let likes_delta = next.metrics.likes_count - previous.metrics.likes_count;
        let followers_delta = next.metrics.followers_count - previous.metrics.followers_count;

        if likes_delta == 0 && followers_delta == 0 && reason.is_none() {
            debug!(
                profile_id = %next.profile_id,
                "Engagement counts unchanged and no reason given, suppressing event"
            );
            return;
        }

        let diff = self.targeting_diff(previous, next);
        let context = serde_json::json!({
            "likes": {
                "previous": previous.metrics.likes_count,
                "next": next.metrics.likes_count,
                "delta": likes_delta,
            },
            "followers": {
                "previous": previous.metrics.followers_count,
                "next": next.metrics.followers_count,
                "delta": followers_delta,
            },
            "reason": reason,
            "targeting": diff.to_context(),
        });
        self.emit(events::ENGAGEMENT_REFRESHED, next, context).await;
    }

    /// Emit a targeting-only change event (funnel movement without a metrics
    /// refresh). Suppressed when the diff is empty.
    pub async fn report_targeting_change(
        &self,
        previous: &ProfileSnapshot,
        next: &ProfileSnapshot,
    ) {
        let diff = self.targeting_diff(previous, next);
        if diff.is_empty() {
            debug!(
                profile_id = %next.profile_id,
                "No targeting movement, suppressing event"
            );
            return;
        }
        self.emit(events::TARGETING_CHANGED, next, diff.to_context())
            .await;
    }

    fn targeting_diff(&self, previous: &ProfileSnapshot, next: &ProfileSnapshot) -> TargetingDiff {
        TargetingDiff::between(&derive_targeting(previous), &derive_targeting(next))
    }

    async fn emit(&self, event_name: &str, next: &ProfileSnapshot, context: serde_json::Value) {
        let event = AnalyticsEvent::system(
            event_name,
            ENTITY_TYPE,
            next.profile_id,
            Some(next.user_id),
            self.source.clone(),
            context,
        );
        if let Err(e) = self.sink.publish(&event).await {
            warn!(
                event_name = %event_name,
                profile_id = %next.profile_id,
                error = %e,
                "Failed to publish analytics event"
            );
        }
    }
}
