//! Marketing/lifecycle targeting derived from a profile snapshot.
//!
//! Pure rule engine: a snapshot in, a funnel stage plus a set of named
//! audience segments out. Segments are a union (several may apply at once);
//! the stage is a single value with later rules overriding earlier ones.

use serde::{Deserialize, Serialize};

use crate::models::profile::{flags, has_flag};
use crate::models::{ProfileSnapshot, SnapshotMetrics};
use crate::services::trust_score::{is_pipeline_win, launchpad_status_score};

/// Launchpad status-score at or above which a profile is segment-eligible.
const LAUNCHPAD_READY_THRESHOLD: f64 = 0.62;

/// Funnel position, escalating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Awareness,
    Consideration,
    Ready,
    Prime,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Awareness => "awareness",
            Stage::Consideration => "consideration",
            Stage::Ready => "ready",
            Stage::Prime => "prime",
        }
    }
}

/// Named audience segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    ProfileReady,
    AudienceBuilder,
    HighIntentTalent,
    LaunchpadReady,
    VolunteerAdvocate,
    DeliveryProven,
    PremiumCandidate,
    InstantBookReady,
}

impl Segment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::ProfileReady => "profile_ready",
            Segment::AudienceBuilder => "audience_builder",
            Segment::HighIntentTalent => "high_intent_talent",
            Segment::LaunchpadReady => "launchpad_ready",
            Segment::VolunteerAdvocate => "volunteer_advocate",
            Segment::DeliveryProven => "delivery_proven",
            Segment::PremiumCandidate => "premium_candidate",
            Segment::InstantBookReady => "instant_book_ready",
        }
    }
}

/// Targeting output for one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct TargetingProfile {
    pub stage: Stage,
    pub segments: Vec<Segment>,
    pub metrics: SnapshotMetrics,
}

/// Derive the stage and segment set for a snapshot.
pub fn derive_targeting(snapshot: &ProfileSnapshot) -> TargetingProfile {
    let metrics = &snapshot.metrics;
    let trust = metrics.trust_score;
    let completion = metrics.profile_completion;
    let likes = metrics.likes_count;
    let followers = metrics.followers_count;
    let connections = metrics.connections_count;

    let status_score = launchpad_status_score(snapshot.launchpad.status.as_deref());
    let wins = snapshot
        .pipeline_insights
        .iter()
        .filter(|i| is_pipeline_win(&i.status))
        .count();

    let mut segments = Vec::new();

    if completion >= 70.0 || trust >= 45.0 {
        segments.push(Segment::ProfileReady);
    }
    if likes >= 40 || followers >= 60 || connections >= 50 {
        segments.push(Segment::AudienceBuilder);
    }
    if followers >= 200 || (trust >= 80.0 && likes >= 80) {
        segments.push(Segment::HighIntentTalent);
    }
    if status_score >= LAUNCHPAD_READY_THRESHOLD || snapshot.launchpad.cohorts > 0 {
        segments.push(Segment::LaunchpadReady);
    }
    if snapshot.volunteer_badges.len() >= 2
        || has_flag(&snapshot.status_flags, flags::VOLUNTEER_ACTIVE)
        || has_flag(&snapshot.status_flags, flags::MENTOR)
    {
        segments.push(Segment::VolunteerAdvocate);
    }
    if wins >= 1
        || has_flag(&snapshot.status_flags, flags::PREFERRED_TALENT)
        || has_flag(&snapshot.status_flags, flags::JOBS_BOARD_FEATURED)
    {
        segments.push(Segment::DeliveryProven);
    }
    if wins >= 3 || trust >= 90.0 {
        segments.push(Segment::PremiumCandidate);
    }
    if has_flag(&snapshot.status_flags, flags::INSTANT_BOOK) {
        segments.push(Segment::InstantBookReady);
    }

    let launchpad_ready = segments.contains(&Segment::LaunchpadReady);
    let delivery_proven = segments.contains(&Segment::DeliveryProven);
    let premium = segments.contains(&Segment::PremiumCandidate);

    // Escalating rules; later ones win.
    let mut stage = Stage::Awareness;
    if segments.contains(&Segment::ProfileReady)
        || segments.contains(&Segment::AudienceBuilder)
        || trust >= 45.0
    {
        stage = Stage::Consideration;
    }
    if launchpad_ready || delivery_proven || trust >= 70.0 {
        stage = Stage::Ready;
    }
    if premium || (launchpad_ready && delivery_proven) || trust >= 88.0 {
        stage = Stage::Prime;
    }

    TargetingProfile {
        stage,
        segments,
        metrics: metrics.clone(),
    }
}

/// Difference between two targeting results.
#[derive(Debug, Clone, Serialize)]
pub struct TargetingDiff {
    pub previous_stage: Stage,
    pub next_stage: Stage,
    pub stage_changed: bool,
    pub segments_added: Vec<Segment>,
    pub segments_removed: Vec<Segment>,
}

impl TargetingDiff {
    pub fn between(previous: &TargetingProfile, next: &TargetingProfile) -> Self {
        let segments_added = next
            .segments
            .iter()
            .filter(|s| !previous.segments.contains(s))
            .copied()
            .collect();
        let segments_removed = previous
            .segments
            .iter()
            .filter(|s| !next.segments.contains(s))
            .copied()
            .collect();
        Self {
            previous_stage: previous.stage,
            next_stage: next.stage,
            stage_changed: previous.stage != next.stage,
            segments_added,
            segments_removed,
        }
    }

    /// No stage movement and no segment churn.
    pub fn is_empty(&self) -> bool {
        !self.stage_changed && self.segments_added.is_empty() && self.segments_removed.is_empty()
    }

    pub fn to_context(&self) -> serde_json::Value {
        serde_json::json!({
            "previous_stage": self.previous_stage.as_str(),
            "next_stage": self.next_stage.as_str(),
            "stage_changed": self.stage_changed,
            "segments_added": self.segments_added.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            "segments_removed": self.segments_removed.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::{LaunchpadState, PipelineInsight};
    use crate::models::{ProfileRecord, ProfileSnapshot, SnapshotMetrics, TrustLevel};

    fn snapshot_with_metrics(trust: f64, completion: f64, likes: i64, followers: i64) -> ProfileSnapshot {
        let record = ProfileRecord::default();
        ProfileSnapshot::from_record_with_metrics(
            &record,
            SnapshotMetrics {
                trust_score: trust,
                trust_score_level: TrustLevel::from_score(trust),
                profile_completion: completion,
                likes_count: likes,
                followers_count: followers,
                connections_count: 0,
                engagement_refreshed_at: None,
            },
        )
    }

    #[test]
    fn empty_snapshot_is_awareness_with_no_segments() {
        let snapshot = snapshot_with_metrics(0.0, 0.0, 0, 0);
        let targeting = derive_targeting(&snapshot);
        assert_eq!(targeting.stage, Stage::Awareness);
        assert!(targeting.segments.is_empty());
    }

    #[test]
    fn trust_alone_escalates_the_stage() {
        assert_eq!(
            derive_targeting(&snapshot_with_metrics(45.0, 0.0, 0, 0)).stage,
            Stage::Consideration
        );
        assert_eq!(
            derive_targeting(&snapshot_with_metrics(70.0, 0.0, 0, 0)).stage,
            Stage::Ready
        );
        assert_eq!(
            derive_targeting(&snapshot_with_metrics(88.0, 0.0, 0, 0)).stage,
            Stage::Prime
        );
    }

    #[test]
    fn audience_builder_thresholds() {
        for (likes, followers, connections, expected) in [
            (40, 0, 0, true),
            (0, 60, 0, true),
            (0, 0, 50, true),
            (39, 59, 49, false),
        ] {
            let mut snapshot = snapshot_with_metrics(0.0, 0.0, likes, followers);
            snapshot.metrics.connections_count = connections;
            let targeting = derive_targeting(&snapshot);
            assert_eq!(
                targeting.segments.contains(&Segment::AudienceBuilder),
                expected,
                "likes={} followers={} connections={}",
                likes,
                followers,
                connections
            );
        }
    }

    #[test]
    fn high_intent_requires_followers_or_trust_and_likes() {
        let by_followers = snapshot_with_metrics(0.0, 0.0, 0, 200);
        assert!(derive_targeting(&by_followers)
            .segments
            .contains(&Segment::HighIntentTalent));

        let by_trust_and_likes = snapshot_with_metrics(80.0, 0.0, 80, 0);
        assert!(derive_targeting(&by_trust_and_likes)
            .segments
            .contains(&Segment::HighIntentTalent));

        let trust_without_likes = snapshot_with_metrics(85.0, 0.0, 10, 0);
        assert!(!derive_targeting(&trust_without_likes)
            .segments
            .contains(&Segment::HighIntentTalent));
    }

    #[test]
    fn launchpad_plus_delivery_reaches_prime() {
        let record = ProfileRecord {
            launchpad: LaunchpadState {
                status: Some("accepted".into()),
                ..Default::default()
            },
            pipeline_insights: vec![PipelineInsight {
                label: "Platform migration".into(),
                status: "won".into(),
            }],
            ..Default::default()
        };
        let snapshot = ProfileSnapshot::from_record(&record);
        let targeting = derive_targeting(&snapshot);
        assert!(targeting.segments.contains(&Segment::LaunchpadReady));
        assert!(targeting.segments.contains(&Segment::DeliveryProven));
        assert_eq!(targeting.stage, Stage::Prime);
    }

    #[test]
    fn premium_candidate_by_wins() {
        let record = ProfileRecord {
            pipeline_insights: (0..3)
                .map(|i| PipelineInsight {
                    label: format!("Gig {}", i),
                    status: "closed won".into(),
                })
                .collect(),
            ..Default::default()
        };
        let snapshot = ProfileSnapshot::from_record(&record);
        let targeting = derive_targeting(&snapshot);
        assert!(targeting.segments.contains(&Segment::PremiumCandidate));
        assert_eq!(targeting.stage, Stage::Prime);
    }

    #[test]
    fn diff_reports_stage_and_segment_churn() {
        let before = derive_targeting(&snapshot_with_metrics(10.0, 0.0, 0, 0));
        let after = derive_targeting(&snapshot_with_metrics(72.0, 80.0, 50, 0));

        let diff = TargetingDiff::between(&before, &after);
        assert!(diff.stage_changed);
        assert_eq!(diff.previous_stage, Stage::Awareness);
        assert_eq!(diff.next_stage, Stage::Ready);
        assert!(diff.segments_added.contains(&Segment::ProfileReady));
        assert!(diff.segments_added.contains(&Segment::AudienceBuilder));
        assert!(diff.segments_removed.is_empty());
        assert!(!diff.is_empty());

        let unchanged = TargetingDiff::between(&after, &after);
        assert!(unchanged.is_empty());
    }
}
