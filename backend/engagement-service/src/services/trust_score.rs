//! Multi-factor trust score engine.
//!
//! Pure function: profile attributes + aggregated engagement signals in,
//! weighted score + tier + per-component breakdown + recommended re-review
//! date out. Reproducible given identical inputs; `now` is an explicit input
//! used for recency arithmetic only.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::models::profile::{
    flags, has_flag, launchpad_flags, Availability, AvailabilityFamily, ImpactHighlight,
    LaunchpadState, PipelineInsight, ProfileRecord, ProfileReference,
};
use crate::models::TrustLevel;

// Component weights; they sum to 1.0.
pub const WEIGHT_FOUNDATION: f64 = 0.25;
pub const WEIGHT_SOCIAL_PROOF: f64 = 0.15;
pub const WEIGHT_LAUNCHPAD: f64 = 0.20;
pub const WEIGHT_VOLUNTEER: f64 = 0.15;
pub const WEIGHT_DELIVERY: f64 = 0.15;
pub const WEIGHT_AVAILABILITY: f64 = 0.05;
pub const WEIGHT_COMPLIANCE: f64 = 0.05;

// Saturation anchors for the log-shaped network signals.
const FOLLOWERS_SATURATION: f64 = 1500.0;
const LIKES_SATURATION: f64 = 400.0;
const CONNECTIONS_SATURATION: f64 = 120.0;

// Keyword classifiers. The literal keyword lists are load-bearing business
// heuristics; do not tidy them up without product sign-off.
static WIN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(won|win|closed|hired|signed|delivered)\b").unwrap());
static INTERVIEW_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(interview|shortlist|screening|trial)\b").unwrap());
static VOLUNTEER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(volunteer|community|pro bono|nonprofit|mentorship)\b").unwrap());

/// Whether a pipeline item's status string reads as a won engagement.
pub fn is_pipeline_win(status: &str) -> bool {
    WIN_PATTERN.is_match(status)
}

/// Whether a pipeline item's status string reads as an interview-type stage.
pub fn is_interview_stage(status: &str) -> bool {
    INTERVIEW_PATTERN.is_match(status)
}

/// Whether an impact highlight is volunteer-tagged.
pub fn is_volunteer_tagged(highlight: &ImpactHighlight) -> bool {
    VOLUNTEER_PATTERN.is_match(&highlight.title)
        || highlight
            .description
            .as_deref()
            .map(|d| VOLUNTEER_PATTERN.is_match(d))
            .unwrap_or(false)
}

/// Bounded [0, 1] transform of an unbounded count: log10(v+1)/log10(s+1),
/// clamped. Negative counts are treated as zero.
pub fn saturating_signal(value: i64, saturation: f64) -> f64 {
    let v = value.max(0) as f64;
    clamp01((v + 1.0).log10() / (saturation + 1.0).log10())
}

/// Launchpad program status mapped into [0.1, 1.0].
pub fn launchpad_status_score(status: Option<&str>) -> f64 {
    match status.map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("graduated") => 1.0,
        Some("active") => 0.85,
        Some("accepted") => 0.7,
        Some("applied") => 0.45,
        Some("waitlisted") => 0.3,
        _ => 0.1,
    }
}

/// Inputs to one scoring run. Engagement counts are passed explicitly so the
/// engine scores freshly aggregated values, not whatever the record last
/// persisted.
#[derive(Debug, Clone)]
pub struct TrustScoreInputs<'a> {
    pub profile: &'a ProfileRecord,
    /// Completion percentage in [0, 100]
    pub completion: f64,
    pub likes_count: i64,
    pub followers_count: i64,
    pub connections_count: i64,
    pub now: DateTime<Utc>,
}

/// One weighted component of the final score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreComponent {
    pub name: &'static str,
    /// Normalized component value in [0, 1]
    pub raw: f64,
    pub weight: f64,
    /// Contribution to the final score: raw × weight × 100
    pub points: f64,
}

/// Output of the engine.
#[derive(Debug, Clone, Serialize)]
pub struct TrustScoreResult {
    /// Final score in [0, 100]
    pub score: f64,
    pub level: TrustLevel,
    pub breakdown: Vec<ScoreComponent>,
    pub recommended_review_at: DateTime<Utc>,
}

/// Compute the trust score for a profile.
pub fn score(inputs: &TrustScoreInputs) -> TrustScoreResult {
    let profile = inputs.profile;
    let availability = profile.availability();

    let foundation = clamp01(inputs.completion / 100.0);
    let social = social_proof_component(
        &profile.references,
        inputs.followers_count,
        inputs.likes_count,
        inputs.connections_count,
        inputs.now,
    );
    let launchpad = launchpad_component(&profile.launchpad);
    let volunteer = volunteer_component(
        &profile.volunteer_badges,
        &profile.impact_highlights,
        &profile.status_flags,
    );
    let delivery = delivery_component(
        &profile.pipeline_insights,
        &profile.impact_highlights,
        &profile.status_flags,
    );
    let availability_raw = availability_component(&availability, inputs.now);
    let compliance = compliance_component(&profile.status_flags, &profile.references);

    let breakdown = vec![
        component("foundation", foundation, WEIGHT_FOUNDATION),
        component("social_proof", social, WEIGHT_SOCIAL_PROOF),
        component("launchpad_readiness", launchpad, WEIGHT_LAUNCHPAD),
        component("volunteer_commitment", volunteer, WEIGHT_VOLUNTEER),
        component("delivery_performance", delivery, WEIGHT_DELIVERY),
        component("availability_freshness", availability_raw, WEIGHT_AVAILABILITY),
        component("compliance", compliance, WEIGHT_COMPLIANCE),
    ];

    let total: f64 = breakdown.iter().map(|c| c.points).sum();
    let score = round2(total.clamp(0.0, 100.0));

    let recommended_review_at = recommended_review_at(
        profile,
        &availability,
        availability_raw,
        launchpad,
        volunteer,
        delivery,
        score,
        inputs.now,
    );

    TrustScoreResult {
        score,
        level: TrustLevel::from_score(score),
        breakdown,
        recommended_review_at,
    }
}

fn component(name: &'static str, raw: f64, weight: f64) -> ScoreComponent {
    ScoreComponent {
        name,
        raw,
        weight,
        points: raw * weight * 100.0,
    }
}

/// 0.55 × reference confidence + 0.45 × network signal.
fn social_proof_component(
    references: &[ProfileReference],
    followers: i64,
    likes: i64,
    connections: i64,
    now: DateTime<Utc>,
) -> f64 {
    let confidence_sum: f64 = references
        .iter()
        .map(|r| {
            let verified_multiplier = if r.verified { 1.0 } else { 0.6 };
            let base = verified_multiplier * (0.6 + 0.4 * r.weight.clamp(0.0, 1.0));
            base + recency_bonus(r.last_interacted_at, now)
        })
        .sum();
    let reference_confidence = clamp01(confidence_sum / 5.0);

    let network_signal = 0.5 * saturating_signal(followers, FOLLOWERS_SATURATION)
        + 0.25 * saturating_signal(likes, LIKES_SATURATION)
        + 0.25 * saturating_signal(connections, CONNECTIONS_SATURATION);

    clamp01(0.55 * reference_confidence + 0.45 * network_signal)
}

fn recency_bonus(last_interacted_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    match last_interacted_at {
        Some(t) => {
            let days = (now - t).num_days();
            if days <= 90 {
                0.25
            } else if days <= 180 {
                0.15
            } else if days <= 365 {
                0.05
            } else {
                0.0
            }
        }
        None => 0.0,
    }
}

fn launchpad_component(state: &LaunchpadState) -> f64 {
    let status_score = launchpad_status_score(state.status.as_deref());
    let mut raw = 0.5 * status_score + 0.3 * clamp01(state.eligibility_score / 100.0);
    raw += state.cohorts.max(0) as f64 * 0.08;

    let mut flag_bonus: f64 = 0.0;
    if has_flag(&state.flags, launchpad_flags::ALUMNI) {
        flag_bonus += 0.15;
    }
    if has_flag(&state.flags, launchpad_flags::FAST_TRACK) {
        flag_bonus += 0.05;
    }
    if has_flag(&state.flags, launchpad_flags::COACH) {
        flag_bonus += 0.05;
    }
    raw += flag_bonus.min(0.25);

    if state.track.as_deref().map(|t| !t.trim().is_empty()).unwrap_or(false) {
        raw += 0.05;
    }

    clamp01(raw)
}

fn volunteer_component(
    badges: &[String],
    highlights: &[ImpactHighlight],
    status_flags: &[String],
) -> f64 {
    let tagged = highlights.iter().filter(|h| is_volunteer_tagged(h)).count();

    let mut raw = 0.45 * (badges.len() as f64 / 4.0) + 0.25 * (tagged as f64 * 0.2);

    let mut flag_bonus: f64 = 0.0;
    if has_flag(status_flags, flags::VOLUNTEER_ACTIVE) {
        flag_bonus += 0.2;
    }
    if has_flag(status_flags, flags::MENTOR) {
        flag_bonus += 0.1;
    }
    if has_flag(status_flags, flags::SAFEGUARDED) {
        flag_bonus += 0.1;
    }
    if has_flag(status_flags, flags::COMMUNITY_LEADER) {
        flag_bonus += 0.1;
    }
    raw += flag_bonus.min(0.35);

    clamp01(raw)
}

fn delivery_component(
    insights: &[PipelineInsight],
    highlights: &[ImpactHighlight],
    status_flags: &[String],
) -> f64 {
    let wins = insights.iter().filter(|i| is_pipeline_win(&i.status)).count();
    let interviews = insights
        .iter()
        .filter(|i| is_interview_stage(&i.status))
        .count();
    let highlight_signal = clamp01(highlights.len() as f64 / 3.0);

    let mut raw = 0.45 * (wins as f64 / 3.0)
        + 0.25 * (insights.len() as f64 / 6.0)
        + 0.2 * highlight_signal
        + 0.1 * (interviews as f64 / 4.0);

    let mut flag_bonus: f64 = 0.0;
    if has_flag(status_flags, flags::PREFERRED_TALENT) {
        flag_bonus += 0.15;
    }
    if has_flag(status_flags, flags::JOBS_BOARD_FEATURED) {
        flag_bonus += 0.1;
    }
    if has_flag(status_flags, flags::INSTANT_BOOK) {
        flag_bonus += 0.05;
    }
    raw += flag_bonus.min(0.3);

    clamp01(raw)
}

fn availability_component(availability: &Availability, now: DateTime<Utc>) -> f64 {
    let base = match availability.updated_at {
        Some(t) => {
            let days = (now - t).num_days();
            if days <= 14 {
                1.0
            } else if days <= 30 {
                0.85
            } else if days <= 60 {
                0.7
            } else if days <= 90 {
                0.55
            } else if days <= 120 {
                0.4
            } else if days <= 180 {
                0.25
            } else {
                0.1
            }
        }
        None => 0.4,
    };

    let status_boost = match availability.family() {
        AvailabilityFamily::Available => 0.15,
        AvailabilityFamily::Limited => 0.05,
        AvailabilityFamily::Unavailable => -0.2,
        AvailabilityFamily::Unknown => 0.0,
    };

    let hours_boost = if availability.hours_per_week <= 0 {
        -0.1
    } else if availability.hours_per_week >= 30 {
        0.1
    } else if availability.hours_per_week >= 15 {
        0.05
    } else {
        0.0
    };

    clamp01(base + status_boost + hours_boost)
}

fn compliance_component(status_flags: &[String], references: &[ProfileReference]) -> f64 {
    let mut raw = 0.35;
    if has_flag(status_flags, flags::VERIFIED) {
        raw += 0.2;
    }
    if has_flag(status_flags, flags::KYC_PASSED) {
        raw += 0.15;
    }
    if has_flag(status_flags, flags::KYB_PASSED) {
        raw += 0.1;
    }
    if has_flag(status_flags, flags::SAFEGUARDED) {
        raw += 0.1;
    }
    if has_flag(status_flags, flags::INSURED) || has_flag(status_flags, flags::COMPLIANCE_PASSED) {
        raw += 0.05;
    }
    if references.iter().any(|r| r.verified) {
        raw += 0.05;
    }
    clamp01(raw)
}

/// Pick the next recommended review date.
///
/// Base date is the last availability update, falling back to the profile's
/// own `updated_at`. Window: 30 days when availability is stale/low, 60 when
/// both launchpad and volunteer are strong or the final score is ≥90,
/// otherwise 45; a weak delivery component floors the window at 40 days.
#[allow(clippy::too_many_arguments)]
fn recommended_review_at(
    profile: &ProfileRecord,
    availability: &Availability,
    availability_raw: f64,
    launchpad_raw: f64,
    volunteer_raw: f64,
    delivery_raw: f64,
    final_score: f64,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let base = availability
        .updated_at
        .unwrap_or(if profile.updated_at.timestamp() > 0 {
            profile.updated_at
        } else {
            now
        });

    let mut window_days = if availability_raw < 0.35 {
        30
    } else if (launchpad_raw >= 0.7 && volunteer_raw >= 0.7) || final_score >= 90.0 {
        60
    } else {
        45
    };
    if delivery_raw < 0.3 {
        window_days = window_days.max(40);
    }

    base + Duration::days(window_days)
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs_for<'a>(profile: &'a ProfileRecord, completion: f64) -> TrustScoreInputs<'a> {
        TrustScoreInputs {
            profile,
            completion,
            likes_count: profile.likes_count,
            followers_count: profile.followers_count,
            connections_count: profile.connections_count,
            now: Utc::now(),
        }
    }

    #[test]
    fn saturating_signal_is_bounded() {
        assert_eq!(saturating_signal(0, 1500.0), 0.0);
        assert_eq!(saturating_signal(-50, 1500.0), 0.0);
        assert_eq!(saturating_signal(1500, 1500.0), 1.0);
        assert_eq!(saturating_signal(1_000_000, 1500.0), 1.0);
        let mid = saturating_signal(100, 1500.0);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn empty_profile_has_near_zero_foundation_and_bounded_score() {
        let profile = ProfileRecord {
            availability_status: Some("limited".into()),
            availability_hours: 0,
            ..Default::default()
        };
        let result = score(&inputs_for(&profile, 0.0));

        assert!(result.score >= 0.0 && result.score <= 100.0);
        let foundation = result
            .breakdown
            .iter()
            .find(|c| c.name == "foundation")
            .unwrap();
        assert_eq!(foundation.points, 0.0);
        assert_eq!(result.level, TrustLevel::Emerging);
    }

    #[test]
    fn adversarial_inputs_stay_clamped() {
        let profile = ProfileRecord {
            references: vec![
                ProfileReference {
                    verified: true,
                    weight: 250.0, // malformed weight, must be clamped
                    last_interacted_at: Some(Utc::now()),
                };
                40
            ],
            status_flags: vec![
                "verified".into(),
                "kyc_passed".into(),
                "kyb_passed".into(),
                "safeguarded".into(),
                "insured".into(),
                "compliance_passed".into(),
                "preferred_talent".into(),
                "jobs_board_featured".into(),
                "instant_book".into(),
                "volunteer_active".into(),
                "mentor".into(),
                "community_leader".into(),
            ],
            volunteer_badges: (0..50).map(|i| format!("badge-{}", i)).collect(),
            launchpad: LaunchpadState {
                status: Some("graduated".into()),
                cohorts: 99,
                track: Some("scale".into()),
                eligibility_score: 100_000.0,
                flags: vec!["alumni".into(), "fast_track".into(), "coach".into()],
            },
            availability_status: Some("available".into()),
            availability_hours: 80,
            availability_updated_at: Some(Utc::now()),
            ..Default::default()
        };
        let mut inputs = inputs_for(&profile, 100.0);
        inputs.likes_count = i64::MAX / 2;
        inputs.followers_count = 10_000;
        inputs.connections_count = -5;

        let result = score(&inputs);
        assert!(result.score <= 100.0);
        assert_eq!(result.level, TrustLevel::Platinum);
        for c in &result.breakdown {
            assert!(c.raw >= 0.0 && c.raw <= 1.0, "{} out of range", c.name);
        }
    }

    #[test]
    fn reference_confidence_rewards_verification_and_recency() {
        let now = Utc::now();
        let fresh_verified = ProfileRecord {
            references: vec![ProfileReference {
                verified: true,
                weight: 1.0,
                last_interacted_at: Some(now - Duration::days(30)),
            }],
            ..Default::default()
        };
        let stale_unverified = ProfileRecord {
            references: vec![ProfileReference {
                verified: false,
                weight: 1.0,
                last_interacted_at: Some(now - Duration::days(400)),
            }],
            ..Default::default()
        };

        let strong = score(&inputs_for(&fresh_verified, 0.0));
        let weak = score(&inputs_for(&stale_unverified, 0.0));
        let strong_social = strong
            .breakdown
            .iter()
            .find(|c| c.name == "social_proof")
            .unwrap()
            .raw;
        let weak_social = weak
            .breakdown
            .iter()
            .find(|c| c.name == "social_proof")
            .unwrap()
            .raw;
        assert!(strong_social > weak_social);
    }

    #[test]
    fn pipeline_classifiers_match_keywords() {
        assert!(is_pipeline_win("Won the bid"));
        assert!(is_pipeline_win("closed"));
        assert!(is_pipeline_win("HIRED after trial"));
        assert!(!is_pipeline_win("negotiating"));
        // "winning" must not match \bwin\b
        assert!(!is_pipeline_win("winning streak"));

        assert!(is_interview_stage("second interview booked"));
        assert!(is_interview_stage("on the shortlist"));
        assert!(!is_interview_stage("proposal sent"));
    }

    #[test]
    fn volunteer_tagging_checks_title_and_description() {
        let by_title = ImpactHighlight {
            title: "Community garden build".into(),
            description: None,
        };
        let by_description = ImpactHighlight {
            title: "Design sprint".into(),
            description: Some("Pro bono rebrand for a nonprofit".into()),
        };
        let untagged = ImpactHighlight {
            title: "Logo refresh".into(),
            description: Some("Paid client work".into()),
        };
        assert!(is_volunteer_tagged(&by_title));
        assert!(is_volunteer_tagged(&by_description));
        assert!(!is_volunteer_tagged(&untagged));
    }

    #[test]
    fn launchpad_status_lookup() {
        assert_eq!(launchpad_status_score(Some("graduated")), 1.0);
        assert_eq!(launchpad_status_score(Some("Active")), 0.85);
        assert_eq!(launchpad_status_score(Some("accepted")), 0.7);
        assert_eq!(launchpad_status_score(Some("applied")), 0.45);
        assert_eq!(launchpad_status_score(Some("waitlisted")), 0.3);
        assert_eq!(launchpad_status_score(Some("expelled")), 0.1);
        assert_eq!(launchpad_status_score(None), 0.1);
    }

    #[test]
    fn availability_component_buckets_and_boosts() {
        let now = Utc::now();
        let fresh = Availability {
            status: Some("available".into()),
            hours_per_week: 35,
            updated_at: Some(now - Duration::days(3)),
        };
        // 1.0 base + 0.15 status + 0.1 hours, clamped to 1.0
        assert_eq!(availability_component(&fresh, now), 1.0);

        let stale_unavailable = Availability {
            status: Some("unavailable".into()),
            hours_per_week: 0,
            updated_at: Some(now - Duration::days(365)),
        };
        // 0.1 base - 0.2 status - 0.1 hours, clamped to 0.0
        assert_eq!(availability_component(&stale_unavailable, now), 0.0);

        let unknown = Availability {
            status: None,
            hours_per_week: 20,
            updated_at: None,
        };
        // 0.4 base + 0.05 hours
        assert!((availability_component(&unknown, now) - 0.45).abs() < 1e-9);
    }

    #[test]
    fn review_window_rules() {
        let now = Utc::now();
        let updated = now - Duration::days(2);
        let updated_long_ago = now - Duration::days(365);

        // Availability component at 0 => 30-day window, floored to 40 by the
        // weak delivery component.
        let sparse = ProfileRecord {
            availability_status: Some("unavailable".into()),
            availability_hours: 0,
            availability_updated_at: Some(updated_long_ago),
            ..Default::default()
        };
        let result = score(&inputs_for(&sparse, 0.0));
        assert_eq!(
            result.recommended_review_at,
            updated_long_ago + Duration::days(40)
        );

        // Mid-range profile with healthy delivery => 45 days.
        let mid = ProfileRecord {
            availability_status: Some("available".into()),
            availability_hours: 20,
            availability_updated_at: Some(updated),
            pipeline_insights: vec![
                PipelineInsight {
                    label: "Gig A".into(),
                    status: "won".into(),
                },
                PipelineInsight {
                    label: "Gig B".into(),
                    status: "signed".into(),
                },
                PipelineInsight {
                    label: "Gig C".into(),
                    status: "interview".into(),
                },
            ],
            ..Default::default()
        };
        let result = score(&inputs_for(&mid, 50.0));
        assert_eq!(result.recommended_review_at, updated + Duration::days(45));
    }

    #[test]
    fn score_is_deterministic_for_identical_inputs() {
        let profile = ProfileRecord {
            headline: Some("Fractional CTO".into()),
            status_flags: vec!["verified".into()],
            followers_count: 120,
            likes_count: 40,
            connections_count: 18,
            ..Default::default()
        };
        let now = Utc::now();
        let mut inputs = inputs_for(&profile, 64.7);
        inputs.now = now;

        let first = score(&inputs);
        let second = score(&inputs);
        assert_eq!(first.score, second.score);
        assert_eq!(first.level, second.level);
        assert_eq!(first.recommended_review_at, second.recommended_review_at);
    }
}
