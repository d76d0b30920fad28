//! Profile completion estimator.
//!
//! A fixed, ordered checklist of equally-weighted predicates over profile
//! content. No partial credit per item; completion is simply the share of
//! satisfied predicates.

use crate::models::ProfileRecord;

/// Number of predicates in the checklist. Kept explicit so a checklist edit
/// shows up in the diff of this constant too.
pub const CHECKLIST_LEN: usize = 17;

/// Estimate profile completion as a percentage in [0, 100].
pub fn estimate(record: &ProfileRecord) -> f64 {
    let checks = checklist(record);
    debug_assert_eq!(checks.len(), CHECKLIST_LEN);

    let satisfied = checks.iter().filter(|&&c| c).count();
    let pct = (satisfied as f64 / checks.len() as f64) * 100.0;
    (pct * 100.0).round() / 100.0
}

fn checklist(record: &ProfileRecord) -> [bool; CHECKLIST_LEN] {
    [
        filled(&record.headline),
        filled(&record.bio),
        filled(&record.mission_statement),
        filled(&record.education),
        filled(&record.location),
        !record.skills.is_empty(),
        !record.experience.is_empty(),
        !record.qualifications.is_empty(),
        !record.references.is_empty(),
        !record.portfolio_links.is_empty(),
        !record.preferred_engagements.is_empty(),
        !record.status_flags.is_empty(),
        !record.volunteer_badges.is_empty(),
        !record.collaborators.is_empty(),
        !record.impact_highlights.is_empty(),
        !record.pipeline_insights.is_empty(),
        record.availability().is_actionable(),
    ]
}

fn filled(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false)
}
