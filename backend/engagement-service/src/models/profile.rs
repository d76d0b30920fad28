//! Profile domain models.
//!
//! The profile row itself is owned by the wider platform; this service only
//! writes the derived engagement columns (`likes_count`, `followers_count`,
//! `engagement_refreshed_at`, `trust_score`, `profile_completion`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ServiceError;

/// Closed set of appreciation kinds a user can leave on a profile.
///
/// Every current kind counts toward `likes_count`; the aggregate query
/// filters on [`AppreciationKind::positive_kinds`] rather than "any row", so
/// a future non-positive kind (e.g. a report) will not inflate the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppreciationKind {
    Like,
    Celebrate,
    Support,
    Endorse,
    Applause,
}

impl AppreciationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppreciationKind::Like => "like",
            AppreciationKind::Celebrate => "celebrate",
            AppreciationKind::Support => "support",
            AppreciationKind::Endorse => "endorse",
            AppreciationKind::Applause => "applause",
        }
    }

    /// The allow-list of kinds that count toward `likes_count`.
    pub fn positive_kinds() -> Vec<String> {
        [
            AppreciationKind::Like,
            AppreciationKind::Celebrate,
            AppreciationKind::Support,
            AppreciationKind::Endorse,
            AppreciationKind::Applause,
        ]
        .iter()
        .map(|k| k.as_str().to_string())
        .collect()
    }
}

impl FromStr for AppreciationKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(AppreciationKind::Like),
            "celebrate" => Ok(AppreciationKind::Celebrate),
            "support" => Ok(AppreciationKind::Support),
            "endorse" => Ok(AppreciationKind::Endorse),
            "applause" => Ok(AppreciationKind::Applause),
            other => Err(ServiceError::InvalidInput(format!(
                "Unsupported appreciation kind: {}",
                other
            ))),
        }
    }
}

/// Status of a (profile, follower) relationship. Only `active` rows count
/// toward `followers_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowerStatus {
    Active,
    Muted,
    Blocked,
}

impl FollowerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowerStatus::Active => "active",
            FollowerStatus::Muted => "muted",
            FollowerStatus::Blocked => "blocked",
        }
    }
}

impl FromStr for FollowerStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(FollowerStatus::Active),
            "muted" => Ok(FollowerStatus::Muted),
            "blocked" => Ok(FollowerStatus::Blocked),
            other => Err(ServiceError::InvalidInput(format!(
                "Unsupported follower status: {}",
                other
            ))),
        }
    }
}

/// Well-known status flag names carried on `profiles.status_flags`.
pub mod flags {
    pub const VERIFIED: &str = "verified";
    pub const KYC_PASSED: &str = "kyc_passed";
    pub const KYB_PASSED: &str = "kyb_passed";
    pub const SAFEGUARDED: &str = "safeguarded";
    pub const INSURED: &str = "insured";
    pub const COMPLIANCE_PASSED: &str = "compliance_passed";
    pub const PREFERRED_TALENT: &str = "preferred_talent";
    pub const JOBS_BOARD_FEATURED: &str = "jobs_board_featured";
    pub const INSTANT_BOOK: &str = "instant_book";
    pub const VOLUNTEER_ACTIVE: &str = "volunteer_active";
    pub const MENTOR: &str = "mentor";
    pub const COMMUNITY_LEADER: &str = "community_leader";
}

/// Flag names carried inside `LaunchpadState::flags` (program-scoped, kept
/// separate from the profile-wide status flags).
pub mod launchpad_flags {
    pub const ALUMNI: &str = "alumni";
    pub const FAST_TRACK: &str = "fast_track";
    pub const COACH: &str = "coach";
}

/// Case-insensitive flag lookup.
pub fn has_flag(status_flags: &[String], name: &str) -> bool {
    status_flags.iter().any(|f| f.eq_ignore_ascii_case(name))
}

/// One professional reference attached to a profile.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfileReference {
    #[serde(default)]
    pub verified: bool,
    /// Relative strength of the reference in [0, 1]
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub last_interacted_at: Option<DateTime<Utc>>,
}

/// One experience entry (role held, project delivered, ...).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExperienceEntry {
    pub title: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// A self-reported impact highlight shown on the profile.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImpactHighlight {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One entry in the profile's opportunity pipeline. The `status` string is
/// free text from the pipeline tool and is classified by keyword.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineInsight {
    pub label: String,
    #[serde(default)]
    pub status: String,
}

/// Launchpad (accelerator program) participation state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LaunchpadState {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub cohorts: i64,
    #[serde(default)]
    pub track: Option<String>,
    /// Program eligibility score in [0, 100]
    #[serde(default)]
    pub eligibility_score: f64,
    /// Program flags: launchpad_alumni, fast_track, coach
    #[serde(default)]
    pub flags: Vec<String>,
}

/// Coarse availability families used by scoring boosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityFamily {
    Available,
    Limited,
    Unavailable,
    Unknown,
}

/// Availability as advertised on the profile.
#[derive(Debug, Clone, Default)]
pub struct Availability {
    pub status: Option<String>,
    pub hours_per_week: i32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Availability {
    pub fn family(&self) -> AvailabilityFamily {
        match self.status.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("available") => AvailabilityFamily::Available,
            Some(s) if s.eq_ignore_ascii_case("open_to_offers") => AvailabilityFamily::Available,
            Some(s) if s.eq_ignore_ascii_case("limited") => AvailabilityFamily::Limited,
            Some(s) if s.eq_ignore_ascii_case("unavailable") => AvailabilityFamily::Unavailable,
            Some(s) if s.eq_ignore_ascii_case("paused") => AvailabilityFamily::Unavailable,
            Some(_) => AvailabilityFamily::Unknown,
            None => AvailabilityFamily::Unknown,
        }
    }

    /// Whether the profile can actually be engaged: any non-limited status
    /// with hours on the table.
    pub fn is_actionable(&self) -> bool {
        self.family() != AvailabilityFamily::Limited && self.hours_per_week > 0
    }
}

/// A profile row as read from the store.
#[derive(Debug, Clone)]
pub struct ProfileRecord {
    pub id: Uuid,
    pub user_id: Uuid,

    // Content fields (owned by profile editing, read-only here)
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub mission_statement: Option<String>,
    pub education: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub qualifications: Vec<String>,
    pub portfolio_links: Vec<String>,
    pub preferred_engagements: Vec<String>,
    pub collaborators: Vec<String>,
    pub status_flags: Vec<String>,
    pub volunteer_badges: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub references: Vec<ProfileReference>,
    pub impact_highlights: Vec<ImpactHighlight>,
    pub pipeline_insights: Vec<PipelineInsight>,
    pub launchpad: LaunchpadState,
    pub availability_status: Option<String>,
    pub availability_hours: i32,
    pub availability_updated_at: Option<DateTime<Utc>>,
    pub connections_count: i64,

    // Derived columns (owned by this pipeline)
    pub likes_count: i64,
    pub followers_count: i64,
    pub engagement_refreshed_at: Option<DateTime<Utc>>,
    pub trust_score: f64,
    pub profile_completion: f64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    pub fn availability(&self) -> Availability {
        Availability {
            status: self.availability_status.clone(),
            hours_per_week: self.availability_hours,
            updated_at: self.availability_updated_at,
        }
    }

    pub fn has_flag(&self, name: &str) -> bool {
        has_flag(&self.status_flags, name)
    }
}

impl Default for ProfileRecord {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            headline: None,
            bio: None,
            mission_statement: None,
            education: None,
            location: None,
            skills: Vec::new(),
            qualifications: Vec::new(),
            portfolio_links: Vec::new(),
            preferred_engagements: Vec::new(),
            collaborators: Vec::new(),
            status_flags: Vec::new(),
            volunteer_badges: Vec::new(),
            experience: Vec::new(),
            references: Vec::new(),
            impact_highlights: Vec::new(),
            pipeline_insights: Vec::new(),
            launchpad: LaunchpadState::default(),
            availability_status: None,
            availability_hours: 0,
            availability_updated_at: None,
            connections_count: 0,
            likes_count: 0,
            followers_count: 0,
            engagement_refreshed_at: None,
            trust_score: 0.0,
            profile_completion: 0.0,
            created_at: now,
            updated_at: now,
        }
    }
}
