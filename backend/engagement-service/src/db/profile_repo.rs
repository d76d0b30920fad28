//! Profile row access.
//!
//! The recompute path locks the profile row (`FOR UPDATE`) for the duration
//! of its transaction, which serializes recomputes per profile across
//! workers. The derived columns written by `apply_recompute` are owned by
//! this pipeline; nothing else writes them.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::profile::{
    ExperienceEntry, ImpactHighlight, LaunchpadState, PipelineInsight, ProfileRecord,
    ProfileReference,
};

const PROFILE_COLUMNS: &str = r#"
    id, user_id,
    headline, bio, mission_statement, education, location,
    skills, qualifications, portfolio_links, preferred_engagements,
    collaborators, status_flags, volunteer_badges,
    experience, reference_entries, impact_highlights, pipeline_insights,
    launchpad,
    availability_status, availability_hours, availability_updated_at,
    connections_count,
    likes_count, followers_count, engagement_refreshed_at,
    trust_score, profile_completion,
    created_at, updated_at
"#;

/// Fetch a profile without locking it (read paths, staleness checks).
pub async fn fetch(pool: &PgPool, profile_id: Uuid) -> ServiceResult<Option<ProfileRecord>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM profiles WHERE id = $1",
        PROFILE_COLUMNS
    ))
    .bind(profile_id)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_record).transpose()
}

/// Fetch a profile with a row lock; must run inside a transaction.
pub async fn fetch_for_update(
    conn: &mut PgConnection,
    profile_id: Uuid,
) -> ServiceResult<Option<ProfileRecord>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM profiles WHERE id = $1 FOR UPDATE",
        PROFILE_COLUMNS
    ))
    .bind(profile_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(row_to_record).transpose()
}

/// The derived columns a successful recompute persists.
#[derive(Debug, Clone, Copy)]
pub struct DerivedMetricsUpdate {
    pub likes_count: i64,
    pub followers_count: i64,
    pub profile_completion: f64,
    pub trust_score: f64,
    pub refreshed_at: DateTime<Utc>,
}

/// Persist freshly computed derived metrics. Called only after the full
/// computation succeeded, inside the same transaction that locked the row.
pub async fn apply_recompute(
    conn: &mut PgConnection,
    profile_id: Uuid,
    update: &DerivedMetricsUpdate,
) -> ServiceResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE profiles
        SET likes_count = $2,
            followers_count = $3,
            profile_completion = $4,
            trust_score = $5,
            engagement_refreshed_at = $6,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(profile_id)
    .bind(update.likes_count)
    .bind(update.followers_count)
    .bind(update.profile_completion)
    .bind(update.trust_score)
    .bind(update.refreshed_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound(format!(
            "Profile {} disappeared during recompute",
            profile_id
        )));
    }
    Ok(())
}

fn row_to_record(row: PgRow) -> ServiceResult<ProfileRecord> {
    let experience: Vec<ExperienceEntry> = decode_json(&row, "experience")?;
    let references: Vec<ProfileReference> = decode_json(&row, "reference_entries")?;
    let impact_highlights: Vec<ImpactHighlight> = decode_json(&row, "impact_highlights")?;
    let pipeline_insights: Vec<PipelineInsight> = decode_json(&row, "pipeline_insights")?;
    let launchpad: LaunchpadState = decode_json(&row, "launchpad")?;

    Ok(ProfileRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        headline: row.try_get("headline")?,
        bio: row.try_get("bio")?,
        mission_statement: row.try_get("mission_statement")?,
        education: row.try_get("education")?,
        location: row.try_get("location")?,
        skills: row.try_get("skills")?,
        qualifications: row.try_get("qualifications")?,
        portfolio_links: row.try_get("portfolio_links")?,
        preferred_engagements: row.try_get("preferred_engagements")?,
        collaborators: row.try_get("collaborators")?,
        status_flags: row.try_get("status_flags")?,
        volunteer_badges: row.try_get("volunteer_badges")?,
        experience,
        references,
        impact_highlights,
        pipeline_insights,
        launchpad,
        availability_status: row.try_get("availability_status")?,
        availability_hours: row.try_get("availability_hours")?,
        availability_updated_at: row.try_get("availability_updated_at")?,
        connections_count: row.try_get("connections_count")?,
        likes_count: row.try_get("likes_count")?,
        followers_count: row.try_get("followers_count")?,
        engagement_refreshed_at: row.try_get("engagement_refreshed_at")?,
        trust_score: row.try_get("trust_score")?,
        profile_completion: row.try_get("profile_completion")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn decode_json<T: serde::de::DeserializeOwned>(row: &PgRow, column: &str) -> ServiceResult<T> {
    let value: serde_json::Value = row.try_get(column)?;
    serde_json::from_value(value).map_err(|e| {
        ServiceError::Internal(format!("Malformed {} payload on profile row: {}", column, e))
    })
}
