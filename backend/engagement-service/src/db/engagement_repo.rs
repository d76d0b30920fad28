//! Raw interaction-signal aggregation.
//!
//! Read-only COUNT queries, no side effects. Callers inside a recompute
//! transaction pass their transaction connection so the counts are
//! consistent with the rest of the transaction's reads.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::models::profile::{AppreciationKind, FollowerStatus};

/// Aggregated engagement signals for one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementCounts {
    pub likes: i64,
    pub followers: i64,
}

/// Count positive appreciations and active followers for a profile.
pub async fn aggregate(
    conn: &mut PgConnection,
    profile_id: Uuid,
) -> ServiceResult<EngagementCounts> {
    // Only the positive allow-list counts; any other appreciation kinds that
    // land in the table later stay out of likes_count.
    let likes: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM profile_appreciations
        WHERE profile_id = $1
          AND kind = ANY($2)
        "#,
    )
    .bind(profile_id)
    .bind(AppreciationKind::positive_kinds())
    .fetch_one(&mut *conn)
    .await?;

    let followers: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM profile_followers
        WHERE profile_id = $1
          AND status = $2
        "#,
    )
    .bind(profile_id)
    .bind(FollowerStatus::Active.as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(EngagementCounts { likes, followers })
}
