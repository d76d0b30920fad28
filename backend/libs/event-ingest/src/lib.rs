//! # Analytics Event Ingestion
//!
//! Thin abstraction over the platform's analytics ingestion sink. Producers
//! build an [`AnalyticsEvent`] and hand it to an [`EventSink`]; the concrete
//! sink (segmentation pipeline, warehouse loader, ...) lives outside this
//! workspace and is wired in by the process's composition root.
//!
//! Delivery is best-effort by contract: callers that must not fail on
//! analytics problems should log and swallow the returned error rather than
//! propagate it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

mod error;

pub use error::{IngestError, IngestResult};

/// A single analytics event bound for the ingestion sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    /// Fully qualified event name (e.g. "profile.trust_score_changed")
    pub event_name: String,

    /// Kind of actor that caused the event (e.g. "system", "user")
    pub actor_type: String,

    /// Kind of entity the event describes (e.g. "profile")
    pub entity_type: String,

    /// ID of the entity the event describes
    pub entity_id: Uuid,

    /// Owning user, when the entity has one
    pub user_id: Option<Uuid>,

    /// Emitting service or subsystem
    pub source: String,

    /// Free-form event payload
    pub context: serde_json::Value,

    /// Timestamp when the event was built
    pub occurred_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    /// Build a system-actor event with `occurred_at = now`.
    pub fn system(
        event_name: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: Uuid,
        user_id: Option<Uuid>,
        source: impl Into<String>,
        context: serde_json::Value,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            actor_type: "system".to_string(),
            entity_type: entity_type.into(),
            entity_id,
            user_id,
            source: source.into(),
            context,
            occurred_at: Utc::now(),
        }
    }
}

/// Sink accepting analytics events.
///
/// Implementations should be cheap to call and must tolerate duplicate
/// delivery; upstream retries may resend an event.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Hand one event to the sink.
    ///
    /// # Errors
    ///
    /// Returns error if the sink could not accept the event.
    async fn publish(&self, event: &AnalyticsEvent) -> IngestResult<()>;
}

/// Sink that drops every event. Used in tests and in deployments where the
/// ingestion pipeline is not wired up yet.
#[derive(Debug, Default, Clone)]
pub struct NoopSink;

#[async_trait]
impl EventSink for NoopSink {
    async fn publish(&self, _event: &AnalyticsEvent) -> IngestResult<()> {
        Ok(())
    }
}

/// Sink that logs each event through `tracing` at info level.
///
/// Useful as a development stand-in and for auditing what would be emitted.
#[derive(Debug, Default, Clone)]
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    async fn publish(&self, event: &AnalyticsEvent) -> IngestResult<()> {
        let context = serde_json::to_string(&event.context)?;
        info!(
            event_name = %event.event_name,
            entity_type = %event.entity_type,
            entity_id = %event.entity_id,
            source = %event.source,
            context = %context,
            "Analytics event"
        );
        Ok(())
    }
}
