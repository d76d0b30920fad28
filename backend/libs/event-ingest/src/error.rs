//! Error types for the event ingestion library.

use thiserror::Error;

/// Result type alias for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur while handing an event to a sink.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The sink rejected or failed to accept the event
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
}
