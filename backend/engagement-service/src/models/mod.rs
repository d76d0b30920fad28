pub mod job;
pub mod profile;
pub mod snapshot;

pub use job::{EngagementJob, EnqueueOptions, JobStatus};
pub use profile::{
    AppreciationKind, Availability, AvailabilityFamily, FollowerStatus, ImpactHighlight,
    LaunchpadState, PipelineInsight, ProfileRecord, ProfileReference,
};
pub use snapshot::{ProfileOverview, ProfileSnapshot, SnapshotMetrics, TrustLevel};
