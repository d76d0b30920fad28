pub mod analytics;
pub mod completion;
pub mod recompute;
pub mod targeting;
pub mod trust_score;

pub use analytics::AnalyticsReporter;
pub use recompute::{RecomputeOptions, RecomputeOutcome, RecomputeService};
pub use targeting::{derive_targeting, Segment, Stage, TargetingDiff, TargetingProfile};
pub use trust_score::{TrustScoreInputs, TrustScoreResult};
