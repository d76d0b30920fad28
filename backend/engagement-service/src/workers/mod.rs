pub mod engagement_worker;

pub use engagement_worker::{EngagementWorker, WorkerSettings};
