pub mod engagement_repo;
pub mod job_repo;
pub mod profile_repo;
