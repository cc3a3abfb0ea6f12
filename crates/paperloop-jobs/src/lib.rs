//! # paperloop-jobs
//!
//! In-memory registry of paper generation jobs.
//!
//! [`JobService`] validates requests, runs each accepted job on its own tokio
//! task and serves status snapshots and results. [`JobStore`] holds the job
//! records and broadcasts [`JobEvent`]s to live subscribers.

pub mod output;
pub mod service;
pub mod store;
pub mod types;

pub use output::{save_paper, SavedPaper};
pub use service::{JobError, JobService};
pub use store::{new_job_id, JobRecord, JobStore};
pub use types::{
    JobEvent, JobResult, JobStatus, JobStatusView, JobSummary, ResultFormat, SectionProgress,
};
