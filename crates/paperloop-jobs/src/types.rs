use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paperloop_core::{Paper, SectionDraft, SectionFailure, SectionState};

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest known state of one section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionProgress {
    pub name: String,
    pub state: SectionState,
    pub iterations: usize,
    pub last_score: Option<f64>,
}

impl SectionProgress {
    pub fn pending(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            state: SectionState::Pending,
            iterations: 0,
            last_score: None,
        }
    }
}

impl From<&SectionDraft> for SectionProgress {
    fn from(draft: &SectionDraft) -> Self {
        Self {
            name: draft.name.clone(),
            state: draft.state,
            iterations: draft.iterations,
            last_score: draft.final_score(),
        }
    }
}

/// Snapshot returned by `get_status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: String,
    pub title: String,
    pub status: JobStatus,
    pub progress: String,
    pub sections: Vec<SectionProgress>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SectionFailure>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Row for job listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: String,
    pub title: String,
    pub status: JobStatus,
    pub sections: usize,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Which form `get_result` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    Structured,
    Rendered,
}

#[derive(Debug, Clone)]
pub enum JobResult {
    Structured(Paper),
    Rendered(String),
}

/// Events broadcast to live subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    JobSubmitted {
        job_id: String,
        title: String,
    },
    SectionUpdated {
        job_id: String,
        section: String,
        state: SectionState,
        iterations: usize,
        last_score: Option<f64>,
    },
    JobFinished {
        job_id: String,
        status: JobStatus,
    },
}
