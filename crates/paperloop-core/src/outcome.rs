use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::paper::Paper;
use crate::section::{SectionDraft, SectionFailure};

/// The final outcome of a paper job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaperOutcome {
    /// Every section reached Accepted or Exhausted
    Completed {
        paper: Paper,
        total_duration_secs: f64,
    },
    /// At least one section failed
    Failed {
        failures: Vec<SectionFailure>,
        sections: Vec<SectionDraft>,
        total_duration_secs: f64,
    },
    /// Stopped by a cancellation request
    Cancelled {
        sections: Vec<SectionDraft>,
        total_duration_secs: f64,
    },
}

impl PaperOutcome {
    pub fn completed(paper: Paper, duration: Duration) -> Self {
        Self::Completed {
            paper,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn failed(
        failures: Vec<SectionFailure>,
        sections: Vec<SectionDraft>,
        duration: Duration,
    ) -> Self {
        Self::Failed {
            failures,
            sections,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn cancelled(sections: Vec<SectionDraft>, duration: Duration) -> Self {
        Self::Cancelled {
            sections,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    pub fn paper(&self) -> Option<&Paper> {
        match self {
            Self::Completed { paper, .. } => Some(paper),
            _ => None,
        }
    }

    /// Final section states, whatever the outcome
    pub fn sections(&self) -> &[SectionDraft] {
        match self {
            Self::Completed { paper, .. } => &paper.sections,
            Self::Failed { sections, .. } => sections,
            Self::Cancelled { sections, .. } => sections,
        }
    }

    pub fn total_duration_secs(&self) -> f64 {
        match self {
            Self::Completed {
                total_duration_secs,
                ..
            }
            | Self::Failed {
                total_duration_secs,
                ..
            }
            | Self::Cancelled {
                total_duration_secs,
                ..
            } => *total_duration_secs,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { paper, .. } if paper.metadata.all_accepted => 0,
            Self::Completed { .. } => 1,
            Self::Failed { .. } => 2,
            Self::Cancelled { .. } => 130,
        }
    }
}
