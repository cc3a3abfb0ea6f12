use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paperloop_critic::EvaluationResult;

use crate::error::LoopError;

/// Where a section is in the generate/evaluate/revise loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionState {
    /// No draft yet
    Pending,
    /// Draft produced, not yet scored
    Drafted,
    /// Draft scored
    Evaluated,
    /// Below threshold with budget left; the next draft is a revision
    Revising,
    /// Scored at or above the threshold
    Accepted,
    /// Budget spent without reaching the threshold; last draft is kept
    Exhausted,
    /// Drafting failed
    Failed,
    /// Stopped at a step boundary by a cancellation request
    Cancelled,
}

impl SectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::Exhausted | Self::Failed | Self::Cancelled
        )
    }

    /// Whether the loop may move from `self` to `next`
    pub fn can_transition_to(&self, next: SectionState) -> bool {
        use SectionState::*;
        matches!(
            (self, next),
            (Pending, Drafted)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Drafted, Evaluated)
                | (Drafted, Revising)
                | (Drafted, Exhausted)
                | (Evaluated, Accepted)
                | (Evaluated, Revising)
                | (Evaluated, Exhausted)
                | (Revising, Drafted)
                | (Revising, Failed)
                | (Revising, Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Drafted => "drafted",
            Self::Evaluated => "evaluated",
            Self::Revising => "revising",
            Self::Accepted => "accepted",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which failure stopped a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    GenerationFailure,
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GenerationFailure => write!(f, "generation_failure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Failure detail for a section in the `Failed` state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionFailure {
    pub section: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Record of one generate/evaluate pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based iteration number
    pub iteration: usize,
    pub text: String,
    /// Feedback the draft was generated against
    pub prior_feedback: Option<String>,
    pub evaluation: Option<EvaluationResult>,
    /// Set when the evaluation of this draft failed
    pub evaluation_error: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// A section's working state, owned by the controller until it is terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDraft {
    pub name: String,
    /// Position in the request
    pub index: usize,
    /// Text of the most recent draft
    pub text: String,
    /// Completed generate/evaluate pairs
    pub iterations: usize,
    pub state: SectionState,
    pub history: Vec<IterationRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<SectionFailure>,
}

impl SectionDraft {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index,
            text: String::new(),
            iterations: 0,
            state: SectionState::Pending,
            history: Vec::new(),
            failure: None,
        }
    }

    /// Evaluation of the current text, if it was scored successfully
    pub fn last_evaluation(&self) -> Option<&EvaluationResult> {
        self.history.last().and_then(|r| r.evaluation.as_ref())
    }

    pub fn final_score(&self) -> Option<f64> {
        self.last_evaluation().map(|e| e.aggregate)
    }

    /// Most recent successful evaluation and the iteration it scored. Differs
    /// from [`last_evaluation`](Self::last_evaluation) when the final
    /// evaluation failed.
    pub fn last_scored(&self) -> Option<(usize, &EvaluationResult)> {
        self.history
            .iter()
            .rev()
            .find_map(|r| r.evaluation.as_ref().map(|e| (r.iteration, e)))
    }

    pub(crate) fn transition(&mut self, next: SectionState) -> Result<(), LoopError> {
        if !self.state.can_transition_to(next) {
            return Err(LoopError::InvalidTransition {
                section: self.name.clone(),
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Force the section into `Failed`, regardless of its current state
    pub(crate) fn fail(&mut self, kind: FailureKind, message: impl Into<String>) {
        self.failure = Some(SectionFailure {
            section: self.name.clone(),
            kind,
            message: message.into(),
        });
        self.state = SectionState::Failed;
    }
}
