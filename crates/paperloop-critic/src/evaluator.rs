use paperloop_agent::{Agent, AgentConfig};
use tracing::{debug, info};

use crate::{EvaluationResult, ReviewPrompts, ScoreParseError};

/// Inputs required to score one section draft.
#[derive(Clone, Copy, Debug)]
pub struct ReviewInput<'a> {
    pub title: &'a str,
    pub section: &'a str,
    pub text: &'a str,
}

/// Evaluator that scores drafts with the evaluator agent
pub struct SectionEvaluator<'a> {
    agent: &'a dyn Agent,
    config: &'a AgentConfig,
}

impl<'a> SectionEvaluator<'a> {
    pub fn new(agent: &'a dyn Agent, config: &'a AgentConfig) -> Self {
        Self { agent, config }
    }

    /// Score a draft. One backend call; no retry.
    pub async fn evaluate(&self, input: ReviewInput<'_>) -> Result<EvaluationResult, EvaluationError> {
        if input.text.trim().is_empty() {
            return Err(EvaluationError::InvalidInput(format!(
                "section '{}' has no text to evaluate",
                input.section
            )));
        }

        let prompt = ReviewPrompts::build_review_prompt(input.title, input.section, input.text);

        debug!(
            prompt_len = prompt.len(),
            section = input.section,
            "Running evaluation"
        );

        let output = self
            .agent
            .execute(&prompt, self.config)
            .await
            .map_err(|e| EvaluationError::AgentError(e.to_string()))?;

        info!(
            section = input.section,
            exit_code = output.exit_code,
            duration_secs = output.duration.as_secs_f64(),
            "Evaluator completed"
        );

        if !output.success() {
            return Err(EvaluationError::AgentError(format!(
                "Evaluator exited with code {}",
                output.exit_code
            )));
        }
        if output.is_blank() {
            return Err(EvaluationError::EmptyResponse);
        }

        EvaluationResult::parse(&output.text).map_err(EvaluationError::ParseError)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Invalid evaluation input: {0}")]
    InvalidInput(String),

    #[error("Evaluator backend error: {0}")]
    AgentError(String),

    #[error("Evaluator returned an empty response")]
    EmptyResponse,

    #[error("Failed to parse evaluator scores: {0}")]
    ParseError(#[from] ScoreParseError),
}
