use paperloop_agent::{Agent, AgentConfig};
use tracing::{debug, info};

use crate::WriterPrompts;

/// What to draft: a section of a titled paper, optionally steered by feedback
#[derive(Clone, Copy, Debug)]
pub struct DraftRequest<'a> {
    pub title: &'a str,
    pub section: &'a str,
    pub prior_feedback: Option<&'a str>,
}

/// Generator that drafts sections with the generator agent
pub struct SectionGenerator<'a> {
    agent: &'a dyn Agent,
    config: &'a AgentConfig,
}

impl<'a> SectionGenerator<'a> {
    pub fn new(agent: &'a dyn Agent, config: &'a AgentConfig) -> Self {
        Self { agent, config }
    }

    /// Draft or revise a section. One backend call; failures are not retried here.
    pub async fn generate(&self, request: DraftRequest<'_>) -> Result<String, GenerationError> {
        if request.title.trim().is_empty() {
            return Err(GenerationError::InvalidInput("title is empty".into()));
        }
        if request.section.trim().is_empty() {
            return Err(GenerationError::InvalidInput("section name is empty".into()));
        }

        let prompt =
            WriterPrompts::build_draft_prompt(request.title, request.section, request.prior_feedback);

        debug!(
            section = request.section,
            revision = request.prior_feedback.is_some(),
            prompt_len = prompt.len(),
            "Running generator"
        );

        let output = self
            .agent
            .execute(&prompt, self.config)
            .await
            .map_err(|e| GenerationError::AgentError(e.to_string()))?;

        info!(
            section = request.section,
            exit_code = output.exit_code,
            duration_secs = output.duration.as_secs_f64(),
            "Generator completed"
        );

        if !output.success() {
            return Err(GenerationError::NonZeroExit(output.exit_code));
        }
        if output.is_blank() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(output.text.trim().to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Invalid generation input: {0}")]
    InvalidInput(String),

    #[error("Generator backend error: {0}")]
    AgentError(String),

    #[error("Generator exited with code {0}")]
    NonZeroExit(i32),

    #[error("Generator returned empty content")]
    EmptyResponse,
}
