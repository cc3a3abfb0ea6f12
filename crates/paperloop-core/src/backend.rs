use async_trait::async_trait;

use paperloop_agent::{Agent, AgentConfig};
use paperloop_critic::{EvaluationError, EvaluationResult, ReviewInput, SectionEvaluator};
use paperloop_writer::{DraftRequest, GenerationError, SectionGenerator};

/// The two model calls the revision loop needs.
///
/// [`AgentBackend`] runs them against real agents; tests substitute scripted
/// implementations.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    async fn generate(&self, request: DraftRequest<'_>) -> Result<String, GenerationError>;

    async fn evaluate(&self, input: ReviewInput<'_>) -> Result<EvaluationResult, EvaluationError>;
}

/// Generator and evaluator agents, each with its own call settings
pub struct AgentBackend {
    generator: Box<dyn Agent>,
    generator_config: AgentConfig,
    evaluator: Box<dyn Agent>,
    evaluator_config: AgentConfig,
}

impl AgentBackend {
    pub fn new(
        generator: Box<dyn Agent>,
        generator_config: AgentConfig,
        evaluator: Box<dyn Agent>,
        evaluator_config: AgentConfig,
    ) -> Self {
        Self {
            generator,
            generator_config,
            evaluator,
            evaluator_config,
        }
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    pub fn evaluator_name(&self) -> &str {
        self.evaluator.name()
    }

    /// Check both agents can be reached
    pub async fn check_available(&self) -> (bool, bool) {
        (
            self.generator.is_available().await,
            self.evaluator.is_available().await,
        )
    }
}

#[async_trait]
impl ContentBackend for AgentBackend {
    async fn generate(&self, request: DraftRequest<'_>) -> Result<String, GenerationError> {
        SectionGenerator::new(self.generator.as_ref(), &self.generator_config)
            .generate(request)
            .await
    }

    async fn evaluate(&self, input: ReviewInput<'_>) -> Result<EvaluationResult, EvaluationError> {
        SectionEvaluator::new(self.evaluator.as_ref(), &self.evaluator_config)
            .evaluate(input)
            .await
    }
}
