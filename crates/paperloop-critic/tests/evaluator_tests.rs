use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use paperloop_agent::{Agent, AgentConfig, AgentError, AgentOutput, AgentType};
use paperloop_critic::{EvaluationError, ReviewInput, SectionEvaluator};

/// Agent that replays a canned response and remembers the prompt it saw.
struct CannedAgent {
    response: Result<AgentOutput, String>,
    last_prompt: Mutex<Option<String>>,
}

impl CannedAgent {
    fn replying(text: &str) -> Self {
        Self {
            response: Ok(AgentOutput::completion(text.to_string(), Duration::ZERO)),
            last_prompt: Mutex::new(None),
        }
    }

    fn exiting(code: i32) -> Self {
        Self {
            response: Ok(AgentOutput::new(
                String::new(),
                "boom".into(),
                code,
                Duration::ZERO,
            )),
            last_prompt: Mutex::new(None),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            last_prompt: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Agent for CannedAgent {
    fn name(&self) -> &str {
        "canned"
    }

    fn agent_type(&self) -> AgentType {
        AgentType::OpenAi
    }

    async fn execute(&self, prompt: &str, _config: &AgentConfig) -> Result<AgentOutput, AgentError> {
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        match &self.response {
            Ok(output) => Ok(output.clone()),
            Err(message) => Err(AgentError::RequestFailed(message.clone())),
        }
    }

    async fn is_available(&self) -> bool {
        true
    }
}

fn input<'a>(text: &'a str) -> ReviewInput<'a> {
    ReviewInput {
        title: "Lipase Catalysis",
        section: "Methods",
        text,
    }
}

#[tokio::test]
async fn test_evaluate_parses_scores() {
    let agent = CannedAgent::replying(
        "RELEVANCE: 9\nCOHERENCE: 8\nFACTUALITY: 8\nREADABILITY: 9\nTOTAL: 34\nFEEDBACK: Minor wording issues.",
    );
    let config = AgentConfig::default();
    let evaluator = SectionEvaluator::new(&agent, &config);

    let result = evaluator.evaluate(input("Draft body.")).await.unwrap();

    assert_eq!(result.aggregate, 34.0);
    assert_eq!(result.feedback, "Minor wording issues.");

    let prompt = agent.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("Paper Title: Lipase Catalysis"));
    assert!(prompt.contains("Draft body."));
}

#[tokio::test]
async fn test_evaluate_rejects_empty_text_without_calling_backend() {
    let agent = CannedAgent::replying("RELEVANCE: 9");
    let config = AgentConfig::default();
    let evaluator = SectionEvaluator::new(&agent, &config);

    let result = evaluator.evaluate(input("   ")).await;

    assert!(matches!(result, Err(EvaluationError::InvalidInput(_))));
    assert!(agent.last_prompt.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_evaluate_unparseable_response() {
    let agent = CannedAgent::replying("Looks great to me!");
    let config = AgentConfig::default();
    let evaluator = SectionEvaluator::new(&agent, &config);

    let result = evaluator.evaluate(input("Draft body.")).await;
    assert!(matches!(result, Err(EvaluationError::ParseError(_))));
}

#[tokio::test]
async fn test_evaluate_backend_failure() {
    let agent = CannedAgent::failing("connection reset");
    let config = AgentConfig::default();
    let evaluator = SectionEvaluator::new(&agent, &config);

    match evaluator.evaluate(input("Draft body.")).await {
        Err(EvaluationError::AgentError(message)) => assert!(message.contains("connection reset")),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_evaluate_non_zero_exit() {
    let agent = CannedAgent::exiting(3);
    let config = AgentConfig::default();
    let evaluator = SectionEvaluator::new(&agent, &config);

    assert!(matches!(
        evaluator.evaluate(input("Draft body.")).await,
        Err(EvaluationError::AgentError(_))
    ));
}
