use async_trait::async_trait;
use serde::Deserialize;
use std::time::Instant;
use tracing::debug;

use crate::http::{send_json, Endpoint};
use crate::{Agent, AgentConfig, AgentError, AgentOutput, AgentType};

/// Default OpenAI chat completions endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Any OpenAI-compatible chat completions service
pub struct OpenAiAgent {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl OpenAiAgent {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    fn url(&self) -> &str {
        self.endpoint.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    fn build_request_body(prompt: &str, config: &AgentConfig) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": config.model.as_deref().unwrap_or(DEFAULT_MODEL),
            "messages": [{ "role": "user", "content": prompt }],
        });
        if let Some(temperature) = config.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if let Some(tokens) = config.max_output_tokens {
            body["max_tokens"] = serde_json::json!(tokens);
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the first choice's content from a chat completions response body
pub(crate) fn parse_chat_response(body: &str) -> Result<String, AgentError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AgentError::InvalidResponse(format!("chat completion: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| AgentError::InvalidResponse("response contained no choices".into()))
}

#[async_trait]
impl Agent for OpenAiAgent {
    fn name(&self) -> &str {
        "OpenAI-compatible"
    }

    fn agent_type(&self) -> AgentType {
        AgentType::OpenAi
    }

    async fn is_available(&self) -> bool {
        self.endpoint.api_key().is_ok()
    }

    async fn execute(&self, prompt: &str, config: &AgentConfig) -> Result<AgentOutput, AgentError> {
        let api_key = self.endpoint.api_key()?;
        let start = Instant::now();

        debug!(
            agent = self.name(),
            url = self.url(),
            prompt_len = prompt.len(),
            "Requesting chat completion"
        );

        let request = self
            .client
            .post(self.url())
            .bearer_auth(api_key)
            .json(&Self::build_request_body(prompt, config));

        let body = send_json(request, config.timeout).await?;
        let text = parse_chat_response(&body)?;

        Ok(AgentOutput::completion(text, start.elapsed()))
    }
}
