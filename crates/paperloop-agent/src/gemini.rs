use async_trait::async_trait;
use serde::Deserialize;
use std::time::Instant;
use tracing::debug;

use crate::http::{send_json, Endpoint};
use crate::{Agent, AgentConfig, AgentError, AgentOutput, AgentType};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Google Gemini `generateContent` backend
pub struct GeminiAgent {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl GeminiAgent {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    fn url(&self, model: &str) -> String {
        let base = self
            .endpoint
            .base_url
            .as_deref()
            .unwrap_or(GEMINI_API_BASE)
            .trim_end_matches('/');
        format!("{}/models/{}:generateContent", base, model)
    }

    fn build_request_body(prompt: &str, config: &AgentConfig) -> serde_json::Value {
        let mut generation_config = serde_json::Map::new();
        if let Some(temperature) = config.temperature {
            generation_config.insert("temperature".into(), serde_json::json!(temperature));
        }
        if let Some(tokens) = config.max_output_tokens {
            generation_config.insert("maxOutputTokens".into(), serde_json::json!(tokens));
        }

        serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Concatenate the text parts of the first candidate
pub(crate) fn parse_generate_response(body: &str) -> Result<String, AgentError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| AgentError::InvalidResponse(format!("generateContent: {}", e)))?;

    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| AgentError::InvalidResponse("response contained no candidates".into()))?;

    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    Ok(text.trim().to_string())
}

#[async_trait]
impl Agent for GeminiAgent {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn agent_type(&self) -> AgentType {
        AgentType::Gemini
    }

    async fn is_available(&self) -> bool {
        self.endpoint.api_key().is_ok()
    }

    async fn execute(&self, prompt: &str, config: &AgentConfig) -> Result<AgentOutput, AgentError> {
        let api_key = self.endpoint.api_key()?;
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let start = Instant::now();

        debug!(
            agent = self.name(),
            model,
            prompt_len = prompt.len(),
            "Requesting content generation"
        );

        let request = self
            .client
            .post(self.url(model))
            .header("x-goog-api-key", api_key)
            .json(&Self::build_request_body(prompt, config));

        let body = send_json(request, config.timeout).await?;
        let text = parse_generate_response(&body)?;

        Ok(AgentOutput::completion(text, start.elapsed()))
    }
}
