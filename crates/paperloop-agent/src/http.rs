use std::time::Duration;

use tracing::warn;

use crate::AgentError;

/// Where an HTTP backend lives and how it authenticates
#[derive(Debug, Clone, Default)]
pub struct Endpoint {
    /// Full URL override for the completion endpoint
    pub base_url: Option<String>,
    /// Explicit API key (takes precedence over the environment)
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
}

impl Endpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = Some(var.into());
        self
    }

    /// Resolve the API key from the explicit value or the configured variable
    pub fn api_key(&self) -> Result<String, AgentError> {
        if let Some(ref key) = self.api_key {
            return Ok(key.clone());
        }
        let var = self
            .api_key_env
            .as_deref()
            .ok_or_else(|| AgentError::MissingApiKey("an api_key_env".into()))?;
        std::env::var(var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AgentError::MissingApiKey(var.to_string()))
    }
}

/// Send a prepared JSON request and return the body of a 2xx response
pub(crate) async fn send_json(
    request: reqwest::RequestBuilder,
    timeout: Option<Duration>,
) -> Result<String, AgentError> {
    let request = match timeout {
        Some(limit) => request.timeout(limit),
        None => request,
    };

    let response = request.send().await.map_err(|e| map_reqwest_error(e, timeout))?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| map_reqwest_error(e, timeout))?;

    if !(200..300).contains(&status) {
        warn!(status, "Backend returned an error status");
        return Err(AgentError::HttpStatus {
            status,
            body: truncate(&body, 500),
        });
    }

    Ok(body)
}

fn map_reqwest_error(err: reqwest::Error, timeout: Option<Duration>) -> AgentError {
    match timeout {
        Some(limit) if err.is_timeout() => AgentError::Timeout(limit),
        _ => AgentError::RequestFailed(err.to_string()),
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        body.to_string()
    } else {
        let cut: String = body.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
