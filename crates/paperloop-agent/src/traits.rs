use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::AgentOutput;

/// Errors that can occur while calling a model backend
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Failed to spawn agent process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Agent call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Agent configuration error: {0}")]
    ConfigError(String),

    #[error("No API key available (set {0})")]
    MissingApiKey(String),

    #[error("Request to backend failed: {0}")]
    RequestFailed(String),

    #[error("Backend returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Failed to parse backend response: {0}")]
    InvalidResponse(String),
}

/// Per-call configuration for an agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Working directory for process-based agents
    pub working_dir: PathBuf,
    /// Per-call timeout (None = no limit)
    pub timeout: Option<Duration>,
    /// Additional environment variables for process-based agents
    pub env_vars: HashMap<String, String>,
    /// Model to use (if the backend supports it)
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens
    pub max_output_tokens: Option<u32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            timeout: None,
            env_vars: HashMap::new(),
            model: None,
            temperature: None,
            max_output_tokens: None,
        }
    }
}

impl AgentConfig {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub fn with_env(mut self, key: String, value: String) -> Self {
        self.env_vars.insert(key, value);
        self
    }
}

/// Supported backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentType {
    ClaudeCode,
    OpenAi,
    Gemini,
}

impl AgentType {
    /// Environment variable consulted for the API key when none is configured
    pub fn default_api_key_env(&self) -> Option<&'static str> {
        match self {
            AgentType::ClaudeCode => None,
            AgentType::OpenAi => Some("OPENAI_API_KEY"),
            AgentType::Gemini => Some("GOOGLE_API_KEY"),
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentType::ClaudeCode => write!(f, "claude-code"),
            AgentType::OpenAi => write!(f, "openai"),
            AgentType::Gemini => write!(f, "gemini"),
        }
    }
}

impl std::str::FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "claude" | "claude-code" | "claudecode" => Ok(AgentType::ClaudeCode),
            "openai" | "open-ai" | "openai-compatible" => Ok(AgentType::OpenAi),
            "gemini" | "google" => Ok(AgentType::Gemini),
            _ => Err(format!("Unknown backend: {}", s)),
        }
    }
}

/// The core abstraction for a text-completion backend
#[async_trait]
pub trait Agent: Send + Sync {
    /// Human-readable name of the backend (e.g., "Gemini", "Claude Code")
    fn name(&self) -> &str;

    /// The backend type
    fn agent_type(&self) -> AgentType;

    /// Send a single prompt and collect the completion
    async fn execute(&self, prompt: &str, config: &AgentConfig) -> Result<AgentOutput, AgentError>;

    /// Check whether the backend can be reached with the current setup
    async fn is_available(&self) -> bool;
}
