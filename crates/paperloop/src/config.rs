//! Project configuration file support for paperloop.
//!
//! Loads configuration from `paperloop.toml` in the working directory, or from
//! the path given with `--config`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use paperloop_agent::{AgentConfig, AgentType, Endpoint};
use paperloop_core::LoopSettings;
use paperloop_critic::MAX_AGGREGATE;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "paperloop.toml";

pub const DEFAULT_BACKEND: AgentType = AgentType::Gemini;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_EVALUATOR_TIMEOUT: Duration = Duration::from_secs(60);
const GEMINI_EVALUATOR_MODEL: &str = "gemini-2.5-flash-lite";
const DEFAULT_GENERATOR_TEMPERATURE: f32 = 0.7;
const DEFAULT_EVALUATOR_TEMPERATURE: f32 = 0.3;
const DEFAULT_GENERATOR_MAX_OUTPUT_TOKENS: u32 = 8000;
const DEFAULT_EVALUATOR_MAX_OUTPUT_TOKENS: u32 = 4000;

/// Project-level configuration loaded from `paperloop.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Global default backend (applies to both generator and evaluator)
    pub backend: Option<String>,
    /// Global default model (applies to both generator and evaluator)
    pub model: Option<String>,
    #[serde(default)]
    pub generator: RoleConfig,
    #[serde(default)]
    pub evaluator: RoleConfig,
    #[serde(default, rename = "loop")]
    pub loop_config: LoopConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub document: DocumentConfig,
}

/// Configuration for a specific role (generator or evaluator)
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub backend: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// Per-call timeout, e.g. "90s"
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    /// Override the backend endpoint (OpenAI-compatible servers, proxies)
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LoopConfig {
    pub threshold: Option<f64>,
    pub max_iterations: Option<usize>,
    pub concurrency: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// How long finished jobs are kept, e.g. "12h"
    #[serde(default, with = "humantime_serde")]
    pub retention: Option<Duration>,
    /// Allowed CORS origins; empty means any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DocumentConfig {
    pub author: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Generator,
    Evaluator,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Generator => write!(f, "generator"),
            Role::Evaluator => write!(f, "evaluator"),
        }
    }
}

/// Everything needed to build one role's agent
#[derive(Debug, Clone)]
pub struct ResolvedRole {
    pub role: Role,
    pub agent_type: AgentType,
    pub endpoint: Endpoint,
    pub agent_config: AgentConfig,
}

impl ProjectConfig {
    /// Load configuration.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if the file exists and parses successfully
    /// - `Ok(None)` if no explicit path was given and `paperloop.toml` does not exist
    /// - `Err(...)` if the file fails to parse, or an explicit path is missing
    pub fn load(explicit: Option<&Path>, working_dir: &Path) -> Result<Option<Self>> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = working_dir.join(CONFIG_FILE_NAME);
                if !path.exists() {
                    return Ok(None);
                }
                path
            }
        };

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn role_config(&self, role: Role) -> &RoleConfig {
        match role {
            Role::Generator => &self.generator,
            Role::Evaluator => &self.evaluator,
        }
    }

    /// Get the effective backend for a role.
    /// Priority: [role].backend > global backend > None
    pub fn backend(&self, role: Role) -> Option<&str> {
        self.role_config(role)
            .backend
            .as_deref()
            .or(self.backend.as_deref())
    }

    /// Get the effective model for a role.
    /// Priority: [role].model > global model > None
    pub fn model(&self, role: Role) -> Option<&str> {
        self.role_config(role)
            .model
            .as_deref()
            .or(self.model.as_deref())
    }

    /// Resolve a role's backend and call settings.
    /// Priority: CLI flag > role section > global > default
    pub fn resolve_role(
        &self,
        role: Role,
        cli_backend: Option<AgentType>,
        cli_model: Option<&str>,
    ) -> Result<ResolvedRole> {
        let agent_type = match cli_backend {
            Some(agent_type) => agent_type,
            None => match self.backend(role) {
                Some(name) => name
                    .parse::<AgentType>()
                    .map_err(|e| anyhow::anyhow!("Invalid {} backend: {}", role, e))?,
                None => DEFAULT_BACKEND,
            },
        };

        let section = self.role_config(role);
        let timeout = section.timeout.unwrap_or(match role {
            Role::Generator => DEFAULT_GENERATOR_TIMEOUT,
            Role::Evaluator => DEFAULT_EVALUATOR_TIMEOUT,
        });

        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let mut agent_config = AgentConfig::new(working_dir).with_timeout(timeout);

        let model = cli_model.or(self.model(role)).or(match (role, agent_type) {
            (Role::Evaluator, AgentType::Gemini) => Some(GEMINI_EVALUATOR_MODEL),
            _ => None,
        });
        if let Some(model) = model {
            agent_config = agent_config.with_model(model.to_string());
        }
        let (default_temperature, default_tokens) = match role {
            Role::Generator => (
                DEFAULT_GENERATOR_TEMPERATURE,
                DEFAULT_GENERATOR_MAX_OUTPUT_TOKENS,
            ),
            Role::Evaluator => (
                DEFAULT_EVALUATOR_TEMPERATURE,
                DEFAULT_EVALUATOR_MAX_OUTPUT_TOKENS,
            ),
        };
        agent_config = agent_config
            .with_temperature(section.temperature.unwrap_or(default_temperature))
            .with_max_output_tokens(section.max_output_tokens.unwrap_or(default_tokens));

        let mut endpoint = Endpoint::new();
        if let Some(ref url) = section.base_url {
            endpoint = endpoint.with_base_url(url.clone());
        }
        if let Some(ref var) = section.api_key_env {
            endpoint = endpoint.with_api_key_env(var.clone());
        }

        Ok(ResolvedRole {
            role,
            agent_type,
            endpoint,
            agent_config,
        })
    }

    /// Loop settings from the `[loop]` section, falling back to defaults.
    /// Values outside the bounds a request may use are rejected.
    pub fn loop_settings(&self) -> Result<LoopSettings> {
        let mut settings = LoopSettings::default();
        if let Some(threshold) = self.loop_config.threshold {
            if !(0.0..=MAX_AGGREGATE).contains(&threshold) {
                anyhow::bail!(
                    "Invalid [loop] threshold: {} (must be between 0 and {})",
                    threshold,
                    MAX_AGGREGATE
                );
            }
            settings = settings.with_threshold(threshold);
        }
        if let Some(max) = self.loop_config.max_iterations {
            if max == 0 {
                anyhow::bail!("Invalid [loop] max_iterations: 0 (must be at least 1)");
            }
            settings = settings.with_max_iterations(max);
        }
        if let Some(concurrency) = self.loop_config.concurrency {
            if concurrency == 0 {
                anyhow::bail!("Invalid [loop] concurrency: 0 (must be at least 1)");
            }
            settings = settings.with_concurrency(concurrency);
        }
        Ok(settings)
    }

    /// Where completed papers are written.
    /// Priority: [server].output_dir > <data dir>/paperloop/papers
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.server
            .output_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("paperloop").join("papers")))
    }

    pub fn retention(&self) -> Duration {
        self.server.retention.unwrap_or(DEFAULT_RETENTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ProjectConfig::parse("").unwrap();
        let generator = config.resolve_role(Role::Generator, None, None).unwrap();
        assert_eq!(generator.agent_type, AgentType::Gemini);
        assert_eq!(generator.agent_config.timeout, Some(Duration::from_secs(120)));
        assert_eq!(generator.agent_config.model, None);
        assert_eq!(generator.agent_config.temperature, Some(0.7));
        assert_eq!(generator.agent_config.max_output_tokens, Some(8000));

        let evaluator = config.resolve_role(Role::Evaluator, None, None).unwrap();
        assert_eq!(evaluator.agent_config.timeout, Some(Duration::from_secs(60)));
        assert_eq!(
            evaluator.agent_config.model.as_deref(),
            Some(GEMINI_EVALUATOR_MODEL)
        );
        assert_eq!(evaluator.agent_config.temperature, Some(0.3));
        assert_eq!(evaluator.agent_config.max_output_tokens, Some(4000));

        assert_eq!(config.loop_settings().unwrap(), LoopSettings::default());
        assert_eq!(config.retention(), DEFAULT_RETENTION);
    }

    #[test]
    fn test_role_sections_override_globals() {
        let config = ProjectConfig::parse(
            r#"
backend = "openai"
model = "gpt-4o-mini"

[evaluator]
model = "gpt-4o"
timeout = "45s"
temperature = 0.2
base_url = "http://localhost:11434/v1/chat/completions"
api_key_env = "LOCAL_KEY"

[loop]
threshold = 30.0
max_iterations = 3

[server]
retention = "2h"
cors_origins = ["http://localhost:5173"]
"#,
        )
        .unwrap();

        assert_eq!(config.model(Role::Generator), Some("gpt-4o-mini"));
        let evaluator = config.resolve_role(Role::Evaluator, None, None).unwrap();
        assert_eq!(evaluator.agent_type, AgentType::OpenAi);
        assert_eq!(evaluator.agent_config.model.as_deref(), Some("gpt-4o"));
        assert_eq!(evaluator.agent_config.timeout, Some(Duration::from_secs(45)));
        assert_eq!(evaluator.agent_config.temperature, Some(0.2));
        assert_eq!(evaluator.agent_config.max_output_tokens, Some(4000));
        assert_eq!(evaluator.endpoint.api_key_env.as_deref(), Some("LOCAL_KEY"));

        let settings = config.loop_settings().unwrap();
        assert_eq!(settings.threshold, 30.0);
        assert_eq!(settings.max_iterations, 3);
        assert_eq!(config.retention(), Duration::from_secs(7200));
        assert_eq!(config.server.cors_origins.len(), 1);
    }

    #[test]
    fn test_out_of_range_loop_settings_are_rejected() {
        for (toml, key) in [
            ("[loop]\nthreshold = 45.0", "threshold"),
            ("[loop]\nthreshold = -1.0", "threshold"),
            ("[loop]\nmax_iterations = 0", "max_iterations"),
            ("[loop]\nconcurrency = 0", "concurrency"),
        ] {
            let config = ProjectConfig::parse(toml).unwrap();
            let err = config.loop_settings().unwrap_err().to_string();
            assert!(err.contains(key), "{} should name {}", err, key);
        }

        let config = ProjectConfig::parse("[loop]\nthreshold = 40.0\nconcurrency = 4").unwrap();
        let settings = config.loop_settings().unwrap();
        assert_eq!(settings.threshold, 40.0);
        assert_eq!(settings.concurrency, 4);
    }

    #[test]
    fn test_cli_flags_win() {
        let config = ProjectConfig::parse("backend = \"openai\"\nmodel = \"gpt-4o\"").unwrap();
        let resolved = config
            .resolve_role(Role::Generator, Some(AgentType::ClaudeCode), Some("sonnet"))
            .unwrap();
        assert_eq!(resolved.agent_type, AgentType::ClaudeCode);
        assert_eq!(resolved.agent_config.model.as_deref(), Some("sonnet"));
    }

    #[test]
    fn test_unknown_keys_and_backends_are_errors() {
        assert!(ProjectConfig::parse("agent = \"claude\"").is_err());
        let config = ProjectConfig::parse("backend = \"cursor\"").unwrap();
        assert!(config.resolve_role(Role::Generator, None, None).is_err());
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(ProjectConfig::load(None, dir.path()).unwrap().is_none());
        assert!(ProjectConfig::load(Some(&dir.path().join("nope.toml")), dir.path()).is_err());
    }
}
