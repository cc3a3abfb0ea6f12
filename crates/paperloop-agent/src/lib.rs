mod claude;
mod gemini;
mod http;
mod openai;
mod output;
mod spawner;
mod traits;

pub use claude::ClaudeCodeAgent;
pub use gemini::GeminiAgent;
pub use http::Endpoint;
pub use openai::OpenAiAgent;
pub use output::AgentOutput;
pub use spawner::ProcessSpawner;
pub use traits::{Agent, AgentConfig, AgentError, AgentType};

/// Create a backend by type. HTTP backends fall back to the type's default
/// API key variable when the endpoint names none.
pub fn create_agent(agent_type: AgentType, endpoint: Endpoint) -> Box<dyn Agent> {
    let endpoint = match (endpoint.api_key_env.is_none(), agent_type.default_api_key_env()) {
        (true, Some(var)) => endpoint.with_api_key_env(var),
        _ => endpoint,
    };

    match agent_type {
        AgentType::ClaudeCode => Box::new(ClaudeCodeAgent::new()),
        AgentType::OpenAi => Box::new(OpenAiAgent::new(endpoint)),
        AgentType::Gemini => Box::new(GeminiAgent::new(endpoint)),
    }
}
