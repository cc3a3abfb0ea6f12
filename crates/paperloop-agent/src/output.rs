use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output captured from one backend call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Completion text (stdout for process-based agents)
    pub text: String,
    /// Diagnostic output (stderr for process-based agents, empty for HTTP)
    pub stderr: String,
    /// Exit code from the process; HTTP backends report 0
    pub exit_code: i32,
    /// Wall-clock duration of the call
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl AgentOutput {
    pub fn new(text: String, stderr: String, exit_code: i32, duration: Duration) -> Self {
        Self {
            text,
            stderr,
            exit_code,
            duration,
        }
    }

    /// Output of a successful HTTP completion
    pub fn completion(text: String, duration: Duration) -> Self {
        Self::new(text, String::new(), 0, duration)
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// True when the completion carries no visible text
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
