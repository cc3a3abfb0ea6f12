use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

use crate::{AgentConfig, AgentError, AgentOutput};

/// Utility for spawning CLI agent processes
pub struct ProcessSpawner;

impl ProcessSpawner {
    /// Spawn a process, wait for it under the configured timeout and capture its output.
    ///
    /// The child is killed if the timeout elapses.
    pub async fn spawn(
        binary: &Path,
        args: &[&str],
        config: &AgentConfig,
    ) -> Result<AgentOutput, AgentError> {
        let start = Instant::now();

        debug!(
            binary = %binary.display(),
            arg_count = args.len(),
            working_dir = %config.working_dir.display(),
            "Spawning agent process"
        );

        let mut cmd = Command::new(binary);
        cmd.args(args)
            .current_dir(&config.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        for (key, value) in &config.env_vars {
            cmd.env(key, value);
        }

        let output = match config.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| AgentError::Timeout(limit))??,
            None => cmd.output().await?,
        };

        let duration = start.elapsed();
        let exit_code = output.status.code().unwrap_or(-1);

        debug!(
            exit_code,
            duration_ms = duration.as_millis(),
            "Agent process completed"
        );

        Ok(AgentOutput::new(
            String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            exit_code,
            duration,
        ))
    }
}
