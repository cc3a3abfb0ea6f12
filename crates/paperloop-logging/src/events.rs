use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Structured log events for paper generation jobs.
///
/// `attempt` is 1-based: the first draft of a section is attempt 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    JobStarted {
        job_id: String,
        title: String,
        sections: Vec<String>,
        threshold: f64,
        max_iterations: usize,
    },
    DraftStarted {
        job_id: String,
        section: String,
        attempt: usize,
        revision: bool,
    },
    DraftCompleted {
        job_id: String,
        section: String,
        attempt: usize,
        chars: usize,
        duration_secs: f64,
    },
    EvaluationCompleted {
        job_id: String,
        section: String,
        attempt: usize,
        aggregate: f64,
        summary: String,
        accepted: bool,
    },
    EvaluationFailed {
        job_id: String,
        section: String,
        attempt: usize,
        error: String,
    },
    SectionFinished {
        job_id: String,
        section: String,
        state: String,
        iterations: usize,
        aggregate: Option<f64>,
    },
    SectionFailed {
        job_id: String,
        section: String,
        attempt: usize,
        error: String,
    },
    JobFinished {
        job_id: String,
        status: String,
        duration_secs: f64,
    },
    PaperSaved {
        job_id: String,
        path: PathBuf,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for job events - handles console output and optional file logging
pub struct Logger {
    format: LogFormat,
    console: bool,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            console: true,
            file_writer: None,
        }
    }

    /// Logger that discards everything (tests, embedding)
    pub fn silent() -> Self {
        Self {
            format: LogFormat::Compact,
            console: false,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            console: true,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if !self.console {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::JobStarted {
                job_id,
                title,
                sections,
                threshold,
                max_iterations,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "paperloop".bold().bright_white(),
                    format!("job {}", job_id).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Title:".dimmed(),
                    Self::truncate(title, 60).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Sections:".dimmed(),
                    Self::truncate(&sections.join(", "), 57).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {} / 40, up to {} iterations",
                    "│".bright_blue(),
                    "Threshold:".dimmed(),
                    threshold,
                    max_iterations
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::DraftStarted {
                section,
                attempt,
                revision,
                ..
            } => {
                let verb = if *revision { "REVISE" } else { "DRAFT" };
                let _ = writeln!(
                    stderr,
                    "  {} {} {} {}",
                    "▶".bright_cyan(),
                    verb.bright_cyan().bold(),
                    section.bold(),
                    format!("(attempt {})", attempt).dimmed()
                );
            }
            LogEvent::DraftCompleted {
                chars,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} chars ({:.1}s)",
                    "✓".bright_green(),
                    chars,
                    duration_secs
                );
            }
            LogEvent::EvaluationCompleted {
                summary, accepted, ..
            } => {
                let line = if *accepted {
                    format!("✓ Score: {}", summary).bright_green().to_string()
                } else {
                    format!("→ Score: {}", summary).bright_yellow().to_string()
                };
                let _ = writeln!(stderr, "    {}", line);
            }
            LogEvent::EvaluationFailed { error, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} Evaluation failed: {}",
                    "✗".bright_red(),
                    error.bright_red()
                );
            }
            LogEvent::SectionFinished {
                section,
                state,
                iterations,
                ..
            } => {
                let label = format!("{} {} after {} iteration(s)", section, state, iterations);
                let styled = if state == "accepted" {
                    label.bright_green().bold()
                } else {
                    label.bright_yellow().bold()
                };
                let _ = writeln!(stderr, "  {} {}", "■".bright_blue(), styled);
                let _ = writeln!(stderr);
            }
            LogEvent::SectionFailed { section, error, .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} failed: {}",
                    "✗".bright_red(),
                    section.bold(),
                    error.bright_red()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::JobFinished { .. } => {
                // Final outcome is printed by the caller
            }
            LogEvent::PaperSaved { path, .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "📄".dimmed(),
                    format!("Saved {}", path.display()).dimmed()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::JobStarted {
                job_id, sections, ..
            } => format!(
                "[{}] job:start:{} sections={}",
                timestamp,
                job_id,
                sections.len()
            ),
            LogEvent::DraftStarted {
                section, attempt, ..
            } => format!("[{}] draft:start:{}:{}", timestamp, section, attempt),
            LogEvent::DraftCompleted {
                section,
                attempt,
                chars,
                duration_secs,
                ..
            } => format!(
                "[{}] draft:done:{}:{} {}c {:.1}s",
                timestamp, section, attempt, chars, duration_secs
            ),
            LogEvent::EvaluationCompleted {
                section,
                attempt,
                summary,
                ..
            } => format!("[{}] eval:done:{}:{} {}", timestamp, section, attempt, summary),
            LogEvent::EvaluationFailed {
                section,
                attempt,
                error,
                ..
            } => format!("[{}] eval:error:{}:{} {}", timestamp, section, attempt, error),
            LogEvent::SectionFinished {
                section,
                state,
                iterations,
                ..
            } => format!(
                "[{}] section:{}:{} iterations={}",
                timestamp, state, section, iterations
            ),
            LogEvent::SectionFailed {
                section,
                attempt,
                error,
                ..
            } => format!(
                "[{}] section:failed:{}:{} {}",
                timestamp, section, attempt, error
            ),
            LogEvent::JobFinished {
                job_id,
                status,
                duration_secs,
            } => format!(
                "[{}] job:{}:{} {:.1}s",
                timestamp, status, job_id, duration_secs
            ),
            LogEvent::PaperSaved { path, .. } => {
                format!("[{}] saved:{}", timestamp, path.display())
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    fn truncate(s: &str, max_chars: usize) -> String {
        if s.chars().count() > max_chars {
            let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{}...", cut)
        } else {
            s.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_log_is_json_with_timestamp() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("events.jsonl");
        let mut logger = Logger::with_file(LogFormat::Compact, &path).unwrap();
        logger.console = false;

        logger.log(&LogEvent::SectionFinished {
            job_id: "ab12cd34".into(),
            section: "Abstract".into(),
            state: "accepted".into(),
            iterations: 1,
            aggregate: Some(35.0),
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(value["event"], "section_finished");
        assert_eq!(value["section"], "Abstract");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(Logger::truncate("abcdef", 5), "ab...");
        assert_eq!(Logger::truncate("ééé", 5), "ééé");
    }
}
