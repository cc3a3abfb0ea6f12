use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use paperloop_core::{AgentBackend, LoopSettings};

use crate::config::ResolvedRole;

pub struct CheckReport<'a> {
    pub config_path: Option<&'a Path>,
    pub generator: &'a ResolvedRole,
    pub evaluator: &'a ResolvedRole,
    pub settings: LoopSettings,
    pub output_dir: Option<&'a Path>,
}

/// Print the resolved configuration and probe both backends.
/// Fails when either backend is unavailable.
pub async fn handle_check_command(report: CheckReport<'_>, backend: &AgentBackend) -> Result<()> {
    match report.config_path {
        Some(path) => println!("Config:         {}", path.display()),
        None => println!("Config:         (defaults, no paperloop.toml found)"),
    }
    print_role(report.generator);
    print_role(report.evaluator);
    println!("Threshold:      {}", report.settings.threshold);
    println!("Max iterations: {}", report.settings.max_iterations);
    println!("Concurrency:    {}", report.settings.concurrency);
    match report.output_dir {
        Some(dir) => println!("Output dir:     {}", dir.display()),
        None => println!("Output dir:     (none)"),
    }
    println!();

    let (generator_ok, evaluator_ok) = backend.check_available().await;
    print_availability("Generator", backend.generator_name(), generator_ok);
    print_availability("Evaluator", backend.evaluator_name(), evaluator_ok);

    if !generator_ok || !evaluator_ok {
        anyhow::bail!("One or more backends are unavailable");
    }
    Ok(())
}

fn print_role(resolved: &ResolvedRole) {
    let label = format!("{}:", capitalize(&resolved.role.to_string()));
    let model = resolved
        .agent_config
        .model
        .as_deref()
        .unwrap_or("backend default");
    let timeout = resolved
        .agent_config
        .timeout
        .map(|t| format!("{}s", t.as_secs()))
        .unwrap_or_else(|| "none".to_string());
    println!(
        "{:<15} {} (model: {}, timeout: {})",
        label, resolved.agent_type, model, timeout
    );
}

fn print_availability(label: &str, name: &str, available: bool) {
    let status = if available {
        "available".green()
    } else {
        "unavailable".red()
    };
    println!("{} {}: {}", label, name.bold(), status);
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
