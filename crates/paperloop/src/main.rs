mod api;
mod check;
mod config;
mod generate;
mod render;
mod serve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use paperloop_agent::{create_agent, AgentType};
use paperloop_core::{AgentBackend, PaperRequest};
use paperloop_jobs::JobService;
use paperloop_latex::LatexRenderer;
use paperloop_logging::{init_tracing, LogFormat, Logger};

use crate::config::{ProjectConfig, ResolvedRole, Role, CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(
    name = "paperloop",
    about = "Generate, score and revise research papers with language models",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (default: ./paperloop.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatChoice,

    /// Tracing level filter (RUST_LOG takes precedence)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Backend for the generator role
    #[arg(long, value_enum, global = true)]
    generator_backend: Option<BackendChoice>,

    /// Backend for the evaluator role
    #[arg(long, value_enum, global = true)]
    evaluator_backend: Option<BackendChoice>,

    /// Model for both roles (if the backend supports it)
    #[arg(short, long, global = true)]
    model: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP job API
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        /// Also write tracing output and job events to files in this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },
    /// Generate one paper in-process
    Generate {
        #[arg(short, long)]
        title: String,

        /// Section name; repeat for each section, in output order
        #[arg(short, long = "section", required = true)]
        sections: Vec<String>,

        /// Acceptance threshold out of 40
        #[arg(long)]
        threshold: Option<f64>,

        #[arg(short = 'n', long)]
        max_iterations: Option<usize>,

        /// Where to write <job_id>.json and <job_id>.tex
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output the final outcome as JSON
        #[arg(long)]
        json_output: bool,
    },
    /// Render a saved paper JSON file to LaTeX
    Render {
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show resolved settings and check backend availability
    Check,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendChoice {
    Claude,
    Openai,
    Gemini,
}

impl From<BackendChoice> for AgentType {
    fn from(choice: BackendChoice) -> Self {
        match choice {
            BackendChoice::Claude => AgentType::ClaudeCode,
            BackendChoice::Openai => AgentType::OpenAi,
            BackendChoice::Gemini => AgentType::Gemini,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    let log_dir = match &cli.command {
        Commands::Serve { log_dir, .. } => log_dir.clone(),
        _ => None,
    };
    let _guard = init_tracing(&cli.log_level, log_format, log_dir.as_deref());

    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    let config_path = config_path(cli.config.as_deref(), &working_dir);
    let config = ProjectConfig::load(cli.config.as_deref(), &working_dir)?.unwrap_or_default();

    let renderer = document_renderer(&config);

    match cli.command {
        Commands::Render {
            ref input,
            ref output,
        } => render::handle_render_command(input, output.as_deref(), &renderer),

        Commands::Check => {
            let (generator, evaluator) = resolve_roles(&config, &cli)?;
            let backend = build_backend(&generator, &evaluator);
            let output_dir = config.output_dir();
            let report = check::CheckReport {
                config_path: config_path.as_deref(),
                generator: &generator,
                evaluator: &evaluator,
                settings: config.loop_settings()?,
                output_dir: output_dir.as_deref(),
            };
            check::handle_check_command(report, &backend).await
        }

        Commands::Serve {
            ref host,
            port,
            ref log_dir,
        } => {
            let (generator, evaluator) = resolve_roles(&config, &cli)?;
            let backend = Arc::new(build_backend(&generator, &evaluator));

            let logger = match log_dir {
                Some(dir) => Logger::with_file(log_format, &dir.join("events.jsonl"))
                    .with_context(|| format!("Failed to open event log in {}", dir.display()))?,
                None => Logger::new(log_format),
            };

            let mut service = JobService::new(backend, Arc::new(logger), config.loop_settings()?)
                .with_renderer(renderer);
            if let Some(dir) = config.output_dir() {
                service = service.with_output_dir(dir);
            }

            let options = serve::ServeOptions {
                host: host
                    .clone()
                    .or_else(|| config.server.host.clone())
                    .unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: port.or(config.server.port).unwrap_or(DEFAULT_PORT),
                retention: config.retention(),
                cors_origins: config.server.cors_origins.clone(),
            };
            serve::handle_serve_command(service, options).await
        }

        Commands::Generate {
            ref title,
            ref sections,
            threshold,
            max_iterations,
            ref output_dir,
            json_output,
        } => {
            let (generator, evaluator) = resolve_roles(&config, &cli)?;
            let backend = build_backend(&generator, &evaluator);

            let (generator_ok, evaluator_ok) = backend.check_available().await;
            if !generator_ok {
                anyhow::bail!(
                    "Generator backend '{}' is not available. Check it is installed or its API key is set.",
                    backend.generator_name()
                );
            }
            if !evaluator_ok {
                anyhow::bail!(
                    "Evaluator backend '{}' is not available. Check it is installed or its API key is set.",
                    backend.evaluator_name()
                );
            }

            let mut request = PaperRequest::new(title.clone(), sections.clone());
            if let Some(threshold) = threshold {
                request = request.with_threshold(threshold);
            }
            if let Some(max) = max_iterations {
                request = request.with_max_iterations(max);
            }

            let options = generate::GenerateOptions {
                request,
                output_dir: output_dir.clone().or_else(|| config.output_dir()),
                json_output,
            };
            let code = generate::handle_generate_command(
                options,
                Arc::new(backend),
                Arc::new(Logger::new(log_format)),
                config.loop_settings()?,
                &renderer,
            )
            .await?;

            std::process::exit(code);
        }
    }
}

/// The config file that will be read, if any
fn config_path(explicit: Option<&Path>, working_dir: &Path) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let path = working_dir.join(CONFIG_FILE_NAME);
            path.exists().then_some(path)
        }
    }
}

fn resolve_roles(config: &ProjectConfig, cli: &Cli) -> Result<(ResolvedRole, ResolvedRole)> {
    let model = cli.model.as_deref();
    let generator =
        config.resolve_role(Role::Generator, cli.generator_backend.map(Into::into), model)?;
    let evaluator =
        config.resolve_role(Role::Evaluator, cli.evaluator_backend.map(Into::into), model)?;
    Ok((generator, evaluator))
}

fn build_backend(generator: &ResolvedRole, evaluator: &ResolvedRole) -> AgentBackend {
    AgentBackend::new(
        create_agent(generator.agent_type, generator.endpoint.clone()),
        generator.agent_config.clone(),
        create_agent(evaluator.agent_type, evaluator.endpoint.clone()),
        evaluator.agent_config.clone(),
    )
}

fn document_renderer(config: &ProjectConfig) -> LatexRenderer {
    let mut renderer = LatexRenderer::default();
    if let Some(ref author) = config.document.author {
        renderer = renderer.with_author(author.clone());
    }
    if let Some(ref date) = config.document.date {
        renderer = renderer.with_date(date.clone());
    }
    renderer
}
