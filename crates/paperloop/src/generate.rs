use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use paperloop_core::{
    ContentBackend, LoopSettings, PaperOutcome, PaperRequest, PaperRunner, SectionState,
};
use paperloop_critic::fmt_score;
use paperloop_jobs::{new_job_id, save_paper};
use paperloop_latex::LatexRenderer;
use paperloop_logging::{LogEvent, Logger};

pub struct GenerateOptions {
    pub request: PaperRequest,
    pub output_dir: Option<PathBuf>,
    pub json_output: bool,
}

/// Run one paper in-process. Returns the process exit code.
pub async fn handle_generate_command(
    options: GenerateOptions,
    backend: Arc<dyn ContentBackend>,
    logger: Arc<Logger>,
    settings: LoopSettings,
    renderer: &LatexRenderer,
) -> Result<i32> {
    options.request.validate()?;

    let runner = PaperRunner::new(backend, logger.clone(), settings);

    let interrupt_handle = runner.interrupt_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Stopping after the current step...");
        interrupt_handle.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let job_id = new_job_id();
    let outcome = runner.run(&job_id, &options.request, None).await;

    if let (PaperOutcome::Completed { paper, .. }, Some(dir)) = (&outcome, &options.output_dir) {
        let latex = renderer.render(paper).context("Failed to render paper")?;
        match save_paper(dir, &job_id, paper, Some(&latex)) {
            Ok(saved) => {
                for path in std::iter::once(saved.json).chain(saved.latex) {
                    logger.log(&LogEvent::PaperSaved {
                        job_id: job_id.clone(),
                        path,
                    });
                }
            }
            Err(e) => warn!(job_id = %job_id, error = %e, "Failed to save paper"),
        }
    }

    if options.json_output {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    Ok(outcome.exit_code())
}

fn print_outcome(outcome: &PaperOutcome) {
    eprintln!();
    match outcome {
        PaperOutcome::Completed {
            paper,
            total_duration_secs,
        } => {
            if paper.metadata.all_accepted {
                eprintln!("=== SUCCESS ===");
            } else {
                eprintln!("=== COMPLETED WITH EXHAUSTED SECTIONS ===");
            }
            for summary in &paper.metadata.sections {
                let score = match (&summary.final_score, &summary.last_scored) {
                    (Some(e), _) => e.short_description(),
                    (None, Some(earlier)) => format!(
                        "unscored (iteration {} scored {})",
                        earlier.iteration,
                        earlier.evaluation.short_description()
                    ),
                    (None, None) => "unscored".to_string(),
                };
                eprintln!(
                    "  {}: {} after {} iteration(s), {}",
                    summary.name, summary.state, summary.iterations, score
                );
            }
            eprintln!("Total score: {}", fmt_score(paper.metadata.total_score));
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        PaperOutcome::Failed {
            failures,
            total_duration_secs,
            ..
        } => {
            eprintln!("=== FAILED ===");
            for failure in failures {
                eprintln!("  {}: {}", failure.section, failure.message);
            }
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        PaperOutcome::Cancelled {
            sections,
            total_duration_secs,
        } => {
            let finished = sections
                .iter()
                .filter(|s| s.state != SectionState::Cancelled)
                .count();
            eprintln!("=== CANCELLED ===");
            eprintln!(
                "{}/{} sections finished before cancellation",
                finished,
                sections.len()
            );
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
    }
}
