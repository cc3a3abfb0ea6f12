use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use paperloop_logging::{LogEvent, Logger};

use crate::backend::ContentBackend;
use crate::controller::{RevisionController, SectionCallback};
use crate::outcome::PaperOutcome;
use crate::paper::Paper;
use crate::request::{LoopSettings, PaperRequest};
use crate::section::{FailureKind, SectionDraft, SectionFailure, SectionState};

/// Runs every section of a paper through the revision loop with bounded concurrency
pub struct PaperRunner {
    backend: Arc<dyn ContentBackend>,
    logger: Arc<Logger>,
    settings: LoopSettings,
    interrupted: Arc<AtomicBool>,
}

impl PaperRunner {
    pub fn new(backend: Arc<dyn ContentBackend>, logger: Arc<Logger>, settings: LoopSettings) -> Self {
        Self {
            backend,
            logger,
            settings,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a handle to signal cancellation
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// Run a validated request to completion.
    ///
    /// Sections run independently; a failure in one never stops its siblings.
    pub async fn run(
        &self,
        job_id: &str,
        request: &PaperRequest,
        on_update: Option<SectionCallback>,
    ) -> PaperOutcome {
        let started = Instant::now();
        let settings = self.settings.for_request(request);
        let title = request.title.trim().to_string();

        self.logger.log(&LogEvent::JobStarted {
            job_id: job_id.to_string(),
            title: title.clone(),
            sections: request.sections.clone(),
            threshold: settings.threshold,
            max_iterations: settings.max_iterations,
        });

        let semaphore = Arc::new(Semaphore::new(settings.concurrency));
        let mut tasks = JoinSet::new();

        for (index, name) in request.sections.iter().enumerate() {
            let backend = self.backend.clone();
            let logger = self.logger.clone();
            let interrupted = self.interrupted.clone();
            let semaphore = semaphore.clone();
            let callback = on_update.clone();
            let title = title.clone();
            let job_id = job_id.to_string();
            let draft = SectionDraft::new(index, name.trim());

            tasks.spawn(async move {
                // The semaphore is never closed, so acquisition only waits
                let _permit = semaphore.acquire_owned().await.ok();
                RevisionController::new(
                    backend.as_ref(),
                    &logger,
                    settings,
                    &interrupted,
                    &job_id,
                )
                .with_callback(callback)
                .run(&title, draft)
                .await
            });
        }

        let mut finished: Vec<Option<SectionDraft>> = vec![None; request.sections.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(draft) => {
                    let index = draft.index;
                    finished[index] = Some(draft);
                }
                Err(e) => warn!(error = %e, "Section task did not complete"),
            }
        }

        let sections: Vec<SectionDraft> = finished
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    let mut draft = SectionDraft::new(index, request.sections[index].trim());
                    draft.fail(FailureKind::Internal, "section task aborted");
                    draft
                })
            })
            .collect();

        let duration = started.elapsed();
        let failures: Vec<SectionFailure> =
            sections.iter().filter_map(|s| s.failure.clone()).collect();

        let outcome = if !failures.is_empty() {
            PaperOutcome::failed(failures, sections, duration)
        } else if sections.iter().any(|s| s.state == SectionState::Cancelled) {
            PaperOutcome::cancelled(sections, duration)
        } else {
            PaperOutcome::completed(Paper::assemble(title, sections, &settings), duration)
        };

        info!(job_id, status = outcome.status(), "Paper job finished");
        self.logger.log(&LogEvent::JobFinished {
            job_id: job_id.to_string(),
            status: outcome.status().to_string(),
            duration_secs: duration.as_secs_f64(),
        });

        outcome
    }
}
