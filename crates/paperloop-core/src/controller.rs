use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use paperloop_critic::ReviewInput;
use paperloop_logging::{LogEvent, Logger};
use paperloop_writer::DraftRequest;

use crate::backend::ContentBackend;
use crate::error::LoopError;
use crate::request::LoopSettings;
use crate::section::{FailureKind, IterationRecord, SectionDraft, SectionState};

/// Called with a snapshot of the section after every state change
pub type SectionCallback = Arc<dyn Fn(&SectionDraft) + Send + Sync>;

/// Drives one section through the generate/evaluate/revise loop
pub struct RevisionController<'a> {
    backend: &'a dyn ContentBackend,
    logger: &'a Logger,
    settings: LoopSettings,
    cancelled: &'a AtomicBool,
    job_id: &'a str,
    on_update: Option<SectionCallback>,
}

impl<'a> RevisionController<'a> {
    pub fn new(
        backend: &'a dyn ContentBackend,
        logger: &'a Logger,
        settings: LoopSettings,
        cancelled: &'a AtomicBool,
        job_id: &'a str,
    ) -> Self {
        Self {
            backend,
            logger,
            settings,
            cancelled,
            job_id,
            on_update: None,
        }
    }

    pub fn with_callback(mut self, callback: Option<SectionCallback>) -> Self {
        self.on_update = callback;
        self
    }

    /// Run the loop until the section is terminal.
    ///
    /// Never returns a non-terminal draft: generation failures and internal
    /// errors are recorded on the draft as `Failed`.
    pub async fn run(&self, title: &str, mut draft: SectionDraft) -> SectionDraft {
        match self.drive(title, &mut draft).await {
            Ok(()) => {
                self.logger.log(&LogEvent::SectionFinished {
                    job_id: self.job_id.to_string(),
                    section: draft.name.clone(),
                    state: draft.state.to_string(),
                    iterations: draft.iterations,
                    aggregate: draft.final_score(),
                });
            }
            Err(LoopError::Generation { section, source }) => {
                warn!(section = %section, error = %source, "Section generation failed");
                self.logger.log(&LogEvent::SectionFailed {
                    job_id: self.job_id.to_string(),
                    section,
                    attempt: draft.iterations + 1,
                    error: source.to_string(),
                });
                draft.fail(FailureKind::GenerationFailure, source.to_string());
            }
            Err(e) => {
                warn!(section = %draft.name, error = %e, "Section loop aborted");
                self.logger.log(&LogEvent::SectionFailed {
                    job_id: self.job_id.to_string(),
                    section: draft.name.clone(),
                    attempt: draft.iterations + 1,
                    error: e.to_string(),
                });
                draft.fail(FailureKind::Internal, e.to_string());
            }
        }

        self.notify(&draft);
        draft
    }

    async fn drive(&self, title: &str, draft: &mut SectionDraft) -> Result<(), LoopError> {
        // Feedback from the most recent successful evaluation
        let mut feedback: Option<String> = None;

        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                info!(section = %draft.name, iterations = draft.iterations, "Section cancelled");
                draft.transition(SectionState::Cancelled)?;
                return Ok(());
            }

            let attempt = draft.iterations + 1;
            self.logger.log(&LogEvent::DraftStarted {
                job_id: self.job_id.to_string(),
                section: draft.name.clone(),
                attempt,
                revision: attempt > 1,
            });

            let started = Instant::now();
            let text = self
                .backend
                .generate(DraftRequest {
                    title,
                    section: &draft.name,
                    prior_feedback: feedback.as_deref(),
                })
                .await
                .map_err(|source| LoopError::Generation {
                    section: draft.name.clone(),
                    source,
                })?;

            self.logger.log(&LogEvent::DraftCompleted {
                job_id: self.job_id.to_string(),
                section: draft.name.clone(),
                attempt,
                chars: text.chars().count(),
                duration_secs: started.elapsed().as_secs_f64(),
            });

            draft.text = text;
            draft.transition(SectionState::Drafted)?;
            self.notify(draft);

            let review = self
                .backend
                .evaluate(ReviewInput {
                    title,
                    section: &draft.name,
                    text: &draft.text,
                })
                .await;
            draft.iterations = attempt;

            let mut record = IterationRecord {
                iteration: attempt,
                text: draft.text.clone(),
                prior_feedback: feedback.clone(),
                evaluation: None,
                evaluation_error: None,
                generated_at: Utc::now(),
            };

            match review {
                Ok(evaluation) => {
                    let accepted = evaluation.meets(self.settings.threshold);
                    self.logger.log(&LogEvent::EvaluationCompleted {
                        job_id: self.job_id.to_string(),
                        section: draft.name.clone(),
                        attempt,
                        aggregate: evaluation.aggregate,
                        summary: evaluation.short_description(),
                        accepted,
                    });
                    let next_feedback = evaluation.feedback.clone();
                    record.evaluation = Some(evaluation);
                    draft.history.push(record);
                    draft.transition(SectionState::Evaluated)?;

                    if accepted {
                        draft.transition(SectionState::Accepted)?;
                        return Ok(());
                    }
                    feedback = Some(next_feedback);
                }
                Err(e) => {
                    // Counts as a below-threshold attempt; prior feedback carries over
                    warn!(section = %draft.name, attempt, error = %e, "Evaluation failed");
                    self.logger.log(&LogEvent::EvaluationFailed {
                        job_id: self.job_id.to_string(),
                        section: draft.name.clone(),
                        attempt,
                        error: e.to_string(),
                    });
                    record.evaluation_error = Some(e.to_string());
                    draft.history.push(record);
                }
            }

            if draft.iterations >= self.settings.max_iterations {
                debug!(section = %draft.name, iterations = draft.iterations, "Iteration budget spent");
                draft.transition(SectionState::Exhausted)?;
                return Ok(());
            }

            draft.transition(SectionState::Revising)?;
            self.notify(draft);
        }
    }

    fn notify(&self, draft: &SectionDraft) {
        if let Some(ref callback) = self.on_update {
            callback(draft);
        }
    }
}
