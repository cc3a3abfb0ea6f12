use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use paperloop_core::{
    ContentBackend, LoopSettings, PaperOutcome, PaperRequest, PaperRunner, SectionCallback,
    SectionDraft, ValidationError,
};
use paperloop_latex::{LatexRenderer, RenderError};
use paperloop_logging::{LogEvent, Logger};

use crate::output::save_paper;
use crate::store::JobStore;
use crate::types::{JobResult, JobStatus, JobStatusView, JobSummary, ResultFormat};

const MIN_EVICTION_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Job {0} not found")]
    NotFound(String),

    #[error("Job {id} is not completed yet. Current status: {status}")]
    NotReady { id: String, status: JobStatus },

    #[error("No completed paper available yet")]
    NoCompletedPaper,

    #[error("Failed to render paper: {0}")]
    Render(#[from] RenderError),
}

/// Accepts paper requests, runs them in the background and serves their results
pub struct JobService {
    store: Arc<JobStore>,
    backend: Arc<dyn ContentBackend>,
    logger: Arc<Logger>,
    settings: LoopSettings,
    renderer: LatexRenderer,
    output_dir: Option<PathBuf>,
}

impl JobService {
    pub fn new(backend: Arc<dyn ContentBackend>, logger: Arc<Logger>, settings: LoopSettings) -> Self {
        Self {
            store: Arc::new(JobStore::new()),
            backend,
            logger,
            settings,
            renderer: LatexRenderer::default(),
            output_dir: None,
        }
    }

    pub fn with_renderer(mut self, renderer: LatexRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Also write every completed paper into `dir`
    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// Validate and enqueue a request. Must be called within a tokio runtime.
    pub fn submit_job(&self, request: PaperRequest) -> Result<String, JobError> {
        request.validate()?;

        let runner = PaperRunner::new(self.backend.clone(), self.logger.clone(), self.settings);
        let job_id = self.store.create(request.clone(), runner.interrupt_handle());
        info!(job_id = %job_id, title = %request.title, "Job submitted");

        let store = self.store.clone();
        let logger = self.logger.clone();
        let renderer = self.renderer.clone();
        let output_dir = self.output_dir.clone();
        let id = job_id.clone();

        tokio::spawn(async move {
            store.mark_running(&id);

            let callback_store = store.clone();
            let callback_id = id.clone();
            let on_update: SectionCallback = Arc::new(move |draft: &SectionDraft| {
                callback_store.update_section(&callback_id, draft);
            });

            let outcome = runner.run(&id, &request, Some(on_update)).await;

            if let (PaperOutcome::Completed { paper, .. }, Some(dir)) = (&outcome, &output_dir) {
                let latex = match renderer.render(paper) {
                    Ok(latex) => Some(latex),
                    Err(e) => {
                        warn!(job_id = %id, error = %e, "Failed to render completed paper");
                        None
                    }
                };
                match save_paper(dir, &id, paper, latex.as_deref()) {
                    Ok(saved) => {
                        for path in std::iter::once(saved.json).chain(saved.latex) {
                            logger.log(&LogEvent::PaperSaved {
                                job_id: id.clone(),
                                path,
                            });
                        }
                    }
                    Err(e) => warn!(job_id = %id, error = %e, "Failed to save paper"),
                }
            }

            store.finish(&id, &outcome);
        });

        Ok(job_id)
    }

    pub fn get_status(&self, job_id: &str) -> Result<JobStatusView, JobError> {
        self.store
            .view(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    pub fn get_result(&self, job_id: &str, format: ResultFormat) -> Result<JobResult, JobError> {
        let record = self
            .store
            .get(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        match (record.status, record.paper) {
            (JobStatus::Completed, Some(paper)) => self.format_result(paper, format),
            (status, _) => Err(JobError::NotReady {
                id: job_id.to_string(),
                status,
            }),
        }
    }

    /// Result of the most recently completed job
    pub fn latest_completed(&self, format: ResultFormat) -> Result<(String, JobResult), JobError> {
        let (id, paper) = self
            .store
            .latest_completed()
            .ok_or(JobError::NoCompletedPaper)?;
        Ok((id, self.format_result(paper, format)?))
    }

    fn format_result(
        &self,
        paper: paperloop_core::Paper,
        format: ResultFormat,
    ) -> Result<JobResult, JobError> {
        match format {
            ResultFormat::Structured => Ok(JobResult::Structured(paper)),
            ResultFormat::Rendered => Ok(JobResult::Rendered(self.renderer.render(&paper)?)),
        }
    }

    /// Request cancellation. Sections stop at their next step boundary.
    pub fn cancel(&self, job_id: &str) -> Result<JobStatusView, JobError> {
        let record = self
            .store
            .get(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        if !record.status.is_finished() {
            info!(job_id, "Cancellation requested");
            record.cancel.store(true, Ordering::SeqCst);
        }
        Ok(record.view())
    }

    pub fn list(&self) -> Vec<JobSummary> {
        self.store.list()
    }

    /// Periodically evict finished jobs older than `retention`
    pub fn spawn_eviction(&self, retention: Duration) -> JoinHandle<()> {
        let store = self.store.clone();
        let period = (retention / 4).max(MIN_EVICTION_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.evict_expired(retention, chrono::Utc::now());
                if removed > 0 {
                    info!(removed, "Evicted finished jobs past retention");
                }
            }
        })
    }
}
