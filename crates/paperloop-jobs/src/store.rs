use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

use paperloop_core::{Paper, PaperOutcome, PaperRequest, SectionDraft, SectionFailure};

use crate::types::{JobEvent, JobStatus, JobStatusView, JobSummary, SectionProgress};

/// Fresh job id: the first 8 hex characters of a v4 UUID
pub fn new_job_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Everything the registry knows about one job
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: String,
    pub request: PaperRequest,
    pub status: JobStatus,
    pub sections: Vec<SectionProgress>,
    pub failures: Vec<SectionFailure>,
    pub paper: Option<Paper>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancel: Arc<AtomicBool>,
}

impl JobRecord {
    pub fn new(id: String, request: PaperRequest, cancel: Arc<AtomicBool>) -> Self {
        let sections = request
            .sections
            .iter()
            .map(|name| SectionProgress::pending(name))
            .collect();
        Self {
            id,
            request,
            status: JobStatus::Pending,
            sections,
            failures: Vec::new(),
            paper: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            cancel,
        }
    }

    pub fn progress_text(&self) -> String {
        let finished = self.sections.iter().filter(|s| s.state.is_terminal()).count();
        let total = self.sections.len();
        match self.status {
            JobStatus::Pending => "Job queued".to_string(),
            JobStatus::Running => format!(
                "Generating paper content: {}/{} sections finished",
                finished, total
            ),
            JobStatus::Completed => {
                let accepted = self
                    .paper
                    .as_ref()
                    .map(|p| p.metadata.all_accepted)
                    .unwrap_or(false);
                if accepted {
                    "Paper generated; all sections accepted".to_string()
                } else {
                    "Paper generated; some sections exhausted their revision budget".to_string()
                }
            }
            JobStatus::Failed => {
                let names: Vec<&str> = self.failures.iter().map(|f| f.section.as_str()).collect();
                format!("Generation failed for: {}", names.join(", "))
            }
            JobStatus::Cancelled => format!("Cancelled after {}/{} sections finished", finished, total),
        }
    }

    pub fn view(&self) -> JobStatusView {
        JobStatusView {
            job_id: self.id.clone(),
            title: self.request.title.clone(),
            status: self.status,
            progress: self.progress_text(),
            sections: self.sections.clone(),
            failures: self.failures.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            job_id: self.id.clone(),
            title: self.request.title.clone(),
            status: self.status,
            sections: self.request.sections.len(),
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}

/// In-memory job registry. Created once at startup and shared by reference.
pub struct JobStore {
    jobs: RwLock<HashMap<String, JobRecord>>,
    tx: broadcast::Sender<JobEvent>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            jobs: RwLock::new(HashMap::new()),
            tx,
        }
    }

    /// Subscribe to job events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, JobRecord>> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, JobRecord>> {
        self.jobs.write().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: JobEvent) {
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    /// Register a new job under a fresh 8-character id
    pub fn create(&self, request: PaperRequest, cancel: Arc<AtomicBool>) -> String {
        let title = request.title.clone();
        let id = {
            let mut jobs = self.write();
            let id = loop {
                let candidate = new_job_id();
                if !jobs.contains_key(&candidate) {
                    break candidate;
                }
            };
            jobs.insert(id.clone(), JobRecord::new(id.clone(), request, cancel));
            id
        };

        self.emit(JobEvent::JobSubmitted {
            job_id: id.clone(),
            title,
        });
        id
    }

    pub fn get(&self, id: &str) -> Option<JobRecord> {
        self.read().get(id).cloned()
    }

    pub fn view(&self, id: &str) -> Option<JobStatusView> {
        self.read().get(id).map(JobRecord::view)
    }

    /// All jobs, newest first
    pub fn list(&self) -> Vec<JobSummary> {
        let mut summaries: Vec<JobSummary> = self.read().values().map(JobRecord::summary).collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Most recently completed job that produced a paper
    pub fn latest_completed(&self) -> Option<(String, Paper)> {
        self.read()
            .values()
            .filter(|r| r.status == JobStatus::Completed)
            .filter_map(|r| r.paper.as_ref().map(|p| (r.completed_at, r.id.clone(), p)))
            .max_by_key(|(completed_at, _, _)| *completed_at)
            .map(|(_, id, paper)| (id, paper.clone()))
    }

    pub fn mark_running(&self, id: &str) {
        if let Some(record) = self.write().get_mut(id) {
            record.status = JobStatus::Running;
            record.started_at = Some(Utc::now());
        }
    }

    /// Replace one section's progress as a whole record
    pub fn update_section(&self, id: &str, draft: &SectionDraft) {
        let progress = SectionProgress::from(draft);
        {
            let mut jobs = self.write();
            let Some(record) = jobs.get_mut(id) else {
                return;
            };
            if let Some(slot) = record.sections.get_mut(draft.index) {
                *slot = progress.clone();
            }
        }

        self.emit(JobEvent::SectionUpdated {
            job_id: id.to_string(),
            section: progress.name,
            state: progress.state,
            iterations: progress.iterations,
            last_score: progress.last_score,
        });
    }

    /// Record a job's final outcome
    pub fn finish(&self, id: &str, outcome: &PaperOutcome) {
        let status = match outcome {
            PaperOutcome::Completed { .. } => JobStatus::Completed,
            PaperOutcome::Failed { .. } => JobStatus::Failed,
            PaperOutcome::Cancelled { .. } => JobStatus::Cancelled,
        };

        {
            let mut jobs = self.write();
            let Some(record) = jobs.get_mut(id) else {
                return;
            };
            record.status = status;
            record.sections = outcome.sections().iter().map(SectionProgress::from).collect();
            record.paper = outcome.paper().cloned();
            if let PaperOutcome::Failed { failures, .. } = outcome {
                record.failures = failures.clone();
            }
            record.completed_at = Some(Utc::now());
        }

        self.emit(JobEvent::JobFinished {
            job_id: id.to_string(),
            status,
        });
    }

    /// Drop finished jobs that completed more than `retention` before `now`.
    /// Returns how many were removed.
    pub fn evict_expired(&self, retention: Duration, now: DateTime<Utc>) -> usize {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        let cutoff = now - retention;

        let mut jobs = self.write();
        let before = jobs.len();
        jobs.retain(|_, record| {
            !(record.status.is_finished()
                && record.completed_at.is_some_and(|done| done < cutoff))
        });
        let removed = before - jobs.len();
        if removed > 0 {
            debug!(removed, "Evicted expired jobs");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
