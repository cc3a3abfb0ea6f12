use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use paperloop_core::{
    ContentBackend, FailureKind, LoopSettings, PaperOutcome, PaperRequest, PaperRunner,
    RevisionController, SectionCallback, SectionDraft, SectionState,
};
use paperloop_critic::{EvaluationError, EvaluationResult, ReviewInput, SubScores};
use paperloop_logging::Logger;
use paperloop_writer::{DraftRequest, GenerationError};

/// One scripted evaluation: a uniform sub-score, or a failure
#[derive(Clone, Copy)]
enum Review {
    Score(f64),
    Fail,
}

/// Backend that replays per-section scripts and records what it was asked
#[derive(Default)]
struct ScriptedBackend {
    reviews: Mutex<HashMap<String, VecDeque<Review>>>,
    default_score: f64,
    fail_generate_on: HashMap<String, usize>,
    generate_calls: Mutex<HashMap<String, usize>>,
    feedback_seen: Mutex<Vec<(String, Option<String>)>>,
    cancel_on_first_generate: OnceLock<Arc<AtomicBool>>,
}

impl ScriptedBackend {
    fn scoring(score: f64) -> Self {
        Self {
            default_score: score,
            ..Default::default()
        }
    }

    fn with_reviews(self, section: &str, reviews: &[Review]) -> Self {
        self.reviews
            .lock()
            .unwrap()
            .insert(section.to_string(), reviews.iter().copied().collect());
        self
    }

    fn failing_generate(mut self, section: &str, call: usize) -> Self {
        self.fail_generate_on.insert(section.to_string(), call);
        self
    }

    fn feedback_for(&self, section: &str) -> Vec<Option<String>> {
        self.feedback_seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == section)
            .map(|(_, f)| f.clone())
            .collect()
    }
}

#[async_trait]
impl ContentBackend for ScriptedBackend {
    async fn generate(&self, request: DraftRequest<'_>) -> Result<String, GenerationError> {
        let call = {
            let mut calls = self.generate_calls.lock().unwrap();
            let count = calls.entry(request.section.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        self.feedback_seen.lock().unwrap().push((
            request.section.to_string(),
            request.prior_feedback.map(str::to_string),
        ));

        if let Some(flag) = self.cancel_on_first_generate.get() {
            flag.store(true, Ordering::SeqCst);
        }
        if self.fail_generate_on.get(request.section) == Some(&call) {
            return Err(GenerationError::AgentError("backend unavailable".into()));
        }
        Ok(format!("{} draft {}", request.section, call))
    }

    async fn evaluate(&self, input: ReviewInput<'_>) -> Result<EvaluationResult, EvaluationError> {
        let review = self
            .reviews
            .lock()
            .unwrap()
            .get_mut(input.section)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Review::Score(self.default_score));

        match review {
            Review::Score(score) => Ok(EvaluationResult::new(
                SubScores::uniform(score),
                format!("Improve: {}", input.text),
            )),
            Review::Fail => Err(EvaluationError::EmptyResponse),
        }
    }
}

fn request(sections: &[&str]) -> PaperRequest {
    PaperRequest::new(
        "Protein Folding",
        sections.iter().map(|s| s.to_string()).collect(),
    )
}

fn runner(backend: Arc<ScriptedBackend>, settings: LoopSettings) -> PaperRunner {
    PaperRunner::new(backend, Arc::new(Logger::silent()), settings)
}

async fn run_section(backend: &ScriptedBackend, settings: LoopSettings, name: &str) -> SectionDraft {
    let logger = Logger::silent();
    let cancelled = AtomicBool::new(false);
    RevisionController::new(backend, &logger, settings, &cancelled, "test0001")
        .run("Protein Folding", SectionDraft::new(0, name))
        .await
}

#[tokio::test]
async fn test_accepts_on_first_attempt() {
    let backend = Arc::new(ScriptedBackend::scoring(9.0));
    let outcome = runner(backend, LoopSettings::default())
        .run("test0001", &request(&["Abstract", "References"]), None)
        .await;

    let paper = outcome.paper().expect("job should complete");
    for section in &paper.sections {
        assert_eq!(section.state, SectionState::Accepted);
        assert_eq!(section.iterations, 1);
        assert_eq!(section.final_score(), Some(36.0));
    }
    assert!(paper.metadata.all_accepted);
    assert_eq!(outcome.exit_code(), 0);
}

#[tokio::test]
async fn test_exhausts_budget_and_keeps_last_draft() {
    let backend = ScriptedBackend::scoring(2.5);
    let settings = LoopSettings::default().with_max_iterations(3);

    let draft = run_section(&backend, settings, "Abstract").await;

    assert_eq!(draft.state, SectionState::Exhausted);
    assert_eq!(draft.iterations, 3);
    assert_eq!(draft.text, "Abstract draft 3");
    assert_eq!(draft.final_score(), Some(10.0));
    assert_eq!(draft.history.len(), 3);
}

#[tokio::test]
async fn test_exhausted_sections_still_complete_the_job() {
    let backend = Arc::new(ScriptedBackend::scoring(2.5));
    let outcome = runner(backend, LoopSettings::default().with_max_iterations(2))
        .run("test0001", &request(&["Abstract"]), None)
        .await;

    assert_eq!(outcome.status(), "completed");
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn test_feedback_is_passed_verbatim_to_the_next_draft() {
    let backend = ScriptedBackend::scoring(9.0)
        .with_reviews("Methods", &[Review::Score(5.0), Review::Score(9.0)]);

    let draft = run_section(&backend, LoopSettings::default(), "Methods").await;

    assert_eq!(draft.state, SectionState::Accepted);
    assert_eq!(draft.iterations, 2);
    assert_eq!(
        backend.feedback_for("Methods"),
        vec![None, Some("Improve: Methods draft 1".to_string())]
    );
    assert_eq!(
        draft.history[1].prior_feedback.as_deref(),
        Some("Improve: Methods draft 1")
    );
}

#[tokio::test]
async fn test_generation_failure_fails_only_that_section() {
    let backend = Arc::new(
        ScriptedBackend::scoring(9.0)
            .with_reviews("Methods", &[Review::Score(5.0)])
            .failing_generate("Methods", 2),
    );
    let outcome = runner(backend, LoopSettings::default())
        .run("test0001", &request(&["Abstract", "Methods"]), None)
        .await;

    match &outcome {
        PaperOutcome::Failed {
            failures, sections, ..
        } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].section, "Methods");
            assert_eq!(failures[0].kind, FailureKind::GenerationFailure);
            assert_eq!(sections[0].state, SectionState::Accepted);
            assert_eq!(sections[1].state, SectionState::Failed);
            // The failed call leaves the previous draft in place
            assert_eq!(sections[1].text, "Methods draft 1");
        }
        other => panic!("expected failure, got {}", other.status()),
    }
    assert_eq!(outcome.exit_code(), 2);
}

#[tokio::test]
async fn test_evaluation_failure_consumes_a_slot() {
    let backend =
        ScriptedBackend::scoring(9.0).with_reviews("Results", &[Review::Fail, Review::Fail]);
    let settings = LoopSettings::default().with_max_iterations(2);

    let draft = run_section(&backend, settings, "Results").await;

    assert_eq!(draft.state, SectionState::Exhausted);
    assert_eq!(draft.iterations, 2);
    assert!(draft.failure.is_none());
    assert!(draft.final_score().is_none());
    assert!(draft
        .history
        .iter()
        .all(|r| r.evaluation.is_none() && r.evaluation_error.is_some()));
}

#[tokio::test]
async fn test_evaluation_failure_reuses_last_feedback() {
    let backend = ScriptedBackend::scoring(9.0).with_reviews(
        "Results",
        &[Review::Score(4.0), Review::Fail, Review::Score(9.0)],
    );

    let draft = run_section(&backend, LoopSettings::default(), "Results").await;

    assert_eq!(draft.state, SectionState::Accepted);
    assert_eq!(draft.iterations, 3);
    let first_feedback = Some("Improve: Results draft 1".to_string());
    assert_eq!(
        backend.feedback_for("Results"),
        vec![None, first_feedback.clone(), first_feedback]
    );
}

#[tokio::test]
async fn test_failed_final_evaluation_keeps_last_scored_draft_visible() {
    let backend = ScriptedBackend::scoring(9.0)
        .with_reviews("Results", &[Review::Score(5.0), Review::Fail]);
    let settings = LoopSettings::default().with_max_iterations(2);

    let draft = run_section(&backend, settings, "Results").await;

    assert_eq!(draft.state, SectionState::Exhausted);
    assert!(draft.final_score().is_none());
    let (iteration, evaluation) = draft.last_scored().unwrap();
    assert_eq!(iteration, 1);
    assert_eq!(evaluation.aggregate, 20.0);
}

#[tokio::test]
async fn test_iterations_stay_within_budget() {
    for max in 1..=4 {
        let backend = ScriptedBackend::scoring(1.0);
        let settings = LoopSettings::default().with_max_iterations(max);
        let draft = run_section(&backend, settings, "Discussion").await;
        assert_eq!(draft.iterations, max);
        assert_eq!(draft.history.len(), max);
    }
}

#[tokio::test]
async fn test_request_overrides_apply_per_job() {
    let backend = Arc::new(ScriptedBackend::scoring(7.0));
    let job = request(&["Abstract"]).with_threshold(28.0);
    let outcome = runner(backend, LoopSettings::default())
        .run("test0001", &job, None)
        .await;

    let paper = outcome.paper().expect("job should complete");
    assert_eq!(paper.sections[0].state, SectionState::Accepted);
    assert_eq!(paper.metadata.threshold, 28.0);
}

#[tokio::test]
async fn test_cancellation_stops_at_step_boundary() {
    let backend = Arc::new(ScriptedBackend::scoring(1.0));
    let runner = runner(
        backend.clone(),
        LoopSettings::default().with_concurrency(1),
    );
    backend
        .cancel_on_first_generate
        .set(runner.interrupt_handle())
        .unwrap();

    let outcome = runner
        .run("test0001", &request(&["Abstract", "Methods"]), None)
        .await;

    assert_eq!(outcome.status(), "cancelled");
    assert_eq!(outcome.exit_code(), 130);

    let sections = outcome.sections();
    assert!(sections.iter().all(|s| s.state == SectionState::Cancelled));

    // The pair in flight completed and was recorded
    let started: Vec<_> = sections.iter().filter(|s| s.iterations > 0).collect();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].history.len(), 1);
    assert!(started[0].history[0].evaluation.is_some());
}

#[tokio::test]
async fn test_callback_sees_every_state_change() {
    let backend = Arc::new(
        ScriptedBackend::scoring(9.0).with_reviews("Abstract", &[Review::Score(3.0)]),
    );
    let seen: Arc<Mutex<Vec<SectionState>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: SectionCallback = Arc::new(move |draft: &SectionDraft| {
        sink.lock().unwrap().push(draft.state);
    });

    runner(backend, LoopSettings::default())
        .run("test0001", &request(&["Abstract"]), Some(callback))
        .await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            SectionState::Drafted,
            SectionState::Revising,
            SectionState::Drafted,
            SectionState::Accepted,
        ]
    );
}
