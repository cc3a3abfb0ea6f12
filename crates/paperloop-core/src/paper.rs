use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paperloop_critic::EvaluationResult;

use crate::request::LoopSettings;
use crate::section::{SectionDraft, SectionState};

/// Per-section generation summary carried in the paper metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub name: String,
    pub state: SectionState,
    pub iterations: usize,
    pub final_score: Option<EvaluationResult>,
    /// Latest successful evaluation when the final one failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scored: Option<ScoredIteration>,
}

/// An evaluation of an earlier draft of a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredIteration {
    pub iteration: usize,
    pub evaluation: EvaluationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub threshold: f64,
    pub max_iterations: usize,
    pub sections: Vec<SectionSummary>,
    /// Sum of the final aggregates of every scored section
    pub total_score: f64,
    pub all_accepted: bool,
    pub generated_at: DateTime<Utc>,
}

/// A finished paper: every section terminal, in request order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub sections: Vec<SectionDraft>,
    pub metadata: PaperMetadata,
}

impl Paper {
    /// Assemble a paper from finalized sections, ordering them by request position
    pub fn assemble(
        title: impl Into<String>,
        mut sections: Vec<SectionDraft>,
        settings: &LoopSettings,
    ) -> Self {
        sections.sort_by_key(|s| s.index);

        let summaries: Vec<SectionSummary> = sections
            .iter()
            .map(|s| SectionSummary {
                name: s.name.clone(),
                state: s.state,
                iterations: s.iterations,
                final_score: s.last_evaluation().cloned(),
                last_scored: match s.last_evaluation() {
                    Some(_) => None,
                    None => s.last_scored().map(|(iteration, e)| ScoredIteration {
                        iteration,
                        evaluation: e.clone(),
                    }),
                },
            })
            .collect();

        let total_score = sections.iter().filter_map(|s| s.final_score()).sum();
        let all_accepted = sections.iter().all(|s| s.state == SectionState::Accepted);

        Self {
            title: title.into(),
            sections,
            metadata: PaperMetadata {
                threshold: settings.threshold,
                max_iterations: settings.max_iterations,
                sections: summaries,
                total_score,
                all_accepted,
                generated_at: Utc::now(),
            },
        }
    }

    /// Look up a section by name, ignoring case and surrounding whitespace
    pub fn section(&self, name: &str) -> Option<&SectionDraft> {
        let wanted = name.trim();
        self.sections
            .iter()
            .find(|s| s.name.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn exhausted_sections(&self) -> impl Iterator<Item = &SectionDraft> {
        self.sections
            .iter()
            .filter(|s| s.state == SectionState::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperloop_critic::SubScores;

    fn finished(index: usize, name: &str, state: SectionState, score: f64) -> SectionDraft {
        let mut draft = SectionDraft::new(index, name);
        draft.text = format!("{} text", name);
        draft.iterations = 1;
        draft.state = state;
        draft.history.push(crate::IterationRecord {
            iteration: 1,
            text: draft.text.clone(),
            prior_feedback: None,
            evaluation: Some(EvaluationResult::new(SubScores::uniform(score), "ok")),
            evaluation_error: None,
            generated_at: Utc::now(),
        });
        draft
    }

    #[test]
    fn test_assemble_restores_request_order() {
        let paper = Paper::assemble(
            "T",
            vec![
                finished(1, "Methods", SectionState::Accepted, 9.0),
                finished(0, "Abstract", SectionState::Accepted, 8.0),
            ],
            &LoopSettings::default(),
        );
        let names: Vec<_> = paper.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Abstract", "Methods"]);
        assert_eq!(paper.metadata.total_score, 68.0);
        assert!(paper.metadata.all_accepted);
    }

    #[test]
    fn test_failed_final_evaluation_keeps_earlier_score() {
        let mut draft = finished(0, "Results", SectionState::Exhausted, 7.0);
        draft.iterations = 2;
        draft.history.push(crate::IterationRecord {
            iteration: 2,
            text: "Results text v2".into(),
            prior_feedback: Some("ok".into()),
            evaluation: None,
            evaluation_error: Some("evaluator timed out".into()),
            generated_at: Utc::now(),
        });

        let paper = Paper::assemble("T", vec![draft], &LoopSettings::default());
        let summary = &paper.metadata.sections[0];
        assert!(summary.final_score.is_none());
        let earlier = summary.last_scored.as_ref().unwrap();
        assert_eq!(earlier.iteration, 1);
        assert_eq!(earlier.evaluation.aggregate, 28.0);
        assert_eq!(paper.metadata.total_score, 0.0);
    }

    #[test]
    fn test_scored_final_evaluation_has_no_earlier_score() {
        let paper = Paper::assemble(
            "T",
            vec![finished(0, "Abstract", SectionState::Accepted, 9.0)],
            &LoopSettings::default(),
        );
        assert!(paper.metadata.sections[0].last_scored.is_none());
    }

    #[test]
    fn test_exhausted_section_clears_all_accepted() {
        let paper = Paper::assemble(
            "T",
            vec![finished(0, "Abstract", SectionState::Exhausted, 2.5)],
            &LoopSettings::default(),
        );
        assert!(!paper.metadata.all_accepted);
        assert_eq!(paper.exhausted_sections().count(), 1);
        assert!(paper.section(" abstract ").is_some());
    }
}
