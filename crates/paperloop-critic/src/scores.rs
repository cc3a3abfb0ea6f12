use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Upper bound of each sub-score
pub const MAX_SUB_SCORE: f64 = 10.0;
/// Upper bound of the aggregate (four criteria)
pub const MAX_AGGREGATE: f64 = 4.0 * MAX_SUB_SCORE;

const CRITERIA: [&str; 4] = ["RELEVANCE", "COHERENCE", "FACTUALITY", "READABILITY"];

/// The four criteria a section is scored on, each in [0, 10]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub relevance: f64,
    pub coherence: f64,
    pub factuality: f64,
    pub readability: f64,
}

impl SubScores {
    pub fn new(relevance: f64, coherence: f64, factuality: f64, readability: f64) -> Self {
        Self {
            relevance,
            coherence,
            factuality,
            readability,
        }
    }

    /// Same score on every criterion
    pub fn uniform(score: f64) -> Self {
        Self::new(score, score, score, score)
    }

    pub fn aggregate(&self) -> f64 {
        self.relevance + self.coherence + self.factuality + self.readability
    }

    /// Clamp every criterion into [0, 10]; the flag reports whether anything moved
    pub fn clamped(self) -> (Self, bool) {
        let clamp = |v: f64| v.clamp(0.0, MAX_SUB_SCORE);
        let clamped = Self::new(
            clamp(self.relevance),
            clamp(self.coherence),
            clamp(self.factuality),
            clamp(self.readability),
        );
        (clamped, clamped != self)
    }

    fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("relevance", self.relevance),
            ("coherence", self.coherence),
            ("factuality", self.factuality),
            ("readability", self.readability),
        ]
    }
}

/// Scores and feedback produced by one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub scores: SubScores,
    /// Sum of the four sub-scores, in [0, 40]
    pub aggregate: f64,
    pub feedback: String,
}

#[derive(Error, Debug)]
pub enum ScoreParseError {
    #[error("Evaluator response is missing a {0} score")]
    MissingScore(&'static str),

    #[error("Evaluator response has a non-numeric {criterion} score: {value}")]
    NotNumeric {
        criterion: &'static str,
        value: String,
    },
}

impl EvaluationResult {
    /// Build a result from raw scores. Out-of-range scores are clamped and the
    /// aggregate is always recomputed from the clamped values.
    pub fn new(scores: SubScores, feedback: impl Into<String>) -> Self {
        let (scores, was_clamped) = scores.clamped();
        if was_clamped {
            warn!(?scores, "Clamped out-of-range evaluator scores");
        }
        Self {
            aggregate: scores.aggregate(),
            scores,
            feedback: feedback.into(),
        }
    }

    pub fn meets(&self, threshold: f64) -> bool {
        self.aggregate >= threshold
    }

    /// Parse an evaluator response of the form
    ///
    /// ```text
    /// RELEVANCE: 8
    /// COHERENCE: 7
    /// FACTUALITY: 9
    /// READABILITY: 8
    /// TOTAL: 32
    /// FEEDBACK: ...
    /// ```
    ///
    /// All four criteria are required. `TOTAL` is ignored.
    pub fn parse(output: &str) -> Result<Self, ScoreParseError> {
        debug!(output_len = output.len(), "Parsing evaluator response");

        let mut values = [0.0; 4];
        for (slot, criterion) in values.iter_mut().zip(CRITERIA) {
            *slot = extract_score(output, criterion)?;
        }
        let scores = SubScores::new(values[0], values[1], values[2], values[3]);

        let feedback = match extract_feedback(output) {
            Some(feedback) => feedback,
            None => fallback_feedback(output, &scores),
        };

        Ok(Self::new(scores, feedback))
    }

    /// Short description for logs, e.g. `31/40 (R8 C7 F8 Rd8)`
    pub fn short_description(&self) -> String {
        format!(
            "{}/{} (R{} C{} F{} Rd{})",
            fmt_score(self.aggregate),
            fmt_score(MAX_AGGREGATE),
            fmt_score(self.scores.relevance),
            fmt_score(self.scores.coherence),
            fmt_score(self.scores.factuality),
            fmt_score(self.scores.readability),
        )
    }
}

/// Integers print without a fraction, everything else with one decimal
pub fn fmt_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{:.0}", score)
    } else {
        format!("{:.1}", score)
    }
}

/// Per-criterion patterns: a numeric score after the label (optionally in
/// brackets), and the bare label with whatever token follows it.
struct ScorePatterns {
    criterion: &'static str,
    numeric: Regex,
    label: Regex,
}

fn score_patterns(criterion: &str) -> Option<&'static ScorePatterns> {
    static PATTERNS: OnceLock<Vec<ScorePatterns>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        CRITERIA
            .iter()
            .map(|&c| {
                let label = format!(r"(?i)\b{}\b[\s*_]*:[\s*_]*", c);
                ScorePatterns {
                    criterion: c,
                    numeric: Regex::new(&format!(r"{}\[?\s*(-?\d+(?:\.\d+)?)", label))
                        .expect("static score pattern"),
                    label: Regex::new(&format!(r"{}(\S*)", label)).expect("static score pattern"),
                }
            })
            .collect()
    });
    patterns.iter().find(|p| p.criterion == criterion)
}

/// First numeric occurrence of the criterion wins. Occurrences without a
/// number (echoed instructions, placeholders) are skipped.
fn extract_score(output: &str, criterion: &'static str) -> Result<f64, ScoreParseError> {
    let patterns = score_patterns(criterion).ok_or(ScoreParseError::MissingScore(criterion))?;

    let score = patterns
        .numeric
        .captures_iter(output)
        .filter_map(|c| c[1].parse::<f64>().ok())
        .find(|v| v.is_finite());
    if let Some(score) = score {
        return Ok(score);
    }

    match patterns.label.captures(output) {
        Some(c) => Err(ScoreParseError::NotNumeric {
            criterion,
            value: c[1].to_string(),
        }),
        None => Err(ScoreParseError::MissingScore(criterion)),
    }
}

fn extract_feedback(output: &str) -> Option<String> {
    static FEEDBACK: OnceLock<Regex> = OnceLock::new();
    let re = FEEDBACK.get_or_init(|| {
        Regex::new(r"(?is)\bFEEDBACK\b[\s*_]*:[\s*_]*(.*)").expect("static feedback pattern")
    });
    re.captures(output)
        .map(|c| c[1].trim().to_string())
        .filter(|f| !f.is_empty())
}

/// Feedback for responses that omit the FEEDBACK field: any prose outside the
/// score lines, otherwise a note naming the weakest criteria.
fn fallback_feedback(output: &str, scores: &SubScores) -> String {
    let prose: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let upper = line.to_uppercase();
            !CRITERIA.iter().any(|c| upper.contains(c)) && !upper.contains("TOTAL")
        })
        .collect();

    if !prose.is_empty() {
        let joined = prose.join("\n");
        return if joined.chars().count() > 500 {
            format!("{}...", joined.chars().take(500).collect::<String>())
        } else {
            joined
        };
    }

    let mut named = scores.named();
    named.sort_by(|a, b| a.1.total_cmp(&b.1));
    let weakest: Vec<String> = named
        .iter()
        .take(2)
        .map(|(name, score)| format!("{} ({})", name, fmt_score(*score)))
        .collect();
    format!(
        "No written feedback was returned. Lowest-scoring criteria: {}.",
        weakest.join(", ")
    )
}
