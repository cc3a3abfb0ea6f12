pub mod evaluator;
mod prompts;
mod scores;

pub use evaluator::{EvaluationError, ReviewInput, SectionEvaluator};
pub use prompts::ReviewPrompts;
pub use scores::{
    fmt_score, EvaluationResult, ScoreParseError, SubScores, MAX_AGGREGATE, MAX_SUB_SCORE,
};
