//! # paperloop-core
//!
//! Orchestration of the generate/evaluate/revise loop.
//!
//! Each section of a [`PaperRequest`] is driven by a [`RevisionController`]
//! through the [`SectionState`] machine until it is accepted, exhausts its
//! iteration budget, fails, or is cancelled. [`PaperRunner`] runs the sections
//! of one job with bounded concurrency and assembles the [`Paper`].

mod backend;
mod controller;
mod error;
mod outcome;
mod paper;
mod request;
mod runner;
mod section;

pub use backend::{AgentBackend, ContentBackend};
pub use controller::{RevisionController, SectionCallback};
pub use error::LoopError;
pub use outcome::PaperOutcome;
pub use paper::{Paper, PaperMetadata, ScoredIteration, SectionSummary};
pub use request::{
    LoopSettings, PaperRequest, ValidationError, DEFAULT_CONCURRENCY, DEFAULT_MAX_ITERATIONS,
    DEFAULT_THRESHOLD,
};
pub use runner::PaperRunner;
pub use section::{FailureKind, IterationRecord, SectionDraft, SectionFailure, SectionState};
