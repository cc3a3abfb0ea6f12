use thiserror::Error;

use crate::SectionState;

#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Generation failed for section '{section}': {source}")]
    Generation {
        section: String,
        #[source]
        source: paperloop_writer::GenerationError,
    },

    #[error("Section '{section}' cannot move from {from} to {to}")]
    InvalidTransition {
        section: String,
        from: SectionState,
        to: SectionState,
    },
}
