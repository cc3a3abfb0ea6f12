mod generator;
mod prompts;

pub use generator::{DraftRequest, GenerationError, SectionGenerator};
pub use prompts::WriterPrompts;
