//! # paperloop-latex
//!
//! Renders a finished paper as a LaTeX document: preamble, title block,
//! abstract environment, prose sections cleaned of markdown, and reference
//! lists as `enumerate` environments.

mod document;
mod escape;
mod markdown;
mod references;

pub use document::{LatexRenderer, RenderError, DEFAULT_AUTHOR, DEFAULT_DATE};
pub use escape::escape_latex;
pub use references::is_reference_section;
