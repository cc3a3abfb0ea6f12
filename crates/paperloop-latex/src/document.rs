use thiserror::Error;
use tracing::debug;

use paperloop_core::{Paper, SectionDraft};
use paperloop_critic::{fmt_score, MAX_AGGREGATE};

use crate::escape::escape_latex;
use crate::markdown::{parse_blocks, Block};
use crate::references::{is_reference_section, parse_entries};

pub const DEFAULT_AUTHOR: &str = "Author Name";
pub const DEFAULT_DATE: &str = r"\today";

const PREAMBLE: &[&str] = &[
    r"\usepackage[utf8]{inputenc}",
    r"\usepackage[T1]{fontenc}",
    r"\usepackage{amsmath}",
    r"\usepackage{graphicx}",
    r"\usepackage{hyperref}",
    r"\usepackage{cite}",
    r"\usepackage{geometry}",
    r"\geometry{a4paper, margin=1in}",
    r"\usepackage{setspace}",
    r"\setstretch{1.15}",
    r"\usepackage{titlesec}",
    "% Format section titles",
    r"\titleformat{\section}{\normalfont\Large\bfseries}{\thesection}{1em}{}",
    r"\titleformat{\subsection}{\normalfont\large\bfseries}{\thesubsection}{1em}{}",
    r"\titleformat{\subsubsection}{\normalfont\normalsize\bfseries}{\thesubsubsection}{1em}{}",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Paper has an empty title")]
    EmptyTitle,

    #[error("Paper has no sections")]
    NoSections,
}

/// Renders a finished [`Paper`] as a standalone LaTeX document.
///
/// Rendering is pure: the same paper always yields the same bytes.
#[derive(Debug, Clone)]
pub struct LatexRenderer {
    author: String,
    /// LaTeX fragment, emitted unescaped
    date: String,
}

impl Default for LatexRenderer {
    fn default() -> Self {
        Self {
            author: DEFAULT_AUTHOR.to_string(),
            date: DEFAULT_DATE.to_string(),
        }
    }
}

impl LatexRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn render(&self, paper: &Paper) -> Result<String, RenderError> {
        if paper.title.trim().is_empty() {
            return Err(RenderError::EmptyTitle);
        }
        if paper.sections.is_empty() {
            return Err(RenderError::NoSections);
        }

        debug!(title = %paper.title, sections = paper.sections.len(), "Rendering LaTeX");

        let mut lines: Vec<String> = vec![
            r"\documentclass{article}".to_string(),
            String::new(),
            "% Packages".to_string(),
        ];
        lines.extend(PREAMBLE.iter().map(|l| l.to_string()));
        lines.extend([
            String::new(),
            "% Document metadata".to_string(),
            format!(r"\title{{{}}}", escape_latex(paper.title.trim())),
            format!(r"\author{{{}}}", escape_latex(&self.author)),
            format!(r"\date{{{}}}", self.date),
        ]);
        lines.extend(metadata_comments(paper));
        lines.extend([
            String::new(),
            r"\begin{document}".to_string(),
            String::new(),
            r"\maketitle".to_string(),
            String::new(),
        ]);

        for section in &paper.sections {
            lines.push(render_section(section));
        }

        lines.push(r"\end{document}".to_string());

        let mut document = lines.join("\n");
        document.push('\n');
        Ok(document)
    }
}

/// `%` comment lines describing how each section was produced
fn metadata_comments(paper: &Paper) -> Vec<String> {
    let meta = &paper.metadata;
    let mut lines = vec![
        "% Generated by paperloop".to_string(),
        format!("% Generated at: {}", meta.generated_at.to_rfc3339()),
        format!(
            "% Threshold: {}/{}, max iterations: {}, total score: {}",
            fmt_score(meta.threshold),
            fmt_score(MAX_AGGREGATE),
            meta.max_iterations,
            fmt_score(meta.total_score)
        ),
    ];
    for summary in &meta.sections {
        let score = match (&summary.final_score, &summary.last_scored) {
            (Some(e), _) => e.short_description(),
            (None, Some(earlier)) => format!(
                "unscored (iteration {} scored {})",
                earlier.iteration,
                earlier.evaluation.short_description()
            ),
            (None, None) => "unscored".to_string(),
        };
        lines.push(format!(
            "% {}: {} after {} iteration(s), score {}",
            comment_safe(&summary.name),
            summary.state,
            summary.iterations,
            score
        ));
    }
    lines
}

fn comment_safe(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_section(section: &SectionDraft) -> String {
    let name = section.name.trim();

    if is_reference_section(name) {
        let entries = parse_entries(name, &section.text);
        let mut out = format!("\\section*{{{}}}\n", escape_latex(name));
        if !entries.is_empty() {
            out.push_str("\\begin{enumerate}\n");
            for entry in entries {
                out.push_str(&format!("\\item {}\n", escape_latex(&entry)));
            }
            out.push_str("\\end{enumerate}\n");
        }
        return out;
    }

    let body = render_blocks(&parse_blocks(name, &section.text));

    if name.eq_ignore_ascii_case("abstract") {
        format!("\\begin{{abstract}}\n{}\n\\end{{abstract}}\n", body)
    } else if body.is_empty() {
        format!("\\section{{{}}}\n", escape_latex(name))
    } else {
        format!("\\section{{{}}}\n{}\n", escape_latex(name), body)
    }
}

fn render_blocks(blocks: &[Block]) -> String {
    blocks
        .iter()
        .enumerate()
        .map(|(position, block)| match block {
            Block::Heading { level, text } => {
                let command = match level {
                    1 => "subsection*",
                    2 => "subsubsection*",
                    _ => "paragraph",
                };
                format!("\\{}{{{}}}", command, escape_latex(text))
            }
            Block::List(items) => {
                let mut out = String::from("\\begin{itemize}\n");
                for item in items {
                    out.push_str(&format!("\\item {}\n", escape_latex(item)));
                }
                out.push_str("\\end{itemize}");
                out
            }
            Block::Paragraph(text) if position == 0 => escape_latex(text),
            Block::Paragraph(text) => {
                format!("\\vspace{{0.5em}}\n\\noindent {}", escape_latex(text))
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_paragraphs_are_not_indented() {
        let blocks = vec![
            Block::Paragraph("First.".into()),
            Block::Paragraph("Second & last.".into()),
        ];
        assert_eq!(
            render_blocks(&blocks),
            "First.\n\n\\vspace{0.5em}\n\\noindent Second \\& last."
        );
    }

    #[test]
    fn test_heading_levels() {
        let blocks = vec![
            Block::Heading {
                level: 1,
                text: "A".into(),
            },
            Block::Heading {
                level: 2,
                text: "B".into(),
            },
            Block::Heading {
                level: 3,
                text: "C_1".into(),
            },
        ];
        assert_eq!(
            render_blocks(&blocks),
            "\\subsection*{A}\n\n\\subsubsection*{B}\n\n\\paragraph{C\\_1}"
        );
    }
}
