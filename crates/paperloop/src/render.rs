use std::path::Path;

use anyhow::{Context, Result};

use paperloop_core::Paper;
use paperloop_latex::LatexRenderer;

/// Re-render a saved paper JSON file, to `output` or stdout
pub fn handle_render_command(
    input: &Path,
    output: Option<&Path>,
    renderer: &LatexRenderer,
) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let paper: Paper = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a saved paper", input.display()))?;

    let latex = renderer
        .render(&paper)
        .with_context(|| format!("Failed to render {}", input.display()))?;

    match output {
        Some(path) => {
            std::fs::write(path, latex)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{}", latex),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperloop_core::{LoopSettings, SectionDraft, SectionState};
    use tempfile::TempDir;

    fn saved_paper(dir: &Path) -> std::path::PathBuf {
        let mut draft = SectionDraft::new(0, "Introduction");
        draft.text = "Proteins fold & unfold.".to_string();
        draft.iterations = 1;
        draft.state = SectionState::Exhausted;
        let paper = Paper::assemble("Folding", vec![draft], &LoopSettings::default());

        let path = dir.join("paper.json");
        std::fs::write(&path, serde_json::to_string(&paper).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_renders_saved_paper_to_file() {
        let dir = TempDir::new().unwrap();
        let input = saved_paper(dir.path());
        let output = dir.path().join("paper.tex");

        handle_render_command(&input, Some(&output), &LatexRenderer::default()).unwrap();

        let latex = std::fs::read_to_string(&output).unwrap();
        assert!(latex.contains("\\section{Introduction}"));
        assert!(latex.contains("Proteins fold \\& unfold."));
    }

    #[test]
    fn test_rejects_non_paper_json() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("bad.json");
        std::fs::write(&input, "{\"title\": 3}").unwrap();

        assert!(handle_render_command(&input, None, &LatexRenderer::default()).is_err());
    }
}
