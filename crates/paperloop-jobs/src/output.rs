use std::path::{Path, PathBuf};

use paperloop_core::Paper;

/// Files written for one finished paper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPaper {
    pub json: PathBuf,
    pub latex: Option<PathBuf>,
}

/// Write `<job_id>.json` and, when rendered, `<job_id>.tex` into `dir`
pub fn save_paper(
    dir: &Path,
    job_id: &str,
    paper: &Paper,
    latex: Option<&str>,
) -> std::io::Result<SavedPaper> {
    std::fs::create_dir_all(dir)?;

    let json_path = dir.join(format!("{}.json", job_id));
    let json = serde_json::to_string_pretty(paper).map_err(std::io::Error::other)?;
    std::fs::write(&json_path, json)?;

    let latex_path = match latex {
        Some(latex) => {
            let path = dir.join(format!("{}.tex", job_id));
            std::fs::write(&path, latex)?;
            Some(path)
        }
        None => None,
    };

    Ok(SavedPaper {
        json: json_path,
        latex: latex_path,
    })
}
