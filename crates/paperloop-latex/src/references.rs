use regex::Regex;
use std::sync::OnceLock;

use crate::markdown::{collapse_whitespace, repeats_name, strip_emphasis};

const REFERENCE_SECTIONS: [&str; 3] = ["references", "bibliography", "works cited"];

/// Whether a section holds the reference list
pub fn is_reference_section(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    REFERENCE_SECTIONS.contains(&name.as_str())
}

fn marker_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:\[\d+\]\s*|\d+[.)]\s+)(.*)$").expect("static reference marker pattern")
    })
}

/// Split a reference list into entries, unescaped.
///
/// Entries start at `[n]`, `n.` or `n)` markers and absorb the lines that
/// follow until the next marker. Without any marker every non-empty line is
/// an entry.
pub(crate) fn parse_entries(section: &str, text: &str) -> Vec<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let lines = match lines.first() {
        Some(first) if repeats_name(first, section) => &lines[1..],
        _ => &lines[..],
    };

    let has_markers = lines.iter().any(|line| marker_pattern().is_match(line));
    if !has_markers {
        return lines
            .iter()
            .map(|line| clean(line.trim_start_matches(['-', '*', '+']).trim()))
            .filter(|entry| !entry.is_empty())
            .collect();
    }

    let mut entries: Vec<String> = Vec::new();
    for line in lines {
        match marker_pattern().captures(line) {
            Some(caps) => entries.push(caps[1].to_string()),
            // Text before the first marker stands alone
            None => match entries.last_mut() {
                Some(last) => {
                    last.push(' ');
                    last.push_str(line);
                }
                None => entries.push(line.to_string()),
            },
        }
    }

    entries
        .iter()
        .map(|entry| clean(entry))
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn clean(entry: &str) -> String {
    collapse_whitespace(&strip_emphasis(entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_section_names() {
        assert!(is_reference_section("References"));
        assert!(is_reference_section("  BIBLIOGRAPHY "));
        assert!(is_reference_section("Works Cited"));
        assert!(!is_reference_section("Related Work"));
    }

    #[test]
    fn test_bracket_markers_with_continuations() {
        let text = "References\n[1] Smith, J. Folding.\n    Nature. 2020.\n[2] Doe, A. Misfolding. Cell. 2021.";
        assert_eq!(
            parse_entries("References", text),
            vec![
                "Smith, J. Folding. Nature. 2020.".to_string(),
                "Doe, A. Misfolding. Cell. 2021.".to_string(),
            ]
        );
    }

    #[test]
    fn test_numeric_markers() {
        let text = "1. **Lee, K.** Chaperones. 2019.\n2) Park, S. Kinetics. 2018.";
        assert_eq!(
            parse_entries("Bibliography", text),
            vec![
                "Lee, K. Chaperones. 2019.".to_string(),
                "Park, S. Kinetics. 2018.".to_string(),
            ]
        );
    }

    #[test]
    fn test_unmarked_lines_become_entries() {
        let text = "Smith, J. Folding. 2020.\n\n- Doe, A. Misfolding. 2021.";
        assert_eq!(
            parse_entries("References", text),
            vec![
                "Smith, J. Folding. 2020.".to_string(),
                "Doe, A. Misfolding. 2021.".to_string(),
            ]
        );
    }
}
