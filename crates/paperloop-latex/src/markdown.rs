use regex::Regex;
use std::sync::OnceLock;

/// A structural piece of section prose, still unescaped
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Block {
    /// Markdown heading; level 1..=3
    Heading { level: usize, text: String },
    /// Bullet lines grouped into one list
    List(Vec<String>),
    /// Paragraph with line breaks and space runs collapsed
    Paragraph(String),
}

fn bold_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").expect("static markdown pattern"))
}

fn italic_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*([^*\s](?:[^*]*[^*\s])?)\*").expect("static markdown pattern"))
}

fn bullet_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-*+]\s+(.*)$").expect("static markdown pattern"))
}

fn heading_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*$").expect("static markdown pattern"))
}

/// Remove `**x**`, `__x__` and `*x*` emphasis, keeping the inner text
pub(crate) fn strip_emphasis(text: &str) -> String {
    let text = bold_pattern().replace_all(text, |caps: &regex::Captures| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map_or(String::new(), |m| m.as_str().to_string())
    });
    italic_pattern().replace_all(&text, "$1").into_owned()
}

/// Collapse whitespace runs (including newlines) into single spaces
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a line only repeats the section name, e.g. `## Methods` or `**Methods:**`
pub(crate) fn repeats_name(line: &str, section: &str) -> bool {
    let bare = strip_emphasis(line.trim_start_matches('#').trim());
    let bare = bare.trim().trim_end_matches(':').trim();
    bare.eq_ignore_ascii_case(section.trim())
}

/// Split model prose into blocks.
///
/// A leading line that repeats the section name is dropped. Bullet runs stay
/// open across blank lines and close at the next non-bullet text line.
pub(crate) fn parse_blocks(section: &str, text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<String> = Vec::new();
    let mut list: Vec<String> = Vec::new();
    let mut seen_content = false;

    fn flush_paragraph(blocks: &mut Vec<Block>, paragraph: &mut Vec<String>) {
        if !paragraph.is_empty() {
            let joined = collapse_whitespace(&paragraph.join(" "));
            paragraph.clear();
            if !joined.is_empty() {
                blocks.push(Block::Paragraph(joined));
            }
        }
    }

    fn flush_list(blocks: &mut Vec<Block>, list: &mut Vec<String>) {
        if !list.is_empty() {
            blocks.push(Block::List(std::mem::take(list)));
        }
    }

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            flush_paragraph(&mut blocks, &mut paragraph);
            continue;
        }

        if !seen_content {
            seen_content = true;
            if repeats_name(line, section) {
                continue;
            }
        }

        if let Some(caps) = bullet_pattern().captures(line) {
            flush_paragraph(&mut blocks, &mut paragraph);
            let item = collapse_whitespace(&strip_emphasis(&caps[1]));
            if !item.is_empty() {
                list.push(item);
            }
            continue;
        }
        flush_list(&mut blocks, &mut list);

        if let Some(caps) = heading_pattern().captures(line) {
            flush_paragraph(&mut blocks, &mut paragraph);
            let heading = collapse_whitespace(&strip_emphasis(&caps[2]));
            if !heading.eq_ignore_ascii_case(section.trim()) {
                blocks.push(Block::Heading {
                    level: caps[1].len().min(3),
                    text: heading,
                });
            }
            continue;
        }

        paragraph.push(strip_emphasis(line));
    }

    flush_paragraph(&mut blocks, &mut paragraph);
    flush_list(&mut blocks, &mut list);
    blocks
}
