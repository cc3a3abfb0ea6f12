/// Prompt templates for the evaluator
pub struct ReviewPrompts;

impl ReviewPrompts {
    /// Build the scoring prompt for one section draft
    pub fn build_review_prompt(title: &str, section: &str, content: &str) -> String {
        format!(
            r#"You are an expert academic reviewer. Evaluate the following research paper section.

Paper Title: {title}
Section: {section}

Content:
{content}

Evaluate the content based on these criteria (score 0-10 for each):

1. RELEVANCE: How relevant is the content to the section topic?
2. COHERENCE: How well-structured and logically flowing is the content?
3. FACTUALITY: How accurate and well-supported are the claims?
4. READABILITY: How clear and accessible is the writing?

Provide your evaluation in this EXACT format:
RELEVANCE: [score]
COHERENCE: [score]
FACTUALITY: [score]
READABILITY: [score]
TOTAL: [sum of all scores]
FEEDBACK: [Detailed feedback on what needs improvement. Be specific about weaknesses and how to address them.]"#,
            title = title,
            section = section,
            content = truncate_content(content, 30_000),
        )
    }
}

fn truncate_content(content: &str, max_len: usize) -> &str {
    if content.len() <= max_len {
        return content;
    }
    let mut end = max_len;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    // Prefer a paragraph boundary
    match content[..end].rfind("\n\n") {
        Some(pos) => &content[..pos],
        None => &content[..end],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_prompt_names_all_criteria() {
        let prompt = ReviewPrompts::build_review_prompt("T", "Introduction", "Body text.");
        for label in ["RELEVANCE:", "COHERENCE:", "FACTUALITY:", "READABILITY:", "FEEDBACK:"] {
            assert!(prompt.contains(label), "missing {}", label);
        }
        assert!(prompt.contains("Section: Introduction"));
        assert!(prompt.contains("Body text."));
    }

    #[test]
    fn test_truncate_content_respects_char_boundaries() {
        let content = "é".repeat(10);
        let truncated = truncate_content(&content, 5);
        assert_eq!(truncated, "éé");
    }
}
