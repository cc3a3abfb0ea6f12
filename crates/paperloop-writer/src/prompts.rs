/// Prompt templates for the generator
pub struct WriterPrompts;

impl WriterPrompts {
    /// Build the drafting prompt. When `prior_feedback` is given it is embedded
    /// verbatim so the next draft can address it.
    pub fn build_draft_prompt(title: &str, section: &str, prior_feedback: Option<&str>) -> String {
        let feedback = match prior_feedback {
            Some(feedback) => Self::build_feedback_block(feedback),
            None => String::new(),
        };

        format!(
            r#"You are an expert academic writer. Write high-quality research paper content in plain text.

Paper Title: {title}
Section: {section}

{feedback}CRITICAL FORMATTING REQUIREMENTS:
- Write in plain text WITHOUT any markdown formatting
- Do NOT use **bold**, *italic*, __underline__, or any markdown syntax
- Do NOT use bullet points with *, -, or + symbols
- Do NOT use # headers or other markdown elements
- Write in complete, flowing paragraphs
- Use proper academic prose with clear topic sentences
- Separate paragraphs with a single blank line
- Use transitions like "Furthermore," "However," "Moreover," etc.

SPECIAL REQUIREMENTS FOR REFERENCES SECTION:
If the section is "References" or "Bibliography":
- Format each reference as a numbered citation: [1], [2], [3], etc.
- Each reference must start on a new line with the number in square brackets
- Follow this exact format for each entry:
  [1] Author(s). Title. Publication. Year.
  [2] Author(s). Title. Publication. Year.
- Include 10-15 relevant academic references
- Do NOT write references as paragraphs or prose

Write a comprehensive, well-researched section that is:
- Academically rigorous and properly structured
- Clear and coherent with smooth transitions
- Factually accurate with logical arguments
- Professional and readable
- Written entirely in plain text format

Section Content:"#,
            title = title,
            section = section,
            feedback = feedback,
        )
    }

    fn build_feedback_block(feedback: &str) -> String {
        format!(
            "Previous Feedback (use this to improve):\n{}\n\nIMPORTANT: Continue to write in plain text without markdown formatting.\n\n",
            feedback
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_draft_has_no_feedback_block() {
        let prompt = WriterPrompts::build_draft_prompt("T", "Abstract", None);
        assert!(!prompt.contains("Previous Feedback"));
        assert!(prompt.contains("Section: Abstract"));
    }

    #[test]
    fn test_revision_embeds_feedback_verbatim() {
        let feedback = "Cite [3] properly.\n\nShorten the opening.";
        let prompt = WriterPrompts::build_draft_prompt("T", "Abstract", Some(feedback));
        assert!(prompt.contains(feedback));
    }
}
