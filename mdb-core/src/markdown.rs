//! Markdown to HTML via comrak.
//!
//! The grammar itself is comrak's business; this module only fixes the
//! extension set (GFM tables, strikethrough, task lists, footnotes,
//! autolinks) and allows raw HTML through so diagrams written as
//! `<div class="mermaid">` survive.

use crate::error::MdbError;
use comrak::ComrakOptions;
use once_cell::sync::Lazy;
use regex::Regex;

/// Renders Markdown to an HTML fragment. Must be a pure function of its input.
pub trait MarkdownParser {
    fn render(&self, markdown: &str) -> Result<String, MdbError>;
}

pub struct ComrakParser {
    options: ComrakOptions<'static>,
}

impl ComrakParser {
    pub fn new() -> Self {
        Self {
            options: default_comrak_options(),
        }
    }
}

impl Default for ComrakParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownParser for ComrakParser {
    fn render(&self, markdown: &str) -> Result<String, MdbError> {
        Ok(comrak::markdown_to_html(markdown, &self.options))
    }
}

fn default_comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;
    options.render.unsafe_ = true;
    options
}

static FRONT_MATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^---[\s\S]*?---").expect("valid front matter pattern"));

/// Drop a leading `---` YAML block and surrounding whitespace.
pub fn strip_front_matter(markdown: &str) -> String {
    FRONT_MATTER.replace(markdown, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_task_lists_as_checkbox_inputs() {
        let html = ComrakParser::new()
            .render("- [x] done\n- [ ] todo\n")
            .unwrap();
        assert_eq!(html.matches("<input").count(), 2);
        assert!(html.contains("checked"));
    }

    #[test]
    fn tags_fenced_code_with_language_class() {
        let html = ComrakParser::new()
            .render("```mermaid\nflowchart TD\nA-->B\n```\n")
            .unwrap();
        assert!(html.contains("<pre><code class=\"language-mermaid\">"));
    }

    #[test]
    fn strips_front_matter_block() {
        let md = "---\ntitle: x\n---\n\n# Body\n";
        assert_eq!(strip_front_matter(md), "# Body");
        assert_eq!(strip_front_matter("# No front matter"), "# No front matter");
    }
}
