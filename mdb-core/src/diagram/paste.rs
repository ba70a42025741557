//! Pulling a diagram out of pasted content.
//!
//! Both helpers return the first diagram found, re-wrapped as a clean
//! ```` ```mermaid ```` fence ready to insert into a Markdown document.

use crate::dom::{descendants, has_class, is_element, parent_of, parse_fragment, text_content};
use markup5ever_rcdom::Handle;
use once_cell::sync::Lazy;
use regex::Regex;

static MERMAID_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```mermaid\s*([\s\S]*?)```").expect("valid fence pattern"));

fn fenced(diagram: &str) -> Option<String> {
    let diagram = diagram.trim();
    if diagram.is_empty() {
        return None;
    }
    Some(format!("```mermaid\n{diagram}\n```"))
}

/// First ```` ```mermaid ```` fence in plain text.
pub fn extract_mermaid_from_markdown(text: &str) -> Option<String> {
    let captures = MERMAID_FENCE.captures(text)?;
    fenced(captures.get(1)?.as_str())
}

/// First `pre.mermaid`, or else `pre > code.language-mermaid`, in an HTML payload.
pub fn extract_mermaid_from_html(html: &str) -> Option<String> {
    if html.trim().is_empty() {
        return None;
    }
    let root = parse_fragment(html);
    let elements = descendants(&root);
    let pre = elements
        .iter()
        .find(|n| is_element(n, "pre") && has_class(n, "mermaid"));
    let code = || {
        elements.iter().find(|n: &&Handle| {
            is_element(n, "code")
                && (has_class(n, "language-mermaid") || has_class(n, "lang-mermaid"))
                && parent_of(n).is_some_and(|p| is_element(&p, "pre"))
        })
    };
    let target = pre.or_else(code)?;
    fenced(&text_content(target))
}
