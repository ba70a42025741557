//! Removes declarations the export renderer cannot draw.
//!
//! Any declaration whose value calls `oklch()`, `oklab()`, `lch()`, `lab()`
//! or `color()` is deleted whole, including `color-mix()` values that nest
//! one of them or mix in a modern colour space. `@keyframes`, `@font-face`
//! and `@page` bodies are cleaned the same way. Rules left without declarations disappear and runs of blank
//! lines collapse. Malformed input is never an error, the worst outcome is
//! a dropped property.

use super::{split_top_level, AtContent, CssItem, Stylesheet};
use once_cell::sync::Lazy;
use regex::Regex;

static UNSUPPORTED_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[^a-z0-9_-])(?:oklch|oklab|lch|lab|color)\s*\(|color-mix\([^)]*\b(?:oklch|oklab|lch|lab)\b",
    )
    .expect("valid colour function pattern")
});

static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid blank line pattern"));

pub fn sanitize_modern_colors(css: &str) -> String {
    let mut sheet = Stylesheet::parse(css);
    sanitize_items(&mut sheet.items);
    BLANK_LINES.replace_all(&sheet.to_css(), "\n").into_owned()
}

fn sanitize_items(items: &mut Vec<CssItem>) {
    items.retain_mut(|item| match item {
        CssItem::Rule(rule) => {
            rule.body = strip_declarations(&rule.body);
            !rule.body.trim().is_empty()
        }
        CssItem::Block(block) => match &mut block.content {
            AtContent::Nested(children) => {
                sanitize_items(children);
                children.iter().any(|child| !is_blank(child))
            }
            AtContent::Opaque(body) => {
                let cleaned = sanitize_opaque(body);
                let keep = !cleaned.trim().is_empty() || body.trim().is_empty();
                *body = cleaned;
                keep
            }
        },
        CssItem::Raw(_) => true,
    });
}

/// Keyframe stops are rules; `@font-face` and `@page` bodies are plain declarations.
fn sanitize_opaque(body: &str) -> String {
    if body.contains('{') {
        let mut inner = Stylesheet::parse(body);
        sanitize_items(&mut inner.items);
        inner.to_css()
    } else {
        strip_declarations(body)
    }
}

fn is_blank(item: &CssItem) -> bool {
    matches!(item, CssItem::Raw(text) if text.trim().is_empty())
}

fn strip_declarations(body: &str) -> String {
    split_top_level(body, b';')
        .into_iter()
        .filter(|declaration| !uses_unsupported_color(declaration))
        .collect::<Vec<_>>()
        .join(";")
}

fn uses_unsupported_color(declaration: &str) -> bool {
    match declaration.find(':') {
        Some(colon) => UNSUPPORTED_FUNCTION.is_match(&declaration[colon + 1..]),
        None => false,
    }
}
