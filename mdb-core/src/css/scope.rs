//! Selector scoping.
//!
//! Rewrites every style rule so it only matches inside the namespace root.
//! Rules nested in conditional at-blocks are scoped too; `@keyframes`,
//! `@font-face` and friends are left alone since their preludes are not
//! selectors.
//!
//! | selector             | scoped                |
//! |----------------------|-----------------------|
//! | `*`                  | `#mdb *`              |
//! | `body`, `html`       | `#mdb`                |
//! | `html body div`      | `#mdb div`            |
//! | `:root`, `:root a`   | dropped               |
//! | `#mdb p`             | unchanged             |
//! | `p a`                | `#mdb p a`            |
//!
//! A rule whose selector list has no survivors is removed with its body.

use super::{split_leading_trivia, split_top_level, AtContent, CssItem, Stylesheet};

/// Namespace root every themed document is rendered under.
pub const NAMESPACE: &str = "#mdb";

/// Scope `css` under `namespace`. Applying it twice equals applying it once.
pub fn scope_css(css: &str, namespace: &str) -> String {
    let mut sheet = Stylesheet::parse(css);
    scope_items(&mut sheet.items, namespace);
    sheet.to_css()
}

fn scope_items(items: &mut Vec<CssItem>, namespace: &str) {
    for item in std::mem::take(items) {
        match item {
            CssItem::Rule(mut rule) => match scope_prelude(&rule.prelude, namespace) {
                Some(prelude) => {
                    rule.prelude = prelude;
                    items.push(CssItem::Rule(rule));
                }
                None => {
                    // a dropped rule keeps the comments in front of it
                    let (trivia, _) = split_leading_trivia(&rule.prelude);
                    if !trivia.trim().is_empty() {
                        items.push(CssItem::Raw(trivia.to_string()));
                    }
                }
            },
            CssItem::Block(mut block) => {
                if let AtContent::Nested(children) = &mut block.content {
                    scope_items(children, namespace);
                }
                items.push(CssItem::Block(block));
            }
            raw @ CssItem::Raw(_) => items.push(raw),
        }
    }
}

/// Returns `None` when the whole rule must go.
fn scope_prelude(prelude: &str, namespace: &str) -> Option<String> {
    let (trivia, rest) = split_leading_trivia(prelude);
    let selectors = rest.trim_end();
    if selectors.is_empty() {
        return Some(prelude.to_string());
    }
    let trailing = &rest[selectors.len()..];

    let scoped: Vec<String> = split_top_level(selectors, b',')
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| scope_selector(s, namespace))
        .collect();

    if scoped.is_empty() {
        return None;
    }
    Some(format!("{trivia}{}{trailing}", scoped.join(", ")))
}

/// Scope one selector; `None` drops it.
pub fn scope_selector(selector: &str, namespace: &str) -> Option<String> {
    if selector.contains(namespace) {
        return Some(selector.to_string());
    }
    if selector.starts_with(":root") {
        return None;
    }
    if selector == "*" {
        return Some(format!("{namespace} *"));
    }

    let mut rest = selector;
    while let Some(stripped) = strip_document_prefix(rest) {
        rest = stripped;
    }
    if rest == "html" || rest == "body" {
        return Some(namespace.to_string());
    }
    Some(format!("{namespace} {rest}"))
}

fn strip_document_prefix(selector: &str) -> Option<&str> {
    ["html", "body"].iter().find_map(|keyword| {
        let rest = selector.strip_prefix(keyword)?;
        if rest.starts_with(char::is_whitespace) {
            Some(rest.trim_start())
        } else {
            None
        }
    })
}
