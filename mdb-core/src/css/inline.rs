//! Bakes stylesheet rules into `style` attributes.
//!
//! The clipboard destination strips `<style>` blocks, so every rule that can
//! be evaluated statically is applied to the elements it matches. Only
//! top-level style rules take part: conditional at-blocks cannot be decided
//! without a viewer, and rules with dynamic pseudo-classes or pseudo-elements
//! have no element to land on. Custom properties are skipped for the same
//! reason.
//!
//! Cascade order is `!important`, then specificity, then source order. An
//! element's own `style` attribute beats every non-important rule.

use super::selector::{parse_selector, Selector, Specificity};
use super::{parse_declarations, split_top_level, CssItem, Declaration, Stylesheet};
use crate::dom::{attr, descendants, set_attr};
use log::debug;
use markup5ever_rcdom::Handle;

struct InlineRule {
    selector: Selector,
    specificity: Specificity,
    order: usize,
    declarations: Vec<Declaration>,
}

/// Apply `css` to `root` and all of its descendants.
pub fn inline_styles(root: &Handle, css: &str) {
    let rules = collect_rules(css);
    debug!("inlining {} selector rules", rules.len());
    if rules.is_empty() {
        return;
    }

    let mut elements = vec![root.clone()];
    elements.extend(descendants(root));
    for element in elements {
        apply_rules(&element, &rules);
    }
}

fn collect_rules(css: &str) -> Vec<InlineRule> {
    let sheet = Stylesheet::parse(css);
    let mut rules = Vec::new();
    for item in &sheet.items {
        let CssItem::Rule(rule) = item else {
            continue;
        };
        let declarations: Vec<Declaration> = parse_declarations(&rule.body)
            .into_iter()
            .filter(|d| !d.property.starts_with("--"))
            .collect();
        if declarations.is_empty() {
            continue;
        }
        let (_, selectors) = super::split_leading_trivia(&rule.prelude);
        for selector in split_top_level(selectors, b',') {
            if let Some(selector) = parse_selector(selector) {
                rules.push(InlineRule {
                    specificity: selector.specificity(),
                    selector,
                    order: rules.len(),
                    declarations: declarations.clone(),
                });
            }
        }
    }
    rules
}

fn apply_rules(element: &Handle, rules: &[InlineRule]) {
    let mut matched: Vec<(bool, Specificity, usize, usize, &Declaration)> = Vec::new();
    for rule in rules.iter().filter(|r| r.selector.matches(element)) {
        for (index, declaration) in rule.declarations.iter().enumerate() {
            matched.push((
                declaration.important,
                rule.specificity,
                rule.order,
                index,
                declaration,
            ));
        }
    }
    if matched.is_empty() {
        return;
    }
    matched.sort_by_key(|m| (m.0, m.1, m.2, m.3));

    let mut computed: Vec<(String, String, bool)> = Vec::new();
    for (important, _, _, _, declaration) in matched {
        upsert(&mut computed, &declaration.property, &declaration.value, important);
    }

    if let Some(existing) = attr(element, "style") {
        for declaration in parse_declarations(&existing) {
            let locked = computed
                .iter()
                .any(|(p, _, important)| *p == declaration.property && *important);
            if !locked || declaration.important {
                upsert(
                    &mut computed,
                    &declaration.property,
                    &declaration.value,
                    declaration.important,
                );
            }
        }
    }

    let style = computed
        .iter()
        .map(|(property, value, _)| format!("{property}: {value};"))
        .collect::<Vec<_>>()
        .join(" ");
    set_attr(element, "style", &style);
}

fn upsert(computed: &mut Vec<(String, String, bool)>, property: &str, value: &str, important: bool) {
    match computed.iter_mut().find(|(p, _, _)| p == property) {
        Some(entry) => {
            entry.1 = value.to_string();
            entry.2 = important;
        }
        None => computed.push((property.to_string(), value.to_string(), important)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{find_first, is_element, parse_fragment};

    fn styled(html: &str, css: &str, tag: &str) -> Option<String> {
        let root = parse_fragment(html);
        let section = find_first(&root, &|n: &Handle| is_element(n, "section")).unwrap();
        inline_styles(&section, css);
        let target = if tag == "section" {
            section
        } else {
            find_first(&root, &|n: &Handle| is_element(n, tag)).unwrap()
        };
        attr(&target, "style")
    }

    #[test]
    fn higher_specificity_wins_regardless_of_order() {
        let css = "#mdb p { color: red; } p { color: blue; margin: 0; }";
        let style = styled("<section id=\"mdb\"><p>x</p></section>", css, "p");
        assert_eq!(style.as_deref(), Some("color: red; margin: 0;"));
    }

    #[test]
    fn later_rule_wins_on_equal_specificity() {
        let css = "#mdb h1 { color: red; }\n#mdb h1 { color: green; }";
        let style = styled("<section id=\"mdb\"><h1>x</h1></section>", css, "h1");
        assert_eq!(style.as_deref(), Some("color: green;"));
    }

    #[test]
    fn important_beats_specificity_and_inline() {
        let css = "#mdb p { color: red; } p { color: blue !important; }";
        let style = styled(
            "<section id=\"mdb\"><p style=\"color: black\">x</p></section>",
            css,
            "p",
        );
        assert_eq!(style.as_deref(), Some("color: blue;"));
    }

    #[test]
    fn existing_inline_style_beats_normal_rules() {
        let css = "#mdb p { color: red; padding: 1px; }";
        let style = styled(
            "<section id=\"mdb\"><p style=\"color: black\">x</p></section>",
            css,
            "p",
        );
        assert_eq!(style.as_deref(), Some("color: black; padding: 1px;"));
    }

    #[test]
    fn root_itself_is_styled_and_media_rules_are_skipped() {
        let css = "#mdb { font-size: 16px; } @media (max-width: 1px) { #mdb { font-size: 1px; } } #mdb a:hover { color: red; }";
        let style = styled("<section id=\"mdb\"><a>x</a></section>", css, "section");
        assert_eq!(style.as_deref(), Some("font-size: 16px;"));
    }
}
