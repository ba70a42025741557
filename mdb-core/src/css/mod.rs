//! Brace-aware CSS tokenizer and the stylesheet transforms built on it.
//!
//!     Theme stylesheets are hand edited and untrusted, so every transform in
//!     this module works on a loss-free item tree instead of line-oriented
//!     regexes. The tree only understands what the transforms need:
//!
//!     - style rules: a selector prelude and an opaque declaration body
//!     - at-blocks: `@media`/`@supports`/`@container`/`@layer`/`@document`
//!       nest further items, everything else (`@keyframes`, `@font-face`,
//!       `@page`) keeps its body verbatim
//!     - raw text: whitespace, comments and at-statements like `@import`
//!
//!     `Stylesheet::parse(css).to_css()` reproduces the input byte for byte
//!     for well-formed CSS, and never fails on malformed CSS (unterminated
//!     blocks simply run to the end of input).
//!
//!     Transforms:
//!     - [`scope`]: confine every selector under the namespace root
//!     - [`sanitize`]: drop declarations using colour functions the export
//!       renderer cannot draw
//!     - [`dark`]: derive a dark stylesheet from a light one
//!     - [`selector`] + [`inline`]: match rules against a DOM and bake them
//!       into `style` attributes for the clipboard

pub mod dark;
pub mod inline;
pub mod sanitize;
pub mod scope;
pub mod selector;

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CssItem {
    Raw(String),
    Rule(StyleRule),
    Block(AtBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    /// Everything between the previous item and `{`, including leading whitespace.
    pub prelude: String,
    /// Declarations between the braces, verbatim.
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtBlock {
    pub prelude: String,
    pub content: AtContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AtContent {
    Nested(Vec<CssItem>),
    Opaque(String),
}

/// A parsed stylesheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stylesheet {
    pub items: Vec<CssItem>,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Self {
        let mut parser = Parser {
            src: css,
            bytes: css.as_bytes(),
            pos: 0,
        };
        Stylesheet {
            items: parser.parse_items(false),
        }
    }

    pub fn to_css(&self) -> String {
        let mut out = String::new();
        write_items(&self.items, &mut out);
        out
    }

    /// Visit every style rule, including those nested in conditional at-blocks.
    pub fn for_each_rule_mut(&mut self, f: &mut dyn FnMut(&mut StyleRule)) {
        visit_rules(&mut self.items, f);
    }
}

impl fmt::Display for Stylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

fn visit_rules(items: &mut [CssItem], f: &mut dyn FnMut(&mut StyleRule)) {
    for item in items.iter_mut() {
        match item {
            CssItem::Rule(rule) => f(rule),
            CssItem::Block(AtBlock {
                content: AtContent::Nested(children),
                ..
            }) => visit_rules(children, f),
            _ => {}
        }
    }
}

fn write_items(items: &[CssItem], out: &mut String) {
    for item in items {
        match item {
            CssItem::Raw(text) => out.push_str(text),
            CssItem::Rule(rule) => {
                out.push_str(&rule.prelude);
                out.push('{');
                out.push_str(&rule.body);
                out.push('}');
            }
            CssItem::Block(block) => {
                out.push_str(&block.prelude);
                out.push('{');
                match &block.content {
                    AtContent::Nested(children) => write_items(children, out),
                    AtContent::Opaque(body) => out.push_str(body),
                }
                out.push('}');
            }
        }
    }
}

const NESTING_AT_RULES: &[&str] = &[
    "media",
    "supports",
    "container",
    "layer",
    "document",
    "-moz-document",
    "scope",
];

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_items(&mut self, nested: bool) -> Vec<CssItem> {
        let mut items = Vec::new();
        loop {
            let start = self.pos;
            match self.scan_to_delimiter() {
                None => {
                    if start < self.bytes.len() {
                        items.push(CssItem::Raw(self.src[start..].to_string()));
                    }
                    return items;
                }
                Some(b'{') => {
                    let prelude = self.src[start..self.pos].to_string();
                    self.pos += 1;
                    match at_rule_name(&prelude) {
                        Some(name) if NESTING_AT_RULES.contains(&name.as_str()) => {
                            let children = self.parse_items(true);
                            items.push(CssItem::Block(AtBlock {
                                prelude,
                                content: AtContent::Nested(children),
                            }));
                        }
                        Some(_) => {
                            let body = self.consume_block();
                            items.push(CssItem::Block(AtBlock {
                                prelude,
                                content: AtContent::Opaque(body),
                            }));
                        }
                        None => {
                            let body = self.consume_block();
                            items.push(CssItem::Rule(StyleRule { prelude, body }));
                        }
                    }
                }
                Some(b'}') if nested => {
                    if start < self.pos {
                        items.push(CssItem::Raw(self.src[start..self.pos].to_string()));
                    }
                    self.pos += 1;
                    return items;
                }
                Some(_) => {
                    // `;` ends an at-statement; a stray top-level `}` is kept as text
                    self.pos += 1;
                    items.push(CssItem::Raw(self.src[start..self.pos].to_string()));
                }
            }
        }
    }

    /// Advance to the next `{`, `}` or `;` outside strings and comments.
    fn scan_to_delimiter(&mut self) -> Option<u8> {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b @ (b'{' | b'}' | b';') => return Some(b),
                b'"' | b'\'' => self.skip_string(),
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'*') => self.skip_comment(),
                _ => self.pos += 1,
            }
        }
        None
    }

    /// Read up to the matching `}` (consumed, not returned).
    fn consume_block(&mut self) -> String {
        let start = self.pos;
        let mut depth = 0usize;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'{' => {
                    depth += 1;
                    self.pos += 1;
                }
                b'}' => {
                    if depth == 0 {
                        let body = self.src[start..self.pos].to_string();
                        self.pos += 1;
                        return body;
                    }
                    depth -= 1;
                    self.pos += 1;
                }
                b'"' | b'\'' => self.skip_string(),
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'*') => self.skip_comment(),
                _ => self.pos += 1,
            }
        }
        self.src[start..].to_string()
    }

    fn skip_string(&mut self) {
        let quote = self.bytes[self.pos];
        self.pos += 1;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b if b == quote => {
                    self.pos += 1;
                    return;
                }
                b'\n' => return,
                _ => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.bytes.len());
    }

    fn skip_comment(&mut self) {
        match self.src[self.pos + 2..].find("*/") {
            Some(end) => self.pos += end + 4,
            None => self.pos = self.bytes.len(),
        }
    }
}

fn at_rule_name(prelude: &str) -> Option<String> {
    let (_, rest) = split_leading_trivia(prelude);
    let rest = rest.strip_prefix('@')?;
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    Some(name.to_ascii_lowercase())
}

/// Split leading whitespace and comments from the rest of `text`.
pub fn split_leading_trivia(text: &str) -> (&str, &str) {
    let mut pos = 0;
    loop {
        let rest = &text[pos..];
        let trimmed = rest.trim_start();
        pos += rest.len() - trimmed.len();
        if trimmed.starts_with("/*") {
            match trimmed[2..].find("*/") {
                Some(end) => pos += end + 4,
                None => {
                    pos = text.len();
                    break;
                }
            }
        } else {
            break;
        }
    }
    (&text[..pos], &text[pos..])
}

/// Split on `separator` where it is not nested in parentheses, brackets or strings.
pub fn split_top_level(text: &str, separator: u8) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 1;
            } else if b == q {
                quote = None;
            }
        } else {
            match b {
                b'"' | b'\'' => quote = Some(b),
                b'(' | b'[' => depth += 1,
                b')' | b']' => depth -= 1,
                _ if b == separator && depth <= 0 => {
                    parts.push(&text[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        i += 1;
    }
    parts.push(&text[start.min(text.len())..]);
    parts
}

/// One `property: value` pair from a declaration block.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

/// Parse a declaration body (`color: red; margin: 0 !important`).
pub fn parse_declarations(body: &str) -> Vec<Declaration> {
    split_top_level(body, b';')
        .into_iter()
        .filter_map(|segment| {
            let (_, segment) = split_leading_trivia(segment);
            let colon = segment.find(':')?;
            let property = segment[..colon].trim();
            if property.is_empty() {
                return None;
            }
            let mut value = segment[colon + 1..].trim().to_string();
            let mut important = false;
            let lower = value.to_ascii_lowercase();
            if let Some(idx) = lower.rfind("!important") {
                if lower[idx + "!important".len()..].trim().is_empty() {
                    value = value[..idx].trim_end().to_string();
                    important = true;
                }
            }
            if value.is_empty() {
                return None;
            }
            let property = if property.starts_with("--") {
                property.to_string()
            } else {
                property.to_ascii_lowercase()
            };
            Some(Declaration {
                property,
                value,
                important,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_source_text() {
        let css = "/* c { } */\n@import url(a.css);\nh1 { color: red; }\n@media (max-width: 600px) {\n  p { margin: 0; }\n}\n@keyframes spin { from { opacity: 0 } to { opacity: 1 } }\n";
        assert_eq!(Stylesheet::parse(css).to_css(), css);
    }

    #[test]
    fn nests_media_but_not_keyframes() {
        let sheet = Stylesheet::parse("@media print { a { x: 1 } } @keyframes k { 0% { x: 1 } }");
        let blocks: Vec<_> = sheet
            .items
            .iter()
            .filter_map(|i| match i {
                CssItem::Block(b) => Some(&b.content),
                _ => None,
            })
            .collect();
        assert!(matches!(blocks[0], AtContent::Nested(_)));
        assert!(matches!(blocks[1], AtContent::Opaque(_)));
    }

    #[test]
    fn braces_inside_strings_do_not_split_rules() {
        let sheet = Stylesheet::parse("a::after { content: \"}\"; } b { x: 1; }");
        let rules = sheet
            .items
            .iter()
            .filter(|i| matches!(i, CssItem::Rule(_)))
            .count();
        assert_eq!(rules, 2);
    }

    #[test]
    fn unterminated_block_runs_to_end() {
        let css = "a { color: red;";
        let sheet = Stylesheet::parse(css);
        assert_eq!(sheet.items.len(), 1);
        assert_eq!(sheet.to_css(), "a { color: red;}");
    }

    #[test]
    fn top_level_split_respects_parentheses() {
        assert_eq!(
            split_top_level(":is(a, b), c[title=\"x,y\"]", b','),
            vec![":is(a, b)", " c[title=\"x,y\"]"]
        );
    }

    #[test]
    fn parses_declarations_with_important() {
        let decls = parse_declarations(" Color: red ; margin:0 !important; --Accent: #fff; ");
        assert_eq!(decls.len(), 3);
        assert_eq!(decls[0].property, "color");
        assert_eq!(decls[1].value, "0");
        assert!(decls[1].important);
        assert_eq!(decls[2].property, "--Accent");
    }
}
