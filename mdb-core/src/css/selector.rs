//! Selector parsing and matching against the rcdom tree.
//!
//! Supports what themes actually use: type, universal, `#id`, `.class`,
//! attribute selectors (`=`, `~=`, `|=`, `^=`, `$=`, `*=`), the four
//! combinators and the structural pseudo-classes `:first-child`,
//! `:last-child`, `:only-child` and `:nth-child()`. Anything else (`:hover`,
//! `::before`, ...) makes [`parse_selector`] return `None`; such rules cannot be
//! baked into a `style` attribute anyway.

use crate::dom::{attr, element_children, has_class, parent_of};
use markup5ever_rcdom::{Handle, NodeData};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Specificity(pub u32, pub u32, pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    compounds: Vec<Vec<Simple>>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Debug, Clone, PartialEq)]
enum Simple {
    Universal,
    Tag(String),
    Id(String),
    Class(String),
    Attr {
        name: String,
        matcher: Option<(AttrOp, String)>,
    },
    FirstChild,
    LastChild,
    OnlyChild,
    NthChild { a: i32, b: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AttrOp {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

/// Parse a single complex selector (no commas).
pub fn parse_selector(input: &str) -> Option<Selector> {
    let chars: Vec<char> = input.trim().chars().collect();
    if chars.is_empty() {
        return None;
    }
    let mut pos = 0;
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    loop {
        compounds.push(parse_compound(&chars, &mut pos)?);
        let had_space = skip_whitespace(&chars, &mut pos);
        if pos >= chars.len() {
            break;
        }
        let combinator = match chars[pos] {
            '>' => Combinator::Child,
            '+' => Combinator::NextSibling,
            '~' => Combinator::SubsequentSibling,
            _ if had_space => Combinator::Descendant,
            _ => return None,
        };
        if combinator != Combinator::Descendant {
            pos += 1;
            skip_whitespace(&chars, &mut pos);
        }
        combinators.push(combinator);
    }
    Some(Selector {
        compounds,
        combinators,
    })
}

fn skip_whitespace(chars: &[char], pos: &mut usize) -> bool {
    let start = *pos;
    while *pos < chars.len() && chars[*pos].is_whitespace() {
        *pos += 1;
    }
    *pos > start
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn parse_ident(chars: &[char], pos: &mut usize) -> Option<String> {
    let mut out = String::new();
    while *pos < chars.len() {
        let c = chars[*pos];
        if c == '\\' && *pos + 1 < chars.len() {
            out.push(chars[*pos + 1]);
            *pos += 2;
        } else if is_ident_char(c) {
            out.push(c);
            *pos += 1;
        } else {
            break;
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn parse_compound(chars: &[char], pos: &mut usize) -> Option<Vec<Simple>> {
    let mut simples = Vec::new();
    if *pos < chars.len() && chars[*pos] == '*' {
        simples.push(Simple::Universal);
        *pos += 1;
    } else if *pos < chars.len() && is_ident_char(chars[*pos]) {
        simples.push(Simple::Tag(parse_ident(chars, pos)?.to_ascii_lowercase()));
    }

    while *pos < chars.len() {
        match chars[*pos] {
            '#' => {
                *pos += 1;
                simples.push(Simple::Id(parse_ident(chars, pos)?));
            }
            '.' => {
                *pos += 1;
                simples.push(Simple::Class(parse_ident(chars, pos)?));
            }
            '[' => {
                *pos += 1;
                simples.push(parse_attribute(chars, pos)?);
            }
            ':' => {
                *pos += 1;
                if chars.get(*pos) == Some(&':') {
                    return None;
                }
                simples.push(parse_pseudo(chars, pos)?);
            }
            _ => break,
        }
    }

    if simples.is_empty() {
        None
    } else {
        Some(simples)
    }
}

fn parse_attribute(chars: &[char], pos: &mut usize) -> Option<Simple> {
    skip_whitespace(chars, pos);
    let name = parse_ident(chars, pos)?.to_ascii_lowercase();
    skip_whitespace(chars, pos);
    if chars.get(*pos) == Some(&']') {
        *pos += 1;
        return Some(Simple::Attr {
            name,
            matcher: None,
        });
    }

    let op = match chars.get(*pos)? {
        '=' => AttrOp::Equals,
        '~' => AttrOp::Includes,
        '|' => AttrOp::DashMatch,
        '^' => AttrOp::Prefix,
        '$' => AttrOp::Suffix,
        '*' => AttrOp::Substring,
        _ => return None,
    };
    *pos += if op == AttrOp::Equals { 1 } else { 2 };
    if op != AttrOp::Equals && chars.get(*pos - 1) != Some(&'=') {
        return None;
    }
    skip_whitespace(chars, pos);

    let value = match chars.get(*pos)? {
        q @ ('"' | '\'') => {
            let quote = *q;
            *pos += 1;
            let mut value = String::new();
            while *pos < chars.len() && chars[*pos] != quote {
                value.push(chars[*pos]);
                *pos += 1;
            }
            *pos += 1;
            value
        }
        _ => parse_ident(chars, pos)?,
    };
    skip_whitespace(chars, pos);
    // case-insensitivity flag is accepted and ignored
    if matches!(chars.get(*pos), Some('i') | Some('s')) {
        *pos += 1;
        skip_whitespace(chars, pos);
    }
    if chars.get(*pos) != Some(&']') {
        return None;
    }
    *pos += 1;
    Some(Simple::Attr {
        name,
        matcher: Some((op, value)),
    })
}

fn parse_pseudo(chars: &[char], pos: &mut usize) -> Option<Simple> {
    let name = parse_ident(chars, pos)?.to_ascii_lowercase();
    match name.as_str() {
        "first-child" => Some(Simple::FirstChild),
        "last-child" => Some(Simple::LastChild),
        "only-child" => Some(Simple::OnlyChild),
        "nth-child" => {
            if chars.get(*pos) != Some(&'(') {
                return None;
            }
            *pos += 1;
            let mut arg = String::new();
            while *pos < chars.len() && chars[*pos] != ')' {
                arg.push(chars[*pos]);
                *pos += 1;
            }
            *pos += 1;
            let (a, b) = parse_nth(&arg)?;
            Some(Simple::NthChild { a, b })
        }
        _ => None,
    }
}

fn parse_nth(arg: &str) -> Option<(i32, i32)> {
    let arg: String = arg.chars().filter(|c| !c.is_whitespace()).collect();
    let arg = arg.to_ascii_lowercase();
    match arg.as_str() {
        "odd" => return Some((2, 1)),
        "even" => return Some((2, 0)),
        _ => {}
    }
    match arg.split_once('n') {
        Some((a, b)) => {
            let a = match a {
                "" | "+" => 1,
                "-" => -1,
                other => other.parse().ok()?,
            };
            let b = if b.is_empty() { 0 } else { b.parse().ok()? };
            Some((a, b))
        }
        None => Some((0, arg.parse().ok()?)),
    }
}

impl Selector {
    pub fn specificity(&self) -> Specificity {
        let mut spec = Specificity::default();
        for simple in self.compounds.iter().flatten() {
            match simple {
                Simple::Id(_) => spec.0 += 1,
                Simple::Class(_)
                | Simple::Attr { .. }
                | Simple::FirstChild
                | Simple::LastChild
                | Simple::OnlyChild
                | Simple::NthChild { .. } => spec.1 += 1,
                Simple::Tag(_) => spec.2 += 1,
                Simple::Universal => {}
            }
        }
        spec
    }

    pub fn matches(&self, element: &Handle) -> bool {
        self.matches_from(element, self.compounds.len() - 1)
    }

    fn matches_from(&self, element: &Handle, index: usize) -> bool {
        if !self.compounds[index]
            .iter()
            .all(|simple| matches_simple(simple, element))
        {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => parent_element(element)
                .map(|parent| self.matches_from(&parent, index - 1))
                .unwrap_or(false),
            Combinator::Descendant => {
                let mut current = parent_element(element);
                while let Some(ancestor) = current {
                    if self.matches_from(&ancestor, index - 1) {
                        return true;
                    }
                    current = parent_element(&ancestor);
                }
                false
            }
            Combinator::NextSibling => previous_siblings(element)
                .last()
                .map(|sibling| self.matches_from(sibling, index - 1))
                .unwrap_or(false),
            Combinator::SubsequentSibling => previous_siblings(element)
                .iter()
                .any(|sibling| self.matches_from(sibling, index - 1)),
        }
    }
}

fn parent_element(node: &Handle) -> Option<Handle> {
    parent_of(node).filter(|p| matches!(p.data, NodeData::Element { .. }))
}

/// Element siblings before `node`, nearest last.
fn previous_siblings(node: &Handle) -> Vec<Handle> {
    let Some(parent) = parent_of(node) else {
        return Vec::new();
    };
    let mut siblings = element_children(&parent);
    match siblings.iter().position(|s| Rc::ptr_eq(s, node)) {
        Some(index) => {
            siblings.truncate(index);
            siblings
        }
        None => Vec::new(),
    }
}

/// 1-based position among element siblings and the sibling count.
fn sibling_position(node: &Handle) -> Option<(usize, usize)> {
    let parent = parent_of(node)?;
    let siblings = element_children(&parent);
    let index = siblings.iter().position(|s| Rc::ptr_eq(s, node))?;
    Some((index + 1, siblings.len()))
}

fn matches_simple(simple: &Simple, element: &Handle) -> bool {
    let NodeData::Element { name, .. } = &element.data else {
        return false;
    };
    match simple {
        Simple::Universal => true,
        Simple::Tag(tag) => (*name.local).eq_ignore_ascii_case(tag),
        Simple::Id(id) => attr(element, "id").as_deref() == Some(id.as_str()),
        Simple::Class(class) => has_class(element, class),
        Simple::Attr { name, matcher } => {
            let Some(actual) = attr(element, name) else {
                return false;
            };
            match matcher {
                None => true,
                Some((op, expected)) => match op {
                    AttrOp::Equals => actual == *expected,
                    AttrOp::Includes => actual.split_whitespace().any(|w| w == expected),
                    AttrOp::DashMatch => {
                        actual == *expected || actual.starts_with(&format!("{expected}-"))
                    }
                    AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected.as_str()),
                    AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected.as_str()),
                    AttrOp::Substring => {
                        !expected.is_empty() && actual.contains(expected.as_str())
                    }
                },
            }
        }
        Simple::FirstChild => sibling_position(element).map(|(i, _)| i == 1).unwrap_or(false),
        Simple::LastChild => sibling_position(element)
            .map(|(i, n)| i == n)
            .unwrap_or(false),
        Simple::OnlyChild => sibling_position(element).map(|(_, n)| n == 1).unwrap_or(false),
        Simple::NthChild { a, b } => sibling_position(element)
            .map(|(i, _)| nth_matches(*a, *b, i as i32))
            .unwrap_or(false),
    }
}

fn nth_matches(a: i32, b: i32, index: i32) -> bool {
    if a == 0 {
        return index == b;
    }
    let diff = index - b;
    diff % a == 0 && diff / a >= 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{find_first, is_element, parse_fragment};

    fn select(html: &str, selector: &str, tag: &str) -> bool {
        let root = parse_fragment(html);
        let target = find_first(&root, &|n: &Handle| is_element(n, tag)).unwrap();
        parse_selector(selector).unwrap().matches(&target)
    }

    #[test]
    fn matches_descendant_and_child() {
        let html = "<section id=\"mdb\"><blockquote><p>x</p></blockquote></section>";
        assert!(select(html, "#mdb p", "p"));
        assert!(select(html, "#mdb blockquote > p", "p"));
        assert!(!select(html, "#mdb > p", "p"));
    }

    #[test]
    fn matches_attributes_and_classes() {
        let html = "<div><input type=\"checkbox\" class=\"task done\"></div>";
        assert!(select(html, "input[type=\"checkbox\"]", "input"));
        assert!(select(html, "input.task.done", "input"));
        assert!(select(html, "[class~=done]", "input"));
        assert!(!select(html, "input[type^=radio]", "input"));
    }

    #[test]
    fn matches_structural_pseudo_classes() {
        let html = "<table><tbody><tr><td>1</td></tr><tr><td>2</td></tr></tbody></table>";
        let root = parse_fragment(html);
        let rows: Vec<Handle> = crate::dom::descendants(&root)
            .into_iter()
            .filter(|n| is_element(n, "tr"))
            .collect();
        let even = parse_selector("tr:nth-child(even)").unwrap();
        assert!(!even.matches(&rows[0]));
        assert!(even.matches(&rows[1]));
        assert!(parse_selector("tr:first-child").unwrap().matches(&rows[0]));
        assert!(parse_selector("tr:last-child").unwrap().matches(&rows[1]));
    }

    #[test]
    fn sibling_combinators() {
        let html = "<div><h2>a</h2><p>b</p><hr></div>";
        assert!(select(html, "h2 + p", "p"));
        assert!(select(html, "h2 ~ hr", "hr"));
        assert!(!select(html, "h2 + hr", "hr"));
    }

    #[test]
    fn rejects_dynamic_pseudo_classes_and_elements() {
        assert!(parse_selector("a:hover").is_none());
        assert!(parse_selector("pre::before").is_none());
        assert!(parse_selector("").is_none());
    }

    #[test]
    fn specificity_orders_id_class_type() {
        let a = parse_selector("#mdb p").unwrap().specificity();
        let b = parse_selector(".x .y p").unwrap().specificity();
        assert_eq!(a, Specificity(1, 0, 1));
        assert!(a > b);
    }
}
