//! Post-processing of engine SVG output.
//!
//! Connector groups (edges, arrows, timeline lines) are emitted after the
//! node shapes by some diagram types, so they paint over them. Moving those
//! groups right after `<defs>` puts them underneath. The rewrite works on the
//! source text by byte ranges, so everything that is not moved stays
//! byte-identical.

use roxmltree::{Document, Node};

const LINE_GROUP_CLASSES: &[&str] = &["lineWrapper", "edgePaths"];
const LINE_GROUP_FRAGMENTS: &[&str] = &["arrow", "node-line", "timeline-line"];

fn is_line_group(node: &Node) -> bool {
    if !node.is_element() || node.tag_name().name() != "g" {
        return false;
    }
    let Some(class) = node.attribute("class") else {
        return false;
    };
    class
        .split_whitespace()
        .any(|c| LINE_GROUP_CLASSES.contains(&c))
        || LINE_GROUP_FRAGMENTS.iter().any(|f| class.contains(f))
}

/// Reorder connector groups of the root `<svg>` behind the shapes.
///
/// Unparseable input, or a `<defs>` that is not a direct child of the root,
/// leaves the markup untouched.
pub fn normalize_svg(svg: &str) -> String {
    let Ok(doc) = Document::parse(svg) else {
        return svg.to_string();
    };
    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        return svg.to_string();
    }

    let children: Vec<Node> = root.children().collect();
    if children.is_empty() {
        return svg.to_string();
    }
    if let Some(defs) = root
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "defs")
    {
        if defs.parent() != Some(root) {
            return svg.to_string();
        }
    }
    if !children.iter().any(is_line_group) {
        return svg.to_string();
    }

    // Each child owns the bytes up to the next child's start.
    let content_end = children[children.len() - 1].range().end;
    let segments: Vec<(Node, &str)> = children
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let end = children
                .get(i + 1)
                .map(|next| next.range().start)
                .unwrap_or(content_end);
            (*node, &svg[node.range().start..end])
        })
        .collect();

    let (lines, rest): (Vec<_>, Vec<_>) = segments.into_iter().partition(|(n, _)| is_line_group(n));
    let insert_at = rest
        .iter()
        .position(|(n, _)| n.is_element() && n.tag_name().name() == "defs")
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut ordered: Vec<&str> = rest.iter().map(|(_, s)| *s).collect();
    for (offset, (_, segment)) in lines.iter().enumerate() {
        ordered.insert(insert_at + offset, segment);
    }

    let mut out = String::with_capacity(svg.len());
    out.push_str(&svg[..children[0].range().start]);
    for segment in ordered {
        out.push_str(segment);
    }
    out.push_str(&svg[content_end..]);
    out
}

fn parse_size(value: Option<&str>) -> Option<f64> {
    let trimmed = value?.trim();
    if trimmed.ends_with('%') {
        return None;
    }
    let numeric: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-' || *c == '+')
        .collect();
    numeric
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Intrinsic size: numeric `width`/`height`, else the `viewBox`, else 400x300.
pub fn svg_dimensions(svg: &str) -> (f64, f64) {
    let Ok(doc) = Document::parse(svg) else {
        return (400.0, 300.0);
    };
    let root = doc.root_element();
    if let (Some(w), Some(h)) = (
        parse_size(root.attribute("width")),
        parse_size(root.attribute("height")),
    ) {
        return (w, h);
    }
    if let Some(view_box) = root.attribute("viewBox") {
        let parts: Vec<f64> = view_box
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|p| !p.is_empty())
            .filter_map(|p| p.parse().ok())
            .collect();
        if parts.len() == 4 && parts[2] > 0.0 && parts[3] > 0.0 {
            return (parts[2], parts[3]);
        }
    }
    (400.0, 300.0)
}
