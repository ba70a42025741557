//! Diagram (Mermaid) discovery and theming.
//!
//!     A diagram block is any of:
//!     - an element carrying the `mermaid` class (`<div class="mermaid">`, `pre.mermaid`)
//!     - a code block tagged `language-mermaid` / `lang-mermaid`
//!     - an untagged code block whose first non-blank line starts with a
//!       diagram keyword (`flowchart`, `sequenceDiagram`, ...) or whose text
//!       starts with an init directive (`%%{`)
//!
//!     Blocks are deduplicated by container: a `<code>` inside a `<pre>` is
//!     the same block as the `<pre>`. The raw source is cached on the
//!     container (`data-mermaid-raw`) the first time it is seen so a
//!     re-render with another theme reads the original text back.
//!
//!     Rendering lives in [`pipeline`]; the external engine contract in
//!     [`engine`]; SVG post-processing in [`svg`]; bitmap conversion in
//!     [`raster`].

pub mod engine;
pub mod paste;
pub mod pipeline;
pub mod raster;
pub mod svg;

pub use engine::{DiagramEngine, RenderedDiagram};
#[cfg(feature = "native-export")]
pub use engine::MermaidCliEngine;
pub use pipeline::{render_raster_pass, render_vector_pass, PassOutcome, RasterOptions};

use crate::dom::{
    add_class, attr, descendants, has_class, is_element, parent_of, set_attr, text_content,
};
use crate::error::MdbError;
use markup5ever_rcdom::Handle;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

pub const DIAGRAM_CLASS: &str = "mermaid";
pub const RAW_SOURCE_ATTR: &str = "data-mermaid-raw";

static DIAGRAM_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(graph|flowchart|sequenceDiagram|classDiagram|stateDiagram-v2|stateDiagram|erDiagram|journey|gantt|pie|mindmap|timeline|gitGraph|quadrantChart)\b",
    )
    .expect("valid diagram keyword pattern")
});

/// Replace non-breaking spaces and normalize line endings.
pub fn normalize_source(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Lightweight grammar sniff on the first non-blank line.
pub fn is_diagram_text(text: &str) -> bool {
    let normalized = normalize_source(text);
    if normalized.trim_start().starts_with("%%{") {
        return true;
    }
    normalized
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| DIAGRAM_KEYWORD.is_match(line))
        .unwrap_or(false)
}

/// One diagram found in a content region.
#[derive(Debug, Clone)]
pub struct DiagramTarget {
    /// Node replaced by the rendered output.
    pub container: Handle,
    /// Normalized diagram source.
    pub source: String,
}

fn is_language_tagged(node: &Handle, language: &str) -> bool {
    has_class(node, &format!("language-{language}")) || has_class(node, &format!("lang-{language}"))
}

fn has_any_language_tag(node: &Handle) -> bool {
    crate::dom::classes(node)
        .iter()
        .any(|c| c.starts_with("language-") || c.starts_with("lang-"))
}

fn is_marked(node: &Handle) -> bool {
    has_class(node, DIAGRAM_CLASS) || is_language_tagged(node, DIAGRAM_CLASS)
}

struct Candidate {
    container: Handle,
    code: Option<Handle>,
    explicit: bool,
    sniff: bool,
}

fn candidate_for(node: &Handle) -> Option<Candidate> {
    if is_element(node, "code") {
        if let Some(pre) = parent_of(node).filter(|p| is_element(p, "pre")) {
            let explicit = is_marked(node) || is_marked(&pre);
            return Some(Candidate {
                container: pre,
                code: Some(node.clone()),
                explicit,
                sniff: !has_any_language_tag(node),
            });
        }
    }
    if is_marked(node) {
        return Some(Candidate {
            container: node.clone(),
            code: None,
            explicit: true,
            sniff: false,
        });
    }
    None
}

/// Find every diagram block under `root`, in document order.
///
/// Marks each container with the diagram class and caches its raw source.
pub fn discover(root: &Handle) -> Vec<DiagramTarget> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for node in descendants(root) {
        let Some(candidate) = candidate_for(&node) else {
            continue;
        };
        if !seen.insert(Rc::as_ptr(&candidate.container)) {
            continue;
        }

        let raw = match (&candidate.code, attr(&candidate.container, RAW_SOURCE_ATTR)) {
            (_, Some(cached)) => cached,
            (Some(code), None) => text_content(code),
            (None, None) => text_content(&candidate.container),
        };
        let source = normalize_source(&raw);
        let should_render = candidate.explicit || (candidate.sniff && is_diagram_text(&source));
        if source.trim().is_empty() || !should_render {
            continue;
        }

        add_class(&candidate.container, DIAGRAM_CLASS);
        if attr(&candidate.container, RAW_SOURCE_ATTR).is_none() {
            set_attr(&candidate.container, RAW_SOURCE_ATTR, &source);
        }
        targets.push(DiagramTarget {
            container: candidate.container,
            source,
        });
    }
    targets
}

const FONT_FAMILY: &str = r#"-apple-system, BlinkMacSystemFont, "Microsoft YaHei", sans-serif"#;
const FONT_SIZE: u32 = 16;

const THEME_CSS: &str = "foreignObject { overflow: visible; } .labelBkg { overflow: visible; } .labelBkg p { margin: 0; padding: 0; line-height: 1.2; }";

const LIGHT_VARIABLES: &[(&str, &str)] = &[
    ("primaryColor", "#fff4dd"),
    ("primaryTextColor", "#000"),
    ("primaryBorderColor", "#000"),
    ("lineColor", "#000"),
    ("secondaryColor", "#efefef"),
    ("tertiaryColor", "#fff"),
    ("background", "#fff"),
    ("mainBkg", "#fff4dd"),
    ("secondBkg", "#efefef"),
    ("tertiaryBkg", "#fff"),
    ("edgeLabelBackground", "#ECEDFE"),
    ("nodeBorder", "#000"),
    ("clusterBkg", "#fff9ed"),
    ("clusterBorder", "#000"),
    ("defaultLinkColor", "#000"),
    ("titleColor", "#000"),
    ("edgeLabelColor", "#000"),
];

const DARK_VARIABLES: &[(&str, &str)] = &[
    ("primaryColor", "#2d3748"),
    ("primaryTextColor", "#fff"),
    ("primaryBorderColor", "#fff"),
    ("lineColor", "#cbd5e0"),
    ("secondaryColor", "#4a5568"),
    ("tertiaryColor", "#1a202c"),
    ("background", "#1a202c"),
    ("mainBkg", "#2d3748"),
    ("secondBkg", "#4a5568"),
    ("tertiaryBkg", "#1a202c"),
    ("edgeLabelBackground", "#2d3748"),
    ("nodeBorder", "#cbd5e0"),
    ("clusterBkg", "#4a5568"),
    ("clusterBorder", "#cbd5e0"),
    ("defaultLinkColor", "#cbd5e0"),
    ("titleColor", "#fff"),
    ("edgeLabelColor", "#fff"),
    ("cScale0", "#2d3748"),
    ("cScale1", "#4a5568"),
    ("cScale2", "#718096"),
    ("cScale3", "#a0aec0"),
    ("cScale4", "#cbd5e0"),
];

/// Engine configuration injected through the init directive.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MermaidConfig {
    pub theme: String,
    pub dark_mode: bool,
    #[serde(rename = "themeCSS")]
    pub theme_css: String,
    pub flowchart: FlowchartConfig,
    pub er: ErConfig,
    pub theme_variables: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowchartConfig {
    pub html_labels: bool,
    pub padding: u32,
    pub node_spacing: u32,
    pub rank_spacing: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErConfig {
    pub font_size: u32,
}

impl MermaidConfig {
    pub fn for_mode(dark: bool) -> Self {
        let palette = if dark { DARK_VARIABLES } else { LIGHT_VARIABLES };
        let mut theme_variables: BTreeMap<String, Value> = palette
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        theme_variables.insert("fontFamily".into(), json!(FONT_FAMILY));
        theme_variables.insert("fontSize".into(), json!(format!("{FONT_SIZE}px")));
        theme_variables.insert("darkMode".into(), json!(dark));

        Self {
            theme: if dark { "dark" } else { "base" }.to_string(),
            dark_mode: dark,
            theme_css: THEME_CSS.to_string(),
            flowchart: FlowchartConfig {
                html_labels: true,
                padding: 20,
                node_spacing: 50,
                rank_spacing: 50,
            },
            er: ErConfig {
                font_size: FONT_SIZE + 4,
            },
            theme_variables,
        }
    }

    /// Labels as SVG `<text>` instead of `foreignObject` HTML.
    pub fn with_html_labels(mut self, enabled: bool) -> Self {
        self.flowchart.html_labels = enabled;
        self
    }

    pub fn directive(&self) -> Result<String, MdbError> {
        Ok(format!("%%{{init: {} }}%%", serde_json::to_string(self)?))
    }
}

/// Prefix `diagram` with the init directive unless it carries its own.
pub fn themed_source(diagram: &str, config: &MermaidConfig) -> Result<String, MdbError> {
    if diagram.trim().is_empty() {
        return Ok(String::new());
    }
    if diagram.trim_start().starts_with("%%{") {
        return Ok(diagram.to_string());
    }
    Ok(format!("{}\n{diagram}", config.directive()?))
}
