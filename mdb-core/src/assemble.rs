//! Output assembly: rendered HTML + theme CSS into one of three artifacts.
//!
//! | target    | theme resolution            | CSS delivery         | diagrams |
//! |-----------|-----------------------------|----------------------|----------|
//! | preview   | editor mode, unconditional  | `<style>` element    | SVG      |
//! | clipboard | light, unconditional        | inlined `style=`     | PNG      |
//! | export    | light + dark media query    | `<style>` in `<head>`| PNG      |
//!
//! Every artifact wraps the content in the namespace root
//! (`<section id="mdb">`), which is what scoped CSS hangs off.

use crate::css::inline::inline_styles;
use crate::css::sanitize::sanitize_modern_colors;
use crate::css::scope::{scope_css, NAMESPACE};
use crate::dom::{
    create_element, descendants, html_escape, is_element, move_children, parse_fragment,
    serialize_node, set_attr, attr,
};
use crate::error::MdbError;
use crate::theme::resolver::ThemeResolver;
use markup5ever_rcdom::Handle;
use once_cell::sync::Lazy;
use regex::Regex;

/// `id` of the namespace root element.
pub const ROOT_ID: &str = "mdb";

pub const CLIPBOARD_HTML_PREFIX: &str = "<meta charset=\"utf-8\">";

/// Shown instead of local images in the preview; the real path moves to `data-src`.
pub const IMAGE_PLACEHOLDER: &str = "data:image/svg+xml;charset=utf-8,%3Csvg xmlns='http://www.w3.org/2000/svg' width='120' height='80'%3E%3Crect width='120' height='80' fill='%23eeeeee'/%3E%3C/svg%3E";

/// Diagram and math container styling appended to exported documents.
pub const EXPORT_EXTRA_CSS: &str = r#"
#mdb .katex {
  font-size: 1.1em;
}

#mdb .katex-display {
  margin: 1em 0;
  text-align: center;
}

#mdb .mermaid-wrapper {
  margin: 1em 0;
  text-align: center;
}

#mdb .mermaid-wrapper .mdb-mermaid-svg {
  display: inline-block;
  max-width: 100%;
  height: auto;
}

#mdb .mdb-mermaid-light {
  color-scheme: light;
}

#mdb .mdb-mermaid-light * {
  color-scheme: light;
}

#mdb .mdb-mermaid-light .node rect,
#mdb .mdb-mermaid-light .node circle,
#mdb .mdb-mermaid-light .node ellipse,
#mdb .mdb-mermaid-light .node polygon,
#mdb .mdb-mermaid-light .node path {
  fill: #fff4dd;
  stroke: #000;
}

#mdb .mdb-mermaid-light .label text,
#mdb .mdb-mermaid-light .label span,
#mdb .mdb-mermaid-light .nodeLabel,
#mdb .mdb-mermaid-light .edgeLabel {
  fill: #000;
  color: #000;
}

#mdb .mdb-mermaid-light .flowchart-link,
#mdb .mdb-mermaid-light .edgePath .path {
  stroke: #000;
}

#mdb .mdb-mermaid-light .marker {
  fill: #000;
  stroke: #000;
}

#mdb .mdb-mermaid-light .cluster rect {
  fill: #fff9ed;
  stroke: #000;
}

#mdb .mermaid-error {
  color: #c62828;
  background: rgba(198, 40, 40, 0.08);
  padding: 12px;
  border-radius: 6px;
}
"#;

/// Where an assembled document is headed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Preview,
    Clipboard,
    Export,
}

impl Target {
    /// Final stylesheet for this target, scoped to the namespace root.
    ///
    /// `dark` is the editor's current mode; only the preview follows it.
    pub fn stylesheet(self, resolver: &ThemeResolver, key: Option<&str>, dark: bool) -> String {
        match self {
            Target::Preview => {
                let css = resolver.resolve(key, dark, false);
                preview_stylesheet(&scope_css(&css, NAMESPACE), dark)
            }
            Target::Clipboard => {
                let css = sanitize_modern_colors(&resolver.resolve(key, false, false));
                scope_css(&css, NAMESPACE)
            }
            Target::Export => {
                let css = sanitize_modern_colors(&resolver.resolve(key, true, true));
                scope_css(&css, NAMESPACE)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    /// Bake `css` into `style` attributes.
    pub inline_styles: bool,
    /// Swap local image sources for [`IMAGE_PLACEHOLDER`].
    pub image_placeholders: bool,
}

/// Wrap rendered HTML in the namespace root and apply `options`.
///
/// Returns the root element so diagram passes can keep mutating it.
pub fn build_root(html: &str, css: &str, options: ProcessOptions) -> Handle {
    let fragment = parse_fragment(html);
    let root = create_element("section", vec![("id", ROOT_ID)]);
    move_children(&fragment, &root);

    if options.image_placeholders {
        replace_local_images(&root);
    }
    if options.inline_styles {
        inline_styles(&root, css);
    }
    root
}

/// [`build_root`] serialized back to markup.
pub fn process_html(html: &str, css: &str, options: ProcessOptions) -> Result<String, MdbError> {
    serialize_node(&build_root(html, css, options))
}

pub fn is_remote_source(src: &str) -> bool {
    let lower = src.trim().to_ascii_lowercase();
    ["http://", "https://", "data:", "//"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

fn replace_local_images(root: &Handle) {
    for img in descendants(root).into_iter().filter(|n| is_element(n, "img")) {
        let Some(src) = attr(&img, "src") else {
            continue;
        };
        if src.is_empty() || is_remote_source(&src) {
            continue;
        }
        set_attr(&img, "data-src", &src);
        set_attr(&img, "src", IMAGE_PLACEHOLDER);
    }
}

static CHECKED_INPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<input[^>]*checked[^>]*>").expect("valid checked input pattern"));
static CHECKBOX_INPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<input[^>]*type=["']checkbox["'][^>]*>"#).expect("valid checkbox pattern")
});

/// Textual checkbox to glyph swap; the paste destination drops `<input>`.
pub fn replace_checkboxes(html: &str) -> String {
    let checked = CHECKED_INPUT.replace_all(html, "✅&nbsp;");
    CHECKBOX_INPUT.replace_all(&checked, "⬜&nbsp;").into_owned()
}

/// Scoped theme CSS plus the mode pin and math fixes the live preview needs.
pub fn preview_stylesheet(scoped_css: &str, dark: bool) -> String {
    let scheme = if dark { "dark" } else { "light" };
    format!(
        "{scoped_css}
#mdb {{
  color-scheme: {scheme};
}}
#mdb * {{
  color-scheme: {scheme};
}}
#mdb .katex-mathml {{
  display: none !important;
}}
#mdb .katex-html {{
  display: inline-block !important;
}}
#mdb .katex-display .katex-html {{
  display: block !important;
}}
.mdb-dark-mode .katex {{
  color: inherit;
}}
"
    )
}

/// Clipboard HTML flavour: charset prefix and glyphs for checkboxes.
pub fn clipboard_html(root_markup: &str) -> String {
    format!("{CLIPBOARD_HTML_PREFIX}{}", replace_checkboxes(root_markup))
}

/// Self-contained export page around already-assembled body markup.
pub fn export_document(title: &str, theme_css: &str, body_html: &str) -> String {
    format!(
        "<!DOCTYPE html>
<html lang=\"en\">
<head>
<meta charset=\"utf-8\">
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">
<title>{}</title>
<style>
{}
{}
</style>
</head>
<body>
{}
</body>
</html>
",
        html_escape(title),
        theme_css.trim(),
        EXPORT_EXTRA_CSS.trim(),
        body_html
    )
}

/// Standalone page showing a preview surface as the editor would.
pub fn preview_document(title: &str, stylesheet: &str, ui_theme: &str, body_html: &str) -> String {
    let body_class = if ui_theme == "dark" {
        " class=\"mdb-dark-mode\""
    } else {
        ""
    };
    format!(
        "<!DOCTYPE html>
<html lang=\"en\">
<head>
<meta charset=\"utf-8\">
<title>{}</title>
<style>
{}
</style>
</head>
<body{body_class}>
<div class=\"mdb-preview\" data-ui-theme=\"{ui_theme}\">
{body_html}
</div>
</body>
</html>
",
        html_escape(title),
        stylesheet.trim(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::resolver::ThemeResolver;

    #[test]
    fn wraps_in_namespace_root() {
        let html = process_html("<h1>Hi</h1>", "", ProcessOptions::default()).unwrap();
        assert_eq!(html, "<section id=\"mdb\"><h1>Hi</h1></section>");
    }

    #[test]
    fn inlines_scoped_css() {
        let css = scope_css("h1 { color: red; } body { margin: 0; }", NAMESPACE);
        let html = process_html(
            "<h1>Hi</h1>",
            &css,
            ProcessOptions {
                inline_styles: true,
                image_placeholders: false,
            },
        )
        .unwrap();
        assert_eq!(
            html,
            "<section id=\"mdb\" style=\"margin: 0;\"><h1 style=\"color: red;\">Hi</h1></section>"
        );
    }

    #[test]
    fn placeholders_only_local_images() {
        let html = process_html(
            "<p><img src=\"assets/a.png\"><img src=\"https://x.test/b.png\"></p>",
            "",
            ProcessOptions {
                inline_styles: false,
                image_placeholders: true,
            },
        )
        .unwrap();
        assert!(html.contains("data-src=\"assets/a.png\""));
        assert!(html.contains("src=\"https://x.test/b.png\""));
        assert_eq!(html.matches("data-src").count(), 1);
    }

    #[test]
    fn checkboxes_become_glyphs() {
        let html = "<li><input type=\"checkbox\" checked=\"\" disabled=\"\"> a</li><li><input type=\"checkbox\" disabled=\"\"> b</li>";
        assert_eq!(
            replace_checkboxes(html),
            "<li>✅&nbsp; a</li><li>⬜&nbsp; b</li>"
        );
    }

    #[test]
    fn targets_resolve_differently() {
        let resolver = ThemeResolver::default();
        let preview = Target::Preview.stylesheet(&resolver, None, true);
        assert!(preview.contains("color-scheme: dark;"));
        assert!(!preview.contains("prefers-color-scheme"));
        assert!(!preview.contains(":root"));

        let export = Target::Export.stylesheet(&resolver, None, false);
        assert!(export.contains("@media (prefers-color-scheme: dark)"));

        let clipboard = Target::Clipboard.stylesheet(&resolver, None, true);
        assert!(!clipboard.contains("mdb-dark-mode-converted"));
        assert!(clipboard.contains("#mdb h1"));
    }

    #[test]
    fn export_document_is_standalone() {
        let doc = export_document("A & B", "#mdb h1 { color: red; }", "<section id=\"mdb\"></section>");
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>A &amp; B</title>"));
        assert!(doc.contains("#mdb .mermaid-wrapper"));
        assert!(doc.contains("<body>\n<section id=\"mdb\"></section>\n</body>"));
    }

    #[test]
    fn preview_document_carries_mode() {
        let doc = preview_document("t", "#mdb h1 {}", "dark", "<section id=\"mdb\"></section>");
        assert!(doc.contains("<body class=\"mdb-dark-mode\">"));
        assert!(doc.contains("data-ui-theme=\"dark\""));
        assert!(preview_document("t", "", "light", "").contains("<body>\n"));
    }
}
