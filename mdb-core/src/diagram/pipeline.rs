//! Render passes over a content region.
//!
//! A pass discovers every diagram block, then renders them one at a time in
//! document order. Diagrams are never rendered concurrently: engines may keep
//! global render state. Each call gets the id `<base_id>-<index>`.
//!
//! The vector pass (preview) keeps the SVG in the DOM and checks
//! `is_current` after every engine call; once it returns false the pass is
//! abandoned and writes nothing more. The raster pass (clipboard, export)
//! races every diagram against a timeout and swaps it for a PNG figure.
//!
//! A failing diagram only affects its own slot.

use super::engine::DiagramEngine;
use super::raster::{rasterize_svg, DEFAULT_SCALE};
use super::svg::normalize_svg;
use super::{discover, themed_source, DiagramTarget, MermaidConfig};
use crate::dom::{
    add_class, append_child, clear_children, create_element, create_text, find_first,
    insert_before, is_element, move_children, parse_fragment, replace_node,
};
use crate::error::MdbError;
use log::{debug, info, warn};
use markup5ever_rcdom::Handle;
use std::time::Duration;

pub const WRAPPER_CLASS: &str = "mermaid-wrapper";
pub const ERROR_CLASS: &str = "mermaid-error";
pub const SVG_CLASS: &str = "mdb-mermaid-svg";
pub const SVG_LIGHT_CLASS: &str = "mdb-mermaid-light";

const FIGURE_STYLE: &str = "margin: 1em 0; text-align: center;";
const IMAGE_STYLE: &str = "width: 100%; display: block; margin: 0 auto; max-width: 100%; height: auto;";
const RASTER_ERROR_STYLE: &str =
    "color: #c62828; background: rgba(198, 40, 40, 0.08); padding: 12px; border-radius: 6px; margin: 1em 0;";

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every discovered diagram was handled, successfully or with an error block.
    Settled { rendered: usize, failed: usize },
    /// A newer pass started; `completed` diagrams had been written before that.
    Abandoned { completed: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct RasterOptions {
    /// Per-diagram limit covering engine render and rasterization.
    pub timeout: Duration,
    pub scale: f32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(30_000),
            scale: DEFAULT_SCALE,
        }
    }
}

async fn render_one<E: DiagramEngine>(
    engine: &E,
    ready: &Result<(), String>,
    id: &str,
    target: &DiagramTarget,
    config: &MermaidConfig,
) -> Result<String, MdbError> {
    if let Err(message) = ready {
        return Err(MdbError::DiagramRender(message.clone()));
    }
    let source = themed_source(&target.source, config)?;
    let rendered = engine.render(id, &source).await?;
    Ok(normalize_svg(&rendered.svg))
}

fn initialize<E: DiagramEngine>(engine: &E) -> Result<(), String> {
    engine.initialize().map_err(|e| {
        warn!("diagram engine initialization failed: {e}");
        e.to_string()
    })
}

/// Render every diagram under `root` as inline SVG.
pub async fn render_vector_pass<E: DiagramEngine>(
    root: &Handle,
    engine: &E,
    dark: bool,
    base_id: &str,
    is_current: impl Fn() -> bool,
    mut progress: impl FnMut(usize, usize),
) -> PassOutcome {
    let targets = discover(root);
    if targets.is_empty() {
        return PassOutcome::Settled {
            rendered: 0,
            failed: 0,
        };
    }
    debug!("pass {base_id}: {} diagram(s), dark={dark}", targets.len());

    let ready = initialize(engine);
    let config = MermaidConfig::for_mode(dark);
    let total = targets.len();
    let (mut rendered, mut failed) = (0, 0);

    for (index, target) in targets.iter().enumerate() {
        let id = format!("{base_id}-{index}");
        let result = render_one(engine, &ready, &id, target, &config).await;

        if !is_current() {
            info!("pass {base_id} abandoned after {index} of {total} diagram(s)");
            return PassOutcome::Abandoned { completed: index };
        }

        match result {
            Ok(svg) => {
                let wrapper = vector_wrapper(&svg, dark);
                if !replace_node(&target.container, wrapper.clone()) {
                    clear_children(&target.container);
                    append_child(&target.container, wrapper);
                }
                rendered += 1;
            }
            Err(err) => {
                warn!("diagram {id} failed: {err}");
                let block = create_element("div", vec![("class", ERROR_CLASS)]);
                append_child(&block, create_text(&err.to_string()));
                clear_children(&target.container);
                append_child(&target.container, block);
                failed += 1;
            }
        }
        progress(index + 1, total);
    }

    debug!("pass {base_id} settled: {rendered} rendered, {failed} failed");
    PassOutcome::Settled { rendered, failed }
}

fn vector_wrapper(svg: &str, dark: bool) -> Handle {
    let mut attrs = vec![("class", WRAPPER_CLASS)];
    if !dark {
        attrs.push(("data-ui-theme", "light"));
    }
    let wrapper = create_element("div", attrs);
    move_children(&parse_fragment(svg), &wrapper);
    if let Some(svg_el) = find_first(&wrapper, &|n: &Handle| is_element(n, "svg")) {
        add_class(&svg_el, SVG_CLASS);
        if !dark {
            add_class(&svg_el, SVG_LIGHT_CLASS);
        }
    }
    wrapper
}

/// Render every diagram under `root` as a PNG figure.
///
/// Diagrams use the light palette with SVG text labels. A failing diagram
/// keeps its source block and gets a visible error block in front of it.
pub async fn render_raster_pass<E: DiagramEngine>(
    root: &Handle,
    engine: &E,
    options: RasterOptions,
    base_id: &str,
    mut progress: impl FnMut(usize, usize),
) -> PassOutcome {
    let targets = discover(root);
    if targets.is_empty() {
        return PassOutcome::Settled {
            rendered: 0,
            failed: 0,
        };
    }

    let ready = initialize(engine);
    let config = MermaidConfig::for_mode(false).with_html_labels(false);
    let total = targets.len();
    let (mut rendered, mut failed) = (0, 0);

    for (index, target) in targets.iter().enumerate() {
        let id = format!("{base_id}-{index}");
        let attempt = async {
            let svg = render_one(engine, &ready, &id, target, &config).await?;
            rasterize_svg(&svg, options.scale)
        };
        let result = match tokio::time::timeout(options.timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(MdbError::DiagramTimeout(options.timeout.as_millis() as u64)),
        };

        match result {
            Ok(data_uri) => {
                let figure = create_element(
                    "div",
                    vec![("style", FIGURE_STYLE), ("data-tool", "mdb")],
                );
                let img = create_element("img", vec![("src", data_uri.as_str()), ("style", IMAGE_STYLE)]);
                append_child(&figure, img);
                replace_node(&target.container, figure);
                rendered += 1;
            }
            Err(err) => {
                warn!("diagram {}/{total} failed: {err}", index + 1);
                let block = create_element("div", vec![("style", RASTER_ERROR_STYLE)]);
                append_child(&block, create_text(&err.to_string()));
                insert_before(&target.container, block);
                failed += 1;
            }
        }
        progress(index + 1, total);
    }

    PassOutcome::Settled { rendered, failed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::engine::RenderedDiagram;
    use crate::dom::{attr, has_class, serialize_children};
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct ScriptedEngine {
        calls: RefCell<Vec<(String, String)>>,
    }

    impl DiagramEngine for ScriptedEngine {
        async fn render(&self, id: &str, source: &str) -> Result<RenderedDiagram, MdbError> {
            self.calls
                .borrow_mut()
                .push((id.to_string(), source.to_string()));
            if source.contains("broken") {
                return Err(MdbError::DiagramRender("syntax error".into()));
            }
            Ok(RenderedDiagram {
                svg: format!(
                    r#"<svg id="{id}" xmlns="http://www.w3.org/2000/svg" width="10" height="10"><g class="nodes"></g><g class="edgePaths"></g></svg>"#
                ),
            })
        }
    }

    fn region() -> Handle {
        parse_fragment(concat!(
            "<p>before</p>",
            "<pre><code class=\"language-mermaid\">flowchart TD\nA--&gt;B</code></pre>",
            "<pre><code class=\"language-mermaid\">graph LR\nbroken</code></pre>",
            "<pre><code>sequenceDiagram\nA-&gt;&gt;B: hi</code></pre>",
        ))
    }

    #[tokio::test]
    async fn vector_pass_renders_in_order_and_isolates_failures() {
        let root = region();
        let engine = ScriptedEngine::default();
        let mut seen = Vec::new();
        let outcome =
            render_vector_pass(&root, &engine, false, "p1", || true, |c, t| seen.push((c, t)))
                .await;

        assert_eq!(outcome, PassOutcome::Settled { rendered: 2, failed: 1 });
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
        let ids: Vec<String> = engine.calls.borrow().iter().map(|c| c.0.clone()).collect();
        assert_eq!(ids, vec!["p1-0", "p1-1", "p1-2"]);
        assert!(engine.calls.borrow()[0].1.starts_with("%%{init: "));

        let html = serialize_children(&root).unwrap();
        assert_eq!(html.matches("class=\"mermaid-wrapper\"").count(), 2);
        assert!(html.contains("data-ui-theme=\"light\""));
        assert!(html.contains("mdb-mermaid-svg mdb-mermaid-light"));
        assert!(html.contains("<div class=\"mermaid-error\">Diagram render failed: syntax error</div>"));
        // edge group moved in front of the nodes
        assert!(html.find("edgePaths").unwrap() < html.find("class=\"nodes\"").unwrap());
        assert!(!html.contains("language-mermaid\">flowchart"));
    }

    #[tokio::test]
    async fn dark_pass_omits_light_markers() {
        let root = parse_fragment("<div class=\"mermaid\">pie\n\"a\": 1</div>");
        let engine = ScriptedEngine::default();
        render_vector_pass(&root, &engine, true, "d", || true, |_, _| {}).await;
        let html = serialize_children(&root).unwrap();
        assert!(html.contains("mdb-mermaid-svg"));
        assert!(!html.contains("mdb-mermaid-light"));
        assert!(!html.contains("data-ui-theme"));
        assert!(engine.calls.borrow()[0].1.contains("\"theme\":\"dark\""));
    }

    #[tokio::test]
    async fn stale_pass_stops_writing() {
        let root = region();
        let engine = ScriptedEngine::default();
        let checks = Cell::new(0);
        let outcome = render_vector_pass(
            &root,
            &engine,
            false,
            "stale",
            || {
                checks.set(checks.get() + 1);
                checks.get() < 2
            },
            |_, _| {},
        )
        .await;

        assert_eq!(outcome, PassOutcome::Abandoned { completed: 1 });
        let html = serialize_children(&root).unwrap();
        assert_eq!(html.matches("mermaid-wrapper").count(), 1);
        assert!(!html.contains("mermaid-error"));
    }

    #[tokio::test]
    async fn raster_pass_swaps_in_figures_and_keeps_failed_sources() {
        let root = region();
        let engine = ScriptedEngine::default();
        let outcome =
            render_raster_pass(&root, &engine, RasterOptions::default(), "r", |_, _| {}).await;
        assert_eq!(outcome, PassOutcome::Settled { rendered: 2, failed: 1 });
        assert!(engine.calls.borrow()[0].1.contains("\"htmlLabels\":false"));

        let figures: Vec<Handle> = crate::dom::descendants(&root)
            .into_iter()
            .filter(|n| attr(n, "data-tool").as_deref() == Some("mdb"))
            .collect();
        assert_eq!(figures.len(), 2);

        let html = serialize_children(&root).unwrap();
        assert!(html.contains("src=\"data:image/png;base64,"));
        let error_at = html.find("Diagram render failed: syntax error").unwrap();
        let source_at = html.find("broken").unwrap();
        assert!(error_at < source_at);
        assert!(html.contains("background: rgba(198, 40, 40, 0.08)"));
    }

    struct HangingEngine;

    impl DiagramEngine for HangingEngine {
        async fn render(&self, _id: &str, _source: &str) -> Result<RenderedDiagram, MdbError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn raster_pass_times_out_hung_diagrams() {
        let root = parse_fragment("<pre class=\"mermaid\">graph TD\nA</pre>");
        let options = RasterOptions {
            timeout: Duration::from_millis(50),
            ..RasterOptions::default()
        };
        let outcome = render_raster_pass(&root, &HangingEngine, options, "h", |_, _| {}).await;
        assert_eq!(outcome, PassOutcome::Settled { rendered: 0, failed: 1 });
        let html = serialize_children(&root).unwrap();
        assert!(html.contains("timed out after 50 ms"));
        let pre = find_first(&root, &|n: &Handle| is_element(n, "pre")).unwrap();
        assert!(has_class(&pre, "mermaid"));
    }
}
