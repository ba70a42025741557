//! Live preview surfaces.
//!
//! A surface is a mount point plus a render token. Every `update` bumps the
//! token and starts a pass; a pass keeps writing only while its token is
//! still the surface's current one. Nothing is cancelled: an overtaken pass
//! finishes its engine calls and drops the results.
//!
//! Appearance changes reach surfaces through [`AppearanceHub`], an explicit
//! subscription list the host publishes mode changes into.

use crate::assemble::{build_root, ProcessOptions, Target};
use crate::diagram::{render_vector_pass, DiagramEngine, PassOutcome};
use crate::dom::{html_escape, serialize_node};
use crate::error::MdbError;
use crate::markdown::{strip_front_matter, MarkdownParser};
use crate::theme::resolver::ThemeResolver;
use log::debug;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

pub const EMPTY_MESSAGE: &str = "No active Markdown document";

/// What a surface needs to render: parser, themes, diagram engine.
pub struct RenderContext<'a, P, E> {
    pub parser: &'a P,
    pub resolver: &'a ThemeResolver,
    pub engine: &'a E,
    /// `None` renders the resolver's default theme.
    pub theme: Option<&'a str>,
}

impl<P, E> Clone for RenderContext<'_, P, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, E> Copy for RenderContext<'_, P, E> {}

#[derive(Debug)]
pub struct PreviewSurface {
    id: u64,
    token: Cell<u64>,
    mounted: Cell<bool>,
    dark: Cell<bool>,
    content: RefCell<String>,
    stylesheet: RefCell<String>,
}

impl Default for PreviewSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewSurface {
    pub fn new() -> Self {
        Self {
            id: NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed),
            token: Cell::new(0),
            mounted: Cell::new(false),
            dark: Cell::new(false),
            content: RefCell::new(String::new()),
            stylesheet: RefCell::new(String::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn token(&self) -> u64 {
        self.token.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    pub fn mount(&self) {
        self.mounted.set(true);
        self.show_empty();
    }

    /// Abandon any in-flight pass and drop the content.
    pub fn dispose(&self) {
        self.token.set(self.token.get() + 1);
        self.mounted.set(false);
        self.content.borrow_mut().clear();
        self.stylesheet.borrow_mut().clear();
    }

    pub fn show_empty(&self) {
        *self.content.borrow_mut() =
            format!("<p class=\"mdb-preview-empty\">{EMPTY_MESSAGE}</p>");
    }

    /// Current inner markup of the surface.
    pub fn html(&self) -> String {
        self.content.borrow().clone()
    }

    /// Contents of the surface's live `<style>` element.
    pub fn stylesheet(&self) -> String {
        self.stylesheet.borrow().clone()
    }

    /// `data-ui-theme` value for the surface's outer element.
    pub fn ui_theme(&self) -> &'static str {
        if self.dark.get() {
            "dark"
        } else {
            "light"
        }
    }

    /// Re-render `markdown` in the given mode.
    ///
    /// A parse failure is shown inside the surface and also returned. Diagram
    /// failures stay in their slots and never fail the update.
    pub async fn update<P, E>(
        &self,
        ctx: RenderContext<'_, P, E>,
        markdown: &str,
        dark: bool,
    ) -> Result<PassOutcome, MdbError>
    where
        P: MarkdownParser,
        E: DiagramEngine,
    {
        let token = self.token.get() + 1;
        self.token.set(token);
        self.dark.set(dark);

        let css = Target::Preview.stylesheet(ctx.resolver, ctx.theme, dark);
        *self.stylesheet.borrow_mut() = css;

        let html = match ctx.parser.render(&strip_front_matter(markdown)) {
            Ok(html) => html,
            Err(err) => {
                *self.content.borrow_mut() = format!(
                    "<p class=\"mdb-preview-error\">Preview Error: {}</p>",
                    html_escape(&err.to_string())
                );
                return Err(err);
            }
        };

        let root = build_root(
            &html,
            "",
            ProcessOptions {
                inline_styles: false,
                image_placeholders: true,
            },
        );
        *self.content.borrow_mut() = serialize_node(&root)?;

        let base_id = format!("mdb-preview-{}-{token}", self.id);
        let outcome = render_vector_pass(
            &root,
            ctx.engine,
            dark,
            &base_id,
            || self.token.get() == token,
            |done, total| debug!("{base_id}: {done}/{total} diagram(s)"),
        )
        .await;

        if matches!(outcome, PassOutcome::Settled { .. }) && self.token.get() == token {
            *self.content.borrow_mut() = serialize_node(&root)?;
        }
        Ok(outcome)
    }
}

/// Handle returned by [`AppearanceHub::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type AppearanceCallback = Rc<dyn Fn(bool)>;

/// Fan-out of host appearance changes (light/dark) to live surfaces.
#[derive(Default)]
pub struct AppearanceHub {
    next: Cell<u64>,
    listeners: RefCell<Vec<(SubscriptionId, AppearanceCallback)>>,
}

impl AppearanceHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl Fn(bool) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next.get());
        self.next.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Notify every subscriber; returns how many were called.
    ///
    /// Callbacks run on a snapshot of the list, so they may subscribe or
    /// unsubscribe (themselves included) while being notified.
    pub fn publish(&self, dark: bool) -> usize {
        let listeners: Vec<AppearanceCallback> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for callback in &listeners {
            callback(dark);
        }
        listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::RenderedDiagram;
    use crate::markdown::ComrakParser;
    use tokio::sync::oneshot;

    struct InstantEngine;

    impl DiagramEngine for InstantEngine {
        async fn render(&self, id: &str, _source: &str) -> Result<RenderedDiagram, MdbError> {
            Ok(RenderedDiagram {
                svg: format!("<svg id=\"{id}\"><g class=\"nodes\"></g></svg>"),
            })
        }
    }

    struct FailingParser;

    impl MarkdownParser for FailingParser {
        fn render(&self, _markdown: &str) -> Result<String, MdbError> {
            Err(MdbError::Parse("bad <input>".into()))
        }
    }

    const DOC: &str = "# Hi\n\n```mermaid\nflowchart TD\nA-->B\n```\n";

    #[tokio::test]
    async fn update_renders_scoped_content_and_diagrams() {
        let resolver = ThemeResolver::default();
        let ctx = RenderContext {
            parser: &ComrakParser::new(),
            resolver: &resolver,
            engine: &InstantEngine,
            theme: Some("basic"),
        };
        let surface = PreviewSurface::new();
        surface.mount();
        let outcome = surface.update(ctx, DOC, false).await.unwrap();

        assert_eq!(outcome, PassOutcome::Settled { rendered: 1, failed: 0 });
        let html = surface.html();
        assert!(html.starts_with("<section id=\"mdb\"><h1>Hi</h1>"));
        assert!(html.contains(&format!("id=\"mdb-preview-{}-1-0\"", surface.id())));
        assert!(html.contains("mdb-mermaid-light"));
        assert!(surface.stylesheet().contains("#mdb h1"));
        assert_eq!(surface.ui_theme(), "light");
    }

    #[tokio::test]
    async fn parse_errors_show_inline() {
        let resolver = ThemeResolver::default();
        let ctx = RenderContext {
            parser: &FailingParser,
            resolver: &resolver,
            engine: &InstantEngine,
            theme: None,
        };
        let surface = PreviewSurface::new();
        assert!(surface.update(ctx, "x", true).await.is_err());
        assert_eq!(
            surface.html(),
            "<p class=\"mdb-preview-error\">Preview Error: Parse error: bad &lt;input&gt;</p>"
        );
    }

    /// Blocks the first render until released.
    struct GatedEngine {
        gate: RefCell<Option<oneshot::Receiver<()>>>,
    }

    impl DiagramEngine for GatedEngine {
        async fn render(&self, id: &str, source: &str) -> Result<RenderedDiagram, MdbError> {
            let gate = self.gate.borrow_mut().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            let label = if source.contains("first") { "first" } else { "second" };
            Ok(RenderedDiagram {
                svg: format!("<svg id=\"{id}\"><text>{label}</text></svg>"),
            })
        }
    }

    #[tokio::test]
    async fn newer_update_wins_over_slow_pass() {
        let (release, gate) = oneshot::channel();
        let engine = GatedEngine {
            gate: RefCell::new(Some(gate)),
        };
        let resolver = ThemeResolver::default();
        let parser = ComrakParser::new();
        let ctx = RenderContext {
            parser: &parser,
            resolver: &resolver,
            engine: &engine,
            theme: None,
        };
        let surface = PreviewSurface::new();

        let slow = surface.update(ctx, "```mermaid\ngraph TD\nfirst\n```\n", false);
        let fast = async {
            tokio::task::yield_now().await;
            let outcome = surface
                .update(ctx, "```mermaid\ngraph TD\nsecond\n```\n", false)
                .await;
            let _ = release.send(());
            outcome
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow.unwrap(), PassOutcome::Abandoned { completed: 0 });
        assert_eq!(fast.unwrap(), PassOutcome::Settled { rendered: 1, failed: 0 });
        let html = surface.html();
        assert!(html.contains("second"));
        assert!(!html.contains(">first<"));
        assert_eq!(surface.token(), 2);
    }

    #[tokio::test]
    async fn dispose_abandons_in_flight_pass() {
        let (release, gate) = oneshot::channel();
        let engine = GatedEngine {
            gate: RefCell::new(Some(gate)),
        };
        let resolver = ThemeResolver::default();
        let parser = ComrakParser::new();
        let ctx = RenderContext {
            parser: &parser,
            resolver: &resolver,
            engine: &engine,
            theme: None,
        };
        let surface = PreviewSurface::new();
        let pass = surface.update(ctx, DOC, true);
        let closer = async {
            tokio::task::yield_now().await;
            surface.dispose();
            let _ = release.send(());
        };
        let (outcome, _) = tokio::join!(pass, closer);
        assert_eq!(outcome.unwrap(), PassOutcome::Abandoned { completed: 0 });
        assert_eq!(surface.html(), "");
    }

    #[test]
    fn hub_fans_out_until_unsubscribed() {
        let hub = AppearanceHub::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let a = {
            let seen = seen.clone();
            hub.subscribe(move |dark| seen.borrow_mut().push(("a", dark)))
        };
        {
            let seen = seen.clone();
            hub.subscribe(move |dark| seen.borrow_mut().push(("b", dark)));
        }
        assert_eq!(hub.publish(true), 2);
        assert!(hub.unsubscribe(a));
        assert!(!hub.unsubscribe(a));
        assert_eq!(hub.publish(false), 1);
        assert_eq!(*seen.borrow(), vec![("a", true), ("b", true), ("b", false)]);
    }

    #[test]
    fn callbacks_may_change_subscriptions_while_notified() {
        let hub = Rc::new(AppearanceHub::new());
        let calls = Rc::new(Cell::new(0));
        let own_id = Rc::new(Cell::new(None));
        let id = {
            let inner = Rc::clone(&hub);
            let calls = Rc::clone(&calls);
            let own_id = Rc::clone(&own_id);
            hub.subscribe(move |_| {
                calls.set(calls.get() + 1);
                if let Some(id) = own_id.get() {
                    inner.unsubscribe(id);
                }
                inner.subscribe(|_| {});
            })
        };
        own_id.set(Some(id));

        assert_eq!(hub.publish(true), 1);
        assert_eq!(calls.get(), 1);
        assert!(!hub.unsubscribe(id));
        assert_eq!(hub.publish(false), 1);
        assert_eq!(calls.get(), 1);
    }
}
