use crate::common::{beautifier, StubEngine, HELLO};
use mdb_core::surface::{PreviewSurface, RenderContext};
use mdb_core::{ComrakParser, PassOutcome, ThemeResolver};

#[tokio::test]
async fn hello_document_renders_scoped_with_light_diagram() {
    let engine = StubEngine::default();
    let resolver = ThemeResolver::default();
    let ctx = RenderContext {
        parser: &ComrakParser::new(),
        resolver: &resolver,
        engine: &engine,
        theme: Some("basic"),
    };
    let surface = PreviewSurface::new();
    surface.mount();
    let outcome = surface.update(ctx, HELLO, false).await.unwrap();
    assert_eq!(outcome, PassOutcome::Settled { rendered: 1, failed: 0 });

    let html = surface.html();
    assert!(html.starts_with("<section id=\"mdb\"><h1>Hi</h1>"));
    assert!(!html.contains("<pre"));
    assert!(html.contains("class=\"mermaid-wrapper\""));
    assert!(html.contains("mdb-mermaid-svg mdb-mermaid-light"));

    let css = surface.stylesheet();
    assert!(css.contains("#mdb h1"));
    assert!(!css.contains(":root"));
    assert!(css.contains("color-scheme: light;"));
}

#[tokio::test]
async fn dark_preview_drops_light_rules() {
    let engine = StubEngine::default();
    let resolver = ThemeResolver::default();
    let ctx = RenderContext {
        parser: &ComrakParser::new(),
        resolver: &resolver,
        engine: &engine,
        theme: None,
    };
    let surface = PreviewSurface::new();
    surface.update(ctx, HELLO, true).await.unwrap();

    assert_eq!(surface.ui_theme(), "dark");
    let html = surface.html();
    assert!(html.contains("mdb-mermaid-svg"));
    assert!(!html.contains("mdb-mermaid-light"));
    let css = surface.stylesheet();
    assert!(css.contains("mdb-dark-mode-converted"));
    assert!(!css.contains("prefers-color-scheme"));
}

#[tokio::test]
async fn render_ids_are_unique_per_surface_and_pass() {
    let engine = StubEngine::default();
    let resolver = ThemeResolver::default();
    let ctx = RenderContext {
        parser: &ComrakParser::new(),
        resolver: &resolver,
        engine: &engine,
        theme: None,
    };
    let a = PreviewSurface::new();
    let b = PreviewSurface::new();
    a.update(ctx, HELLO, false).await.unwrap();
    a.update(ctx, HELLO, false).await.unwrap();
    b.update(ctx, HELLO, false).await.unwrap();

    let ids = engine.ids.borrow();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[0], format!("mdb-preview-{}-1-0", a.id()));
    assert_eq!(ids[1], format!("mdb-preview-{}-2-0", a.id()));
    assert_eq!(ids[2], format!("mdb-preview-{}-1-0", b.id()));
}

#[tokio::test]
async fn preview_page_is_a_full_document() {
    let page = beautifier().preview_page(HELLO, "Hi", false).await.unwrap();
    assert!(page.starts_with("<!DOCTYPE html>"));
    assert!(page.contains("<title>Hi</title>"));
    assert!(page.contains("data-ui-theme=\"light\""));
    assert!(page.contains("<svg"));
}
