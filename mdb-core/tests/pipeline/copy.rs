use crate::common::beautifier;
use mdb_core::MemoryClipboard;

#[tokio::test]
async fn task_lists_paste_as_glyphs() {
    let md = "- [x] shipped\n- [ ] pending\n";
    let mut sink = MemoryClipboard::default();
    let payload = beautifier().copy_to(md, &mut sink, |_, _| {}).await.unwrap();

    assert_eq!(payload.html.matches("<input").count(), 0);
    assert!(payload.html.contains("✅&nbsp;"));
    assert!(payload.html.contains("⬜&nbsp;"));
    assert_eq!(payload.text, md);
    assert!(sink.last.is_some());
}

#[tokio::test]
async fn diagrams_become_png_figures() {
    let md = "Intro\n\n```mermaid\nflowchart TD\nA-->B\n```\n";
    let mut progress = Vec::new();
    let payload = beautifier()
        .copy(md, |done, total| progress.push((done, total)))
        .await
        .unwrap();

    assert!(payload.html.contains("data-tool=\"mdb\""));
    assert!(payload.html.contains("src=\"data:image/png;base64,"));
    assert!(!payload.html.contains("<svg"));
    assert!(!payload.html.contains("<pre"));
    assert_eq!(progress, vec![(1, 1)]);
}

#[tokio::test]
async fn styles_are_inlined_and_front_matter_dropped() {
    let md = "---\ntitle: x\n---\n# Heading\n\nBody";
    let payload = beautifier().copy(md, |_, _| {}).await.unwrap();

    assert!(!payload.html.contains("title: x"));
    assert!(payload.html.contains("<h1 style=\""));
    assert!(!payload.html.contains("<style"));
    assert!(!payload.html.contains("oklch("));
}
