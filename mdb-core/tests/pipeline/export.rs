use crate::common::beautifier;
use mdb_core::{publish, ExportFormat, PublishArtifact, PublishSpec};
use tempfile::tempdir;

#[tokio::test]
async fn export_is_mode_adaptive_and_self_contained() {
    let doc = beautifier()
        .export_html("# Report\n\n```mermaid\npie\n\"a\": 1\n```\n", "Report", |_, _| {})
        .await
        .unwrap();

    assert!(doc.starts_with("<!DOCTYPE html>"));
    assert!(doc.contains("@media (prefers-color-scheme: dark)"));
    assert!(doc.contains("#mdb .mermaid-wrapper"));
    assert!(doc.contains("<section id=\"mdb\"><h1>Report</h1>"));
    assert!(doc.contains("data:image/png;base64,"));
}

#[tokio::test]
async fn one_broken_diagram_does_not_sink_the_rest() {
    let md = "```mermaid\ngraph TD\nbroken\n```\n\n```mermaid\nflowchart LR\nA-->B\n```\n";
    let doc = beautifier().export_html(md, "x", |_, _| {}).await.unwrap();

    assert!(doc.contains("Diagram render failed: Parse error on line 2"));
    assert_eq!(doc.matches("data-tool=\"mdb\"").count(), 1);
    let error_at = doc.find("Parse error on line 2").unwrap();
    let source_at = doc.find("broken").unwrap();
    assert!(error_at < source_at);
}

#[tokio::test]
async fn publish_writes_html_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.html");
    let result = publish(
        &beautifier(),
        PublishSpec::new("Hello file", ExportFormat::Html)
            .with_title("File")
            .with_output_path(&path),
        |_, _| {},
    )
    .await
    .unwrap();

    assert_eq!(result.artifact, PublishArtifact::File(path.clone()));
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("<title>File</title>"));
    assert!(written.contains("Hello file"));
}
