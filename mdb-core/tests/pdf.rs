#[cfg(all(unix, feature = "native-export"))]
mod unix {
    use crate::common::{beautifier, write_script};
    use mdb_core::pdf::{render_html_to_pdf, PdfPageSize};
    use mdb_core::{publish, ExportFormat, PublishArtifact, PublishSpec};
    use std::fs;
    use tempfile::tempdir;

    /// Copies the page it was given next to the PDF so tests can inspect it.
    const FAKE_CHROME: &str = r#"#!/bin/sh
OUTPUT=""
PAGE=""
for arg in "$@"; do
  case $arg in
    --print-to-pdf=*)
      OUTPUT="${arg#*=}"
      ;;
    file://*)
      PAGE="${arg#file://}"
      ;;
  esac
done
if [ -z "$OUTPUT" ]; then
  echo "missing output" >&2
  exit 1
fi
cp "$PAGE" "$OUTPUT.html"
printf '%%PDF-1.7\n%%%%EOF\n' > "$OUTPUT"
exit 0
"#;

    // Both checks share one test so MDB_CHROME_BIN is never set concurrently.
    #[tokio::test]
    async fn pdf_export_prints_through_chrome() {
        let stub_dir = tempdir().unwrap();
        let chrome = write_script(stub_dir.path(), "fake-chrome.sh", FAKE_CHROME);
        let prev = std::env::var("MDB_CHROME_BIN").ok();
        std::env::set_var("MDB_CHROME_BIN", &chrome);

        let bytes = render_html_to_pdf(
            "<html><head></head><body>x</body></html>",
            PdfPageSize::Mobile,
        )
        .await
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let out_dir = tempdir().unwrap();
        let path = out_dir.path().join("doc.pdf");
        let result = publish(
            &beautifier(),
            PublishSpec::new("# Printed", ExportFormat::Pdf)
                .with_pdf_size(PdfPageSize::A4)
                .with_output_path(&path),
            |_, _| {},
        )
        .await
        .unwrap();
        assert_eq!(result.artifact, PublishArtifact::File(path.clone()));
        assert!(fs::read(&path).unwrap().starts_with(b"%PDF"));

        if let Some(prev) = prev {
            std::env::set_var("MDB_CHROME_BIN", prev);
        } else {
            std::env::remove_var("MDB_CHROME_BIN");
        }
    }
}
