//! Top-level document operations.
//!
//! [`Beautifier`] bundles a Markdown parser, the theme resolver and a diagram
//! engine, and runs the three output targets on top of them: the standalone
//! preview page, the clipboard payload and the export document.
//!
//! [`publish`] is the file-oriented entry point used by "Export to HTML" and
//! "Export to PDF": it runs the export target and either returns the text or
//! writes it to disk.
//!
//! Every operation here returns its error. Hosts that need the
//! "exactly one notice" behaviour wrap the call in
//! [`run_reported`](crate::notice::run_reported).

use crate::assemble::{
    build_root, clipboard_html, export_document, preview_document, ProcessOptions, Target,
};
use crate::clipboard::{ClipboardPayload, ClipboardSink};
use crate::diagram::{render_raster_pass, DiagramEngine, PassOutcome, RasterOptions};
use crate::dom::serialize_node;
use crate::error::MdbError;
use crate::markdown::{strip_front_matter, MarkdownParser};
use crate::pdf::PdfPageSize;
use crate::surface::{PreviewSurface, RenderContext};
use crate::theme::resolver::ThemeResolver;
use log::info;
use markup5ever_rcdom::Handle;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct Beautifier<P, E> {
    parser: P,
    engine: E,
    resolver: ThemeResolver,
    theme: Option<String>,
    raster: RasterOptions,
}

impl<P: MarkdownParser, E: DiagramEngine> Beautifier<P, E> {
    pub fn new(parser: P, engine: E, resolver: ThemeResolver) -> Self {
        Self {
            parser,
            engine,
            resolver,
            theme: None,
            raster: RasterOptions::default(),
        }
    }

    /// Theme key to render with; unset means the resolver's default.
    pub fn with_theme(mut self, key: impl Into<String>) -> Self {
        self.theme = Some(key.into());
        self
    }

    pub fn with_raster_options(mut self, options: RasterOptions) -> Self {
        self.raster = options;
        self
    }

    pub fn theme(&self) -> Option<&str> {
        self.theme.as_deref()
    }

    pub fn resolver(&self) -> &ThemeResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut ThemeResolver {
        &mut self.resolver
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn context(&self) -> RenderContext<'_, P, E> {
        RenderContext {
            parser: &self.parser,
            resolver: &self.resolver,
            engine: &self.engine,
            theme: self.theme.as_deref(),
        }
    }

    /// Render `markdown` through a fresh preview surface and wrap the result
    /// in a standalone page.
    pub async fn preview_page(
        &self,
        markdown: &str,
        title: &str,
        dark: bool,
    ) -> Result<String, MdbError> {
        let surface = PreviewSurface::new();
        surface.mount();
        surface.update(self.context(), markdown, dark).await?;
        Ok(preview_document(
            title,
            &surface.stylesheet(),
            surface.ui_theme(),
            &surface.html(),
        ))
    }

    /// Build the clipboard payload: inlined light-theme HTML with raster
    /// diagrams, and the raw Markdown as the plain-text flavour.
    pub async fn copy(
        &self,
        markdown: &str,
        progress: impl FnMut(usize, usize),
    ) -> Result<ClipboardPayload, MdbError> {
        let html = self.parser.render(&strip_front_matter(markdown))?;
        let css = Target::Clipboard.stylesheet(&self.resolver, self.theme(), false);
        let root = build_root(
            &html,
            &css,
            ProcessOptions {
                inline_styles: true,
                image_placeholders: false,
            },
        );
        self.rasterize(&root, "copy", progress).await;

        Ok(ClipboardPayload {
            html: clipboard_html(&serialize_node(&root)?),
            text: markdown.to_string(),
        })
    }

    /// [`copy`](Self::copy) straight into `sink`, both flavours in one write.
    pub async fn copy_to(
        &self,
        markdown: &str,
        sink: &mut impl ClipboardSink,
        progress: impl FnMut(usize, usize),
    ) -> Result<ClipboardPayload, MdbError> {
        let payload = self.copy(markdown, progress).await?;
        sink.write(&payload)?;
        info!("copied {} bytes of HTML", payload.html.len());
        Ok(payload)
    }

    /// Self-contained HTML document that follows the viewer's color scheme.
    pub async fn export_html(
        &self,
        markdown: &str,
        title: &str,
        progress: impl FnMut(usize, usize),
    ) -> Result<String, MdbError> {
        let html = self.parser.render(&strip_front_matter(markdown))?;
        let css = Target::Export.stylesheet(&self.resolver, self.theme(), false);
        let root = build_root(&html, &css, ProcessOptions::default());
        self.rasterize(&root, "export", progress).await;
        Ok(export_document(title, &css, &serialize_node(&root)?))
    }

    async fn rasterize(
        &self,
        root: &Handle,
        purpose: &str,
        progress: impl FnMut(usize, usize),
    ) -> PassOutcome {
        let base_id = format!("mdb-{purpose}-{}", Uuid::new_v4().simple());
        let outcome = render_raster_pass(root, &self.engine, self.raster, &base_id, progress).await;
        if let PassOutcome::Settled { rendered, failed } = outcome {
            if rendered + failed > 0 {
                info!("{purpose}: {rendered} diagram(s) rasterized, {failed} failed");
            }
        }
        outcome
    }
}

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Html,
    Pdf,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Result<Self, MdbError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(ExportFormat::Html),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(MdbError::Export(format!("Unsupported export format '{other}'"))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// Specifies how to export a document.
///
/// ```ignore
/// let spec = PublishSpec::new(&markdown, ExportFormat::Pdf)
///     .with_title("Notes")
///     .with_pdf_size(PdfPageSize::Mobile)
///     .with_output_path("notes.pdf");
/// ```
///
/// Without an output path HTML comes back in memory. PDF always needs one.
#[derive(Debug)]
pub struct PublishSpec<'a> {
    pub markdown: &'a str,
    pub format: ExportFormat,
    pub title: String,
    pub output: Option<PathBuf>,
    pub pdf_size: PdfPageSize,
}

impl<'a> PublishSpec<'a> {
    pub fn new(markdown: &'a str, format: ExportFormat) -> Self {
        Self {
            markdown,
            format,
            title: "Document".to_string(),
            output: None,
            pdf_size: PdfPageSize::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_output_path(mut self, path: impl AsRef<Path>) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_pdf_size(mut self, size: PdfPageSize) -> Self {
        self.pdf_size = size;
        self
    }
}

/// The output from a successful publish operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishArtifact {
    InMemory(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishResult {
    pub artifact: PublishArtifact,
}

/// Export a document according to `spec`.
///
/// # Errors
///
/// Parse and I/O failures, a PDF request without an output path, and
/// anything the PDF printer reports. Diagram failures are not errors: they
/// end up as error blocks inside the document.
pub async fn publish<P, E>(
    beautifier: &Beautifier<P, E>,
    spec: PublishSpec<'_>,
    progress: impl FnMut(usize, usize),
) -> Result<PublishResult, MdbError>
where
    P: MarkdownParser,
    E: DiagramEngine,
{
    if spec.format == ExportFormat::Pdf && spec.output.is_none() {
        return Err(MdbError::Export(
            "PDF export requires an explicit output path".to_string(),
        ));
    }

    let html = beautifier
        .export_html(spec.markdown, &spec.title, progress)
        .await?;
    match spec.format {
        ExportFormat::Html => write_or_return_text(html, spec.output),
        ExportFormat::Pdf => {
            let bytes = print_pdf(&html, spec.pdf_size).await?;
            write_binary(bytes, spec.output)
        }
    }
}

#[cfg(feature = "native-export")]
async fn print_pdf(html: &str, size: PdfPageSize) -> Result<Vec<u8>, MdbError> {
    crate::pdf::render_html_to_pdf(html, size).await
}

#[cfg(not(feature = "native-export"))]
async fn print_pdf(_html: &str, _size: PdfPageSize) -> Result<Vec<u8>, MdbError> {
    Err(MdbError::Export(
        "PDF export requires the native-export feature".to_string(),
    ))
}

fn write_or_return_text(text: String, output: Option<PathBuf>) -> Result<PublishResult, MdbError> {
    if let Some(path) = output {
        write_to_path(path, text.into_bytes()).map(|path| PublishResult {
            artifact: PublishArtifact::File(path),
        })
    } else {
        Ok(PublishResult {
            artifact: PublishArtifact::InMemory(text),
        })
    }
}

fn write_binary(bytes: Vec<u8>, output: Option<PathBuf>) -> Result<PublishResult, MdbError> {
    let path = output.ok_or_else(|| {
        MdbError::Export("binary formats require an explicit output path".to_string())
    })?;
    write_to_path(path, bytes).map(|path| PublishResult {
        artifact: PublishArtifact::File(path),
    })
}

fn write_to_path(path: PathBuf, bytes: Vec<u8>) -> Result<PathBuf, MdbError> {
    fs::write(&path, &bytes)?;
    Ok(path)
}
