//! Themed Markdown to HTML for paste-into-editor publishing
//!
//!     This crate turns a Markdown document into HTML that looks the same in
//!     the live preview, after a paste into a rich-text editor that strips
//!     `<style>` and vector markup, and as a standalone exported file.
//!
//!     It is a pure lib: it powers the `mdb` binary but assumes no shell. The
//!     only process-level inputs are the `MDB_MMDC_BIN` and `MDB_CHROME_BIN`
//!     binary overrides read by the native backends.
//!
//! Architecture
//!
//!     Markdown is rendered once (comrak) and everything after that works on
//!     an `Rc` DOM (html5ever + markup5ever_rcdom) wrapped in a single
//!     namespace root, `<section id="mdb">`. Theme CSS is scoped under that
//!     root so it can never leak into the host page, and the three outputs
//!     differ only in how CSS and diagrams are delivered:
//!
//!     - preview: `<style>` element, diagrams as inline SVG, local images
//!       swapped for placeholders
//!     - clipboard: CSS baked into `style=` attributes, diagrams as PNG,
//!       checkboxes as glyphs, the raw Markdown as plain-text sibling
//!     - export: one self-contained document, CSS wrapped in a
//!       `prefers-color-scheme` media query, diagrams as PNG
//!
//!     The file structure :
//!     .
//!     ├── error.rs
//!     ├── dom.rs                  # rcdom helpers
//!     ├── markdown.rs             # MarkdownParser trait, comrak adapter
//!     ├── css
//!     │   ├── mod.rs              # brace-aware stylesheet tree
//!     │   ├── scope.rs            # selector scoping
//!     │   ├── sanitize.rs         # modern colour function removal
//!     │   ├── dark.rs             # dark stylesheet derivation
//!     │   ├── selector.rs         # selector matching over the DOM
//!     │   └── inline.rs           # style inlining for the clipboard
//!     ├── theme                   # registry + per-target resolver
//!     ├── diagram
//!     │   ├── mod.rs              # discovery and theme directives
//!     │   ├── engine.rs           # engine contract, mermaid-cli backend
//!     │   ├── pipeline.rs         # vector and raster passes
//!     │   ├── svg.rs              # z-order fix-ups
//!     │   ├── raster.rs           # resvg rasterization
//!     │   └── paste.rs            # diagrams out of pasted content
//!     ├── assemble.rs             # output targets
//!     ├── surface.rs              # preview surfaces, render tokens
//!     ├── schedule.rs             # debounce and scroll sync
//!     ├── device.rs               # device preview frames
//!     ├── clipboard.rs
//!     ├── upload.rs               # image hosting
//!     ├── notice.rs               # one-outcome reporting
//!     ├── publish.rs              # Beautifier, export to file
//!     └── pdf.rs                  # headless Chrome printing
//!
//! Concurrency
//!
//!     Everything is single threaded. Diagrams inside one pass render one at
//!     a time in document order; passes on the same surface interleave and
//!     the newest wins through the surface's render token. Nothing here is
//!     `Send`, run it on a current-thread runtime or a `LocalSet`.
//!
//! Errors
//!
//!     A broken diagram only ever breaks its own slot. Top-level operations
//!     return [`MdbError`]; hosts turn that into exactly one user notice with
//!     [`notice::run_reported`].

pub mod assemble;
pub mod clipboard;
pub mod css;
pub mod device;
pub mod diagram;
pub mod dom;
pub mod error;
pub mod markdown;
pub mod notice;
pub mod pdf;
pub mod publish;
pub mod schedule;
pub mod surface;
pub mod theme;
pub mod upload;

pub use assemble::{process_html, ProcessOptions, Target};
pub use clipboard::{ClipboardPayload, ClipboardSink, MemoryClipboard};
pub use diagram::{DiagramEngine, PassOutcome, RasterOptions, RenderedDiagram};
pub use error::MdbError;
pub use markdown::{ComrakParser, MarkdownParser};
pub use publish::{publish, Beautifier, ExportFormat, PublishArtifact, PublishResult, PublishSpec};
pub use surface::{AppearanceHub, PreviewSurface, RenderContext};
pub use theme::{ThemeMode, ThemeRegistry, ThemeResolver};
