//! Error types for the beautify pipeline

use thiserror::Error;

/// Errors that can occur while rendering, converting or publishing a document
#[derive(Debug, Error)]
pub enum MdbError {
    /// Markdown could not be rendered to HTML
    #[error("Parse error: {0}")]
    Parse(String),
    /// Theme key not registered (callers usually fall back to the default theme instead)
    #[error("Theme '{0}' not found")]
    ThemeNotFound(String),
    /// The diagram engine rejected a diagram or could not be started
    #[error("Diagram render failed: {0}")]
    DiagramRender(String),
    /// A diagram render did not finish in time on the raster path
    #[error("Diagram render timed out after {0} ms")]
    DiagramTimeout(u64),
    /// Vector to bitmap conversion failed
    #[error("Rasterization failed: {0}")]
    Raster(String),
    /// HTML or JSON serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Image upload failed (network error, non-200 status or malformed body)
    #[error("Upload failed: {0}")]
    Upload(String),
    /// The configured image host has no uploader
    #[error("Unsupported image host: {0}")]
    UnsupportedHost(String),
    /// The clipboard sink refused the payload
    #[error("Clipboard error: {0}")]
    Clipboard(String),
    /// Standalone export (HTML/PDF) failed
    #[error("Export error: {0}")]
    Export(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for MdbError {
    fn from(err: reqwest::Error) -> Self {
        MdbError::Upload(err.to_string())
    }
}

impl From<serde_json::Error> for MdbError {
    fn from(err: serde_json::Error) -> Self {
        MdbError::Serialization(err.to_string())
    }
}
