//! Image upload: local image discovery, backends and document rewriting.
//!
//! Only the official host has an uploader. Its protocol is a single
//! `multipart/form-data` POST with one `file` part; the server answers 200
//! with `{"url": "..."}`. Anything else is a failure.

use crate::error::MdbError;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

pub const OFFICIAL_HOST: &str = "official";
pub const DEFAULT_UPLOAD_URL: &str = "https://api.wemd.app/upload";

/// Pluggable upload backend.
#[allow(async_fn_in_trait)]
pub trait ImageUploader {
    /// Upload one file and return its public URL.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        content_type: &str,
    ) -> Result<String, MdbError>;
}

/// Resolves an image reference found in a document to its bytes.
#[allow(async_fn_in_trait)]
pub trait ImageLoader {
    async fn load(&self, path: &str) -> Result<Vec<u8>, MdbError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: Option<String>,
}

/// Uploader for the official image host.
#[derive(Debug, Clone)]
pub struct OfficialUploader {
    client: reqwest::Client,
    endpoint: String,
}

impl OfficialUploader {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// The uploader for `host`, if there is one.
    pub fn for_host(host: &str, endpoint: &str) -> Result<Self, MdbError> {
        if host != OFFICIAL_HOST {
            return Err(MdbError::UnsupportedHost(host.to_string()));
        }
        let endpoint = if endpoint.trim().is_empty() {
            DEFAULT_UPLOAD_URL
        } else {
            endpoint
        };
        Ok(Self::new(endpoint))
    }
}

/// `multipart/form-data` body with a single `file` part.
pub fn multipart_body(boundary: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let header = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
    );
    let footer = format!("\r\n--{boundary}--");
    let mut body = Vec::with_capacity(header.len() + bytes.len() + footer.len());
    body.extend_from_slice(header.as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(footer.as_bytes());
    body
}

impl ImageUploader for OfficialUploader {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        content_type: &str,
    ) -> Result<String, MdbError> {
        let boundary = format!("----MdbBoundary{}", uuid::Uuid::new_v4().simple());
        let body = multipart_body(&boundary, file_name, content_type, &bytes);

        let response = self
            .client
            .post(&self.endpoint)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(MdbError::Upload(format!(
                "server returned status {}",
                status.as_u16()
            )));
        }
        let parsed: UploadResponse = response.json().await?;
        let url = parsed
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| MdbError::Upload("response has no url".into()))?;
        info!("uploaded {file_name} to {url}");
        Ok(url)
    }
}

/// Reads images relative to the document's directory.
#[derive(Debug, Clone)]
pub struct FsImageLoader {
    base_dir: PathBuf,
}

impl FsImageLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Percent-decoded filesystem path for a document reference.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, MdbError> {
        let base_dir = std::path::absolute(&self.base_dir)?;
        let not_found = || MdbError::Upload(format!("file not found: {reference}"));
        let base = Url::from_directory_path(&base_dir).map_err(|_| not_found())?;
        base.join(reference.trim())
            .ok()
            .filter(|u| u.scheme() == "file")
            .and_then(|u| u.to_file_path().ok())
            .ok_or_else(not_found)
    }
}

impl ImageLoader for FsImageLoader {
    async fn load(&self, path: &str) -> Result<Vec<u8>, MdbError> {
        let resolved = self.resolve(path)?;
        tokio::fs::read(&resolved)
            .await
            .map_err(|e| MdbError::Upload(format!("cannot read {}: {e}", resolved.display())))
    }
}

/// A local image reference in a Markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// The whole reference as written.
    pub full: String,
    pub alt: String,
    pub path: String,
    /// Byte offset of `full` in the document.
    pub start: usize,
}

static MARKDOWN_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\[\]]*)\]\(([^)]*)\)").expect("valid image pattern"));
static WIKI_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[\[(.*?)\]\]").expect("valid wiki image pattern"));

pub fn is_remote(path: &str) -> bool {
    let path = path.trim();
    path.starts_with("http://") || path.starts_with("https://") || path.starts_with("data:")
}

/// `![alt](path)` and `![[path|alt]]` references to local files, in document order.
pub fn find_local_images(markdown: &str) -> Vec<ImageRef> {
    let mut refs: Vec<ImageRef> = MARKDOWN_IMAGE
        .captures_iter(markdown)
        .filter_map(|c| {
            let full = c.get(0)?;
            Some(ImageRef {
                full: full.as_str().to_string(),
                alt: c[1].to_string(),
                path: c[2].trim().to_string(),
                start: full.start(),
            })
        })
        .collect();

    for c in WIKI_IMAGE.captures_iter(markdown) {
        let Some(full) = c.get(0) else { continue };
        if refs.iter().any(|r| r.start == full.start()) {
            continue;
        }
        let (path, alt) = c[1].split_once('|').unwrap_or((&c[1], ""));
        refs.push(ImageRef {
            full: full.as_str().to_string(),
            alt: alt.to_string(),
            path: path.trim().to_string(),
            start: full.start(),
        });
    }

    refs.retain(|r| !r.path.is_empty() && !is_remote(&r.path));
    refs.sort_by_key(|r| r.start);
    refs
}

/// MIME type from the file extension.
pub fn content_type_for(path: &str) -> String {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("") => "image/png".to_string(),
        Some("jpg") => "image/jpeg".to_string(),
        Some("svg") => "image/svg+xml".to_string(),
        Some("ico") => "image/x-icon".to_string(),
        Some(other) => format!("image/{other}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// The document with every successful upload rewritten.
    pub content: String,
    pub uploaded: usize,
    pub failed: usize,
}

/// Upload every local image and rewrite successes to `![alt](url)`.
///
/// Replacement runs bottom-up so earlier offsets stay valid. Failed
/// references are left exactly as written.
pub async fn upload_all_images<L, U>(markdown: &str, loader: &L, uploader: &U) -> UploadReport
where
    L: ImageLoader,
    U: ImageUploader,
{
    let mut refs = find_local_images(markdown);
    refs.reverse();

    let mut content = markdown.to_string();
    let (mut uploaded, mut failed) = (0, 0);
    for image in refs {
        let result = async {
            let bytes = loader.load(&image.path).await?;
            let file_name = Path::new(&image.path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("image.png")
                .to_string();
            uploader
                .upload(bytes, &file_name, &content_type_for(&image.path))
                .await
        }
        .await;

        match result {
            Ok(url) => {
                let alt = if image.alt.is_empty() { "image" } else { &image.alt };
                content.replace_range(
                    image.start..image.start + image.full.len(),
                    &format!("![{alt}]({url})"),
                );
                uploaded += 1;
            }
            Err(err) => {
                warn!("failed to upload {}: {err}", image.path);
                failed += 1;
            }
        }
    }

    UploadReport {
        content,
        uploaded,
        failed,
    }
}
