//! PDF export on top of the HTML export + headless Chrome.
//!
//! The export document gets page-size specific CSS injected, then a
//! Chrome/Chromium binary running in headless mode prints it to PDF.

use crate::error::MdbError;
use serde::{Deserialize, Serialize};
#[cfg(feature = "native-export")]
use log::{debug, info};
#[cfg(feature = "native-export")]
use std::{env, path::PathBuf};
#[cfg(feature = "native-export")]
use tempfile::tempdir;
#[cfg(feature = "native-export")]
use tokio::process::Command;
#[cfg(feature = "native-export")]
use url::Url;
#[cfg(feature = "native-export")]
use which::which;

/// Page profile for printed output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfPageSize {
    #[default]
    A4,
    Mobile,
}

impl PdfPageSize {
    pub fn parse(value: &str) -> Result<Self, MdbError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "a4" => Ok(PdfPageSize::A4),
            "mobile" => Ok(PdfPageSize::Mobile),
            other => Err(MdbError::Export(format!(
                "Invalid PDF size '{other}' (expected a4 or mobile)"
            ))),
        }
    }

    pub fn print_css(&self) -> &'static str {
        match self {
            PdfPageSize::A4 => "@page { size: 210mm 297mm; margin: 18mm; }\nbody { margin: 0; }\n",
            PdfPageSize::Mobile => {
                "@page { size: 90mm 160mm; margin: 5mm; }\nbody { margin: 0; }\n#mdb { max-width: calc(90mm - 10mm); }\n"
            }
        }
    }

    #[cfg_attr(not(feature = "native-export"), allow(dead_code))]
    fn viewport(&self) -> (u32, u32) {
        match self {
            PdfPageSize::A4 => (1280, 960),
            PdfPageSize::Mobile => (450, 900),
        }
    }
}

pub fn inject_page_css(html: &str, css: &str) -> String {
    let style_tag = format!("<style data-mdb-pdf>\n{css}\n</style>");
    if let Some(idx) = html.find("</head>") {
        let mut output = String::with_capacity(html.len() + style_tag.len());
        output.push_str(&html[..idx]);
        output.push_str(&style_tag);
        output.push_str(&html[idx..]);
        output
    } else {
        format!("{style_tag}{html}")
    }
}

/// Print a standalone HTML document to PDF bytes.
#[cfg(feature = "native-export")]
pub async fn render_html_to_pdf(html: &str, size: PdfPageSize) -> Result<Vec<u8>, MdbError> {
    let chrome = resolve_chrome_binary()?;
    let final_html = inject_page_css(html, size.print_css());

    let temp_dir = tempdir().map_err(|e| MdbError::Export(format!("Temp dir error: {e}")))?;
    let html_path = temp_dir.path().join("mdb-export.html");
    tokio::fs::write(&html_path, final_html.as_bytes()).await?;

    let pdf_path = temp_dir.path().join("mdb-export.pdf");
    let file_url = Url::from_file_path(&html_path).map_err(|_| {
        MdbError::Export("Failed to construct file:// URL for HTML input".to_string())
    })?;

    let pdf_arg = format!("--print-to-pdf={}", pdf_path.display());
    let window_arg = {
        let (w, h) = size.viewport();
        format!("--window-size={w},{h}")
    };

    debug!("printing {} with {}", file_url, chrome.display());
    let status = Command::new(&chrome)
        .arg("--headless")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--print-to-pdf-no-header")
        .arg(pdf_arg)
        .arg(window_arg)
        .arg(file_url.as_str())
        .status()
        .await
        .map_err(|e| {
            MdbError::Export(format!(
                "Failed to launch Chrome ({}): {}",
                chrome.display(),
                e
            ))
        })?;

    if !status.success() {
        return Err(MdbError::Export(format!("Chrome exited with status {status}")));
    }

    tokio::fs::read(&pdf_path)
        .await
        .map_err(|e| MdbError::Export(format!("Chrome produced no PDF: {e}")))
}

#[cfg(feature = "native-export")]
fn resolve_chrome_binary() -> Result<PathBuf, MdbError> {
    if let Some(path) = env::var_os("MDB_CHROME_BIN") {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    for var in ["GOOGLE_CHROME_BIN", "CHROME_BIN"] {
        if let Some(path) = env::var_os(var) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
    }

    for candidate in [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "chrome",
        "msedge",
    ] {
        if let Ok(path) = which(candidate) {
            info!("using Chrome at {}", path.display());
            return Ok(path);
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidate = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    #[cfg(target_os = "windows")]
    {
        let candidates = [
            r"C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
            r"C:\\Program Files (x86)\\Google\\Chrome\\Application\\chrome.exe",
        ];
        for candidate in candidates {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium-browser",
            "/usr/bin/chromium",
        ];
        for candidate in candidates {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    Err(MdbError::Export(
        "Unable to locate a Chrome/Chromium binary. Set MDB_CHROME_BIN to override the detection."
            .to_string(),
    ))
}
