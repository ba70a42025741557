//! Shared configuration loader for the mdb toolchain.
//!
//! `defaults/mdb.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer a user settings file
//! (TOML or JSON) and CLI overrides on top of those defaults via [`Loader`]
//! before deserializing into [`MdbConfig`]: user settings are always merged
//! over defaults, never used on their own.
//!
//! [`save_settings`] is the only write path.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use mdb_core::device::{DeviceFrame, DevicePreset, Scale};
use mdb_core::diagram::RasterOptions;
use mdb_core::pdf::PdfPageSize;
use mdb_core::theme::{ThemeMode, ThemeResolver};
use mdb_core::upload::OfficialUploader;
use mdb_core::MdbError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/mdb.default.toml");

/// Top-level configuration consumed by mdb applications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MdbConfig {
    pub general: GeneralConfig,
    #[serde(default)]
    pub themes: ThemesConfig,
    pub image_host: ImageHostConfig,
    pub preview: PreviewConfig,
    pub diagram: DiagramConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub default_theme: String,
    pub theme_mode: ThemeMode,
    pub copy_as_html: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemesConfig {
    /// Theme key to stylesheet text.
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageHostConfig {
    pub active: String,
    pub official_upload_url: String,
    pub auto_upload: bool,
    /// Credentials per third-party host, kept but unused by the uploader.
    #[serde(default)]
    pub hosts: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    pub device: DevicePreset,
    pub custom_width: String,
    pub custom_height: String,
    pub rotated: bool,
    pub auto_scale: bool,
    pub manual_scale: u32,
    pub sync_scroll: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramConfig {
    pub render_timeout_ms: u64,
    pub supersample: f32,
    /// Empty means "detect".
    pub mmdc_bin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    pub pdf: PdfConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfConfig {
    pub size: PdfPageSize,
}

impl MdbConfig {
    /// Built-in themes plus the configured custom ones.
    pub fn theme_resolver(&self) -> ThemeResolver {
        let mut resolver =
            ThemeResolver::default().with_default_theme(self.general.default_theme.clone());
        for (key, css) in &self.themes.custom {
            resolver.set_custom(key.clone(), css.clone());
        }
        resolver
    }

    pub fn raster_options(&self) -> RasterOptions {
        RasterOptions {
            timeout: Duration::from_millis(self.diagram.render_timeout_ms),
            scale: self.diagram.supersample,
        }
    }

    pub fn mmdc_bin(&self) -> Option<PathBuf> {
        let bin = self.diagram.mmdc_bin.trim();
        (!bin.is_empty()).then(|| PathBuf::from(bin))
    }

    pub fn device_frame(&self) -> DeviceFrame {
        DeviceFrame {
            preset: self.preview.device,
            custom_width: self.preview.custom_width.clone(),
            custom_height: self.preview.custom_height.clone(),
            rotated: self.preview.rotated,
        }
    }

    pub fn preview_scale(&self) -> Scale {
        if self.preview.auto_scale {
            Scale::Auto
        } else {
            Scale::Manual(self.preview.manual_scale)
        }
    }

    /// Uploader for the active image host.
    pub fn uploader(&self) -> Result<OfficialUploader, MdbError> {
        OfficialUploader::for_host(&self.image_host.active, &self.image_host.official_upload_url)
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a settings file (`.json` or TOML). Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let source = File::from(path).format(file_format(path)).required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional settings file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let source = File::from(path).format(file_format(path)).required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<MdbConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

fn file_format(path: &Path) -> FileFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => FileFormat::Json,
        _ => FileFormat::Toml,
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<MdbConfig, ConfigError> {
    Loader::new().build()
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Persist `config` as pretty JSON, creating parent directories as needed.
pub fn save_settings(path: impl AsRef<Path>, config: &MdbConfig) -> Result<(), SettingsError> {
    let path = path.as_ref();
    let write_err = |source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json).map_err(write_err)
}
