//! Theme catalogue.
//!
//! Built-in themes are layered stylesheets concatenated in a fixed order:
//! base, then an optional accent, then the code highlighting layer. Later
//! layers win through the cascade, nothing is merged. Custom themes live in
//! the [`ThemeResolver`] and replace a built-in of the same key outright.

pub mod resolver;

pub use resolver::ThemeResolver;

use crate::error::MdbError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key every lookup falls back to.
pub const DEFAULT_THEME: &str = "basic";

const BASE_LAYER: &str = include_str!("../../css/base.css");
const CODE_LAYER: &str = include_str!("../../css/code/github.css");

const ACCENTS: &[(&str, &str)] = &[
    ("basic", include_str!("../../css/accents/default.css")),
    (
        "academic-paper",
        include_str!("../../css/accents/academic-paper.css"),
    ),
    ("bauhaus", include_str!("../../css/accents/bauhaus.css")),
    (
        "morandi-forest",
        include_str!("../../css/accents/morandi-forest.css"),
    ),
    (
        "neo-brutalism",
        include_str!("../../css/accents/neo-brutalism.css"),
    ),
    ("receipt", include_str!("../../css/accents/receipt.css")),
    ("sunset-film", include_str!("../../css/accents/sunset-film.css")),
];

/// Light/dark preference as configured by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Follow the host appearance
    #[default]
    Auto,
    Light,
    Dark,
}

impl ThemeMode {
    pub fn is_dark(self, host_is_dark: bool) -> bool {
        match self {
            ThemeMode::Auto => host_is_dark,
            ThemeMode::Light => false,
            ThemeMode::Dark => true,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(ThemeMode::Auto),
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            _ => None,
        }
    }
}

/// Registry of built-in stylesheets keyed by theme name
///
/// # Examples
///
/// ```ignore
/// let registry = ThemeRegistry::with_defaults();
/// assert!(registry.get("basic")?.contains("h1"));
/// ```
pub struct ThemeRegistry {
    themes: HashMap<String, String>,
}

impl ThemeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        ThemeRegistry {
            themes: HashMap::new(),
        }
    }

    /// Register a stylesheet, replacing any previous one with that key.
    pub fn register(&mut self, key: impl Into<String>, css: impl Into<String>) {
        self.themes.insert(key.into(), css.into());
    }

    pub fn get(&self, key: &str) -> Result<&str, MdbError> {
        self.themes
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| MdbError::ThemeNotFound(key.to_string()))
    }

    pub fn has(&self, key: &str) -> bool {
        self.themes.contains_key(key)
    }

    /// List all theme keys (sorted)
    pub fn list(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.themes.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Create a registry holding every built-in theme
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("code-github", compose(&[BASE_LAYER, CODE_LAYER]));
        for (key, accent) in ACCENTS {
            registry.register(*key, compose(&[BASE_LAYER, *accent, CODE_LAYER]));
        }
        registry
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Concatenate layers in order.
pub fn compose(layers: &[&str]) -> String {
    layers
        .iter()
        .map(|layer| layer.trim())
        .filter(|layer| !layer.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_include_basic_and_code_only_theme() {
        let registry = ThemeRegistry::with_defaults();
        assert!(registry.has(DEFAULT_THEME));
        assert!(registry.has("code-github"));
        assert!(registry.list().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn layers_keep_fixed_order() {
        let registry = ThemeRegistry::with_defaults();
        let css = registry.get("bauhaus").unwrap();
        let base = css.find("Base layer").unwrap();
        let accent = css.find("Bauhaus").unwrap();
        let code = css.find("Code highlighting layer").unwrap();
        assert!(base < accent && accent < code);
    }

    #[test]
    fn missing_theme_is_an_error() {
        let registry = ThemeRegistry::new();
        assert!(matches!(
            registry.get("nope"),
            Err(MdbError::ThemeNotFound(_))
        ));
    }

    #[test]
    fn mode_resolution_follows_host_only_in_auto() {
        assert!(ThemeMode::Auto.is_dark(true));
        assert!(!ThemeMode::Light.is_dark(true));
        assert!(ThemeMode::Dark.is_dark(false));
        assert_eq!(ThemeMode::parse("DARK"), Some(ThemeMode::Dark));
    }
}
