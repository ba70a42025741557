//! Theme resolution per target.
//!
//! `resolve(key, dark, wrap_in_media)` picks the stylesheet (custom override,
//! else built-in, else the default theme) and returns the variant a target
//! needs:
//!
//! | dark  | already marked | wrap  | result                                       |
//! |-------|----------------|-------|----------------------------------------------|
//! | no    | no             | -     | stylesheet as is                             |
//! | no    | yes            | -     | segment before the marker, trimmed           |
//! | yes   | yes            | no    | marker + segment after the marker            |
//! | yes   | yes            | yes   | stylesheet as is                             |
//! | yes   | no             | no    | derived dark block only                      |
//! | yes   | no             | yes   | light + derived dark in a `prefers-color-scheme` media query |
//!
//! Preview and clipboard resolve with `wrap = false` so the editor's mode
//! applies unconditionally. Export resolves with `wrap = true` so the file
//! adapts to whoever opens it. Derived dark blocks are cached per key, the
//! converter runs at most once per stylesheet.

use super::{ThemeRegistry, DEFAULT_THEME};
use crate::css::dark::{DarkModeConverter, HeuristicDarkConverter, DARK_MARK};
use log::{debug, warn};
use std::cell::RefCell;
use std::collections::HashMap;

pub struct ThemeResolver {
    registry: ThemeRegistry,
    custom: HashMap<String, String>,
    default_key: String,
    converter: Box<dyn DarkModeConverter>,
    dark_cache: RefCell<HashMap<String, String>>,
}

impl ThemeResolver {
    pub fn new(registry: ThemeRegistry, converter: impl DarkModeConverter + 'static) -> Self {
        Self {
            registry,
            custom: HashMap::new(),
            default_key: DEFAULT_THEME.to_string(),
            converter: Box::new(converter),
            dark_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Theme used when `resolve` is called without a key.
    pub fn with_default_theme(mut self, key: impl Into<String>) -> Self {
        self.default_key = key.into();
        self
    }

    pub fn default_theme(&self) -> &str {
        &self.default_key
    }

    /// Add or replace a custom theme. A custom key shadows the built-in of that name.
    pub fn set_custom(&mut self, key: impl Into<String>, css: impl Into<String>) {
        let key = key.into();
        self.dark_cache.get_mut().remove(&key);
        self.custom.insert(key, css.into());
    }

    pub fn remove_custom(&mut self, key: &str) -> Option<String> {
        self.dark_cache.get_mut().remove(key);
        self.custom.remove(key)
    }

    /// Every resolvable key, built-in and custom (sorted, no duplicates).
    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.registry.list();
        keys.extend(self.custom.keys().cloned());
        keys.sort();
        keys.dedup();
        keys
    }

    /// The raw stylesheet for `key` together with the key it actually resolved to.
    pub fn stylesheet(&self, key: Option<&str>) -> (String, String) {
        let requested = key
            .filter(|k| !k.trim().is_empty())
            .unwrap_or(&self.default_key);
        if let Some(css) = self.lookup(requested) {
            return (requested.to_string(), css);
        }
        warn!("theme '{requested}' not found, falling back to '{DEFAULT_THEME}'");
        let css = self.lookup(DEFAULT_THEME).unwrap_or_default();
        (DEFAULT_THEME.to_string(), css)
    }

    fn lookup(&self, key: &str) -> Option<String> {
        if let Some(css) = self.custom.get(key).filter(|css| !css.trim().is_empty()) {
            return Some(css.clone());
        }
        self.registry.get(key).ok().map(str::to_string)
    }

    pub fn resolve(&self, key: Option<&str>, dark: bool, wrap_in_media: bool) -> String {
        let (key, css) = self.stylesheet(key);

        if !dark {
            return match css.find(DARK_MARK) {
                Some(idx) => css[..idx].trim().to_string(),
                None => css,
            };
        }

        if let Some((_, dark_part)) = css.rsplit_once(DARK_MARK) {
            if wrap_in_media {
                return css;
            }
            return format!("{DARK_MARK}\n{}", dark_part.trim());
        }

        let derived = self.derive_dark(&key, &css);
        if wrap_in_media {
            format!("{css}\n\n@media (prefers-color-scheme: dark) {{\n{derived}\n}}\n")
        } else {
            derived
        }
    }

    fn derive_dark(&self, key: &str, light: &str) -> String {
        if let Some(cached) = self.dark_cache.borrow().get(key) {
            return cached.clone();
        }
        debug!("deriving dark stylesheet for theme '{key}'");
        let derived = self.converter.convert(light);
        self.dark_cache
            .borrow_mut()
            .insert(key.to_string(), derived.clone());
        derived
    }
}

impl Default for ThemeResolver {
    fn default() -> Self {
        Self::new(ThemeRegistry::with_defaults(), HeuristicDarkConverter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingConverter(Rc<Cell<usize>>);

    impl DarkModeConverter for CountingConverter {
        fn convert(&self, light_css: &str) -> String {
            self.0.set(self.0.get() + 1);
            format!("{DARK_MARK}\n{}", light_css.replace("white", "black"))
        }
    }

    fn counting_resolver() -> (ThemeResolver, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let mut registry = ThemeRegistry::new();
        registry.register("basic", "body { background: white; }");
        let resolver = ThemeResolver::new(registry, CountingConverter(calls.clone()));
        (resolver, calls)
    }

    #[test]
    fn dark_resolution_converts_once() {
        let (resolver, calls) = counting_resolver();
        let first = resolver.resolve(Some("basic"), true, false);
        let second = resolver.resolve(Some("basic"), true, false);
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        assert_eq!(first, format!("{DARK_MARK}\nbody {{ background: black; }}"));
    }

    #[test]
    fn media_wrapping_keeps_light_rules_first() {
        let (resolver, calls) = counting_resolver();
        let css = resolver.resolve(None, true, true);
        assert!(css.starts_with("body { background: white; }"));
        assert!(css.contains("@media (prefers-color-scheme: dark) {\n/* mdb-dark-mode-converted */"));
        resolver.resolve(None, true, false);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn marked_stylesheet_splits_by_mode() {
        let (mut resolver, calls) = counting_resolver();
        let marked = format!("  a {{ color: red; }}\n{DARK_MARK}\n a {{ color: pink; }} ");
        resolver.set_custom("marked", marked.clone());

        assert_eq!(resolver.resolve(Some("marked"), false, false), "a { color: red; }");
        assert_eq!(
            resolver.resolve(Some("marked"), true, false),
            format!("{DARK_MARK}\na {{ color: pink; }}")
        );
        assert_eq!(resolver.resolve(Some("marked"), true, true), marked);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn custom_override_replaces_builtin_and_invalidates_cache() {
        let (mut resolver, calls) = counting_resolver();
        resolver.resolve(Some("basic"), true, false);
        resolver.set_custom("basic", "p { color: white; }");
        assert_eq!(resolver.resolve(Some("basic"), false, false), "p { color: white; }");
        let dark = resolver.resolve(Some("basic"), true, false);
        assert!(dark.contains("p { color: black; }"));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn unknown_key_falls_back_to_default() {
        let resolver = ThemeResolver::default();
        let (key, css) = resolver.stylesheet(Some("does-not-exist"));
        assert_eq!(key, DEFAULT_THEME);
        assert!(!css.is_empty());
    }

    #[test]
    fn blank_custom_entry_does_not_shadow_builtin() {
        let mut resolver = ThemeResolver::default();
        resolver.set_custom("basic", "   ");
        assert!(resolver.resolve(Some("basic"), false, false).contains("Base layer"));
    }
}
