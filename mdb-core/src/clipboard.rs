//! Clipboard payloads and sinks.

use crate::error::MdbError;

pub const HTML_MIME: &str = "text/html";
pub const TEXT_MIME: &str = "text/plain";

/// HTML and plain-text flavours, always written together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub html: String,
    /// The raw Markdown, for destinations without HTML support.
    pub text: String,
}

impl ClipboardPayload {
    /// Plain text only, for hosts configured not to copy HTML.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            html: String::new(),
            text: text.into(),
        }
    }

    pub fn is_text_only(&self) -> bool {
        self.html.is_empty()
    }

    /// `(mime, payload)` pairs to write together.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        let mut entries = Vec::with_capacity(2);
        if !self.is_text_only() {
            entries.push((HTML_MIME, self.html.as_str()));
        }
        entries.push((TEXT_MIME, self.text.as_str()));
        entries
    }
}

/// Accepts all flavours of a payload in one atomic write.
pub trait ClipboardSink {
    fn write(&mut self, payload: &ClipboardPayload) -> Result<(), MdbError>;
}

/// Keeps the last payload; used by `--stdout` and tests.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    pub last: Option<ClipboardPayload>,
}

impl ClipboardSink for MemoryClipboard {
    fn write(&mut self, payload: &ClipboardPayload) -> Result<(), MdbError> {
        self.last = Some(payload.clone());
        Ok(())
    }
}

#[cfg(feature = "system-clipboard")]
pub use system::SystemClipboard;

#[cfg(feature = "system-clipboard")]
mod system {
    use super::{ClipboardPayload, ClipboardSink};
    use crate::error::MdbError;
    use log::debug;

    /// The OS clipboard via `arboard`.
    #[derive(Default)]
    pub struct SystemClipboard {
        inner: Option<arboard::Clipboard>,
    }

    impl SystemClipboard {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl ClipboardSink for SystemClipboard {
        fn write(&mut self, payload: &ClipboardPayload) -> Result<(), MdbError> {
            if self.inner.is_none() {
                let clipboard =
                    arboard::Clipboard::new().map_err(|e| MdbError::Clipboard(e.to_string()))?;
                self.inner = Some(clipboard);
            }
            let Some(clipboard) = self.inner.as_mut() else {
                return Err(MdbError::Clipboard("clipboard unavailable".into()));
            };
            if payload.is_text_only() {
                clipboard
                    .set_text(payload.text.as_str())
                    .map_err(|e| MdbError::Clipboard(e.to_string()))?;
                debug!("wrote {} bytes of text to the clipboard", payload.text.len());
            } else {
                clipboard
                    .set_html(payload.html.as_str(), Some(payload.text.as_str()))
                    .map_err(|e| MdbError::Clipboard(e.to_string()))?;
                debug!("wrote {} bytes of HTML to the clipboard", payload.html.len());
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_both_flavours() {
        let payload = ClipboardPayload {
            html: "<p>x</p>".into(),
            text: "x".into(),
        };
        let mut sink = MemoryClipboard::default();
        sink.write(&payload).unwrap();
        let stored = sink.last.unwrap();
        assert_eq!(
            stored.entries(),
            vec![("text/html", "<p>x</p>"), ("text/plain", "x")]
        );
    }

    #[test]
    fn text_only_payload_has_one_entry() {
        let payload = ClipboardPayload::text_only("# md");
        assert!(payload.is_text_only());
        assert_eq!(payload.entries(), vec![("text/plain", "# md")]);
    }
}
