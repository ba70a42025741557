//! Terminal rendition of the notice contract: everything goes to stderr so
//! stdout stays clean for generated HTML.

use mdb_core::notice::Notifier;
use std::cell::{Cell, RefCell};

#[derive(Debug, Default)]
pub struct TerminalNotifier {
    active: RefCell<Option<String>>,
    failed: Cell<bool>,
}

impl TerminalNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any reported operation failed.
    pub fn failed(&self) -> bool {
        self.failed.get()
    }
}

impl Notifier for TerminalNotifier {
    fn progress(&self, message: &str) {
        eprintln!("{message}...");
        *self.active.borrow_mut() = Some(message.to_string());
    }

    fn dismiss(&self) {
        self.active.borrow_mut().take();
    }

    fn success(&self, message: &str) {
        eprintln!("{message}");
    }

    fn failure(&self, message: &str) {
        self.failed.set(true);
        eprintln!("Error: {message}");
    }
}
