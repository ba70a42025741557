//! Timing helpers for the live preview: update debouncing and scroll sync.

use std::cell::Cell;
use std::time::Duration;
use tokio::time::{sleep, Instant};

pub const PREVIEW_DEBOUNCE: Duration = Duration::from_millis(200);
pub const SCROLL_FEEDBACK_WINDOW: Duration = Duration::from_millis(120);

/// Trailing debounce for preview updates.
///
/// Every call to [`Debouncer::request`] waits out the delay; only the last
/// request of a burst resolves to `Some`. A forced request anywhere in the
/// burst makes the surviving request forced.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: Cell<u64>,
    forced: Cell<bool>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Cell::new(0),
            forced: Cell::new(false),
        }
    }

    /// `Some(force)` if this request won the burst, `None` if a later one superseded it.
    pub async fn request(&self, force: bool) -> Option<bool> {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        if force {
            self.forced.set(true);
        }
        sleep(self.delay).await;
        if self.generation.get() != generation {
            return None;
        }
        Some(self.forced.replace(false))
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(PREVIEW_DEBOUNCE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollSide {
    Editor,
    Preview,
}

impl ScrollSide {
    fn other(self) -> Self {
        match self {
            ScrollSide::Editor => ScrollSide::Preview,
            ScrollSide::Preview => ScrollSide::Editor,
        }
    }
}

/// Scroll geometry of one pane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    fn scrollable(&self) -> f64 {
        self.scroll_height - self.client_height
    }

    /// Position as a fraction of the scrollable range.
    pub fn ratio(&self) -> Option<f64> {
        let total = self.scrollable();
        (total > 0.0).then(|| (self.scroll_top / total).clamp(0.0, 1.0))
    }
}

/// Proportional scroll mapping between editor and preview.
///
/// A scroll applied to one side by a sync must not bounce back: events from
/// the side that was just driven are ignored for the feedback window.
#[derive(Debug)]
pub struct ScrollSync {
    window: Duration,
    last_driven: Cell<Option<(ScrollSide, Instant)>>,
}

impl ScrollSync {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_driven: Cell::new(None),
        }
    }

    /// New `scroll_top` for the opposite pane, or `None` when nothing should move.
    pub fn on_scroll(
        &self,
        from: ScrollSide,
        source: ScrollMetrics,
        target: ScrollMetrics,
    ) -> Option<f64> {
        if let Some((driven, at)) = self.last_driven.get() {
            if driven == from && at.elapsed() < self.window {
                return None;
            }
        }
        let ratio = source.ratio()?;
        let total = target.scrollable();
        if total <= 0.0 {
            return None;
        }
        let offset = ratio * total;
        if (target.scroll_top - offset).abs() <= 1.0 {
            return None;
        }
        self.last_driven.set(Some((from.other(), Instant::now())));
        Some(offset)
    }
}

impl Default for ScrollSync {
    fn default() -> Self {
        Self::new(SCROLL_FEEDBACK_WINDOW)
    }
}
