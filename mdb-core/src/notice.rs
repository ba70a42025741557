//! User-facing outcome reporting for top-level operations.

use crate::error::MdbError;
use log::error;
use std::future::Future;

/// Where progress and terminal outcomes are shown.
pub trait Notifier {
    /// Show or update a persistent "working" indicator.
    fn progress(&self, message: &str);
    /// Hide the indicator.
    fn dismiss(&self);
    fn success(&self, message: &str);
    fn failure(&self, message: &str);
}

/// Run `task` behind a progress indicator and report exactly one outcome.
///
/// The indicator is dismissed on every path. Errors end here: they become a
/// failure notice and `None`.
pub async fn run_reported<N, T, F>(notifier: &N, label: &str, task: F) -> Option<T>
where
    N: Notifier + ?Sized,
    F: Future<Output = Result<T, MdbError>>,
{
    notifier.progress(label);
    let result = task.await;
    notifier.dismiss();
    match result {
        Ok(value) => {
            notifier.success(&format!("{label}: done"));
            Some(value)
        }
        Err(err) => {
            error!("{label} failed: {err}");
            notifier.failure(&format!("{label}: {err}"));
            None
        }
    }
}
