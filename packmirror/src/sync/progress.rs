//! Progress reporting hooks.

/// Receives progress of a synchronization run.
///
/// Each pool phase is bracketed by `start` and `end`; `advance` is called
/// exactly once per resource, whether it was fetched, failed or skipped.
pub trait ProgressSink: Send + Sync {
    /// A phase over `total` resources begins.
    fn start(&self, label: &str, total: u64);

    /// One resource reached a terminal outcome.
    fn advance(&self);

    /// The current phase finished.
    fn end(&self);

    /// A notable event worth showing to the operator.
    fn report(&self, message: &str);
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn start(&self, _label: &str, _total: u64) {}

    fn advance(&self) {}

    fn end(&self) {}

    fn report(&self, _message: &str) {}
}
