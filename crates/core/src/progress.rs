//! Progress reporting for batch runs.
//!
//! The batch processor reports through [`ProgressCallback`] and asks it,
//! between records, whether to keep going. Rendering is left to the caller.

/// Implementations must be `Send + Sync` so a progress sink can be shared
/// with the task driving the batch.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    fn set_message(&self, msg: String);

    fn finish(&self, msg: String);

    /// Checked between records; returning `false` stops the batch after the
    /// current record.
    fn should_continue(&self) -> bool {
        true
    }
}

/// Ignores all progress updates and never cancels.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}
