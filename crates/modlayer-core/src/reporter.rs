//! Reporter trait for dependency injection
//!
//! Core logic reports progress and status through this trait so it is not
//! coupled to a particular terminal UI.

/// Sink for user-facing progress and status messages.
pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Fetching").
    fn section(&self, title: &str);

    /// A remote refresh of one mod has started.
    fn fetching(&self, name: &str);

    /// Updates the progress of a download.
    fn downloading(&self, name: &str, tag: &str, current: u64, total: Option<u64>);

    /// Marks a mod operation as successfully completed.
    fn done(&self, name: &str, tag: &str, detail: &str);

    /// Marks a mod operation as failed with a specific reason.
    fn failed(&self, name: &str, tag: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title)
    }
    fn fetching(&self, name: &str) {
        (**self).fetching(name)
    }
    fn downloading(&self, name: &str, tag: &str, current: u64, total: Option<u64>) {
        (**self).downloading(name, tag, current, total)
    }
    fn done(&self, name: &str, tag: &str, detail: &str) {
        (**self).done(name, tag, detail)
    }
    fn failed(&self, name: &str, tag: &str, reason: &str) {
        (**self).failed(name, tag, reason)
    }
    fn info(&self, msg: &str) {
        (**self).info(msg)
    }
    fn success(&self, msg: &str) {
        (**self).success(msg)
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg)
    }
    fn error(&self, msg: &str) {
        (**self).error(msg)
    }
}

/// A no-op reporter for silent operations (e.g. tests).
#[derive(Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn fetching(&self, _: &str) {}
    fn downloading(&self, _: &str, _: &str, _: u64, _: Option<u64>) {}
    fn done(&self, _: &str, _: &str, _: &str) {}
    fn failed(&self, _: &str, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
}
