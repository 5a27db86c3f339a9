//! Reporter trait for dependency injection
//!
//! This trait allows the packaging pipeline to report progress and status
//! without being coupled to a specific terminal implementation.

pub trait Reporter: Send + Sync {
    /// Indicates a new packaging step has started (e.g. "Freezing").
    fn section(&self, title: &str);

    /// Marks one produced file as done, with an optional size in bytes.
    fn produced(&self, path: &std::path::Path, detail: &str, size: Option<u64>);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Display a final summary of the run.
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn produced(&self, path: &std::path::Path, detail: &str, size: Option<u64>) {
        (**self).produced(path, detail, size);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        (**self).summary(count, action, elapsed_secs);
    }
}

/// A no-op reporter for silent operations (e.g., library use, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn produced(&self, _: &std::path::Path, _: &str, _: Option<u64>) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn summary(&self, _: usize, _: &str, _: f64) {}
}
