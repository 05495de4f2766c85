//! Load progress reporting

use tracing::{debug, info, warn};

use crate::error::LoadError;

/// Receives fetch progress and a terminal signal per asset.
/// Drives the loading overlay in a UI shell.
pub trait ProgressSink: Send + Sync {
    /// Bytes received so far for `path`
    fn progress(&self, path: &str, loaded: u64, total: u64);

    /// Terminal success or failure for `path`
    fn finished(&self, path: &str, result: Result<(), &LoadError>);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn progress(&self, _path: &str, _loaded: u64, _total: u64) {}

    fn finished(&self, _path: &str, _result: Result<(), &LoadError>) {}
}

/// Forwards progress to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn progress(&self, path: &str, loaded: u64, total: u64) {
        let percent = if total > 0 { loaded * 100 / total } else { 0 };
        debug!(path = %path, loaded, total, "Loading {}... {}%", path, percent);
    }

    fn finished(&self, path: &str, result: Result<(), &LoadError>) {
        match result {
            Ok(()) => info!(path = %path, "Model loaded"),
            Err(e) => warn!(path = %path, error = %e, "Model failed to load"),
        }
    }
}
