//! Output sinks supplied by the embedding UI
//!
//! The pipeline never talks to a terminal or widget directly; it appends
//! text to three abstract sinks owned by the caller.

use std::sync::Arc;

/// A text-receiving endpoint.
///
/// `append` may be invoked from a background worker; callers that need to
/// touch an event loop are responsible for rethreading themselves.
pub trait Appender: Send + Sync {
    fn append(&self, text: &str);
}

impl<F> Appender for F
where
    F: Fn(&str) + Send + Sync,
{
    fn append(&self, text: &str) {
        self(text)
    }
}

/// The three output channels of a pipeline run.
///
/// `stdout` and `stderr` carry the spawned processes' own streams; `info`
/// carries diagnostics from the pipeline itself (launch failures, stream
/// read errors, exit-code reports).
#[derive(Clone)]
pub struct OutputSinks {
    pub stdout: Arc<dyn Appender>,
    pub stderr: Arc<dyn Appender>,
    pub info: Arc<dyn Appender>,
}

impl OutputSinks {
    pub fn new(
        stdout: Arc<dyn Appender>,
        stderr: Arc<dyn Appender>,
        info: Arc<dyn Appender>,
    ) -> Self {
        Self {
            stdout,
            stderr,
            info,
        }
    }
}

impl std::fmt::Debug for OutputSinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSinks").finish_non_exhaustive()
    }
}
