//! Run sessions and the at-most-one-run policy
//!
//! A [`Controller`] owns the shared dependency cache and hands out one
//! cancellable [`RunHandle`] per submitted pipeline. Submitting a new run
//! cancels the previous one; the previous run's completion callback still
//! fires exactly once.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::deps::DependencyCache;
use crate::pipeline::{PipelineError, RunRequest, run_pipeline};

/// Callback fired when a session's running state flips.
pub type RunningChanged = Arc<dyn Fn(bool) + Send + Sync>;

/// Entry point for submitting compile-and-run cycles.
///
/// Enforces at most one live session: a new submission cancels the
/// previous handle before its own pipeline starts.
pub struct Controller {
    cache: Arc<DependencyCache>,
    running_changed: Option<RunningChanged>,
    current: Option<RunHandle>,
}

impl Controller {
    /// Create a controller with its own dependency cache.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self::with_cache(Arc::new(DependencyCache::new()?)))
    }

    /// Create a controller sharing an existing dependency cache.
    pub fn with_cache(cache: Arc<DependencyCache>) -> Self {
        Self {
            cache,
            running_changed: None,
            current: None,
        }
    }

    /// The dependency cache shared by this controller's sessions.
    pub fn cache(&self) -> &Arc<DependencyCache> {
        &self.cache
    }

    /// Register a callback observing the running state: `true` when a
    /// session starts, `false` when its completion callback fires.
    pub fn set_running_changed(&mut self, callback: impl Fn(bool) + Send + Sync + 'static) {
        self.running_changed = Some(Arc::new(callback));
    }

    /// Start a new pipeline run, cancelling any previous one first.
    ///
    /// `on_finished` fires exactly once, after cleanup, on every outcome:
    /// success, stage failure, launch failure, cancellation, or an
    /// unexpected internal error.
    pub fn submit(
        &mut self,
        request: RunRequest,
        on_finished: impl FnOnce() + Send + 'static,
    ) -> RunHandle {
        self.stop();

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (finished_tx, finished_rx) = watch::channel(false);

        if let Some(callback) = &self.running_changed {
            callback(true);
        }

        let cache = self.cache.clone();
        let running_changed = self.running_changed.clone();
        let sinks = request.sinks.clone();

        tokio::spawn(async move {
            // The pipeline runs as its own task so that even a panic inside
            // it surfaces here as a JoinError instead of skipping the
            // completion callback.
            let outcome = tokio::spawn(run_pipeline(request, cache, cancel_rx)).await;

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(PipelineError::Cancelled)) => debug!("run cancelled"),
                Ok(Err(PipelineError::StageFailed { stage, code })) => {
                    // The stage's own stderr already carried the details.
                    debug!(stage, code, "stage failed");
                }
                Ok(Err(e)) => sinks.info.append(&format!("ERROR: {e}\n")),
                Err(e) => sinks.info.append(&format!("ERROR: internal error running program: {e}\n")),
            }

            on_finished();
            if let Some(callback) = running_changed {
                callback(false);
            }
            let _ = finished_tx.send(true);
        });

        let handle = RunHandle {
            cancel: Arc::new(cancel_tx),
            finished: finished_rx,
        };
        self.current = Some(handle.clone());
        handle
    }

    /// Cancel the current session, if any.
    ///
    /// Best-effort: kills whatever stage process is active and lets the
    /// pipeline fall through to cleanup. Output already delivered to the
    /// sinks stays delivered. Never fails.
    pub fn stop(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.cancel();
        }
    }
}

/// Cancellable handle to one in-flight pipeline run.
#[derive(Clone)]
pub struct RunHandle {
    cancel: Arc<watch::Sender<bool>>,
    finished: watch::Receiver<bool>,
}

impl RunHandle {
    /// Request cancellation. Safe to call at any time, from any task, and
    /// after completion; repeated calls are no-ops.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Wait until the run's completion callback has fired.
    pub async fn wait(&self) {
        let mut finished = self.finished.clone();
        if *finished.borrow() {
            return;
        }
        while finished.changed().await.is_ok() {
            if *finished.borrow() {
                return;
            }
        }
        // Sender dropped without signalling: the session task is gone,
        // nothing further to wait for.
    }

    /// Whether the run's completion callback has fired.
    pub fn is_finished(&self) -> bool {
        *self.finished.borrow()
    }
}
