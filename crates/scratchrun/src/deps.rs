//! Dependency discovery and the process-wide fetch cache
//!
//! Source text can request dependencies with marker lines; each marker
//! becomes one fetch stage. Fetched dependencies are cached in private
//! directories for the lifetime of the cache, so repeat runs copy instead
//! of re-downloading.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tempfile::TempDir;
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell, watch};
use tracing::{debug, instrument};

use crate::exec::{ProcessError, run_streamed};
use crate::sink::OutputSinks;

/// Sentinel that marks a dependency request line in source text.
///
/// Any line containing the sentinel followed by whitespace and an
/// identifier requests that dependency, so the marker works inside the
/// comment syntax of any language (`//DEPS x`, `# //DEPS x`, ...).
pub const DEPENDENCY_MARKER: &str = "//DEPS";

/// Scan source text for dependency markers.
///
/// Returns one identifier per marker line, in source order, duplicates
/// included. Markers with a blank identifier are ignored.
pub fn scan_dependencies(source: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| {
            let idx = line.find(DEPENDENCY_MARKER)?;
            let rest = &line[idx + DEPENDENCY_MARKER.len()..];
            if !rest.starts_with(char::is_whitespace) {
                return None;
            }
            let id = rest.trim();
            (!id.is_empty()).then(|| id.to_owned())
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("failed to start dependency fetch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("dependency fetch for '{id}' exited with code {code}")]
    FetchFailed { id: String, code: i32 },

    #[error("dependency fetch for '{id}' was cancelled")]
    Cancelled { id: String },

    #[error("empty dependency fetch command")]
    EmptyCommand,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Process-wide cache of fetched dependencies.
///
/// Maps a dependency identifier to the private directory its fetch command
/// populated. Entries are registered only after a fetch exits zero, live
/// until the cache is dropped, and are never evicted. The cache is an
/// explicit, injectable object so tests can supply an isolated instance
/// and assert fetch counts.
#[derive(Debug)]
pub struct DependencyCache {
    root: TempDir,
    entries: Mutex<HashMap<String, Arc<OnceCell<PathBuf>>>>,
    next_dir: AtomicU64,
}

impl DependencyCache {
    /// Create a cache rooted in a fresh private directory.
    pub fn new() -> std::io::Result<Self> {
        let root = tempfile::Builder::new()
            .prefix("scratchrun-deps-")
            .tempdir()?;
        debug!(path = ?root.path(), "created dependency cache");
        Ok(Self {
            root,
            entries: Mutex::new(HashMap::new()),
            next_dir: AtomicU64::new(0),
        })
    }

    /// Make a dependency's files available in `target`.
    ///
    /// On the first request for an identifier the fetch command (`argv`,
    /// already expanded, with the identifier as its final argument) runs
    /// inside a new private directory, streaming its output through
    /// `sinks`; the mapping is registered only if it exits zero. Every
    /// request, first or repeat, then recursively copies the cached
    /// directory's contents into `target`.
    ///
    /// Concurrent first requests for the same identifier are serialized;
    /// at most one fetch per key ever succeeds. A failed or cancelled
    /// fetch leaves the key unregistered, so a later request retries.
    #[instrument(skip(self, argv, sinks, cancel))]
    pub async fn materialize(
        &self,
        id: &str,
        argv: &[String],
        target: &Path,
        sinks: &OutputSinks,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), DependencyError> {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(id.to_owned()).or_default().clone()
        };

        if cell.get().is_none() {
            debug!(id, "dependency not cached, fetching");
        }

        let dir = cell
            .get_or_try_init(|| self.fetch(id, argv, sinks, cancel))
            .await?;

        debug!(id, cached = ?dir, "copying dependency into scratch directory");
        copy_dir_contents(dir, target).await?;
        Ok(())
    }

    /// Number of registered (successfully fetched) dependencies.
    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        let mut initialized = 0;
        for cell in entries.values() {
            if cell.get().is_some() {
                initialized += 1;
            }
        }
        initialized
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn fetch(
        &self,
        id: &str,
        argv: &[String],
        sinks: &OutputSinks,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<PathBuf, DependencyError> {
        let dir = self
            .root
            .path()
            .join(format!("dep-{}", self.next_dir.fetch_add(1, Ordering::Relaxed)));
        tokio::fs::create_dir(&dir).await?;

        sinks.info.append(&format!("Fetching dependency {id}\n"));

        match run_streamed(argv, &dir, None, sinks, cancel).await {
            Ok(Some(0)) => {
                debug!(id, ?dir, "dependency fetched");
                Ok(dir)
            }
            Ok(code) => Err(DependencyError::FetchFailed {
                id: id.to_owned(),
                code: code.unwrap_or(-1),
            }),
            Err(ProcessError::Cancelled) => Err(DependencyError::Cancelled { id: id.to_owned() }),
            Err(ProcessError::Spawn { program, source }) => {
                Err(DependencyError::Spawn { program, source })
            }
            Err(ProcessError::EmptyCommand) => Err(DependencyError::EmptyCommand),
            Err(ProcessError::Io(e)) => Err(DependencyError::Io(e)),
        }
    }
}

/// Recursively copy the contents of `src` into `dst` (which must exist or
/// be creatable). Files are copied, directories recreated.
async fn copy_dir_contents(src: &Path, dst: &Path) -> std::io::Result<()> {
    let mut queue = vec![(src.to_path_buf(), dst.to_path_buf())];

    while let Some((from, to)) = queue.pop() {
        tokio::fs::create_dir_all(&to).await?;
        let mut entries = tokio::fs::read_dir(&from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = to.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                queue.push((entry.path(), target));
            } else {
                tokio::fs::copy(entry.path(), &target).await?;
            }
        }
    }

    Ok(())
}
