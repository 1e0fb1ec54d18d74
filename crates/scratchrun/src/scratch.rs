//! Scratch directory lifecycle
//!
//! Every pipeline run works inside its own uniquely-named temporary
//! directory holding the source file and whatever the toolchain produces.
//! The directory is deleted on every exit path; a run never reuses another
//! run's directory.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

/// The private working directory of one pipeline run.
///
/// Call [`cleanup()`](Self::cleanup) when the run finishes; dropping the
/// scratchpad without it still removes the directory as a best-effort
/// backstop, but an explicit cleanup gets the failure logged.
#[derive(Debug)]
pub struct Scratchpad {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Scratchpad {
    /// Create a fresh, uniquely-named scratch directory.
    pub fn create() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("scratchrun-").tempdir()?;
        let path = dir.path().to_path_buf();
        debug!(?path, "created scratch directory");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Path of the scratch directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the source file into the scratch directory and return its path.
    pub async fn write_source(
        &self,
        file_name: &str,
        contents: &str,
    ) -> std::io::Result<PathBuf> {
        let path = self.path.join(file_name);
        tokio::fs::write(&path, contents).await?;
        debug!(?path, len = contents.len(), "wrote source file");
        Ok(path)
    }

    /// Recursively delete the scratch directory.
    ///
    /// Deletion failures are logged and swallowed; a leftover temp
    /// directory must never turn a finished run into a failed one.
    pub fn cleanup(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!(path = ?self.path, error = %e, "failed to delete scratch directory");
            } else {
                debug!(path = ?self.path, "deleted scratch directory");
            }
        }
    }
}
