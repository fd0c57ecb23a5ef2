//! Scoped temporary workspace for diagram rendering.
//!
//! One workspace is owned by one renderer instance. The directory is created
//! on first use, shared by every render of the same document, and removed by
//! [`Workspace::cleanup`] or when the workspace is dropped. [`Workspace::keep`]
//! detaches the directory instead so it survives for inspection.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::TempDir;
use uuid::Uuid;

/// Lazily created temporary directory.
pub struct Workspace {
    prefix: String,
    dir: Mutex<Option<TempDir>>,
}

impl Workspace {
    /// Create a workspace whose directory name starts with `prefix`.
    ///
    /// No directory is created until [`path`](Self::path) is called.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            dir: Mutex::new(None),
        }
    }

    /// Path of the workspace directory, creating it on first call.
    pub fn path(&self) -> io::Result<PathBuf> {
        let mut dir = self.dir.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = dir.as_ref() {
            return Ok(existing.path().to_path_buf());
        }
        let created = tempfile::Builder::new().prefix(&self.prefix).tempdir()?;
        let path = created.path().to_path_buf();
        tracing::debug!(path = %path.display(), "Created render workspace");
        *dir = Some(created);
        Ok(path)
    }

    /// Allocate a file path inside the workspace that no other call returns.
    ///
    /// Names combine `stem`, a random UUID and `extension`, so concurrent
    /// renders sharing the workspace never collide.
    pub fn unique_file(&self, stem: &str, extension: &str) -> io::Result<PathBuf> {
        let id = Uuid::new_v4().simple();
        Ok(self.path()?.join(format!("{stem}-{id}.{extension}")))
    }

    /// Whether the directory currently exists.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.dir
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Remove the workspace directory and everything in it.
    ///
    /// Safe to call repeatedly; a later [`path`](Self::path) call creates a
    /// fresh directory.
    pub fn cleanup(&self) {
        let taken = self
            .dir
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(dir) = taken {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove render workspace");
            }
        }
    }

    /// Detach the workspace directory so it is never removed.
    ///
    /// Returns the kept path, or `None` if no directory was created. A later
    /// [`path`](Self::path) call creates a fresh directory.
    pub fn keep(&self) -> Option<PathBuf> {
        self.dir
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(TempDir::keep)
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dir = self.dir.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Workspace")
            .field("prefix", &self.prefix)
            .field("dir", &dir.as_ref().map(TempDir::path).map(Path::to_path_buf))
            .finish()
    }
}
