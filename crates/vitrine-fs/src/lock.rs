//! Sentinel-file lock for the sync directory.
//!
//! Two kiosk devices can point at the same directory; the sentinel keeps
//! their snapshot writes from racing. The lock is advisory: whoever finds
//! `database.lock` present treats the directory as busy and aborts.

use std::{
  io,
  path::{Path, PathBuf},
  sync::Arc
};

use tracing::{debug, warn};
use vitrine_core::ProviderError;

use crate::fs::LocalFileSystem;

/// Name of the sentinel file.
pub const LOCK_FILE: &str = "database.lock";

/// A held directory lock. Removing the sentinel is guaranteed: it happens
/// on drop, whatever exit path the write takes.
pub struct DirLock {
  fs: Arc<dyn LocalFileSystem>,
  path: PathBuf
}

impl std::fmt::Debug for DirLock {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DirLock").field("path", &self.path).finish()
  }
}

impl DirLock {
  /// Acquire the lock by creating the sentinel.
  ///
  /// # Errors
  ///
  /// Returns [`ProviderError::Locked`] when the sentinel already exists
  /// (another sync is in progress), or the underlying I/O error.
  pub fn acquire(fs: Arc<dyn LocalFileSystem>, dir: &Path) -> anyhow::Result<Self> {
    let path = dir.join(LOCK_FILE);

    match fs.create_new(&path) {
      Ok(()) => {
        debug!(path = %path.display(), "lock acquired");
        Ok(Self { fs, path })
      }
      Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(ProviderError::Locked.into()),
      Err(e) => Err(e.into())
    }
  }
}

impl Drop for DirLock {
  fn drop(&mut self) {
    if let Err(e) = self.fs.remove(&self.path) {
      warn!(path = %self.path.display(), error = %e, "failed to remove lock file");
    } else {
      debug!(path = %self.path.display(), "lock released");
    }
  }
}
