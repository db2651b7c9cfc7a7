//! Local filesystem abstraction.
//!
//! The provider talks to the directory through this trait so that
//! platform-specific capabilities (native filesystem here, sandboxed
//! directory grants elsewhere) satisfy one interface, and tests can
//! substitute a failing filesystem.

use std::{
  io,
  path::{Path, PathBuf}
};

/// Synchronous filesystem operations against a granted directory.
pub trait LocalFileSystem: Send + Sync + 'static {
  /// Read a whole file.
  ///
  /// # Errors
  ///
  /// Returns the underlying I/O error.
  fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

  /// Write a whole file, creating or truncating it.
  ///
  /// # Errors
  ///
  /// Returns the underlying I/O error.
  fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

  /// Atomically rename a file within the directory.
  ///
  /// # Errors
  ///
  /// Returns the underlying I/O error.
  fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

  /// Remove a file. Missing files are not an error.
  ///
  /// # Errors
  ///
  /// Returns the underlying I/O error for anything but a missing file.
  fn remove(&self, path: &Path) -> io::Result<()>;

  /// Whether a path exists.
  fn exists(&self, path: &Path) -> bool;

  /// Create a directory and its parents.
  ///
  /// # Errors
  ///
  /// Returns the underlying I/O error.
  fn create_dir_all(&self, path: &Path) -> io::Result<()>;

  /// Create an empty file, failing with `AlreadyExists` if it is present.
  /// This is the sentinel-lock primitive.
  ///
  /// # Errors
  ///
  /// Returns `AlreadyExists` when the file is already there, other I/O
  /// errors otherwise.
  fn create_new(&self, path: &Path) -> io::Result<()>;

  /// List the entries of a directory.
  ///
  /// # Errors
  ///
  /// Returns the underlying I/O error.
  fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

  /// Whether the path is a directory this process can write into.
  /// Grants can silently expire between sessions, so this is re-checked
  /// before every access.
  fn is_writable_dir(&self, path: &Path) -> bool;
}

/// [`LocalFileSystem`] over `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFileSystem;

impl LocalFileSystem for NativeFileSystem {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    std::fs::read(path)
  }

  fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
    std::fs::write(path, bytes)
  }

  fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
    std::fs::rename(from, to)
  }

  fn remove(&self, path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      other => other
    }
  }

  fn exists(&self, path: &Path) -> bool {
    path.exists()
  }

  fn create_dir_all(&self, path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path)
  }

  fn create_new(&self, path: &Path) -> io::Result<()> {
    std::fs::OpenOptions::new()
      .write(true)
      .create_new(true)
      .open(path)
      .map(|_| ())
  }

  fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(path)? {
      entries.push(entry?.path());
    }
    Ok(entries)
  }

  fn is_writable_dir(&self, path: &Path) -> bool {
    match std::fs::metadata(path) {
      Ok(meta) => meta.is_dir() && !meta.permissions().readonly(),
      Err(_) => false
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn create_new_fails_on_existing_file() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let fs = NativeFileSystem;
    let path = dir.path().join("sentinel");

    fs.create_new(&path).expect("first create");
    let err = fs.create_new(&path).expect_err("second create");
    assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
  }

  #[test]
  fn remove_is_silent_on_missing_file() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let fs = NativeFileSystem;

    fs.remove(&dir.path().join("never-existed")).expect("remove");
  }

  #[test]
  fn writable_dir_check() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let fs = NativeFileSystem;

    assert!(fs.is_writable_dir(dir.path()));
    assert!(!fs.is_writable_dir(&dir.path().join("missing")));
  }
}
