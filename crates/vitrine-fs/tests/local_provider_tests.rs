//! Local-directory provider tests: snapshot round-trip, the sentinel lock,
//! permission checks, and defensive snapshot parsing.
//!
//! Run: `cargo test -p vitrine-fs --test local_provider_tests`

#![allow(clippy::expect_used)]

use std::{
  io,
  path::{Path, PathBuf},
  sync::Arc
};

use vitrine_core::{BackupData, ConnectResult, ProviderError, StorageProvider, asset};
use vitrine_fs::{
  LocalDirConfig, LocalDirProvider, SNAPSHOT_FILE,
  fs::{LocalFileSystem, NativeFileSystem},
  lock::LOCK_FILE
};

fn provider_in(dir: &tempfile::TempDir) -> LocalDirProvider {
  LocalDirProvider::new(LocalDirConfig::new(dir.path().to_path_buf()))
}

fn snapshot(clock: i64) -> BackupData {
  let mut snapshot = BackupData::seeded();
  snapshot.settings.app_name = "Local Sync".to_string();
  snapshot.settings.last_updated = clock;
  snapshot
}

#[tokio::test]
async fn save_then_load_round_trips() {
  let dir = tempfile::tempdir().expect("tmpdir");
  let provider = provider_in(&dir);

  assert_eq!(provider.connect().await.expect("connect"), ConnectResult::Fresh);

  let saved = snapshot(42);
  provider.save_snapshot(&saved).await.expect("save");

  assert_eq!(
    provider.connect().await.expect("reconnect"),
    ConnectResult::Existing
  );

  let loaded = provider
    .load_snapshot()
    .await
    .expect("load")
    .expect("snapshot present");
  assert_eq!(loaded, saved);

  // The write is staged and renamed; no temp file survives
  assert!(!dir.path().join("database.json.tmp").exists());
}

#[tokio::test]
async fn load_returns_none_before_any_save() {
  let dir = tempfile::tempdir().expect("tmpdir");
  let provider = provider_in(&dir);

  assert_eq!(provider.load_snapshot().await.expect("load"), None);
}

#[tokio::test]
async fn a_held_lock_aborts_the_save_and_is_left_alone() {
  let dir = tempfile::tempdir().expect("tmpdir");
  let provider = provider_in(&dir);

  provider.save_snapshot(&snapshot(1)).await.expect("first save");

  // Another writer is mid-sync
  std::fs::write(dir.path().join(LOCK_FILE), b"").expect("plant sentinel");

  let err = provider
    .save_snapshot(&snapshot(2))
    .await
    .expect_err("contended save must abort");
  assert!(
    matches!(err.downcast_ref(), Some(ProviderError::Locked)),
    "expected Locked, got {err:?}"
  );

  assert!(
    dir.path().join(LOCK_FILE).exists(),
    "the other writer's sentinel must not be removed"
  );

  let kept = provider
    .load_snapshot()
    .await
    .expect("load")
    .expect("snapshot");
  assert_eq!(kept.settings.last_updated, 1, "prior snapshot untouched");
}

#[tokio::test]
async fn the_lock_is_removed_after_a_successful_save() {
  let dir = tempfile::tempdir().expect("tmpdir");
  let provider = provider_in(&dir);

  provider.save_snapshot(&snapshot(1)).await.expect("save");

  assert!(!dir.path().join(LOCK_FILE).exists());

  // And the directory is immediately writable again
  provider.save_snapshot(&snapshot(2)).await.expect("second save");
}

/// Filesystem that fails every write to a `.tmp` path.
struct FailingWrites(NativeFileSystem);

impl LocalFileSystem for FailingWrites {
  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    self.0.read(path)
  }

  fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
    if path.extension().is_some_and(|e| e == "tmp") {
      return Err(io::Error::other("simulated write failure"));
    }
    self.0.write(path, bytes)
  }

  fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
    self.0.rename(from, to)
  }

  fn remove(&self, path: &Path) -> io::Result<()> {
    self.0.remove(path)
  }

  fn exists(&self, path: &Path) -> bool {
    self.0.exists(path)
  }

  fn create_dir_all(&self, path: &Path) -> io::Result<()> {
    self.0.create_dir_all(path)
  }

  fn create_new(&self, path: &Path) -> io::Result<()> {
    self.0.create_new(path)
  }

  fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
    self.0.list_dir(path)
  }

  fn is_writable_dir(&self, path: &Path) -> bool {
    self.0.is_writable_dir(path)
  }
}

#[tokio::test]
async fn the_lock_is_removed_even_when_the_write_fails() {
  let dir = tempfile::tempdir().expect("tmpdir");
  let provider = LocalDirProvider::with_fs(
    LocalDirConfig::new(dir.path().to_path_buf()),
    Arc::new(FailingWrites(NativeFileSystem))
  );

  provider
    .save_snapshot(&snapshot(1))
    .await
    .expect_err("write failure propagates");

  assert!(
    !dir.path().join(LOCK_FILE).exists(),
    "the sentinel is removed on the failure path too"
  );
}

#[tokio::test]
async fn a_missing_directory_is_a_permission_error() {
  let dir = tempfile::tempdir().expect("tmpdir");
  let gone = dir.path().join("revoked");
  let provider = LocalDirProvider::new(LocalDirConfig::new(gone));

  for err in [
    provider.connect().await.expect_err("connect"),
    provider.save_snapshot(&snapshot(1)).await.expect_err("save"),
    provider.load_snapshot().await.expect_err("load")
  ] {
    assert!(
      matches!(err.downcast_ref(), Some(ProviderError::Permission(_))),
      "expected Permission, got {err:?}"
    );
  }

  assert!(!provider.is_online().await);
}

#[tokio::test]
async fn malformed_snapshot_content_degrades_per_collection() {
  let dir = tempfile::tempdir().expect("tmpdir");
  let provider = provider_in(&dir);

  std::fs::write(
    dir.path().join(SNAPSHOT_FILE),
    br#"{"brands": "garbage", "products": [], "settings": {"appName": "Damaged"}}"#
  )
  .expect("plant file");

  let loaded = provider
    .load_snapshot()
    .await
    .expect("load")
    .expect("snapshot");

  assert!(
    !loaded.brands.is_empty(),
    "broken brands field falls back to seed data"
  );
  assert!(loaded.products.is_empty(), "valid empty array is kept");
  assert_eq!(loaded.settings.app_name, "Damaged");
}

#[tokio::test]
async fn assets_are_mirrored_and_referenced_as_data_uris() {
  let dir = tempfile::tempdir().expect("tmpdir");
  let provider = provider_in(&dir);

  let bytes = b"\xff\xd8\xff fake jpeg";
  let reference = provider
    .save_asset("logo.jpg", "image/jpeg", bytes)
    .await
    .expect("save asset");

  let (mime, decoded) = asset::decode_data_uri(&reference).expect("self-contained reference");
  assert_eq!(mime, "image/jpeg");
  assert_eq!(decoded, bytes);

  let mirrored = std::fs::read(dir.path().join("assets").join("logo.jpg")).expect("mirror");
  assert_eq!(mirrored, bytes);
}
