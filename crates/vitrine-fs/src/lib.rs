//! vitrine-fs — local-directory storage provider for Vitrine.
//!
//! Implements `vitrine_core::StorageProvider` against a user-chosen
//! directory: the snapshot lives in `database.json`, asset mirrors under
//! `assets/`, and a `database.lock` sentinel keeps concurrent writers out.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod fs;
pub mod lock;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration
};

use anyhow::Context;
use tracing::{debug, info};
use vitrine_core::{
  BackupData, ConnectResult, ProviderError, ProviderKind, StorageProvider, asset
};

use crate::{
  fs::{LocalFileSystem, NativeFileSystem},
  lock::DirLock
};

/// Snapshot file name inside the sync directory.
pub const SNAPSHOT_FILE: &str = "database.json";

/// Staging name the snapshot is written to before the final rename.
const SNAPSHOT_TMP: &str = "database.json.tmp";

/// Subdirectory asset bytes are mirrored into.
const ASSETS_DIR: &str = "assets";

/// Local-directory provider configuration.
#[derive(Debug, Clone)]
pub struct LocalDirConfig {
  /// The granted sync directory.
  pub root: PathBuf,
  /// Interval for polling the directory for newer snapshots (seconds).
  pub poll_interval_secs: u64
}

impl LocalDirConfig {
  /// Configuration with the default 5-second poll interval.
  #[must_use]
  pub fn new(root: PathBuf) -> Self {
    Self {
      root,
      poll_interval_secs: 5
    }
  }
}

/// Storage provider over a local directory.
pub struct LocalDirProvider {
  config: LocalDirConfig,
  fs: Arc<dyn LocalFileSystem>
}

impl LocalDirProvider {
  /// Create a provider over the native filesystem.
  #[must_use]
  pub fn new(config: LocalDirConfig) -> Self {
    Self::with_fs(config, Arc::new(NativeFileSystem))
  }

  /// Create a provider over a custom filesystem (tests, sandboxes).
  #[must_use]
  pub fn with_fs(config: LocalDirConfig, fs: Arc<dyn LocalFileSystem>) -> Self {
    Self { config, fs }
  }

  /// The configured sync directory.
  #[must_use]
  pub fn root(&self) -> &Path {
    &self.config.root
  }

  /// Re-verify directory access. Grants can expire between sessions, so
  /// every operation starts here rather than trusting an old check.
  fn verify_access(&self) -> anyhow::Result<()> {
    if self.fs.is_writable_dir(&self.config.root) {
      Ok(())
    } else {
      Err(
        ProviderError::Permission(format!(
          "sync directory {} is missing or not writable; reselect it in settings",
          self.config.root.display()
        ))
        .into()
      )
    }
  }
}

impl StorageProvider for LocalDirProvider {
  async fn connect(&self) -> anyhow::Result<ConnectResult> {
    self.verify_access()?;

    let snapshot = self.config.root.join(SNAPSHOT_FILE);
    if self.fs.exists(&snapshot) {
      info!(dir = %self.config.root.display(), "connected to existing sync directory");
      Ok(ConnectResult::Existing)
    } else {
      info!(dir = %self.config.root.display(), "connected to empty sync directory");
      Ok(ConnectResult::Fresh)
    }
  }

  async fn save_snapshot(&self, snapshot: &BackupData) -> anyhow::Result<()> {
    self.verify_access()?;

    // Held for the whole write; removed on every exit path
    let _lock = DirLock::acquire(self.fs.clone(), &self.config.root)?;

    let json = serde_json::to_vec_pretty(snapshot).context("encoding snapshot")?;
    let tmp = self.config.root.join(SNAPSHOT_TMP);
    let target = self.config.root.join(SNAPSHOT_FILE);

    self
      .fs
      .write(&tmp, &json)
      .with_context(|| format!("writing {}", tmp.display()))?;
    self
      .fs
      .rename(&tmp, &target)
      .with_context(|| format!("renaming into {}", target.display()))?;

    debug!(
      path = %target.display(),
      bytes = json.len(),
      clock = snapshot.settings.last_updated,
      "snapshot saved"
    );
    Ok(())
  }

  async fn load_snapshot(&self) -> anyhow::Result<Option<BackupData>> {
    self.verify_access()?;

    let path = self.config.root.join(SNAPSHOT_FILE);
    if !self.fs.exists(&path) {
      return Ok(None);
    }

    let raw = self
      .fs
      .read(&path)
      .with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value =
      serde_json::from_slice(&raw).with_context(|| format!("parsing {}", path.display()))?;

    Ok(Some(BackupData::from_value(value)))
  }

  async fn save_asset(&self, name: &str, mime: &str, bytes: &[u8]) -> anyhow::Result<String> {
    self.verify_access()?;

    let assets = self.config.root.join(ASSETS_DIR);
    self
      .fs
      .create_dir_all(&assets)
      .with_context(|| format!("creating {}", assets.display()))?;

    let path = assets.join(name);
    self
      .fs
      .write(&path, bytes)
      .with_context(|| format!("writing {}", path.display()))?;

    debug!(path = %path.display(), bytes = bytes.len(), "asset mirrored");

    // The canonical reference stays self-contained so it survives a
    // provider switch; the file on disk is a mirror for inspection.
    Ok(asset::encode_data_uri(mime, bytes))
  }

  async fn disconnect(&self) {
    // No retained handles on the native filesystem
    info!(dir = %self.config.root.display(), "sync directory disconnected");
  }

  async fn is_online(&self) -> bool {
    self.verify_access().is_ok()
  }

  fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.config.poll_interval_secs)
  }

  fn kind(&self) -> ProviderKind {
    ProviderKind::Local
  }

  fn name(&self) -> &'static str {
    "local-dir"
  }
}
