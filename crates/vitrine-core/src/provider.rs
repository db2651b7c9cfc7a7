//! Storage provider trait — unified interface for snapshot backends.
//!
//! A provider is a pure transport target: it never owns data. The catalog
//! owns state; the sync engine tells the provider WHEN to save or load, the
//! provider decides HOW. Exactly one provider is active at a time —
//! connecting a new one requires disconnecting the previous one first.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::snapshot::BackupData;

/// Provider discriminant, persisted under the `storageProvider` store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ProviderKind {
  /// No provider connected; local store only.
  #[default]
  None,
  /// Snapshot file in a user-chosen local directory.
  Local,
  /// Custom HTTP API (GET/POST with optional shared secret).
  CustomApi,
  /// Public read-only snapshot URL.
  SharedUrl
}

/// Outcome of connecting to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectResult {
  /// The provider location is empty; first save will create the snapshot.
  Fresh,
  /// A snapshot already exists at the provider location.
  Existing,
  /// The provider is currently unreachable; sync will retry.
  Offline
}

/// Failures callers must distinguish to show an actionable message.
///
/// Everything else travels as plain `anyhow` context.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
  /// Directory access denied, revoked, or read-only.
  #[error("storage permission denied: {0}")]
  Permission(String),
  /// A sentinel lock is held by another writer.
  #[error("another sync is in progress")]
  Locked,
  /// Remote endpoint answered with a non-2xx status.
  #[error("remote returned HTTP {0}")]
  Status(u16)
}

/// Backend for snapshot storage.
///
/// `save_snapshot`/`load_snapshot` move whole [`BackupData`] documents;
/// `save_asset` persists one binary and returns a self-contained data-URI
/// reference so assets stay valid across provider switches.
pub trait StorageProvider: Send + Sync + 'static {
  /// Verify access/reachability and inspect the provider location.
  ///
  /// # Errors
  ///
  /// Returns an error when access is denied (not merely offline).
  fn connect(&self) -> impl Future<Output = anyhow::Result<ConnectResult>> + Send;

  /// Serialize and persist the full current state.
  ///
  /// # Errors
  ///
  /// Returns [`ProviderError::Locked`] on write contention,
  /// [`ProviderError::Permission`] on access failure, transport errors
  /// otherwise. A failed save never leaves a partial snapshot behind.
  fn save_snapshot(
    &self,
    snapshot: &BackupData
  ) -> impl Future<Output = anyhow::Result<()>> + Send;

  /// Read back the previously saved snapshot, `None` if none exists yet.
  ///
  /// # Errors
  ///
  /// Returns transport/permission errors. Malformed snapshot content is NOT
  /// an error: parsing degrades per collection (see `BackupData::from_value`).
  fn load_snapshot(&self) -> impl Future<Output = anyhow::Result<Option<BackupData>>> + Send;

  /// Persist one binary asset and return its reference string.
  ///
  /// The returned reference is always a self-contained data-URI, regardless
  /// of where the provider mirrors the bytes.
  ///
  /// # Errors
  ///
  /// Returns transport/permission errors.
  fn save_asset(
    &self,
    name: &str,
    mime: &str,
    bytes: &[u8]
  ) -> impl Future<Output = anyhow::Result<String>> + Send;

  /// Release held handles and caches. Called before switching providers.
  fn disconnect(&self) -> impl Future<Output = ()> + Send;

  /// Check reachability without side effects.
  fn is_online(&self) -> impl Future<Output = bool> + Send;

  /// How often the poll worker pulls from this provider.
  fn poll_interval(&self) -> Duration;

  /// Discriminant for persistence and UI.
  fn kind(&self) -> ProviderKind;

  /// Provider name for logs.
  fn name(&self) -> &'static str;
}
