//! Durable key-value store over a single-file embedded database.
//!
//! One `redb` table holds every top-level piece of application state under
//! its own key (see [`keys`]), so partial reads and writes never touch
//! unrelated state. The store is a passive persistence target: the catalog
//! owns the data and replays writes on every mutation.

use std::{path::Path, sync::Arc};

use anyhow::Context;
use redb::{Database, TableDefinition};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

const STATE: TableDefinition<&str, &[u8]> = TableDefinition::new("state");

/// Store keys for every top-level piece of application state.
pub mod keys {
  /// Brand collection.
  pub const BRANDS: &str = "brands";
  /// Product collection.
  pub const PRODUCTS: &str = "products";
  /// Catalogue collection.
  pub const CATALOGUES: &str = "catalogues";
  /// Pamphlet collection.
  pub const PAMPHLETS: &str = "pamphlets";
  /// Settings singleton.
  pub const SETTINGS: &str = "settings";
  /// Screensaver ad collection.
  pub const SCREENSAVER_ADS: &str = "screensaverAds";
  /// Admin user collection.
  pub const ADMIN_USERS: &str = "adminUsers";
  /// TV content collection.
  pub const TV_CONTENT: &str = "tvContent";
  /// Category collection.
  pub const CATEGORIES: &str = "categories";
  /// Client collection.
  pub const CLIENTS: &str = "clients";
  /// Quote collection.
  pub const QUOTES: &str = "quotes";
  /// Per-kiosk view tallies.
  pub const VIEW_COUNTS: &str = "viewCounts";
  /// Active storage provider discriminant.
  pub const STORAGE_PROVIDER: &str = "storageProvider";
  /// Device display theme.
  pub const THEME: &str = "theme";
  /// Device playback volume.
  pub const LOCAL_VOLUME: &str = "localVolume";
  /// First-run setup flag.
  pub const IS_SETUP_COMPLETE: &str = "isSetupComplete";
  /// Retained sync-directory path for the local provider.
  pub const DIRECTORY_HANDLE: &str = "directoryHandle";
}

/// Async key-value store over one embedded database file.
#[derive(Clone)]
pub struct StateStore {
  db: Arc<Database>
}

impl StateStore {
  /// Open (or create) the database file.
  ///
  /// # Errors
  ///
  /// Returns an error if the file cannot be created or opened.
  pub fn open(path: &Path) -> anyhow::Result<Self> {
    let db = Database::create(path)
      .with_context(|| format!("opening state store {}", path.display()))?;

    debug!(path = %path.display(), "state store opened");
    Ok(Self { db: Arc::new(db) })
  }

  /// Read and decode the value stored under `key`.
  ///
  /// Never fails: a missing key, an I/O error, or an undecodable value all
  /// surface as `None` (with a logged diagnostic), so startup can fall back
  /// to seed data instead of aborting.
  pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let raw = match self.read_raw(key).await {
      Ok(raw) => raw?,
      Err(e) => {
        warn!(key, error = %e, "state read failed, falling back to defaults");
        return None;
      }
    };

    match serde_json::from_slice(&raw) {
      Ok(value) => Some(value),
      Err(e) => {
        warn!(key, error = %e, "stored value is undecodable, falling back to defaults");
        None
      }
    }
  }

  /// Encode and durably write `value` under `key`.
  ///
  /// # Errors
  ///
  /// Returns an error on encoding or I/O failure. Callers log and continue:
  /// the write is replayed on the next mutation of the same key.
  pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> anyhow::Result<()> {
    let raw = serde_json::to_vec(value).with_context(|| format!("encoding {key}"))?;
    self.write_raw(key, raw).await
  }

  async fn read_raw(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
    let db = self.db.clone();
    let key = key.to_string();

    tokio::task::spawn_blocking(move || {
      let txn = db.begin_read()?;
      let table = match txn.open_table(STATE) {
        Ok(table) => table,
        // First run: nothing written yet
        Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
        Err(e) => return Err(e.into())
      };

      Ok(table.get(key.as_str())?.map(|guard| guard.value().to_vec()))
    })
    .await
    .context("store read task")?
  }

  async fn write_raw(&self, key: &str, raw: Vec<u8>) -> anyhow::Result<()> {
    let db = self.db.clone();
    let key = key.to_string();

    tokio::task::spawn_blocking(move || {
      let txn = db.begin_write()?;
      {
        let mut table = txn.open_table(STATE)?;
        table.insert(key.as_str(), raw.as_slice())?;
      }
      txn.commit()?;
      Ok(())
    })
    .await
    .context("store write task")?
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn open_temp() -> (StateStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tmpdir");
    let store = StateStore::open(&dir.path().join("state.redb")).expect("open");
    (store, dir)
  }

  #[tokio::test]
  async fn put_get_round_trip() {
    let (store, _dir) = open_temp();

    store
      .put(keys::THEME, &"dark".to_string())
      .await
      .expect("put");

    let theme: Option<String> = store.get(keys::THEME).await;
    assert_eq!(theme.as_deref(), Some("dark"));
  }

  #[tokio::test]
  async fn missing_key_reads_as_none() {
    let (store, _dir) = open_temp();

    let volume: Option<f32> = store.get(keys::LOCAL_VOLUME).await;
    assert_eq!(volume, None);
  }

  #[tokio::test]
  async fn undecodable_value_reads_as_none() {
    let (store, _dir) = open_temp();

    store.put(keys::LOCAL_VOLUME, &"not a number").await.expect("put");

    let volume: Option<f32> = store.get(keys::LOCAL_VOLUME).await;
    assert_eq!(volume, None, "type mismatch degrades to the default");
  }

  #[tokio::test]
  async fn keys_are_independent() {
    let (store, _dir) = open_temp();

    store.put(keys::THEME, &"light").await.expect("put theme");
    store.put(keys::LOCAL_VOLUME, &0.5f32).await.expect("put volume");
    store.put(keys::THEME, &"dark").await.expect("overwrite theme");

    assert_eq!(store.get::<String>(keys::THEME).await.as_deref(), Some("dark"));
    assert_eq!(store.get::<f32>(keys::LOCAL_VOLUME).await, Some(0.5));
  }
}
