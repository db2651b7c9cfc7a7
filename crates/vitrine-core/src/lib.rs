//! vitrine-core — offline-first store and sync engine for the Vitrine kiosk.
//!
//! Contains:
//! - `StateStore` — embedded key-value store, one key per collection
//! - `Catalog` — single controller owning all application state
//! - `Settings` + `SettingsPatch` — typed deep-merge of partial updates
//! - `BackupData` — the snapshot envelope, parsed defensively
//! - `StorageProvider` trait — unified interface for snapshot backends
//! - `SyncEngine` — debounced push + interval pull, last-write-wins by clock
//! - `SyncEventHandler` — trait for UI/log observers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐     ┌─────────────┐     ┌────────────┐
//! │ admin/UI │ ──► │   Catalog   │ ──► │ StateStore │
//! │  layers  │     │ (state+clock)│    │   (redb)   │
//! └──────────┘     └──────┬──────┘     └────────────┘
//!                         │ StoreEvent
//!                  ┌──────▼───────┐     ┌───────────┐
//!                  │  SyncEngine  │ ──► │ Provider  │
//!                  │(debounce+poll)│    │ (fs/http) │
//!                  └──────────────┘     └───────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod asset;
pub mod catalog;
pub mod config;
pub mod events;
pub mod model;
pub mod provider;
pub mod seed;
pub mod settings;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod test_utils;

pub use catalog::{Catalog, CatalogError, CatalogState};
pub use config::SyncConfig;
pub use events::{LogLevel, NoopEventHandler, SyncEventHandler};
pub use model::{
  AdminUser, Brand, Catalogue, Category, Client, KioskViews, MediaKind, Pamphlet, Product, Quote,
  QuoteItem, QuoteStatus, Record, ScreensaverAd, Trashable, TvContent, ViewCounts, new_id
};
pub use provider::{ConnectResult, ProviderError, ProviderKind, StorageProvider};
pub use settings::{Settings, SettingsPatch};
pub use snapshot::BackupData;
pub use store::{StateStore, keys};
pub use sync::{StoreEvent, SyncEngine, SyncStatus};

use std::sync::Arc;

use tracing::{info, warn};

/// Main entry point: connect a provider and start auto-sync.
///
/// 1. Verifies provider access (`connect`)
/// 2. Reconciles once: adopts the remote snapshot if strictly newer
/// 3. Starts the `SyncEngine` (debounced push + interval pull)
/// 4. Wires the catalog's mutation events to the engine
///
/// The caller keeps the returned engine to flush/shut down, and must
/// `detach_sync` + `disconnect` before connecting a different provider.
///
/// # Errors
///
/// Returns an error when provider access is denied.
pub async fn start_sync<P: StorageProvider>(
  config: SyncConfig,
  catalog: Arc<Catalog>,
  provider: Arc<P>,
  events: Arc<dyn SyncEventHandler>
) -> anyhow::Result<(SyncEngine, tokio::task::JoinHandle<()>)> {
  let connected = provider.connect().await?;
  info!(provider = provider.name(), ?connected, "provider connected");

  // Initial reconciliation, same rule as the poll worker
  match provider.load_snapshot().await {
    Ok(Some(remote)) => {
      let remote_clock = remote.settings.last_updated;
      let local_clock = catalog.last_updated().await;

      if remote_clock > local_clock {
        info!(remote_clock, local_clock, "adopting newer remote snapshot");
        catalog.replace_with_snapshot(remote).await;
        events.on_pull(remote_clock);
      }
    }
    Ok(None) => {}
    Err(e) => {
      warn!(provider = provider.name(), error = %e, "initial pull failed, continuing offline")
    }
  }

  let (engine, handle) = SyncEngine::start(config, catalog.clone(), provider, events);
  catalog.attach_sync(engine.sender());

  Ok((engine, handle))
}
