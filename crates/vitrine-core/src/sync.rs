//! Auto-sync engine.
//!
//! Orchestrates timing: collapses bursts of mutations into one debounced
//! push, and polls the provider for newer remote snapshots.
//!
//! Does NOT decide what a snapshot contains — that is the catalog's job —
//! and does NOT transport bytes — that is the provider's job.

use std::{sync::Arc, time::Duration};

use tokio::{
  sync::{mpsc, watch},
  time::{Instant, sleep, sleep_until}
};
use tracing::{debug, error, info, warn};

use crate::{
  catalog::Catalog,
  config::SyncConfig,
  events::{LogLevel, SyncEventHandler},
  provider::StorageProvider
};

/// Event from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
  /// A logical mutation advanced the clock.
  Mutated,
  /// Push now, skipping the debounce window.
  Flush,
  /// Final push (if dirty), then exit.
  Shutdown
}

/// Observable sync state. Purely informational: it never blocks mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
  /// Nothing to push.
  #[default]
  Idle,
  /// Mutations are waiting out the debounce window.
  Pending,
  /// A push is in flight.
  Syncing,
  /// The last push succeeded.
  Synced,
  /// The last push or pull failed.
  Error
}

/// Auto-sync engine handle.
///
/// Starts two background workers:
/// 1. `push_worker` — receives [`StoreEvent`]s, debounces, pushes snapshots
/// 2. `poll_worker` — periodically pulls and adopts strictly newer snapshots
pub struct SyncEngine {
  event_tx: mpsc::Sender<StoreEvent>,
  status_rx: watch::Receiver<SyncStatus>
}

impl SyncEngine {
  /// Create and start the engine against a connected provider.
  ///
  /// The returned join handle completes after [`SyncEngine::shutdown`].
  pub fn start<P: StorageProvider>(
    config: SyncConfig,
    catalog: Arc<Catalog>,
    provider: Arc<P>,
    events: Arc<dyn SyncEventHandler>
  ) -> (Self, tokio::task::JoinHandle<()>) {
    let (event_tx, event_rx) = mpsc::channel(256);
    let (status_tx, status_rx) = watch::channel(SyncStatus::Idle);
    let status_tx = Arc::new(status_tx);
    let (done_tx, done_rx) = watch::channel(false);

    let handle = tokio::spawn(Self::push_worker(
      config,
      catalog.clone(),
      provider.clone(),
      events.clone(),
      status_tx.clone(),
      event_rx,
      done_tx
    ));

    tokio::spawn(Self::poll_worker(catalog, provider, events, status_tx, done_rx));

    (Self { event_tx, status_rx }, handle)
  }

  /// A sender for the catalog to report mutations on.
  #[must_use]
  pub fn sender(&self) -> mpsc::Sender<StoreEvent> {
    self.event_tx.clone()
  }

  /// Current sync status.
  #[must_use]
  pub fn status(&self) -> SyncStatus {
    *self.status_rx.borrow()
  }

  /// A watch for status transitions (admin UI indicator).
  #[must_use]
  pub fn status_watch(&self) -> watch::Receiver<SyncStatus> {
    self.status_rx.clone()
  }

  /// Push now, without waiting out the debounce window.
  ///
  /// # Errors
  ///
  /// Returns an error if the engine has already shut down.
  pub async fn flush(&self) -> anyhow::Result<()> {
    self
      .event_tx
      .send(StoreEvent::Flush)
      .await
      .map_err(|e| anyhow::anyhow!("error sending Flush: {e}"))
  }

  /// Shut the engine down, pushing once more if mutations are pending.
  ///
  /// # Errors
  ///
  /// Returns an error if the engine has already shut down.
  pub async fn shutdown(&self) -> anyhow::Result<()> {
    self
      .event_tx
      .send(StoreEvent::Shutdown)
      .await
      .map_err(|e| anyhow::anyhow!("error sending Shutdown: {e}"))
  }

  /// Debounce worker.
  ///
  /// Logic:
  /// - `Mutated` (auto-sync on) -> mark dirty, restart the debounce window
  /// - `Flush` -> immediate push
  /// - `Shutdown` -> final push if dirty, exit
  /// - debounce expiry -> push if dirty
  ///
  /// Pushes are serialized: one save at a time; events arriving mid-save
  /// queue up and re-fire the window afterwards, preserving causal order.
  async fn push_worker<P: StorageProvider>(
    config: SyncConfig,
    catalog: Arc<Catalog>,
    provider: Arc<P>,
    events: Arc<dyn SyncEventHandler>,
    status_tx: Arc<watch::Sender<SyncStatus>>,
    mut event_rx: mpsc::Receiver<StoreEvent>,
    done_tx: watch::Sender<bool>
  ) {
    let mut dirty = false;
    let mut trigger = false;
    let debounce = config.debounce();

    // Debounce deadline — far in the future (inactive)
    let far_future = Instant::now() + Duration::from_secs(365 * 24 * 3600);
    let mut deadline = far_future;

    loop {
      tokio::select! {
        event = event_rx.recv() => {
          match event {
            Some(StoreEvent::Mutated) => {
              if catalog.auto_sync_enabled().await {
                dirty = true;
                deadline = Instant::now() + debounce;
                set_status(&status_tx, &events, SyncStatus::Pending);
              }
            }
            Some(StoreEvent::Flush) => {
              dirty = true;
              trigger = true;
            }
            Some(StoreEvent::Shutdown) | None => {
              if dirty {
                Self::do_push(&catalog, &provider, &events, &status_tx).await;
              }
              break;
            }
          }
        }
        () = sleep_until(deadline), if dirty => {
          trigger = true;
        }
      }

      if trigger && dirty {
        Self::do_push(&catalog, &provider, &events, &status_tx).await;
        dirty = false;
        trigger = false;
        deadline = far_future;
      }
    }

    let _ = done_tx.send(true);
    debug!("push_worker finished");
  }

  /// Push the full current state to the provider.
  async fn do_push<P: StorageProvider>(
    catalog: &Arc<Catalog>,
    provider: &Arc<P>,
    events: &Arc<dyn SyncEventHandler>,
    status_tx: &Arc<watch::Sender<SyncStatus>>
  ) {
    set_status(status_tx, events, SyncStatus::Syncing);

    let snapshot = catalog.snapshot().await;
    let clock = snapshot.settings.last_updated;

    match provider.save_snapshot(&snapshot).await {
      Ok(()) => {
        set_status(status_tx, events, SyncStatus::Synced);
        events.on_push(clock);
        debug!(provider = provider.name(), clock, "snapshot pushed");
      }
      Err(e) => {
        set_status(status_tx, events, SyncStatus::Error);
        error!(provider = provider.name(), error = %e, "push failed");
        events.on_log(LogLevel::Error, &format!("sync push failed: {e}"));
      }
    }
  }

  /// Worker for periodic remote polling.
  ///
  /// Adopts a remote snapshot only when its clock is strictly newer than
  /// the local one; equal or older snapshots are discarded without side
  /// effects. A failed pull never touches local state.
  async fn poll_worker<P: StorageProvider>(
    catalog: Arc<Catalog>,
    provider: Arc<P>,
    events: Arc<dyn SyncEventHandler>,
    status_tx: Arc<watch::Sender<SyncStatus>>,
    mut done_rx: watch::Receiver<bool>
  ) {
    let interval = provider.poll_interval();

    loop {
      tokio::select! {
        () = sleep(interval) => {}
        _ = done_rx.wait_for(|done| *done) => break
      }

      match provider.load_snapshot().await {
        Ok(Some(remote)) => {
          let remote_clock = remote.settings.last_updated;
          let local_clock = catalog.last_updated().await;

          if remote_clock > local_clock {
            info!(
              provider = provider.name(),
              remote_clock,
              local_clock,
              "remote snapshot is newer, replacing local state"
            );
            catalog.replace_with_snapshot(remote).await;
            events.on_pull(remote_clock);
          } else {
            debug!(remote_clock, local_clock, "remote snapshot not newer, discarded");
          }
        }
        Ok(None) => {
          // Nothing saved at the provider yet
        }
        Err(e) => {
          warn!(provider = provider.name(), error = %e, "pull failed");
          events.on_log(LogLevel::Warn, &format!("sync pull failed: {e}"));

          // Surface the failure, but never mask an in-flight push
          let current = *status_tx.borrow();
          if matches!(current, SyncStatus::Idle | SyncStatus::Synced) {
            set_status(&status_tx, &events, SyncStatus::Error);
          }
        }
      }
    }

    debug!("poll_worker finished");
  }
}

fn set_status(
  status_tx: &watch::Sender<SyncStatus>,
  events: &Arc<dyn SyncEventHandler>,
  status: SyncStatus
) {
  let changed = *status_tx.borrow() != status;
  if changed {
    status_tx.send_replace(status);
    events.on_status(status);
  }
}
