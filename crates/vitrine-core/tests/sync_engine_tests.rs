//! Sync engine tests: debounce collapse, last-write-wins pulls, status
//! transitions, and shutdown flushing.
//!
//! Run: `cargo test -p vitrine-core --test sync_engine_tests`

#![allow(clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use vitrine_core::{
  Brand, Catalog, StateStore, SyncConfig, SyncEngine, SyncEventHandler, SyncStatus,
  settings::SettingsPatch,
  snapshot::BackupData,
  test_utils::{MockProvider, TestEventHandler, with_timeout}
};

/// Debounce window used by these tests. Short, but long enough to batch.
const DEBOUNCE: Duration = Duration::from_millis(150);

/// Comfortably longer than the debounce window.
const SETTLE: Duration = Duration::from_millis(600);

async fn fresh_catalog() -> (Arc<Catalog>, tempfile::TempDir) {
  let dir = tempfile::tempdir().expect("tmpdir");
  let store = StateStore::open(&dir.path().join("state.redb")).expect("open store");
  (Arc::new(Catalog::load(store).await), dir)
}

/// Create the full pipeline: catalog + engine + mock provider.
///
/// The catalog is wired to the engine's sender, so mutations automatically
/// produce `StoreEvent`s that the engine debounces.
fn start_engine(
  catalog: &Arc<Catalog>,
  provider: Arc<MockProvider>
) -> (SyncEngine, tokio::task::JoinHandle<()>, Arc<TestEventHandler>) {
  let events = Arc::new(TestEventHandler::new());
  let events_dyn: Arc<dyn SyncEventHandler> = events.clone();

  let config = SyncConfig {
    debounce_ms: u64::try_from(DEBOUNCE.as_millis()).expect("debounce fits")
  };
  let (engine, handle) = SyncEngine::start(config, catalog.clone(), provider, events_dyn);
  catalog.attach_sync(engine.sender());

  (engine, handle, events)
}

fn brand(id: &str, name: &str) -> Brand {
  Brand {
    id: id.to_string(),
    name: name.to_string(),
    ..Brand::default()
  }
}

// ============================================================================
// Debounced push
// ============================================================================

#[tokio::test]
async fn a_burst_of_mutations_collapses_into_one_push() {
  with_timeout("a_burst_of_mutations_collapses_into_one_push", async {
    let (catalog, _dir) = fresh_catalog().await;
    let provider = Arc::new(MockProvider::new());
    let (engine, handle, _events) = start_engine(&catalog, provider.clone());

    for i in 0..5 {
      catalog.add_brand(brand(&format!("b{i}"), "Burst")).await;
    }
    catalog
      .update_settings(SettingsPatch {
        app_name: Some("After Burst".to_string()),
        ..SettingsPatch::default()
      })
      .await;

    tokio::time::sleep(SETTLE).await;

    assert_eq!(
      provider.save_call_count(),
      1,
      "six rapid mutations must produce exactly one save"
    );

    let saved = provider.last_saved().expect("saved snapshot");
    assert_eq!(saved.brands.iter().filter(|b| b.name == "Burst").count(), 5);
    assert_eq!(
      saved.settings.app_name, "After Burst",
      "the single push reflects the state after all mutations"
    );

    engine.shutdown().await.expect("shutdown");
    handle.await.expect("join");
  })
  .await;
}

#[tokio::test]
async fn spaced_mutations_push_separately() {
  with_timeout("spaced_mutations_push_separately", async {
    let (catalog, _dir) = fresh_catalog().await;
    let provider = Arc::new(MockProvider::new());
    let (engine, handle, _events) = start_engine(&catalog, provider.clone());

    catalog.add_brand(brand("b1", "First")).await;
    tokio::time::sleep(SETTLE).await;

    catalog.add_brand(brand("b2", "Second")).await;
    tokio::time::sleep(SETTLE).await;

    assert_eq!(provider.save_call_count(), 2);

    engine.shutdown().await.expect("shutdown");
    handle.await.expect("join");
  })
  .await;
}

#[tokio::test]
async fn flush_pushes_without_waiting_for_the_window() {
  with_timeout("flush_pushes_without_waiting_for_the_window", async {
    let (catalog, _dir) = fresh_catalog().await;
    let provider = Arc::new(MockProvider::new());
    let (engine, handle, _events) = start_engine(&catalog, provider.clone());

    catalog.add_brand(brand("b1", "Acme")).await;
    engine.flush().await.expect("flush");

    // Well inside the debounce window
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(provider.save_call_count(), 1);

    engine.shutdown().await.expect("shutdown");
    handle.await.expect("join");
  })
  .await;
}

#[tokio::test]
async fn a_mutation_during_a_push_queues_a_second_push() {
  with_timeout("a_mutation_during_a_push_queues_a_second_push", async {
    let (catalog, _dir) = fresh_catalog().await;
    let provider = Arc::new(MockProvider::new());
    provider.set_save_delay(Duration::from_millis(300));
    let (engine, handle, _events) = start_engine(&catalog, provider.clone());

    catalog.add_brand(brand("b1", "First")).await;
    tokio::time::sleep(DEBOUNCE + Duration::from_millis(50)).await;

    // The first save is now in flight (held by the delay); mutate again
    catalog.add_brand(brand("b2", "Second")).await;

    tokio::time::sleep(Duration::from_millis(900)).await;

    assert_eq!(
      provider.save_call_count(),
      2,
      "the mid-flight mutation re-queues and pushes after the first save"
    );
    let last = provider.last_saved().expect("second snapshot");
    assert!(last.brands.iter().any(|b| b.id == "b2"));

    engine.shutdown().await.expect("shutdown");
    handle.await.expect("join");
  })
  .await;
}

#[tokio::test]
async fn shutdown_pushes_pending_mutations() {
  with_timeout("shutdown_pushes_pending_mutations", async {
    let (catalog, _dir) = fresh_catalog().await;
    let provider = Arc::new(MockProvider::new());
    let (engine, handle, _events) = start_engine(&catalog, provider.clone());

    catalog.add_brand(brand("b1", "Unsaved")).await;

    // Shut down inside the debounce window
    engine.shutdown().await.expect("shutdown");
    handle.await.expect("join");

    assert_eq!(provider.save_call_count(), 1, "final push on shutdown");
    let saved = provider.last_saved().expect("snapshot");
    assert!(saved.brands.iter().any(|b| b.id == "b1"));
  })
  .await;
}

#[tokio::test]
async fn auto_sync_off_suppresses_pushes_but_flush_still_works() {
  with_timeout("auto_sync_off_suppresses_pushes_but_flush_still_works", async {
    let (catalog, _dir) = fresh_catalog().await;

    catalog
      .update_settings(SettingsPatch {
        sync: Some(vitrine_core::settings::SyncPatch {
          auto_sync_enabled: Some(false),
          ..vitrine_core::settings::SyncPatch::default()
        }),
        ..SettingsPatch::default()
      })
      .await;

    let provider = Arc::new(MockProvider::new());
    let (engine, handle, _events) = start_engine(&catalog, provider.clone());

    catalog.add_brand(brand("b1", "Quiet")).await;
    tokio::time::sleep(SETTLE).await;

    assert_eq!(provider.save_call_count(), 0, "no auto push while disabled");

    engine.flush().await.expect("flush");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(provider.save_call_count(), 1, "an explicit flush still pushes");

    engine.shutdown().await.expect("shutdown");
    handle.await.expect("join");
  })
  .await;
}

// ============================================================================
// Status transitions
// ============================================================================

#[tokio::test]
async fn successful_push_walks_pending_syncing_synced() {
  with_timeout("successful_push_walks_pending_syncing_synced", async {
    let (catalog, _dir) = fresh_catalog().await;
    let provider = Arc::new(MockProvider::new());
    let (engine, handle, events) = start_engine(&catalog, provider.clone());

    assert_eq!(engine.status(), SyncStatus::Idle);

    catalog.add_brand(brand("b1", "Acme")).await;
    tokio::time::sleep(SETTLE).await;

    assert_eq!(engine.status(), SyncStatus::Synced);
    assert!(events.saw_status(SyncStatus::Pending));
    assert!(events.saw_status(SyncStatus::Syncing));
    assert_eq!(events.push_count(), 1);

    engine.shutdown().await.expect("shutdown");
    handle.await.expect("join");
  })
  .await;
}

#[tokio::test]
async fn failed_push_reports_error_then_recovers() {
  with_timeout("failed_push_reports_error_then_recovers", async {
    let (catalog, _dir) = fresh_catalog().await;
    let provider = Arc::new(MockProvider::new());
    provider.set_save_error("disk full");
    let (engine, handle, events) = start_engine(&catalog, provider.clone());

    catalog.add_brand(brand("b1", "Acme")).await;
    tokio::time::sleep(SETTLE).await;

    assert_eq!(engine.status(), SyncStatus::Error);
    assert_eq!(events.push_count(), 0);

    // Local mutations are never blocked by sync failures
    catalog.add_brand(brand("b2", "Still works")).await;
    assert!(catalog.brand("b2").await.is_some());

    provider.clear_save_error();
    tokio::time::sleep(SETTLE).await;

    assert_eq!(engine.status(), SyncStatus::Synced, "retries on the next window");

    engine.shutdown().await.expect("shutdown");
    handle.await.expect("join");
  })
  .await;
}

// ============================================================================
// Pull polling (last-write-wins)
// ============================================================================

fn remote_snapshot(clock: i64, app_name: &str) -> BackupData {
  let mut snapshot = BackupData::seeded();
  snapshot.settings.app_name = app_name.to_string();
  snapshot.settings.last_updated = clock;
  snapshot
}

#[tokio::test]
async fn a_strictly_newer_remote_snapshot_replaces_local_state() {
  with_timeout("a_strictly_newer_remote_snapshot_replaces_local_state", async {
    let (catalog, _dir) = fresh_catalog().await;
    catalog.add_brand(brand("b-local", "Local edit")).await;
    let local_clock = catalog.last_updated().await;

    let provider = Arc::new(MockProvider::with_poll_interval(Duration::from_millis(100)));
    provider.set_load_result(Some(remote_snapshot(local_clock + 1_000, "Remote Wins")));
    let (engine, handle, events) = start_engine(&catalog, provider.clone());

    tokio::time::sleep(Duration::from_millis(400)).await;

    let settings = catalog.settings().await;
    assert_eq!(settings.app_name, "Remote Wins");
    assert_eq!(settings.last_updated, local_clock + 1_000, "remote clock adopted as-is");
    assert!(
      catalog.brand("b-local").await.is_none(),
      "replace is wholesale; concurrent local edits are discarded"
    );
    assert!(events.pull_count() >= 1);

    engine.shutdown().await.expect("shutdown");
    handle.await.expect("join");
  })
  .await;
}

#[tokio::test]
async fn equal_or_older_remote_snapshots_are_discarded() {
  with_timeout("equal_or_older_remote_snapshots_are_discarded", async {
    let (catalog, _dir) = fresh_catalog().await;
    catalog.add_brand(brand("b-local", "Keep me")).await;
    let local_clock = catalog.last_updated().await;

    let provider = Arc::new(MockProvider::with_poll_interval(Duration::from_millis(100)));
    provider.set_load_result(Some(remote_snapshot(local_clock, "Equal clock")));
    let (engine, handle, events) = start_engine(&catalog, provider.clone());

    tokio::time::sleep(Duration::from_millis(400)).await;

    provider.set_load_result(Some(remote_snapshot(local_clock - 50, "Older clock")));
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(catalog.brand("b-local").await.is_some(), "local state untouched");
    assert_ne!(catalog.settings().await.app_name, "Equal clock");
    assert_eq!(events.pull_count(), 0, "discards have no side effects");

    engine.shutdown().await.expect("shutdown");
    handle.await.expect("join");
  })
  .await;
}

#[tokio::test]
async fn a_failed_pull_leaves_local_state_alone() {
  with_timeout("a_failed_pull_leaves_local_state_alone", async {
    let (catalog, _dir) = fresh_catalog().await;
    catalog.add_brand(brand("b-local", "Keep me")).await;

    let provider = Arc::new(MockProvider::with_poll_interval(Duration::from_millis(100)));
    provider.set_load_error("connection refused");
    let (engine, handle, events) = start_engine(&catalog, provider.clone());

    // Let the first (debounced) push drain, then the failing polls fire
    tokio::time::sleep(SETTLE).await;

    assert!(catalog.brand("b-local").await.is_some());
    assert_eq!(events.pull_count(), 0);
    assert_eq!(engine.status(), SyncStatus::Error, "pull failures surface as error");

    engine.shutdown().await.expect("shutdown");
    handle.await.expect("join");
  })
  .await;
}

#[tokio::test]
async fn pull_then_push_round_trip_converges_two_replicas() {
  with_timeout("pull_then_push_round_trip_converges_two_replicas", async {
    // Replica A pushes through its provider; replica B polls a provider
    // that returns whatever A saved last.
    let (replica_a, _dir_a) = fresh_catalog().await;
    let provider_a = Arc::new(MockProvider::new());
    let (engine_a, handle_a, _) = start_engine(&replica_a, provider_a.clone());

    replica_a.add_brand(brand("b-shared", "From A")).await;
    tokio::time::sleep(SETTLE).await;

    let pushed = provider_a.last_saved().expect("A pushed");

    let (replica_b, _dir_b) = fresh_catalog().await;
    replica_b.add_brand(brand("b-doomed", "B's unpushed edit")).await;

    let provider_b = Arc::new(MockProvider::with_poll_interval(Duration::from_millis(100)));

    // Make A's snapshot strictly newer than B's local clock
    let mut newer = pushed;
    newer.settings.last_updated = replica_b.last_updated().await + 1_000;
    provider_b.set_load_result(Some(newer));

    let (engine_b, handle_b, _) = start_engine(&replica_b, provider_b);
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(replica_b.brand("b-shared").await.is_some(), "B converged to A's state");
    assert!(
      replica_b.brand("b-doomed").await.is_none(),
      "B's concurrent edit is lost — last write wins at snapshot granularity"
    );

    engine_a.shutdown().await.expect("shutdown a");
    handle_a.await.expect("join a");
    engine_b.shutdown().await.expect("shutdown b");
    handle_b.await.expect("join b");
  })
  .await;
}
