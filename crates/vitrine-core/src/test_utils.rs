//! Test utilities: `MockProvider` and `TestEventHandler`.

#![allow(clippy::expect_used)]

use std::{
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering}
  },
  time::Duration
};

use crate::{
  asset,
  events::{LogLevel, SyncEventHandler},
  provider::{ConnectResult, ProviderKind, StorageProvider},
  snapshot::BackupData,
  sync::SyncStatus
};

/// Mock provider for unit testing the sync engine and catalog wiring.
///
/// Records all calls for subsequent assertions.
pub struct MockProvider {
  /// Recorded `save_snapshot()` calls, in order.
  pub save_calls: Arc<Mutex<Vec<BackupData>>>,
  /// Recorded `save_asset()` calls: `(name, mime, byte length)`.
  pub asset_calls: Arc<Mutex<Vec<(String, String, usize)>>>,
  /// Snapshot returned by `load_snapshot()`.
  pub load_result: Arc<Mutex<Option<BackupData>>>,
  /// Error returned by `save_snapshot()` (if set).
  pub save_error: Arc<Mutex<Option<String>>>,
  /// Error returned by `load_snapshot()` (if set).
  pub load_error: Arc<Mutex<Option<String>>>,
  /// Delay before returning from `save_snapshot()` (race testing).
  pub save_delay: Arc<Mutex<Option<Duration>>>,
  /// Poll interval reported to the engine.
  pub poll_interval_dur: Duration,
  /// Online status.
  pub online: Arc<AtomicBool>
}

impl Default for MockProvider {
  fn default() -> Self {
    Self::new()
  }
}

impl MockProvider {
  /// Create a mock with a poll interval long enough to never fire.
  #[must_use]
  pub fn new() -> Self {
    Self::with_poll_interval(Duration::from_secs(3600))
  }

  /// Create a mock that polls at the given interval.
  #[must_use]
  pub fn with_poll_interval(poll_interval_dur: Duration) -> Self {
    Self {
      save_calls: Arc::new(Mutex::new(Vec::new())),
      asset_calls: Arc::new(Mutex::new(Vec::new())),
      load_result: Arc::new(Mutex::new(None)),
      save_error: Arc::new(Mutex::new(None)),
      load_error: Arc::new(Mutex::new(None)),
      save_delay: Arc::new(Mutex::new(None)),
      poll_interval_dur,
      online: Arc::new(AtomicBool::new(true))
    }
  }

  /// Set the snapshot `load_snapshot()` returns.
  pub fn set_load_result(&self, snapshot: Option<BackupData>) {
    *self.load_result.lock().expect("lock") = snapshot;
  }

  /// Make `save_snapshot()` fail.
  pub fn set_save_error(&self, msg: &str) {
    *self.save_error.lock().expect("lock") = Some(msg.to_string());
  }

  /// Clear the `save_snapshot()` error.
  pub fn clear_save_error(&self) {
    *self.save_error.lock().expect("lock") = None;
  }

  /// Make `load_snapshot()` fail.
  pub fn set_load_error(&self, msg: &str) {
    *self.load_error.lock().expect("lock") = Some(msg.to_string());
  }

  /// Delay `save_snapshot()` before it returns.
  pub fn set_save_delay(&self, delay: Duration) {
    *self.save_delay.lock().expect("lock") = Some(delay);
  }

  /// Number of `save_snapshot()` calls so far.
  pub fn save_call_count(&self) -> usize {
    self.save_calls.lock().expect("lock").len()
  }

  /// The most recent snapshot passed to `save_snapshot()`.
  pub fn last_saved(&self) -> Option<BackupData> {
    self.save_calls.lock().expect("lock").last().cloned()
  }
}

impl StorageProvider for MockProvider {
  async fn connect(&self) -> anyhow::Result<ConnectResult> {
    if self.load_result.lock().expect("lock").is_some() {
      Ok(ConnectResult::Existing)
    } else {
      Ok(ConnectResult::Fresh)
    }
  }

  async fn save_snapshot(&self, snapshot: &BackupData) -> anyhow::Result<()> {
    self
      .save_calls
      .lock()
      .expect("lock")
      .push(snapshot.clone());

    let delay = *self.save_delay.lock().expect("lock");
    if let Some(d) = delay {
      tokio::time::sleep(d).await;
    }

    let maybe_err = self
      .save_error
      .lock()
      .expect("lock")
      .as_ref()
      .map(ToString::to_string);
    if let Some(msg) = maybe_err {
      return Err(anyhow::anyhow!("{msg}"));
    }

    Ok(())
  }

  async fn load_snapshot(&self) -> anyhow::Result<Option<BackupData>> {
    if let Some(ref msg) = *self.load_error.lock().expect("lock") {
      return Err(anyhow::anyhow!("{msg}"));
    }

    Ok(self.load_result.lock().expect("lock").clone())
  }

  async fn save_asset(&self, name: &str, mime: &str, bytes: &[u8]) -> anyhow::Result<String> {
    self
      .asset_calls
      .lock()
      .expect("lock")
      .push((name.to_string(), mime.to_string(), bytes.len()));

    Ok(asset::encode_data_uri(mime, bytes))
  }

  async fn disconnect(&self) {}

  async fn is_online(&self) -> bool {
    self.online.load(Ordering::Relaxed)
  }

  fn poll_interval(&self) -> Duration {
    self.poll_interval_dur
  }

  fn kind(&self) -> ProviderKind {
    ProviderKind::CustomApi
  }

  fn name(&self) -> &'static str {
    "mock"
  }
}

/// Test event handler that records all calls.
#[derive(Default)]
pub struct TestEventHandler {
  /// Recorded `on_status` transitions.
  pub status_calls: Arc<Mutex<Vec<SyncStatus>>>,
  /// Recorded `on_push(clock)` calls.
  pub push_calls: Arc<Mutex<Vec<i64>>>,
  /// Recorded `on_pull(clock)` calls.
  pub pull_calls: Arc<Mutex<Vec<i64>>>,
  /// Recorded `on_log(level, message)` calls.
  pub log_calls: Arc<Mutex<Vec<(LogLevel, String)>>>
}

impl TestEventHandler {
  /// Create an empty handler.
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of `on_push` calls.
  pub fn push_count(&self) -> usize {
    self.push_calls.lock().expect("lock").len()
  }

  /// Number of `on_pull` calls.
  pub fn pull_count(&self) -> usize {
    self.pull_calls.lock().expect("lock").len()
  }

  /// Whether a given status was ever observed.
  pub fn saw_status(&self, status: SyncStatus) -> bool {
    self.status_calls.lock().expect("lock").contains(&status)
  }

  /// Number of log entries at a given level.
  pub fn log_count(&self, level: LogLevel) -> usize {
    self
      .log_calls
      .lock()
      .expect("lock")
      .iter()
      .filter(|(l, _)| *l == level)
      .count()
  }
}

impl SyncEventHandler for TestEventHandler {
  fn on_status(&self, status: SyncStatus) {
    self.status_calls.lock().expect("lock").push(status);
  }

  fn on_push(&self, clock: i64) {
    self.push_calls.lock().expect("lock").push(clock);
  }

  fn on_pull(&self, clock: i64) {
    self.pull_calls.lock().expect("lock").push(clock);
  }

  fn on_log(&self, level: LogLevel, message: &str) {
    self
      .log_calls
      .lock()
      .expect("lock")
      .push((level, message.to_string()));
  }
}

/// Default timeout for async tests (10 seconds).
///
/// Prevents tests from hanging indefinitely on deadlocks or timing issues.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Wrap an async test body with a timeout and status output.
///
/// Usage:
/// ```ignore
/// #[tokio::test]
/// async fn test_foo() {
///     with_timeout("test_foo", async {
///         // test body
///     }).await;
/// }
/// ```
#[allow(clippy::panic)]
pub async fn with_timeout<F, T>(test_name: &str, f: F) -> T
where
  F: std::future::Future<Output = T>
{
  eprintln!("[TEST] Starting: {test_name}");
  let result = tokio::time::timeout(TEST_TIMEOUT, f).await.unwrap_or_else(
    |_| {
      panic!(
        "[TEST] {test_name} timed out after {TEST_TIMEOUT:?} — possible deadlock"
      )
    }
  );
  eprintln!("[TEST] Completed: {test_name}");
  result
}
