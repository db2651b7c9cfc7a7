//! Sync event handler for UIs (admin screen, CLI, logs).

use crate::sync::SyncStatus;

/// Log level forwarded to UI surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
  /// Diagnostic detail.
  Debug,
  /// Informational message.
  Info,
  /// Something degraded but recoverable.
  Warn,
  /// An operation failed.
  Error
}

/// Observer of sync engine activity.
///
/// All methods have noop default implementations, so an implementor only
/// overrides what it displays.
#[allow(unused_variables)]
pub trait SyncEventHandler: Send + Sync + 'static {
  /// Sync status changed.
  fn on_status(&self, status: SyncStatus) {}

  /// A snapshot was pushed to the provider; `clock` is its logical clock.
  fn on_push(&self, clock: i64) {}

  /// A newer remote snapshot replaced local state; `clock` is its logical clock.
  fn on_pull(&self, clock: i64) {}

  /// A log message for the UI.
  fn on_log(&self, level: LogLevel, message: &str) {}
}

/// Empty event handler (tests and headless runs).
pub struct NoopEventHandler;

impl SyncEventHandler for NoopEventHandler {}
