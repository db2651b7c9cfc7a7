//! Sync engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sync scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
  /// Debounce window before an outbound save (milliseconds). Repeated
  /// mutations inside the window collapse into a single push.
  #[serde(default = "SyncConfig::default_debounce_ms")]
  pub debounce_ms: u64
}

impl SyncConfig {
  const fn default_debounce_ms() -> u64 {
    2500
  }

  /// Convert to `Duration` — debounce window.
  #[must_use]
  pub const fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      debounce_ms: Self::default_debounce_ms()
    }
  }
}
