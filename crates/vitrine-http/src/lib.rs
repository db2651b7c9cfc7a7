//! vitrine-http — HTTP storage providers for Vitrine.
//!
//! Implements `vitrine_core::StorageProvider` twice:
//! - [`HttpApiProvider`] — a self-hosted snapshot API (GET/POST, optional
//!   `x-api-key` shared secret)
//! - [`SharedUrlProvider`] — a public snapshot URL, pull-oriented; pushes
//!   are attempted but typically rejected server-side

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod client;

use std::time::Duration;

use tracing::{info, warn};
use vitrine_core::{
  BackupData, ConnectResult, ProviderError, ProviderKind, StorageProvider, asset
};

use crate::client::ApiClient;

/// HTTP provider configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
  /// Snapshot endpoint URL.
  pub url: String,
  /// Shared secret sent as `x-api-key`.
  pub api_key: Option<String>,
  /// Interval for polling the endpoint for newer snapshots (seconds).
  pub poll_interval_secs: u64
}

impl HttpConfig {
  /// Configuration with the default 5-second poll interval and no key.
  #[must_use]
  pub fn new(url: String) -> Self {
    Self {
      url,
      api_key: None,
      poll_interval_secs: 5
    }
  }
}

/// Storage provider over a custom snapshot API.
pub struct HttpApiProvider {
  client: ApiClient,
  poll_interval_secs: u64
}

impl HttpApiProvider {
  /// Create an API provider.
  ///
  /// # Errors
  ///
  /// Returns an error for an empty URL or an invalid API key value.
  pub fn new(config: &HttpConfig) -> anyhow::Result<Self> {
    Ok(Self {
      client: ApiClient::new(&config.url, config.api_key.as_deref())?,
      poll_interval_secs: config.poll_interval_secs
    })
  }
}

impl StorageProvider for HttpApiProvider {
  async fn connect(&self) -> anyhow::Result<ConnectResult> {
    connect_over_http(&self.client).await
  }

  async fn save_snapshot(&self, snapshot: &BackupData) -> anyhow::Result<()> {
    self.client.push_snapshot(snapshot).await
  }

  async fn load_snapshot(&self) -> anyhow::Result<Option<BackupData>> {
    load_over_http(&self.client).await
  }

  async fn save_asset(&self, _name: &str, mime: &str, bytes: &[u8]) -> anyhow::Result<String> {
    // Assets travel inside the snapshot body; there is no separate upload
    // endpoint, so the reference is the encoded bytes themselves.
    Ok(asset::encode_data_uri(mime, bytes))
  }

  async fn disconnect(&self) {
    info!(url = %self.client.url(), "api provider disconnected");
  }

  async fn is_online(&self) -> bool {
    self.client.fetch_snapshot().await.is_ok()
  }

  fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_secs)
  }

  fn kind(&self) -> ProviderKind {
    ProviderKind::CustomApi
  }

  fn name(&self) -> &'static str {
    "custom-api"
  }
}

/// Storage provider over a public shared snapshot URL.
///
/// Pull-oriented by convention: `save_snapshot` still POSTs, and the usual
/// server answer is a rejected status surfaced as a sync error.
pub struct SharedUrlProvider {
  client: ApiClient,
  poll_interval_secs: u64
}

impl SharedUrlProvider {
  /// Create a shared-URL provider.
  ///
  /// # Errors
  ///
  /// Returns an error for an empty URL or an invalid API key value.
  pub fn new(config: &HttpConfig) -> anyhow::Result<Self> {
    Ok(Self {
      client: ApiClient::new(&config.url, config.api_key.as_deref())?,
      poll_interval_secs: config.poll_interval_secs
    })
  }
}

impl StorageProvider for SharedUrlProvider {
  async fn connect(&self) -> anyhow::Result<ConnectResult> {
    connect_over_http(&self.client).await
  }

  async fn save_snapshot(&self, snapshot: &BackupData) -> anyhow::Result<()> {
    self.client.push_snapshot(snapshot).await
  }

  async fn load_snapshot(&self) -> anyhow::Result<Option<BackupData>> {
    load_over_http(&self.client).await
  }

  async fn save_asset(&self, _name: &str, mime: &str, bytes: &[u8]) -> anyhow::Result<String> {
    Ok(asset::encode_data_uri(mime, bytes))
  }

  async fn disconnect(&self) {
    info!(url = %self.client.url(), "shared url disconnected");
  }

  async fn is_online(&self) -> bool {
    self.client.fetch_snapshot().await.is_ok()
  }

  fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_secs)
  }

  fn kind(&self) -> ProviderKind {
    ProviderKind::SharedUrl
  }

  fn name(&self) -> &'static str {
    "shared-url"
  }
}

/// Shared connect logic: an auth rejection is a hard error, an unreachable
/// endpoint is merely offline.
async fn connect_over_http(client: &ApiClient) -> anyhow::Result<ConnectResult> {
  match client.fetch_snapshot().await {
    Ok(Some(_)) => {
      info!(url = %client.url(), "connected to existing remote snapshot");
      Ok(ConnectResult::Existing)
    }
    Ok(None) => {
      info!(url = %client.url(), "connected, remote is empty");
      Ok(ConnectResult::Fresh)
    }
    Err(e) => match e.downcast_ref::<ProviderError>() {
      Some(ProviderError::Status(status @ (401 | 403))) => {
        Err(ProviderError::Permission(format!("remote rejected the api key (HTTP {status})")).into())
      }
      _ => {
        warn!(url = %client.url(), error = %e, "remote unreachable, connecting offline");
        Ok(ConnectResult::Offline)
      }
    }
  }
}

/// Shared load logic: fetch then parse defensively.
async fn load_over_http(client: &ApiClient) -> anyhow::Result<Option<BackupData>> {
  Ok(
    client
      .fetch_snapshot()
      .await?
      .map(BackupData::from_value)
  )
}
