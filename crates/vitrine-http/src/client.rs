//! Snapshot API HTTP client.
//!
//! One endpoint, two verbs: `GET` returns the snapshot JSON, `POST`
//! overwrites it. An optional shared secret travels as `x-api-key`.

use std::time::Duration;

use anyhow::Context;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, error};
use vitrine_core::{BackupData, ProviderError};

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Request timeout. A timeout is a provider failure, never a hang.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Snapshot API HTTP client.
pub struct ApiClient {
  /// reqwest HTTP client.
  c: reqwest::Client,
  /// Snapshot endpoint URL.
  url: String
}

impl ApiClient {
  /// Create a snapshot API client.
  ///
  /// # Errors
  ///
  /// Returns an error if `url` is empty, the key is not a valid header
  /// value, or the HTTP client cannot be built.
  pub fn new(url: &str, api_key: Option<&str>) -> anyhow::Result<Self> {
    if url.trim().is_empty() {
      anyhow::bail!("snapshot URL must not be empty");
    }

    let mut h = HeaderMap::new();
    h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(key) = api_key {
      h.insert(
        API_KEY_HEADER,
        HeaderValue::from_str(key).map_err(|e| anyhow::anyhow!("invalid api key: {e}"))?
      );
    }

    Ok(Self {
      c: reqwest::Client::builder()
        .default_headers(h)
        .timeout(REQUEST_TIMEOUT)
        .build()?,
      url: url.trim_end_matches('/').to_string()
    })
  }

  /// The configured endpoint.
  #[must_use]
  pub fn url(&self) -> &str {
    &self.url
  }

  /// `GET` the remote snapshot. `None` when the endpoint has none yet (404).
  ///
  /// # Errors
  ///
  /// Returns [`ProviderError::Status`] for any other non-2xx answer, or a
  /// network/timeout error.
  pub async fn fetch_snapshot(&self) -> anyhow::Result<Option<Value>> {
    let start = std::time::Instant::now();
    debug!(url = %self.url, "GET snapshot");

    let resp = self
      .c
      .get(&self.url)
      .send()
      .await
      .context("snapshot GET failed")?;
    let st = resp.status();

    if st.as_u16() == 404 {
      debug!(url = %self.url, "no remote snapshot yet");
      return Ok(None);
    }
    if !st.is_success() {
      error!(url = %self.url, status = st.as_u16(), "snapshot GET rejected");
      return Err(ProviderError::Status(st.as_u16()).into());
    }

    let txt = resp.text().await?;
    debug!(
      status = st.as_u16(),
      ms = start.elapsed().as_millis(),
      bytes = txt.len(),
      "snapshot GET ok"
    );

    let value = serde_json::from_str(&txt).context("snapshot body is not JSON")?;
    Ok(Some(value))
  }

  /// `POST` the full snapshot body, overwriting remote state.
  ///
  /// # Errors
  ///
  /// Returns [`ProviderError::Status`] for any non-2xx answer (no partial
  /// success), or a network/timeout error.
  pub async fn push_snapshot(&self, snapshot: &BackupData) -> anyhow::Result<()> {
    let start = std::time::Instant::now();
    debug!(url = %self.url, "POST snapshot");

    let resp = self
      .c
      .post(&self.url)
      .json(snapshot)
      .send()
      .await
      .context("snapshot POST failed")?;
    let st = resp.status();

    if !st.is_success() {
      error!(url = %self.url, status = st.as_u16(), "snapshot POST rejected");
      return Err(ProviderError::Status(st.as_u16()).into());
    }

    debug!(
      status = st.as_u16(),
      ms = start.elapsed().as_millis(),
      "snapshot POST ok"
    );
    Ok(())
  }
}
