//! Mock snapshot API server on axum.
//!
//! Provides `FakeSnapshotApi::spawn()` — starts an HTTP server on a random
//! port that stores one JSON snapshot, enforces an optional `x-api-key`,
//! and can be switched into read-only or failing modes.

#![allow(clippy::expect_used)]

use std::sync::{
  Arc,
  atomic::{AtomicBool, AtomicUsize, Ordering}
};

use axum::{
  Json, Router,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
  routing::get
};
use serde_json::Value;
use tokio::sync::RwLock;

/// Internal state of the fake API.
#[derive(Default)]
pub struct FakeState {
  /// The stored snapshot, if any.
  pub snapshot: RwLock<Option<Value>>,
  /// Required `x-api-key` value; `None` disables the check.
  pub required_key: RwLock<Option<String>>,
  /// Reject POSTs with 405 (shared-URL behavior).
  pub read_only: AtomicBool,
  /// Answer every request with this status (outage simulation).
  pub fail_with: RwLock<Option<u16>>,
  /// Number of accepted POSTs.
  pub post_count: AtomicUsize
}

impl FakeState {
  /// Store a snapshot directly, bypassing HTTP.
  pub async fn set_snapshot(&self, value: Value) {
    *self.snapshot.write().await = Some(value);
  }

  /// Require this `x-api-key` on every request.
  pub async fn require_key(&self, key: &str) {
    *self.required_key.write().await = Some(key.to_string());
  }

  /// Reject all POSTs from now on.
  pub fn set_read_only(&self) {
    self.read_only.store(true, Ordering::Relaxed);
  }

  /// Fail every request with the given status.
  pub async fn set_failure(&self, status: u16) {
    *self.fail_with.write().await = Some(status);
  }

  /// Number of accepted POSTs.
  pub fn post_count(&self) -> usize {
    self.post_count.load(Ordering::Relaxed)
  }
}

/// The fake snapshot API.
pub struct FakeSnapshotApi;

impl FakeSnapshotApi {
  /// Start the server on a random port. Returns `(base_url, state)`.
  pub async fn spawn() -> (String, Arc<FakeState>) {
    let state = Arc::new(FakeState::default());

    let app = Router::new()
      .route("/", get(get_snapshot).post(post_snapshot))
      .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
      .await
      .expect("bind");
    let addr = listener.local_addr().expect("addr");

    tokio::spawn(async move {
      axum::serve(listener, app).await.expect("serve");
    });

    (format!("http://{addr}/"), state)
  }
}

async fn guard(state: &FakeState, headers: &HeaderMap) -> Result<(), StatusCode> {
  if let Some(status) = *state.fail_with.read().await {
    return Err(StatusCode::from_u16(status).expect("valid status"));
  }

  if let Some(required) = state.required_key.read().await.as_deref() {
    let presented = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if presented != Some(required) {
      return Err(StatusCode::UNAUTHORIZED);
    }
  }

  Ok(())
}

async fn get_snapshot(
  State(state): State<Arc<FakeState>>,
  headers: HeaderMap
) -> impl IntoResponse {
  if let Err(status) = guard(&state, &headers).await {
    return status.into_response();
  }

  match state.snapshot.read().await.clone() {
    Some(value) => Json(value).into_response(),
    None => StatusCode::NOT_FOUND.into_response()
  }
}

async fn post_snapshot(
  State(state): State<Arc<FakeState>>,
  headers: HeaderMap,
  Json(body): Json<Value>
) -> impl IntoResponse {
  if let Err(status) = guard(&state, &headers).await {
    return status.into_response();
  }

  if state.read_only.load(Ordering::Relaxed) {
    return StatusCode::METHOD_NOT_ALLOWED.into_response();
  }

  *state.snapshot.write().await = Some(body);
  state.post_count.fetch_add(1, Ordering::Relaxed);
  StatusCode::OK.into_response()
}
