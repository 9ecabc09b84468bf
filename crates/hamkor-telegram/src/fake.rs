//! A local stand-in for the Bot API that records every call.

use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use axum::{
  extract::{Path, State},
  routing::post,
  Json, Router,
};
use serde_json::{json, Value};

use crate::TelegramClient;

#[derive(Debug, Clone)]
pub struct Call {
  pub method: String,
  pub body:   Value,
}

#[derive(Default)]
struct FakeState {
  calls:   Mutex<Vec<Call>>,
  reject:  Option<String>,
  pending: Mutex<Vec<Value>>,
  /// Delay before answering `sendMessage`.
  stall:   Option<Duration>,
}

pub struct FakeBotApi {
  base:  String,
  state: Arc<FakeState>,
}

impl FakeBotApi {
  pub async fn start() -> Self { Self::spawn(FakeState::default()).await }

  pub async fn start_rejecting(description: &str) -> Self {
    Self::spawn(FakeState { reject: Some(description.to_owned()), ..FakeState::default() }).await
  }

  /// Serve `updates` on the first `getUpdates` call.
  pub async fn with_updates(updates: Vec<Value>) -> Self {
    Self::spawn(FakeState { pending: Mutex::new(updates), ..FakeState::default() }).await
  }

  /// Like [`Self::with_updates`], but every `sendMessage` answers after `stall`.
  pub async fn with_slow_replies(updates: Vec<Value>, stall: Duration) -> Self {
    Self::spawn(FakeState {
      pending: Mutex::new(updates),
      stall: Some(stall),
      ..FakeState::default()
    })
    .await
  }

  async fn spawn(state: FakeState) -> Self {
    let state = Arc::new(state);
    let app = Router::new()
      .route("/{bot}/{method}", post(handle))
      .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    Self { base: format!("http://{addr}"), state }
  }

  pub fn client(&self) -> TelegramClient {
    TelegramClient::new(&self.base, "TEST", Duration::from_secs(5)).unwrap()
  }

  pub fn calls(&self) -> Vec<Call> { self.state.calls.lock().unwrap().clone() }

  /// Calls other than polling.
  pub fn sent(&self) -> Vec<Call> {
    self.calls().into_iter().filter(|c| c.method != "getUpdates").collect()
  }
}

async fn handle(
  State(state): State<Arc<FakeState>>,
  Path((_bot, method)): Path<(String, String)>,
  Json(body): Json<Value>,
) -> Json<Value> {
  state.calls.lock().unwrap().push(Call { method: method.clone(), body });

  if let Some(description) = &state.reject {
    return Json(json!({ "ok": false, "error_code": 403, "description": description }));
  }
  if method == "getUpdates" {
    let updates: Vec<Value> = std::mem::take(&mut *state.pending.lock().unwrap());
    if updates.is_empty() {
      tokio::time::sleep(Duration::from_millis(20)).await;
    }
    return Json(json!({ "ok": true, "result": updates }));
  }
  if let (Some(stall), "sendMessage") = (state.stall, method.as_str()) {
    tokio::time::sleep(stall).await;
  }
  Json(json!({ "ok": true, "result": true }))
}
