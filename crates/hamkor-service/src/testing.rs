//! Shared fixtures for the service tests.

use std::{sync::{Arc, Mutex}, time::Duration};

use hamkor_core::{
  dispatch::{ChatDispatch, DispatchError},
  identity::ChatAccountId,
};
use hamkor_store_sqlite::SqliteStore;

use crate::{session::SessionTokens, ServiceSettings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
  Text { account: ChatAccountId, text: String },
  Photo { account: ChatAccountId, url: String, caption: String },
}

/// Chat channel that records every call instead of talking to Telegram.
#[derive(Default)]
pub struct RecordingChat {
  sent:  Mutex<Vec<Sent>>,
  fail:  bool,
  delay: Option<Duration>,
}

impl RecordingChat {
  pub fn failing() -> Self { Self { fail: true, ..Self::default() } }

  pub fn slow(delay: Duration) -> Self { Self { delay: Some(delay), ..Self::default() } }

  pub fn sent(&self) -> Vec<Sent> { self.sent.lock().unwrap().clone() }

  async fn record(&self, item: Sent) -> Result<(), DispatchError> {
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    self.sent.lock().unwrap().push(item);
    if self.fail {
      return Err(DispatchError::Transport("connection refused".into()));
    }
    Ok(())
  }
}

impl ChatDispatch for RecordingChat {
  async fn send_text(&self, account: ChatAccountId, text: String) -> Result<(), DispatchError> {
    self.record(Sent::Text { account, text }).await
  }

  async fn send_photo(
    &self,
    account: ChatAccountId,
    photo_url: String,
    caption: String,
  ) -> Result<(), DispatchError> {
    self.record(Sent::Photo { account, url: photo_url, caption }).await
  }
}

pub async fn store() -> Arc<SqliteStore> {
  Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"))
}

pub fn settings() -> ServiceSettings {
  ServiceSettings { dispatch_timeout_ms: 200, ..ServiceSettings::default() }
}

pub fn tokens() -> SessionTokens { SessionTokens::new("test-secret", settings().token_ttl()) }
