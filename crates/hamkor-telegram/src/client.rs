//! Async client for the Telegram Bot API.

use std::time::Duration;

use hamkor_core::{
  dispatch::{ChatDispatch, DispatchError},
  identity::ChatAccountId,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::{
  wire::{
    AnswerCallbackQuery, ApiResponse, ChatId, GetUpdates, ReplyMarkup, SendMessage, SendPhoto,
    Update,
  },
  Error, Result,
};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct TelegramClient {
  http:     Client,
  /// `{api_base}/bot{token}`
  endpoint: String,
}

impl TelegramClient {
  /// `request_timeout` must exceed the long-poll timeout used with
  /// [`Self::get_updates`].
  pub fn new(api_base: &str, token: &str, request_timeout: Duration) -> Result<Self> {
    let http = Client::builder().timeout(request_timeout).build()?;
    let endpoint = format!("{}/bot{token}", api_base.trim_end_matches('/'));
    Ok(Self { http, endpoint })
  }

  async fn call<P, R>(&self, method: &'static str, params: &P) -> Result<R>
  where
    P: Serialize + ?Sized,
    R: DeserializeOwned,
  {
    let resp: ApiResponse<R> = self
      .http
      .post(format!("{}/{method}", self.endpoint))
      .json(params)
      .send()
      .await?
      .json()
      .await?;

    match resp {
      ApiResponse { ok: true, result: Some(result), .. } => Ok(result),
      ApiResponse { description, .. } => Err(Error::Api {
        method,
        description: description.unwrap_or_else(|| "no description".to_owned()),
      }),
    }
  }

  // ── Polling ───────────────────────────────────────────────────────────────

  /// Long-poll for updates with id `>= offset`, waiting up to `timeout_secs`.
  pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
    let params = GetUpdates {
      offset,
      timeout: timeout_secs,
      allowed_updates: &["message", "callback_query"],
    };
    self.call("getUpdates", &params).await
  }

  // ── Sending ───────────────────────────────────────────────────────────────

  pub async fn send_message(
    &self,
    chat_id: &ChatId,
    text: &str,
    reply_markup: Option<&ReplyMarkup>,
  ) -> Result<()> {
    let params = SendMessage { chat_id, text, reply_markup };
    let _: serde_json::Value = self.call("sendMessage", &params).await?;
    debug!(?chat_id, "sent message");
    Ok(())
  }

  pub async fn send_photo(&self, chat_id: i64, photo: &str, caption: &str) -> Result<()> {
    let params = SendPhoto { chat_id, photo, caption };
    let _: serde_json::Value = self.call("sendPhoto", &params).await?;
    debug!(chat_id, "sent photo");
    Ok(())
  }

  pub async fn answer_callback(&self, callback_query_id: &str) -> Result<()> {
    let _: serde_json::Value = self
      .call("answerCallbackQuery", &AnswerCallbackQuery { callback_query_id })
      .await?;
    Ok(())
  }
}

impl From<Error> for DispatchError {
  fn from(e: Error) -> Self {
    match e {
      Error::Api { description, .. } => DispatchError::Rejected(description),
      Error::Http(e) if e.is_timeout() => DispatchError::TimedOut,
      Error::TimedOut { .. } => DispatchError::TimedOut,
      other => DispatchError::Transport(other.to_string()),
    }
  }
}

impl ChatDispatch for TelegramClient {
  async fn send_text(&self, account: ChatAccountId, text: String) -> Result<(), DispatchError> {
    Ok(self.send_message(&ChatId::Account(account), &text, None).await?)
  }

  async fn send_photo(
    &self,
    account: ChatAccountId,
    photo_url: String,
    caption: String,
  ) -> Result<(), DispatchError> {
    Ok(TelegramClient::send_photo(self, account, &photo_url, &caption).await?)
  }
}
