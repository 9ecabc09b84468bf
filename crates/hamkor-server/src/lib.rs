//! Wiring for the Hamkor server binary: configuration, the concrete chat
//! channel and image host, and the top-level router.

pub mod imagekit;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Json, Router,
  http::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
  },
  routing::get,
};
use hamkor_api::{ApiState, api_router};
use hamkor_core::{
  dispatch::{ChatDispatch, DispatchError, ImageHost},
  identity::ChatAccountId,
  store::MarketStore,
};
use hamkor_service::ServiceSettings;
use hamkor_telegram::{BotSettings, TelegramClient, client::DEFAULT_API_BASE};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

pub use imagekit::{ImageKitHost, Images};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, layered from `config.toml` and `HAMKOR_*`
/// environment variables.
#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub database_path:        PathBuf,
  /// HS256 signing secret for session tokens. Required.
  pub jwt_secret:           String,
  /// Without a token the bot is not started and chat delivery is disabled.
  pub telegram_bot_token:   Option<String>,
  pub telegram_api_base:    String,
  /// Without a key image uploads are refused.
  pub imagekit_private_key: Option<String>,
  pub imagekit_upload_url:  String,
  /// Base of the file management API, used to delete orphaned uploads.
  pub imagekit_files_url:   String,
  pub imagekit_folder:      String,
  pub service:              ServiceSettings,
  pub bot:                  BotSettings,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                 "0.0.0.0".into(),
      port:                 8000,
      database_path:        "hamkor.db".into(),
      jwt_secret:           String::new(),
      telegram_bot_token:   None,
      telegram_api_base:    DEFAULT_API_BASE.into(),
      imagekit_private_key: None,
      imagekit_upload_url:  imagekit::DEFAULT_UPLOAD_URL.into(),
      imagekit_files_url:   imagekit::DEFAULT_FILES_URL.into(),
      imagekit_folder:      "/hamkor".into(),
      service:              ServiceSettings::default(),
      bot:                  BotSettings::default(),
    }
  }
}

impl ServerConfig {
  /// HTTP timeout for Bot API calls; must outlast one long poll.
  pub fn telegram_request_timeout(&self) -> Duration {
    Duration::from_secs(self.bot.poll_timeout_secs + 10)
  }
}

// ─── Chat channel ─────────────────────────────────────────────────────────────

/// The chat channel handed to the services.
#[derive(Clone)]
pub enum ChatChannel {
  Telegram(Arc<TelegramClient>),
  Disabled,
}

impl ChatDispatch for ChatChannel {
  async fn send_text(&self, account: ChatAccountId, text: String) -> Result<(), DispatchError> {
    match self {
      ChatChannel::Telegram(client) => client.send_text(account, text).await,
      ChatChannel::Disabled => Err(DispatchError::Disabled),
    }
  }

  async fn send_photo(
    &self,
    account: ChatAccountId,
    photo_url: String,
    caption: String,
  ) -> Result<(), DispatchError> {
    match self {
      ChatChannel::Telegram(client) => {
        ChatDispatch::send_photo(client.as_ref(), account, photo_url, caption).await
      }
      ChatChannel::Disabled => Err(DispatchError::Disabled),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

async fn welcome() -> Json<Value> { Json(json!({ "message": "Welcome to Hamkor API" })) }

/// The full HTTP surface: API routes, the welcome route, CORS and tracing.
pub fn router<S, D, H>(state: ApiState<S, D, H>) -> Router
where
  S: MarketStore + 'static,
  D: ChatDispatch + 'static,
  H: ImageHost + 'static,
{
  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::GET, Method::POST, Method::PUT])
    .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

  Router::new()
    .route("/", get(welcome))
    .merge(api_router(state))
    .layer(cors)
    .layer(TraceLayer::new_for_http())
}
