//! JSON HTTP API for the Hamkor marketplace.
//!
//! Exposes an axum [`Router`] backed by any [`MarketStore`], chat channel and
//! image host. TLS, CORS and request tracing are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! Router::new().merge(hamkor_api::api_router(state))
//! ```

pub mod auth;
pub mod error;
pub mod login;
pub mod messages;
pub mod reviews;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post, put},
};
use hamkor_core::{
  dispatch::{ChatDispatch, ImageHost},
  store::MarketStore,
};
use hamkor_service::{
  ServiceSettings, otp::OtpService, relay::MessageRelay, reviews::ReviewBook,
  session::SessionTokens,
};

pub use auth::Authenticated;
pub use error::ApiError;

/// Largest accepted request body; bounds image uploads.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S, D, H> {
  pub store:   Arc<S>,
  pub images:  Arc<H>,
  pub tokens:  SessionTokens,
  pub otp:     OtpService<S, D>,
  pub relay:   MessageRelay<S, D>,
  pub reviews: ReviewBook<S>,
}

impl<S, D, H> Clone for ApiState<S, D, H> {
  fn clone(&self) -> Self {
    Self {
      store:   Arc::clone(&self.store),
      images:  Arc::clone(&self.images),
      tokens:  self.tokens.clone(),
      otp:     self.otp.clone(),
      relay:   self.relay.clone(),
      reviews: self.reviews.clone(),
    }
  }
}

impl<S, D, H> ApiState<S, D, H>
where
  S: MarketStore,
  D: ChatDispatch,
  H: ImageHost,
{
  pub fn new(
    store: Arc<S>,
    chat: Arc<D>,
    images: Arc<H>,
    tokens: SessionTokens,
    settings: ServiceSettings,
  ) -> Self {
    Self {
      otp: OtpService::new(store.clone(), chat.clone(), tokens.clone(), settings.clone()),
      relay: MessageRelay::new(store.clone(), chat, settings),
      reviews: ReviewBook::new(store.clone()),
      store,
      images,
      tokens,
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be merged into any parent router regardless
/// of its own state type.
pub fn api_router<S, D, H>(state: ApiState<S, D, H>) -> Router<()>
where
  S: MarketStore + 'static,
  D: ChatDispatch + 'static,
  H: ImageHost + 'static,
{
  Router::new()
    // Authentication
    .route("/auth/login", post(login::login::<S, D, H>))
    .route("/auth/verify", post(login::verify::<S, D, H>))
    // Users
    .route("/users/me", get(users::me))
    .route("/users/role", put(users::set_role::<S, D, H>))
    // Messages
    .route("/messages/send", post(messages::send::<S, D, H>))
    .route("/messages/send-image", post(messages::send_image::<S, D, H>))
    .route("/messages/chats", get(messages::chats::<S, D, H>))
    .route("/messages/{peer_id}", get(messages::conversation::<S, D, H>))
    .route("/messages/{peer_id}/read", post(messages::mark_read::<S, D, H>))
    // Reviews
    .route(
      "/reviews/{user_id}",
      get(reviews::list::<S, D, H>).post(reviews::create::<S, D, H>),
    )
    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
    .with_state(state)
}
