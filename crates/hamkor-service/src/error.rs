//! Error type for `hamkor-service`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("phone number is required")]
  InvalidPhone,

  #[error("invalid verification code")]
  InvalidCode,

  #[error("verification code has expired")]
  Expired,

  #[error("invalid or expired token")]
  InvalidToken,

  #[error("daily limit of {limit} image messages reached")]
  RateLimited { limit: u32 },

  #[error("message has neither text nor image")]
  EmptyMessage,

  #[error("you cannot review yourself")]
  SelfReview,

  #[error("rating must be between 1 and 5 stars, got {0}")]
  InvalidRating(i64),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("token signing failed: {0}")]
  Token(#[source] jsonwebtoken::errors::Error),
}

impl Error {
  /// Wrap a backend error; used as `.map_err(Error::store)`.
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
