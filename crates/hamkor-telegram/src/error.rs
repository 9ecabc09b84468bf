//! Error type for `hamkor-telegram`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{method} rejected: {description}")]
  Api { method: &'static str, description: String },

  #[error("{method} timed out")]
  TimedOut { method: &'static str },

  #[error("support channel is not configured")]
  NoSupportChannel,

  #[error(transparent)]
  Service(#[from] hamkor_service::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
