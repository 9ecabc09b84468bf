//! Error types for `hamkor-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown role: {0:?}")]
  UnknownRole(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
