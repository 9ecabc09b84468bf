//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use hamkor_core::dispatch::UploadError;
use hamkor_service::Error as ServiceError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Service(#[from] ServiceError),

  #[error("missing bearer token")]
  MissingToken,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Upload(#[from] UploadError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Service(e) => match e {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::InvalidPhone
        | ServiceError::InvalidCode
        | ServiceError::Expired
        | ServiceError::EmptyMessage
        | ServiceError::SelfReview
        | ServiceError::InvalidRating(_) => StatusCode::BAD_REQUEST,
        ServiceError::InvalidToken => StatusCode::UNAUTHORIZED,
        ServiceError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        ServiceError::Store(_) | ServiceError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
      ApiError::MissingToken => StatusCode::UNAUTHORIZED,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Upload(UploadError::Disabled) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Upload(UploadError::Failed(_)) => StatusCode::BAD_GATEWAY,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
