//! Bearer-token extractor.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use hamkor_core::{
  dispatch::{ChatDispatch, ImageHost},
  identity::Identity,
  store::MarketStore,
};
use hamkor_service::Error as ServiceError;

use crate::{ApiState, error::ApiError};

/// The identity behind a valid session token.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

/// The token of an `Authorization: Bearer <token>` header.
pub fn bearer(headers: &HeaderMap) -> Option<&str> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.split_once(' ')?;
  scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

impl<S, D, H> FromRequestParts<ApiState<S, D, H>> for Authenticated
where
  S: MarketStore,
  D: ChatDispatch,
  H: ImageHost,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S, D, H>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer(&parts.headers).ok_or(ApiError::MissingToken)?;
    let phone = state.tokens.authenticate(token)?;

    // A valid token for a phone without an identity is still unauthorised.
    let identity = state
      .store
      .identity_by_phone(&phone)
      .await
      .map_err(ApiError::store)?
      .ok_or(ServiceError::InvalidToken)?;
    Ok(Authenticated(identity))
  }
}
