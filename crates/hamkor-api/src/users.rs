//! Handlers for `/users` endpoints.

use axum::{Json, extract::State};
use hamkor_core::{
  dispatch::{ChatDispatch, ImageHost},
  identity::{Identity, Role},
  store::MarketStore,
};
use serde::Deserialize;

use crate::{ApiState, auth::Authenticated, error::ApiError};

/// `GET /users/me`
pub async fn me(Authenticated(identity): Authenticated) -> Json<Identity> { Json(identity) }

#[derive(Debug, Deserialize)]
pub struct RoleBody {
  pub role: Role,
}

/// `PUT /users/role`, body: `{"role":"supplier"}`
pub async fn set_role<S, D, H>(
  State(state): State<ApiState<S, D, H>>,
  Authenticated(identity): Authenticated,
  Json(body): Json<RoleBody>,
) -> Result<Json<Identity>, ApiError>
where
  S: MarketStore,
  D: ChatDispatch,
  H: ImageHost,
{
  let updated = state
    .store
    .set_role(identity.identity_id, body.role)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(updated))
}
