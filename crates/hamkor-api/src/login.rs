//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/login` | Body: `{"phone":"998…","role":"customer"}`; issues a code |
//! | `POST` | `/auth/verify` | Body: `{"phone":"998…","code":"123456"}`; returns a token |

use axum::{Json, extract::State};
use hamkor_core::{
  dispatch::{ChatDispatch, ImageHost},
  identity::Role,
  store::MarketStore,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ApiState, error::ApiError};

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub phone: String,
  pub role:  Option<Role>,
}

/// Echo of the canonical phone and the role now stored.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
  pub phone: String,
  pub role:  Role,
}

/// `POST /auth/login`
pub async fn login<S, D, H>(
  State(state): State<ApiState<S, D, H>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<LoginResponse>, ApiError>
where
  S: MarketStore,
  D: ChatDispatch,
  H: ImageHost,
{
  let issued = state.otp.login(&body.phone, body.role).await?;
  info!(
    identity = %issued.identity.identity_id,
    delivered = issued.delivered,
    "login requested"
  );
  Ok(Json(LoginResponse { phone: issued.identity.phone, role: issued.identity.role }))
}

// ─── Verify ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
  pub phone: String,
  #[serde(alias = "otpCode", alias = "otp_code")]
  pub code:  String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
  pub token:      String,
  pub token_type: &'static str,
}

/// `POST /auth/verify`
pub async fn verify<S, D, H>(
  State(state): State<ApiState<S, D, H>>,
  Json(body): Json<VerifyBody>,
) -> Result<Json<TokenResponse>, ApiError>
where
  S: MarketStore,
  D: ChatDispatch,
  H: ImageHost,
{
  let token = state.otp.verify(&body.phone, &body.code).await?;
  Ok(Json(TokenResponse { token, token_type: "bearer" }))
}
