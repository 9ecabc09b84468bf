//! Handlers for `/reviews/{user_id}`.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use hamkor_core::{
  dispatch::{ChatDispatch, ImageHost},
  review::Review,
  store::MarketStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, auth::Authenticated, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub stars: i64,
  pub text:  Option<String>,
}

/// `POST /reviews/{user_id}`, body: `{"stars":5,"text":"…"}`
pub async fn create<S, D, H>(
  State(state): State<ApiState<S, D, H>>,
  Authenticated(author): Authenticated,
  Path(user_id): Path<Uuid>,
  Json(body): Json<ReviewBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore,
  D: ChatDispatch,
  H: ImageHost,
{
  let review = state
    .reviews
    .submit(&author, user_id, body.stars, body.text)
    .await?;
  Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /reviews/{user_id}`, public.
pub async fn list<S, D, H>(
  State(state): State<ApiState<S, D, H>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Review>>, ApiError>
where
  S: MarketStore,
  D: ChatDispatch,
  H: ImageHost,
{
  Ok(Json(state.reviews.for_identity(user_id).await?))
}
