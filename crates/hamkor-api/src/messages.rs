//! Handlers for `/messages` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/messages/send` | Body: `{"receiverId":"…","content":"…"}` |
//! | `POST` | `/messages/send-image` | Multipart: `receiverId`, `image`, optional `content` |
//! | `GET`  | `/messages/chats` | Newest conversation first |
//! | `GET`  | `/messages/{peer_id}` | Oldest message first |
//! | `POST` | `/messages/{peer_id}/read` | Returns `{"updated":n}` |

use axum::{
  Json,
  extract::{Multipart, Path, State, multipart::MultipartError},
  http::StatusCode,
  response::IntoResponse,
};
use hamkor_core::{
  dispatch::{ChatDispatch, ImageHost, StoredImage},
  message::{ChatSummary, Message},
  store::MarketStore,
};
use hamkor_service::Error as ServiceError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{ApiState, auth::Authenticated, error::ApiError};

// ─── Text ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBody {
  #[serde(alias = "receiver_id")]
  pub receiver_id: Uuid,
  pub content:     Option<String>,
}

/// `POST /messages/send`
pub async fn send<S, D, H>(
  State(state): State<ApiState<S, D, H>>,
  Authenticated(me): Authenticated,
  Json(body): Json<SendBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore,
  D: ChatDispatch,
  H: ImageHost,
{
  let message = state
    .relay
    .send(&me, body.receiver_id, body.content, None)
    .await?;
  Ok((StatusCode::CREATED, Json(message)))
}

// ─── Image ───────────────────────────────────────────────────────────────────

/// The parts of an image upload form.
#[derive(Debug, Default)]
struct ImageForm {
  receiver_id: Option<String>,
  content:     Option<String>,
  image:       Option<UploadedFile>,
}

#[derive(Debug)]
struct UploadedFile {
  file_name: String,
  bytes:     Vec<u8>,
}

fn bad_form(e: MultipartError) -> ApiError { ApiError::BadRequest(e.body_text()) }

async fn read_image_form(mut multipart: Multipart) -> Result<ImageForm, ApiError> {
  let mut form = ImageForm::default();
  while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
    match field.name() {
      Some("receiverId" | "receiver_id") => {
        form.receiver_id = Some(field.text().await.map_err(bad_form)?);
      }
      Some("content") => form.content = Some(field.text().await.map_err(bad_form)?),
      Some("image") => {
        let kind = field.content_type().unwrap_or("image/*");
        if !kind.starts_with("image/") {
          return Err(ApiError::BadRequest(format!("not an image: {kind}")));
        }
        let file_name = field.file_name().unwrap_or("image").to_owned();
        let bytes = field.bytes().await.map_err(bad_form)?.to_vec();
        form.image = Some(UploadedFile { file_name, bytes });
      }
      other => debug!(field = ?other, "ignoring multipart field"),
    }
  }
  Ok(form)
}

/// `POST /messages/send-image`
///
/// The quota is checked before the upload so a refused request never reaches
/// the image host. The insert re-checks it atomically; when that refuses the
/// message, the upload is discarded.
pub async fn send_image<S, D, H>(
  State(state): State<ApiState<S, D, H>>,
  Authenticated(me): Authenticated,
  multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore,
  D: ChatDispatch,
  H: ImageHost,
{
  let form = read_image_form(multipart).await?;
  let receiver_id = form
    .receiver_id
    .ok_or_else(|| ApiError::BadRequest("missing field `receiverId`".into()))?;
  let receiver_id = Uuid::parse_str(receiver_id.trim())
    .map_err(|e| ApiError::BadRequest(format!("invalid receiverId: {e}")))?;
  let image = form
    .image
    .filter(|f| !f.bytes.is_empty())
    .ok_or_else(|| ApiError::BadRequest("missing field `image`".into()))?;

  state
    .store
    .identity(receiver_id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ServiceError::NotFound("receiver"))?;
  state.relay.ensure_image_quota(me.identity_id).await?;

  let stored = state.images.upload(image.bytes, image.file_name).await?;
  match state
    .relay
    .send(&me, receiver_id, form.content, Some(stored.url.clone()))
    .await
  {
    Ok(message) => Ok((StatusCode::CREATED, Json(message))),
    Err(e) => {
      discard_upload(&state, stored).await;
      Err(e.into())
    }
  }
}

/// Delete an upload no message ended up pointing at. Identical pictures share
/// one hosted file, so a file some stored message still uses is kept.
async fn discard_upload<S, D, H>(state: &ApiState<S, D, H>, stored: StoredImage)
where
  S: MarketStore,
  D: ChatDispatch,
  H: ImageHost,
{
  match state.store.image_in_use(stored.url.clone()).await {
    Ok(false) => {}
    Ok(true) => return,
    Err(e) => {
      warn!(url = %stored.url, error = %e, "could not check image references; keeping upload");
      return;
    }
  }
  if let Err(e) = state.images.delete(stored.file_id).await {
    warn!(url = %stored.url, error = %e, "failed to delete orphaned upload");
  }
}

// ─── Reading ─────────────────────────────────────────────────────────────────

/// `GET /messages/chats`
pub async fn chats<S, D, H>(
  State(state): State<ApiState<S, D, H>>,
  Authenticated(me): Authenticated,
) -> Result<Json<Vec<ChatSummary>>, ApiError>
where
  S: MarketStore,
  D: ChatDispatch,
  H: ImageHost,
{
  Ok(Json(state.relay.chats(me.identity_id).await?))
}

/// `GET /messages/{peer_id}`
pub async fn conversation<S, D, H>(
  State(state): State<ApiState<S, D, H>>,
  Authenticated(me): Authenticated,
  Path(peer_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: MarketStore,
  D: ChatDispatch,
  H: ImageHost,
{
  Ok(Json(state.relay.conversation(me.identity_id, peer_id).await?))
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
  pub updated: u64,
}

/// `POST /messages/{peer_id}/read`
pub async fn mark_read<S, D, H>(
  State(state): State<ApiState<S, D, H>>,
  Authenticated(me): Authenticated,
  Path(peer_id): Path<Uuid>,
) -> Result<Json<MarkedRead>, ApiError>
where
  S: MarketStore,
  D: ChatDispatch,
  H: ImageHost,
{
  let updated = state.relay.mark_read(me.identity_id, peer_id).await?;
  Ok(Json(MarkedRead { updated }))
}
