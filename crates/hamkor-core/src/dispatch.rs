//! Outbound collaborators: the chat channel and the image host.
//!
//! Chat delivery is a convenience signal. Callers treat every
//! [`DispatchError`] as log-and-continue; it never reaches an end user.

use std::future::Future;

use thiserror::Error;

use crate::identity::ChatAccountId;

#[derive(Debug, Error)]
pub enum DispatchError {
  #[error("chat channel is not configured")]
  Disabled,

  #[error("chat transport error: {0}")]
  Transport(String),

  #[error("chat api rejected the request: {0}")]
  Rejected(String),

  #[error("chat dispatch timed out")]
  TimedOut,
}

/// Best-effort delivery over the chat channel.
pub trait ChatDispatch: Send + Sync {
  fn send_text(
    &self,
    account: ChatAccountId,
    text: String,
  ) -> impl Future<Output = Result<(), DispatchError>> + Send + '_;

  fn send_photo(
    &self,
    account: ChatAccountId,
    photo_url: String,
    caption: String,
  ) -> impl Future<Output = Result<(), DispatchError>> + Send + '_;
}

#[derive(Debug, Error)]
pub enum UploadError {
  #[error("image host is not configured")]
  Disabled,

  #[error("image upload failed: {0}")]
  Failed(String),
}

/// A file held by the image host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
  /// Public URL saved on the message.
  pub url:     String,
  /// Host-side handle, needed to delete the file.
  pub file_id: String,
}

/// External image hosting: upload bytes, get back a public URL.
pub trait ImageHost: Send + Sync {
  fn upload(
    &self,
    bytes: Vec<u8>,
    file_name: String,
  ) -> impl Future<Output = Result<StoredImage, UploadError>> + Send + '_;

  /// Remove a previously uploaded file.
  fn delete(&self, file_id: String) -> impl Future<Output = Result<(), UploadError>> + Send + '_;
}
