//! Image host backed by the ImageKit upload API.
//!
//! Uploads are content-addressed: the stored file name is derived from a
//! SHA-256 of the bytes, so re-sending the same picture reuses one object.

use std::time::Duration;

use hamkor_core::dispatch::{ImageHost, StoredImage, UploadError};
use reqwest::{
  Client,
  multipart::{Form, Part},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

pub const DEFAULT_UPLOAD_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";
pub const DEFAULT_FILES_URL: &str = "https://api.imagekit.io/v1/files";

/// Large uploads over slow links are common; bounded well above the chat
/// dispatch timeout.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Hex digits of the content hash kept in the file name.
const NAME_HASH_LEN: usize = 32;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
  file_id: String,
  url:     String,
}

#[derive(Clone)]
pub struct ImageKitHost {
  http:        Client,
  upload_url:  String,
  files_url:   String,
  private_key: String,
  folder:      String,
}

impl ImageKitHost {
  pub fn new(
    upload_url: impl Into<String>,
    files_url: impl Into<String>,
    private_key: impl Into<String>,
    folder: impl Into<String>,
    timeout: Duration,
  ) -> reqwest::Result<Self> {
    Ok(Self {
      http:        Client::builder().timeout(timeout).build()?,
      upload_url:  upload_url.into(),
      files_url:   files_url.into().trim_end_matches('/').to_owned(),
      private_key: private_key.into(),
      folder:      folder.into(),
    })
  }

  async fn post(&self, bytes: Vec<u8>, file_name: String) -> reqwest::Result<StoredImage> {
    let form = Form::new()
      .part("file", Part::bytes(bytes).file_name(file_name.clone()))
      .text("fileName", file_name)
      .text("folder", self.folder.clone())
      .text("useUniqueFileName", "false");

    let resp: UploadResponse = self
      .http
      .post(&self.upload_url)
      .basic_auth(&self.private_key, Some(""))
      .multipart(form)
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;
    Ok(StoredImage {
      url:     resp.url,
      file_id: resp.file_id,
    })
  }

  async fn remove(&self, file_id: &str) -> reqwest::Result<()> {
    self
      .http
      .delete(format!("{}/{file_id}", self.files_url))
      .basic_auth(&self.private_key, Some(""))
      .send()
      .await?
      .error_for_status()?;
    Ok(())
  }
}

impl ImageHost for ImageKitHost {
  async fn upload(&self, bytes: Vec<u8>, file_name: String) -> Result<StoredImage, UploadError> {
    let stored = content_file_name(&bytes, &file_name);
    let size = bytes.len();
    match self.post(bytes, stored.clone()).await {
      Ok(image) => {
        info!(file = %stored, file_id = %image.file_id, size, "uploaded image");
        Ok(image)
      }
      Err(e) => {
        warn!(file = %stored, error = %e, "image upload failed");
        Err(UploadError::Failed(e.to_string()))
      }
    }
  }

  async fn delete(&self, file_id: String) -> Result<(), UploadError> {
    match self.remove(&file_id).await {
      Ok(()) => {
        info!(%file_id, "deleted image");
        Ok(())
      }
      Err(e) => {
        warn!(%file_id, error = %e, "image delete failed");
        Err(UploadError::Failed(e.to_string()))
      }
    }
  }
}

/// `<sha256 prefix>.<ext>`, keeping a short alphanumeric extension of
/// `original` and falling back to `jpg`.
pub fn content_file_name(bytes: &[u8], original: &str) -> String {
  let digest = hex::encode(Sha256::digest(bytes));
  let ext = original
    .rsplit_once('.')
    .map(|(_, ext)| ext.to_ascii_lowercase())
    .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    .unwrap_or_else(|| "jpg".to_owned());
  format!("{}.{ext}", &digest[..NAME_HASH_LEN])
}

// ─── Configured host ──────────────────────────────────────────────────────────

/// The image host handed to the API: ImageKit when a key is configured.
#[derive(Clone)]
pub enum Images {
  ImageKit(ImageKitHost),
  Disabled,
}

impl ImageHost for Images {
  async fn upload(&self, bytes: Vec<u8>, file_name: String) -> Result<StoredImage, UploadError> {
    match self {
      Images::ImageKit(host) => host.upload(bytes, file_name).await,
      Images::Disabled => Err(UploadError::Disabled),
    }
  }

  async fn delete(&self, file_id: String) -> Result<(), UploadError> {
    match self {
      Images::ImageKit(host) => host.delete(file_id).await,
      Images::Disabled => Err(UploadError::Disabled),
    }
  }
}
