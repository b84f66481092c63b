//! Client for the external image service.
//!
//! Account images are not stored here. Uploads are forwarded to an image
//! service that produces resized variants and returns their locations; the
//! account record keeps only those references.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rollcall_model::{AccountImage, ImageUpload};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Connect and response timeout applied to every image-service call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("image service request timed out")]
    Timeout,
    #[error("image service request failed: {0}")]
    Request(String),
    #[error("image service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid image service response: {0}")]
    Decode(String),
    #[error("invalid image service url: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ImageStoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ImageStoreError::Timeout
        } else if err.is_decode() {
            ImageStoreError::Decode(err.to_string())
        } else {
            ImageStoreError::Request(err.to_string())
        }
    }
}

/// Storage for account images.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `upload` and return one reference per produced variant.
    async fn store(
        &self,
        upload: &ImageUpload,
    ) -> Result<Vec<AccountImage>, ImageStoreError>;

    /// Remove a previously stored image. Removing an unknown image succeeds.
    async fn delete(&self, image: &AccountImage) -> Result<(), ImageStoreError>;
}

#[derive(Debug, Deserialize)]
struct StoredImage {
    filename: String,
    url: String,
    version_name: String,
}

#[derive(Debug, Deserialize)]
struct StoreResponse {
    #[serde(default)]
    images: Vec<StoredImage>,
}

/// [`ImageStore`] speaking JSON over HTTP.
///
/// `POST {base}/images` with `{filename, data, ops}` (data base64) answers
/// `{images: [{filename, url, version_name}]}`; `DELETE
/// {base}/images/{filename}` removes one variant.
#[derive(Debug, Clone)]
pub struct HttpImageStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpImageStore {
    pub fn new(
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ImageStoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ImageStoreError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ImageStoreError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ImageStoreError::Request(format!(
                    "Failed to create HTTP client: {}",
                    e
                ))
            })?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ImageStoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ImageStoreError::InvalidUrl(self.base_url.to_string())
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn error_for_status(response: reqwest::Response) -> ImageStoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ImageStoreError::Status { status, body }
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn store(
        &self,
        upload: &ImageUpload,
    ) -> Result<Vec<AccountImage>, ImageStoreError> {
        let url = self.endpoint(&["images"])?;
        debug!(
            "Storing image {} ({} bytes)",
            upload.filename,
            upload.data.len()
        );

        let mut body = upload.clone();
        body.ops = upload.effective_ops();

        let response = self.client.post(url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        let stored: StoreResponse = response.json().await?;
        Ok(stored
            .images
            .into_iter()
            .map(|image| AccountImage {
                variant: image.version_name,
                url: image.url,
                filename: image.filename,
            })
            .collect())
    }

    async fn delete(
        &self,
        image: &AccountImage,
    ) -> Result<(), ImageStoreError> {
        let url = self.endpoint(&["images", image.filename.as_str()])?;

        let response = self.client.delete(url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!("Image {} already removed", image.filename);
                Ok(())
            }
            _ => Err(Self::error_for_status(response).await),
        }
    }
}
