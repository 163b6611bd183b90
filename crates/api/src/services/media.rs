//! External media host client for product images.
//!
//! Uploads one image per request as `multipart/form-data` (field `file`) with
//! a bearer token and reads the public URL back from the JSON response.
//! Hosts answering with either `secure_url` or `url` are accepted.

use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::config::MediaConfig;

/// Errors from the media host.
#[derive(Debug, Error)]
pub enum MediaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Host returned an error status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response carried no usable URL.
    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    secure_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl UploadResponse {
    fn into_url(self) -> Option<String> {
        self.secure_url
            .or(self.url)
            .filter(|u| !u.trim().is_empty())
    }
}

/// Image upload client.
#[derive(Clone)]
pub struct MediaClient {
    inner: Arc<MediaClientInner>,
}

struct MediaClientInner {
    client: reqwest::Client,
    config: MediaConfig,
}

impl MediaClient {
    #[must_use]
    pub fn new(config: MediaConfig) -> Self {
        Self {
            inner: Arc::new(MediaClientInner {
                client: reqwest::Client::builder()
                    .timeout(Duration::from_secs(30))
                    .build()
                    .unwrap_or_default(),
                config,
            }),
        }
    }

    /// Host the upload URL points at, used to recognise hosted images.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.inner.config.upload_url.host_str()
    }

    /// Upload one image and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns `MediaError` if the upload fails or the response has no URL.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        file_name: String,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<String, MediaError> {
        let mut part = Part::bytes(bytes).file_name(file_name);
        if let Some(mime) = content_type {
            part = part.mime_str(mime)?;
        }
        let form = Form::new().part("file", part);

        let response = self
            .inner
            .client
            .post(self.inner.config.upload_url.clone())
            .bearer_auth(self.inner.config.token.expose_secret())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Parse(e.to_string()))?;
        let url = body
            .into_url()
            .ok_or_else(|| MediaError::Parse("upload response has no url".to_owned()))?;
        tracing::info!(%url, "Image uploaded");
        Ok(url)
    }
}
