//! Postal-code lookup client.
//!
//! Resolves a 6-digit Indian pincode to a city (district) and state through
//! the India Post lookup service. Hits and misses are cached for 24 hours.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use storehouse_core::checkout::PostalArea;

/// Errors from the lookup service.
#[derive(Debug, Error)]
pub enum PincodeError {
    /// Not six ASCII digits.
    #[error("pincode must be 6 digits")]
    InvalidFormat,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service returned an error status.
    #[error("API error: {status}")]
    Api { status: u16 },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LookupResponse {
    status: String,
    #[serde(default)]
    post_office: Option<Vec<PostOffice>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PostOffice {
    district: String,
    state: String,
}

/// Six ASCII digits.
#[must_use]
pub fn is_valid_pincode(pincode: &str) -> bool {
    pincode.len() == 6 && pincode.bytes().all(|b| b.is_ascii_digit())
}

/// First post office of a successful lookup.
fn first_area(responses: Vec<LookupResponse>) -> Option<PostalArea> {
    let response = responses.into_iter().next()?;
    if response.status != "Success" {
        return None;
    }
    response
        .post_office?
        .into_iter()
        .next()
        .map(|office| PostalArea {
            city: office.district,
            state: office.state,
        })
}

/// Cached postal-code lookup client.
#[derive(Clone)]
pub struct PincodeClient {
    inner: Arc<PincodeClientInner>,
}

struct PincodeClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<String, Option<PostalArea>>,
}

impl PincodeClient {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(24 * 60 * 60))
            .build();

        Self {
            inner: Arc::new(PincodeClientInner {
                client: reqwest::Client::builder()
                    .timeout(Duration::from_secs(10))
                    .build()
                    .unwrap_or_default(),
                base_url,
                cache,
            }),
        }
    }

    /// City and state for `pincode`, or `None` when the service knows no
    /// such pincode.
    ///
    /// # Errors
    ///
    /// `PincodeError::InvalidFormat` before any request; transport and
    /// parse failures otherwise. Failures are not cached.
    #[instrument(skip(self))]
    pub async fn lookup(&self, pincode: &str) -> Result<Option<PostalArea>, PincodeError> {
        if !is_valid_pincode(pincode) {
            return Err(PincodeError::InvalidFormat);
        }
        if let Some(cached) = self.inner.cache.get(pincode).await {
            debug!("Pincode cache hit");
            return Ok(cached);
        }

        let area = self.fetch(pincode).await?;
        self.inner
            .cache
            .insert(pincode.to_owned(), area.clone())
            .await;
        Ok(area)
    }

    async fn fetch(&self, pincode: &str) -> Result<Option<PostalArea>, PincodeError> {
        let url = format!(
            "{}/pincode/{pincode}",
            self.inner.base_url.as_str().trim_end_matches('/')
        );
        let response = self.inner.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PincodeError::Api {
                status: status.as_u16(),
            });
        }

        let body: Vec<LookupResponse> = response
            .json()
            .await
            .map_err(|e| PincodeError::Parse(e.to_string()))?;
        Ok(first_area(body))
    }
}
