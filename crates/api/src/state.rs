//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::auth::TokenSigner;
use crate::services::{MediaClient, PincodeClient};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; gives handlers the pool, configuration,
/// token signer and outbound clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    tokens: TokenSigner,
    pincode: PincodeClient,
    media: Option<MediaClient>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        let tokens = TokenSigner::new(
            config.token_secret.clone(),
            chrono::Duration::hours(config.token_ttl_hours),
        );
        let pincode = PincodeClient::new(config.pincode_api_url.clone());
        let media = config.media.clone().map(MediaClient::new);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                pincode,
                media,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Bearer token signer.
    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }

    /// Postal-code lookup client.
    #[must_use]
    pub fn pincode(&self) -> &PincodeClient {
        &self.inner.pincode
    }

    /// Media host client, when one is configured.
    #[must_use]
    pub fn media(&self) -> Option<&MediaClient> {
        self.inner.media.as_ref()
    }
}
