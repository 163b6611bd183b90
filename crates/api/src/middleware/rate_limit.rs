//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: login, registration and admin sign-in (~10/min)
//! - `public_rate_limiter`: unauthenticated writes and lookups (~100/min)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::error::AppError;

/// Proxy headers carrying the client address, most trusted first.
const CLIENT_IP_HEADERS: [&str; 4] = [
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

/// Key extractor that reads the client IP from proxy headers, falling back
/// to the socket peer address when the server runs without a proxy.
///
/// `X-Forwarded-For` contributes its first (client) entry.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();
        CLIENT_IP_HEADERS
            .iter()
            .filter_map(|name| headers.get(*name)?.to_str().ok())
            .filter_map(|value| value.split(',').next()?.trim().parse::<IpAddr>().ok())
            .next()
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|info| info.0.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Render a limiter rejection as the JSON error envelope, keeping the
/// limiter's `retry-after` style headers.
fn rejection_response(err: GovernorError) -> Response {
    match err {
        GovernorError::TooManyRequests { headers, .. } => {
            let mut response = AppError::RateLimited.into_response();
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
        }
        GovernorError::UnableToExtractKey => {
            AppError::Internal("rate limiter could not extract a client key".to_owned())
                .into_response()
        }
        GovernorError::Other { msg, .. } => AppError::BadRequest(
            msg.unwrap_or_else(|| "Request rejected".to_owned()),
        )
        .into_response(),
    }
}

/// Rate limiter for credential endpoints: ~10 requests per minute per IP.
///
/// # Panics
///
/// Never panics: `per_second(6)` and `burst_size(5)` are valid positive
/// values for `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6) // Replenish 1 token every 6 seconds (~10/minute)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config)).error_handler(rejection_response)
}

/// Rate limiter for public endpoints: ~100 requests per minute per IP.
///
/// # Panics
///
/// Never panics: `per_second(1)` and `burst_size(50)` are valid positive
/// values for `GovernorConfigBuilder`.
#[must_use]
pub fn public_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(1)
        .burst_size(50)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(50) is valid");
    GovernorLayer::new(Arc::new(config)).error_handler(rejection_response)
}
