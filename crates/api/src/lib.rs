//! Storehouse API library.
//!
//! REST backend for the storefront and admin panel: accounts, catalog,
//! orders with stock reservation, dashboard aggregates and content. The
//! binary in `main.rs` wires configuration, logging and Sentry around
//! [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    routing::get,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::config::ApiConfig;
use crate::state::AppState;

/// CORS policy from the configured origins.
///
/// No configured origins means any origin in development and none in
/// production.
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(routes::orders::IDEMPOTENCY_KEY_HEADER),
        ])
        .expose_headers([HeaderName::from_static(
            middleware::request_id::REQUEST_ID_HEADER,
        )])
        .max_age(Duration::from_secs(3600));

    if config.cors_origins.is_empty() {
        if config.environment.is_production() {
            tracing::warn!("STOREHOUSE_CORS_ORIGINS is empty; cross-origin requests are refused");
            return base;
        }
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

/// Build the application router with every route and layer except Sentry.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config());

    Router::new()
        .route("/health", get(routes::health))
        .route("/health/ready", get(routes::readiness))
        .merge(routes::routes())
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use storehouse_core::{UserId, UserRole};

    use super::*;
    use crate::state::test_support::lazy_state;

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app(lazy_state()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn bearer(role: UserRole) -> String {
        let token = lazy_state().tokens().issue(UserId::new(7), role).unwrap();
        format!("Bearer {token}")
    }

    fn json_post(uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.5")
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let response = app(lazy_state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let (status, json) = send(Request::get("/api/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        for uri in ["/api/order/my-orders", "/api/user/profile", "/api/user/addresses"] {
            let (status, json) = send(Request::get(uri).body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(json["success"], false);
        }
    }

    #[tokio::test]
    async fn test_admin_routes_forbid_customers() {
        for uri in [
            "/api/order/list",
            "/api/dashboard/stats",
            "/api/dashboard/analytics",
            "/api/contact/list",
            "/api/doc/list",
            "/api/product/list",
        ] {
            let (status, _) = send(
                Request::get(uri)
                    .header(header::AUTHORIZATION, bearer(UserRole::User))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_tampered_token_rejected() {
        let mut token = bearer(UserRole::Admin);
        token.push('x');
        let (status, _) = send(
            Request::get("/api/dashboard/stats")
                .header(header::AUTHORIZATION, token)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_analytics_period_is_bad_request() {
        let (status, json) = send(
            Request::get("/api/dashboard/analytics?period=yearly")
                .header(header::AUTHORIZATION, bearer(UserRole::Admin))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_empty_order_rejected_before_database() {
        let body = r#"{"items": [], "paymentMethod": "cod"}"#;
        let (status, json) = send(
            json_post("/api/order/create")
                .header(header::AUTHORIZATION, bearer(UserRole::User))
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Order must contain at least one item");
    }

    #[tokio::test]
    async fn test_register_validation_before_database() {
        let body = r#"{"name": "Asha", "email": "not-an-email", "password": "longenough"}"#;
        let (status, json) = send(json_post("/api/user/register").body(Body::from(body)).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let body = r#"{"name": "Asha", "email": "asha@example.com", "password": "short"}"#;
        let (status, _) = send(json_post("/api/user/register").body(Body::from(body)).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_contact_validation_before_database() {
        let body = r#"{"clientName": "", "email": "a@b.co", "messages": "hi"}"#;
        let (status, json) = send(json_post("/api/contact").body(Body::from(body)).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_short_pincode_rejected() {
        let (status, _) = send(
            Request::get("/api/pincode/1234")
                .header("x-forwarded-for", "203.0.113.5")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_product_sort_rejected() {
        let (status, _) = send(
            Request::get("/api/products?sort=random")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_requests_use_error_envelope() {
        let body = r#"{"items": [{"productId": 1, "quantity": 1}], "paymentMethod": "bitcoin"}"#;
        let (status, json) = send(
            json_post("/api/order/create")
                .header(header::AUTHORIZATION, bearer(UserRole::User))
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().is_some_and(|m| !m.is_empty()));

        let (status, json) = send(
            json_post("/api/order/cancel")
                .header(header::AUTHORIZATION, bearer(UserRole::User))
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let (status, json) = send(
            Request::get("/api/order/abc")
                .header(header::AUTHORIZATION, bearer(UserRole::User))
                .header("x-forwarded-for", "203.0.113.5")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let (status, json) = send(
            Request::get("/api/products?_page=two")
                .header("x-forwarded-for", "203.0.113.5")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_product_form_validated_before_upload() {
        let boundary = "storehouse-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"price\"\r\n\r\n\
             100\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"image1\"; filename=\"cap.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\n\
             jpegbytes\r\n\
             --{boundary}--\r\n"
        );
        let (status, json) = send(
            Request::post("/api/product/add")
                .header(header::AUTHORIZATION, bearer(UserRole::Admin))
                .header("x-forwarded-for", "203.0.113.5")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "product name is required");

        let (status, json) = send(
            Request::post("/api/product/add")
                .header(header::AUTHORIZATION, bearer(UserRole::Admin))
                .header("x-forwarded-for", "203.0.113.5")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }
}
