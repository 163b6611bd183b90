//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database round trip)
//! GET  /api/health                      - JSON liveness probe
//!
//! # Accounts
//! POST /api/user/register               - Create a customer account
//! POST /api/user/login                  - Issue a bearer token
//! POST /api/user/admin                  - Issue a bearer token (admins only)
//! GET  /api/user/profile                - Own profile (auth)
//! PUT  /api/user/profile                - Update name/phone/default address (auth)
//! GET  /api/user/addresses              - Address book (auth)
//! POST /api/user/addresses              - Add address (auth)
//! PUT  /api/user/addresses/{id}         - Edit address (auth)
//! DEL  /api/user/addresses/{id}         - Remove address (auth)
//! PUT  /api/user/addresses/{id}/default - Make default (auth)
//!
//! # Catalog
//! GET  /api/products                    - List/filter, or one product by `_id`
//! GET  /api/product/list                - Every product (admin)
//! POST /api/product/add                 - Create, multipart (admin)
//! POST /api/product/update              - Partial update (admin)
//! POST /api/product/remove              - Delete (admin)
//! GET  /api/category, /api/brand        - Taxonomy
//! POST /api/category, /api/brand        - Add (admin)
//! PUT  /api/category/{id}               - Rename (admin)
//! DEL  /api/category/{id}, /api/brand/{id} - Remove (admin)
//!
//! # Orders
//! POST /api/order/create                - Place order (auth, `Idempotency-Key`)
//! GET  /api/order/my-orders             - Own orders (auth)
//! POST /api/order/cancel                - Cancel own order (auth)
//! GET  /api/order/{id}                  - One order (owner or admin)
//! GET  /api/order/list                  - All orders (admin)
//! POST /api/order/status                - Set status (admin)
//! POST /api/payment/process-mock-payment - Capture mock payment (auth)
//!
//! # Dashboard (admin)
//! GET  /api/dashboard/stats | analytics | quick-stats | inventory
//!
//! # Content
//! POST /api/contact                     - Contact form
//! GET  /api/contact/list, POST /api/contact/remove (admin)
//! GET  /api/doc/list, POST /api/doc/add|update|delete (admin)
//!
//! # Lookup
//! GET  /api/pincode/{pincode}           - City/state for an Indian pincode
//! ```

pub mod content;
pub mod dashboard;
pub mod orders;
pub mod pincode;
pub mod products;
pub mod taxonomy;
pub mod users;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;

use crate::middleware::{auth_rate_limiter, public_rate_limiter};
use crate::state::AppState;

/// Upper bound for a product form with four images.
const PRODUCT_FORM_LIMIT: usize = 20 * 1024 * 1024;

/// Account routes, with credential endpoints rate limited.
pub fn user_routes() -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/admin", post(users::admin_login))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/profile", get(users::profile).put(users::update_profile))
        .route(
            "/addresses",
            get(users::list_addresses).post(users::add_address),
        )
        .route(
            "/addresses/{id}",
            put(users::update_address).delete(users::delete_address),
        )
        .route("/addresses/{id}/default", put(users::set_default_address))
        .merge(credentials)
}

/// Admin product routes.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(products::list_all))
        .route(
            "/add",
            post(products::add).layer(DefaultBodyLimit::max(PRODUCT_FORM_LIMIT)),
        )
        .route("/update", post(products::update))
        .route("/remove", post(products::remove))
}

/// Order routes.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(orders::create))
        .route("/my-orders", get(orders::my_orders))
        .route("/cancel", post(orders::cancel))
        .route("/list", get(orders::list))
        .route("/status", post(orders::set_status))
        .route("/{id}", get(orders::show))
}

/// Dashboard routes.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(dashboard::stats))
        .route("/analytics", get(dashboard::analytics))
        .route("/quick-stats", get(dashboard::quick_stats))
        .route("/inventory", get(dashboard::inventory))
}

/// Documentation routes.
pub fn doc_routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(content::list_docs))
        .route("/add", post(content::add_doc))
        .route("/update", post(content::update_doc))
        .route("/delete", post(content::delete_doc))
}

/// Unauthenticated routes that write or call out, rate limited per client.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/contact", post(content::submit_contact))
        .route("/api/pincode/{pincode}", get(pincode::lookup))
        .layer(public_rate_limiter())
}

/// Create all `/api` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(api_health))
        .nest("/api/user", user_routes())
        .route("/api/products", get(products::index))
        .nest("/api/product", product_routes())
        .route(
            "/api/category",
            get(taxonomy::list_categories).post(taxonomy::add_category),
        )
        .route(
            "/api/category/{id}",
            put(taxonomy::rename_category).delete(taxonomy::delete_category),
        )
        .route(
            "/api/brand",
            get(taxonomy::list_brands).post(taxonomy::add_brand),
        )
        .route("/api/brand/{id}", axum::routing::delete(taxonomy::delete_brand))
        .nest("/api/order", order_routes())
        .route(
            "/api/payment/process-mock-payment",
            post(orders::mock_payment),
        )
        .nest("/api/dashboard", dashboard_routes())
        .route("/api/contact/list", get(content::list_contacts))
        .route("/api/contact/remove", post(content::remove_contact))
        .nest("/api/doc", doc_routes())
        .merge(public_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// `GET /api/health`
pub async fn api_health() -> impl IntoResponse {
    Json(json!({ "success": true, "message": "API is running" }))
}
