//! HTTP middleware stack for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span, echoed in the response)
//! 4. CORS
//! 5. Rate limiting (governor) on credential and public write routes

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{AuthRejection, CurrentUser, RequireAdmin, RequireAuth};
pub use rate_limit::{auth_rate_limiter, public_rate_limiter};
pub use request_id::request_id_middleware;
