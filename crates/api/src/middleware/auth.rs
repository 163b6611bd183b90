//! Bearer-token extractors.
//!
//! Handlers that need a signed-in caller take [`RequireAuth`]; admin-only
//! handlers take [`RequireAdmin`]. Both read `Authorization: Bearer <token>`
//! and verify it with the state's [`TokenSigner`](crate::services::auth::TokenSigner).
//! The role is taken from the token claims, so no database round trip is
//! needed to authorize a request.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use storehouse_core::{UserId, UserRole};

use crate::error::set_sentry_user;
use crate::services::auth::TokenError;
use crate::state::AppState;

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_orders(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("orders for {}", user.id)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a valid bearer token with the admin role.
pub struct RequireAdmin(pub CurrentUser);

/// Why a protected request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No `Authorization: Bearer` header.
    MissingToken,
    /// Token failed verification.
    InvalidToken(TokenError),
    /// Valid token without the admin role.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingToken => (StatusCode::UNAUTHORIZED, "Not authorized, login again"),
            Self::InvalidToken(TokenError::Expired) => {
                (StatusCode::UNAUTHORIZED, "Session expired, login again")
            }
            Self::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "Invalid token, login again"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Admin access required"),
        };
        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<CurrentUser, AuthRejection> {
    let token = bearer_token(parts).ok_or(AuthRejection::MissingToken)?;
    let claims = state
        .tokens()
        .verify(token)
        .map_err(AuthRejection::InvalidToken)?;
    set_sentry_user(&claims.sub, None);
    Ok(CurrentUser {
        id: claims.sub,
        role: claims.role,
    })
}

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        authenticate(parts, &state).map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let user = authenticate(parts, &state)?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Non-admin hit admin route");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;
    use crate::state::test_support::lazy_state;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/order/my-orders");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[tokio::test]
    async fn test_require_auth_accepts_issued_token() {
        let state = lazy_state();
        let token = state.tokens().issue(UserId::new(4), UserRole::User).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));

        let RequireAuth(user) = RequireAuth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.id, UserId::new(4));
        assert!(!user.is_admin());
    }

    #[tokio::test]
    async fn test_require_auth_rejects_missing_and_garbage() {
        let state = lazy_state();
        let mut parts = parts_with(None);
        assert_eq!(
            RequireAuth::from_request_parts(&mut parts, &state).await.err(),
            Some(AuthRejection::MissingToken)
        );

        let mut parts = parts_with(Some("Bearer not-a-token"));
        assert!(matches!(
            RequireAuth::from_request_parts(&mut parts, &state).await,
            Err(AuthRejection::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_require_admin_checks_role() {
        let state = lazy_state();
        let user_token = state.tokens().issue(UserId::new(4), UserRole::User).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {user_token}")));
        assert_eq!(
            RequireAdmin::from_request_parts(&mut parts, &state).await.err(),
            Some(AuthRejection::Forbidden)
        );

        let admin_token = state.tokens().issue(UserId::new(1), UserRole::Admin).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {admin_token}")));
        assert!(RequireAdmin::from_request_parts(&mut parts, &state).await.is_ok());
    }

    #[test]
    fn test_rejection_status() {
        assert_eq!(
            AuthRejection::MissingToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::InvalidToken(TokenError::Expired).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthRejection::Forbidden.into_response().status(), StatusCode::FORBIDDEN);
    }
}
