//! Account route handlers: registration, sign-in, profile and address book.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use storehouse_core::AddressId;
use storehouse_core::account::{AddressInput, ProfileUpdate};

use crate::db::{AddressRepository, RepositoryError, UserRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{AppJson, AppPath};
use crate::middleware::RequireAuth;
use crate::services::AuthService;
use crate::services::auth::Session;
use crate::state::AppState;

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

fn session_body(session: &Session, message: &str) -> serde_json::Value {
    json!({
        "success": true,
        "message": message,
        "token": session.token,
        "user": {
            "_id": session.user.id,
            "name": session.user.name,
            "email": session.user.email,
            "role": session.user.role,
        },
    })
}

/// `POST /api/user/register`
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterBody>,
) -> Result<impl IntoResponse> {
    let session = AuthService::new(state.pool(), state.tokens())
        .register(&body.name, &body.email, &body.password)
        .await?;
    add_breadcrumb("auth", "User registered", None);
    Ok((
        StatusCode::CREATED,
        Json(session_body(&session, "Account created")),
    ))
}

/// `POST /api/user/login`
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginBody>,
) -> Result<impl IntoResponse> {
    let session = AuthService::new(state.pool(), state.tokens())
        .login(&body.email, &body.password)
        .await?;
    Ok(Json(session_body(&session, "Signed in")))
}

/// `POST /api/user/admin`
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn admin_login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginBody>,
) -> Result<impl IntoResponse> {
    let session = AuthService::new(state.pool(), state.tokens())
        .admin_login(&body.email, &body.password)
        .await?;
    Ok(Json(session_body(&session, "Welcome back")))
}

/// `GET /api/user/profile`
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let account = UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))?;
    let addresses = AddressRepository::new(state.pool()).list(user.id).await?;
    Ok(Json(json!({ "success": true, "user": account.into_profile(addresses) })))
}

/// `PUT /api/user/profile`
#[instrument(skip(state, update), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(update): AppJson<ProfileUpdate>,
) -> Result<impl IntoResponse> {
    update.validate()?;
    let name = update.name.as_deref().map(str::trim);
    let phone = update.phone.as_deref().map(str::trim);

    let account = UserRepository::new(state.pool())
        .update_profile(user.id, name, phone)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("User not found".to_owned()),
            other => other.into(),
        })?;

    let addresses = AddressRepository::new(state.pool());
    if let Some(address) = update.address {
        addresses.upsert_default(user.id, &address.normalized()).await?;
    }
    let book = addresses.list(user.id).await?;

    tracing::info!("Profile updated");
    Ok(Json(json!({
        "success": true,
        "message": "Profile updated",
        "user": account.into_profile(book),
    })))
}

/// `GET /api/user/addresses`
pub async fn list_addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let addresses = AddressRepository::new(state.pool()).list(user.id).await?;
    Ok(Json(json!({ "success": true, "addresses": addresses })))
}

/// `POST /api/user/addresses`
#[instrument(skip(state, input), fields(user_id = %user.id))]
pub async fn add_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(input): AppJson<AddressInput>,
) -> Result<impl IntoResponse> {
    let input = input.normalized();
    input.validate()?;
    let address = AddressRepository::new(state.pool()).create(user.id, &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Address added", "address": address })),
    ))
}

/// `PUT /api/user/addresses/{id}`
#[instrument(skip(state, input), fields(user_id = %user.id))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<AddressId>,
    AppJson(input): AppJson<AddressInput>,
) -> Result<impl IntoResponse> {
    let input = input.normalized();
    input.validate()?;
    let address = AddressRepository::new(state.pool())
        .update(user.id, id, &input)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Address updated", "address": address })))
}

/// `PUT /api/user/addresses/{id}/default`
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn set_default_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<AddressId>,
) -> Result<impl IntoResponse> {
    let address = AddressRepository::new(state.pool())
        .set_default(user.id, id)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Default address set", "address": address })))
}

/// `DELETE /api/user/addresses/{id}`
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<AddressId>,
) -> Result<impl IntoResponse> {
    AddressRepository::new(state.pool()).delete(user.id, id).await?;
    Ok(Json(json!({ "success": true, "message": "Address removed" })))
}
