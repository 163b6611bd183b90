//! Category and brand route handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use storehouse_core::{BrandId, CategoryId};

use crate::db::{BrandRepository, CategoryRepository};
use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppPath};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Body carrying a category or brand name.
#[derive(Debug, Deserialize)]
pub struct NameBody {
    #[serde(default)]
    pub name: String,
}

impl NameBody {
    fn validated(&self) -> Result<&str> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("name is required".to_owned()));
        }
        Ok(name)
    }
}

/// `GET /api/category`
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(Json(json!({ "success": true, "categories": categories })))
}

/// `POST /api/category`
#[instrument(skip(state, body), fields(admin_id = %admin.id))]
pub async fn add_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppJson(body): AppJson<NameBody>,
) -> Result<impl IntoResponse> {
    let category = CategoryRepository::new(state.pool())
        .create(body.validated()?)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Category added", "category": category })),
    ))
}

/// `PUT /api/category/{id}`
#[instrument(skip(state, body), fields(admin_id = %admin.id))]
pub async fn rename_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppPath(id): AppPath<CategoryId>,
    AppJson(body): AppJson<NameBody>,
) -> Result<impl IntoResponse> {
    let category = CategoryRepository::new(state.pool())
        .rename(id, body.validated()?)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Category updated", "category": category })))
}

/// `DELETE /api/category/{id}`
#[instrument(skip(state), fields(admin_id = %admin.id))]
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppPath(id): AppPath<CategoryId>,
) -> Result<impl IntoResponse> {
    CategoryRepository::new(state.pool()).delete(id).await?;
    Ok(Json(json!({ "success": true, "message": "Category removed" })))
}

/// `GET /api/brand`
pub async fn list_brands(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let brands = BrandRepository::new(state.pool()).list().await?;
    Ok(Json(json!({ "success": true, "brands": brands })))
}

/// `POST /api/brand`
#[instrument(skip(state, body), fields(admin_id = %admin.id))]
pub async fn add_brand(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppJson(body): AppJson<NameBody>,
) -> Result<impl IntoResponse> {
    let brand = BrandRepository::new(state.pool())
        .create(body.validated()?)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Brand added", "brand": brand })),
    ))
}

/// `DELETE /api/brand/{id}`
#[instrument(skip(state), fields(admin_id = %admin.id))]
pub async fn delete_brand(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppPath(id): AppPath<BrandId>,
) -> Result<impl IntoResponse> {
    BrandRepository::new(state.pool()).delete(id).await?;
    Ok(Json(json!({ "success": true, "message": "Brand removed" })))
}
