//! Postal-code lookup handler.

use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::AppPath;
use crate::state::AppState;

/// `GET /api/pincode/{pincode}`
#[instrument(skip(state))]
pub async fn lookup(
    State(state): State<AppState>,
    AppPath(pincode): AppPath<String>,
) -> Result<impl IntoResponse> {
    let area = state
        .pincode()
        .lookup(pincode.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("Invalid pincode".to_owned()))?;
    Ok(Json(json!({ "success": true, "city": area.city, "state": area.state })))
}
