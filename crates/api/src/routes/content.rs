//! Contact inbox and admin documentation handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use storehouse_core::content::{ContactInput, DocInput};
use storehouse_core::{ContactId, DocId};

use crate::db::{ContactRepository, DocRepository};
use crate::error::Result;
use crate::extract::AppJson;
use crate::middleware::RequireAdmin;
use crate::routes::products::IdBody;
use crate::state::AppState;

/// `POST /api/contact`
#[instrument(skip(state, input))]
pub async fn submit_contact(
    State(state): State<AppState>,
    AppJson(input): AppJson<ContactInput>,
) -> Result<impl IntoResponse> {
    let contact = input.validate()?;
    let stored = ContactRepository::new(state.pool()).create(&contact).await?;
    tracing::info!(contact_id = %stored.id, "Contact message received");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Message sent", "contact": stored })),
    ))
}

/// `GET /api/contact/list`
pub async fn list_contacts(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let contacts = ContactRepository::new(state.pool()).list().await?;
    Ok(Json(json!({ "success": true, "contacts": contacts })))
}

/// `POST /api/contact/remove`
#[instrument(skip(state, body), fields(admin_id = %admin.id))]
pub async fn remove_contact(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppJson(body): AppJson<IdBody<ContactId>>,
) -> Result<impl IntoResponse> {
    ContactRepository::new(state.pool()).delete(body.id).await?;
    Ok(Json(json!({ "success": true, "message": "Message removed" })))
}

/// `POST /api/doc/update` body.
#[derive(Debug, Deserialize)]
pub struct DocUpdateBody {
    #[serde(rename = "_id")]
    pub id: DocId,
    #[serde(flatten)]
    pub doc: DocInput,
}

/// `GET /api/doc/list`
pub async fn list_docs(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let docs = DocRepository::new(state.pool()).list().await?;
    Ok(Json(json!({ "success": true, "docs": docs })))
}

/// `POST /api/doc/add`
#[instrument(skip(state, input), fields(admin_id = %admin.id))]
pub async fn add_doc(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppJson(input): AppJson<DocInput>,
) -> Result<impl IntoResponse> {
    let input = input.validate()?;
    let doc = DocRepository::new(state.pool()).create(&input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Doc added", "doc": doc })),
    ))
}

/// `POST /api/doc/update`
#[instrument(skip(state, body), fields(admin_id = %admin.id, doc_id = %body.id))]
pub async fn update_doc(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppJson(body): AppJson<DocUpdateBody>,
) -> Result<impl IntoResponse> {
    let input = body.doc.validate()?;
    let doc = DocRepository::new(state.pool()).update(body.id, &input).await?;
    Ok(Json(json!({ "success": true, "message": "Doc updated", "doc": doc })))
}

/// `POST /api/doc/delete`
#[instrument(skip(state, body), fields(admin_id = %admin.id))]
pub async fn delete_doc(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppJson(body): AppJson<IdBody<DocId>>,
) -> Result<impl IntoResponse> {
    DocRepository::new(state.pool()).delete(body.id).await?;
    Ok(Json(json!({ "success": true, "message": "Doc removed" })))
}
