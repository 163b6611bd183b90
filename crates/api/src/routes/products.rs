//! Catalog route handlers.
//!
//! Public listing plus admin create/update/remove. Product creation takes a
//! multipart form whose images are either uploaded files (`image1`..`image4`,
//! sent on to the media host) or a JSON list of URLs in `imageUrls`.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use storehouse_core::product::{MAX_IMAGES, ProductDraft, ProductPatch};
use storehouse_core::{ProductId, ProductType};

use crate::db::ProductRepository;
use crate::db::products::ProductFilter;
use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppQuery};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

const IMAGE_FIELDS: [&str; MAX_IMAGES] = ["image1", "image2", "image3", "image4"];

/// `GET /api/products` query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub search: Option<String>,
    #[serde(rename = "_type")]
    pub product_type: Option<String>,
    pub sort: Option<String>,
    #[serde(rename = "_page")]
    pub page: Option<i64>,
    #[serde(rename = "_perPage")]
    pub per_page: Option<i64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

impl ListQuery {
    fn into_filter(self) -> Result<ProductFilter> {
        let product_type = non_blank(self.product_type)
            .map(|t| t.parse::<ProductType>())
            .transpose()
            .map_err(AppError::BadRequest)?;
        let sort = self
            .sort
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(AppError::BadRequest)?;

        Ok(ProductFilter {
            category: non_blank(self.category),
            brand: non_blank(self.brand),
            search: non_blank(self.search),
            product_type,
            sort,
            page: self.page.unwrap_or(1),
            per_page: self.per_page.unwrap_or_default(),
        }
        .clamped())
    }
}

/// `GET /api/products`
///
/// With `_id` returns `{product}`; otherwise a filtered, paged list.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.pool());

    if let Some(raw_id) = non_blank(query.id.clone()) {
        let id: ProductId = raw_id
            .parse()
            .map_err(|_| AppError::BadRequest(format!("invalid product id: {raw_id}")))?;
        let product = products
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;
        return Ok(Json(json!({ "success": true, "product": product })));
    }

    let filter = query.into_filter()?;
    let (items, total) = products.list(&filter).await?;
    Ok(Json(json!({
        "success": true,
        "products": items,
        "total": total,
        "page": filter.page,
        "perPage": filter.per_page,
    })))
}

/// `GET /api/product/list`: every product, for the admin inventory table.
pub async fn list_all(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.pool()).list_all().await?;
    Ok(Json(json!({ "success": true, "products": products })))
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes")
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Decimal::ZERO);
    }
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("{field} must be a number")))
}

/// `tags` may arrive as a JSON array or a comma-separated list.
fn parse_tags(raw: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(raw).unwrap_or_else(|_| {
        raw.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    })
}

/// Build a draft from the text fields of the product form.
fn draft_from_form(fields: &HashMap<String, String>, images: Vec<String>) -> Result<ProductDraft> {
    let text = |name: &str| fields.get(name).map(String::as_str).unwrap_or_default();

    let stock = match text("stock").trim() {
        "" => 0,
        raw => raw
            .parse()
            .map_err(|_| AppError::BadRequest("stock must be a whole number".to_owned()))?,
    };

    let draft = ProductDraft {
        name: text("name").to_owned(),
        description: text("description").to_owned(),
        price: parse_decimal("price", text("price"))?,
        discounted_percentage: parse_decimal("discountedPercentage", text("discountedPercentage"))?,
        stock,
        category: text("category").to_owned(),
        brand: fields.get("brand").cloned(),
        images,
        is_available: fields.get("isAvailable").is_none_or(|v| parse_bool(v)),
        offer: parse_bool(text("offer")),
        badge: parse_bool(text("badge")),
        product_type: text("_type").parse().map_err(AppError::BadRequest)?,
        tags: parse_tags(text("tags")),
    }
    .normalized();
    draft.validate()?;
    Ok(draft)
}

/// A file part of the product form, held until the form is validated.
#[derive(Debug)]
struct Upload {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// Text fields and pending uploads of a product form.
#[derive(Debug, Default)]
struct ProductForm {
    fields: HashMap<String, String>,
    uploads: Vec<Upload>,
}

async fn read_form(mut multipart: Multipart) -> Result<ProductForm> {
    let mut form = ProductForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid form: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        if IMAGE_FIELDS.contains(&name.as_str()) {
            let file_name = field.file_name().unwrap_or(&name).to_owned();
            let content_type = field.content_type().map(String::from);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("invalid upload: {e}")))?;
            if !bytes.is_empty() {
                form.uploads.push(Upload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("invalid field {name}: {e}")))?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}

/// Validate the whole form before anything is sent to the media host.
///
/// Pending uploads stand in for their future URLs by file name, so the
/// image count covers uploads and `imageUrls` together. Returns the draft
/// and the URLs given in `imageUrls`.
fn validate_form(form: &ProductForm) -> Result<(ProductDraft, Vec<String>)> {
    let urls: Vec<String> = match form.fields.get("imageUrls") {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)
            .map_err(|_| AppError::BadRequest("imageUrls must be a JSON array".to_owned()))?,
        _ => Vec::new(),
    };
    let urls: Vec<String> = urls.iter().map(|url| url.trim().to_owned()).collect();
    let pending = form
        .uploads
        .iter()
        .map(|upload| upload.file_name.clone())
        .chain(urls.iter().cloned())
        .collect();
    let draft = draft_from_form(&form.fields, pending)?;
    Ok((draft, urls))
}

/// `POST /api/product/add`
#[instrument(skip(state, multipart), fields(admin_id = %admin.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let form = read_form(multipart?).await?;
    let (mut draft, urls) = validate_form(&form)?;

    let mut images = Vec::with_capacity(MAX_IMAGES);
    if !form.uploads.is_empty() {
        let media = state.media().ok_or_else(|| {
            AppError::BadRequest("Image uploads are not configured, send imageUrls".to_owned())
        })?;
        for upload in form.uploads {
            images.push(
                media
                    .upload(upload.file_name, upload.content_type.as_deref(), upload.bytes)
                    .await?,
            );
        }
    }
    images.extend(urls);
    draft.images = images;

    let product = ProductRepository::new(state.pool()).create(&draft).await?;
    tracing::info!(product_id = %product.id, "Product added");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Product added", "product": product })),
    ))
}

/// `POST /api/product/update` body.
#[derive(Debug, Deserialize)]
pub struct UpdateBody {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(flatten)]
    pub patch: ProductPatch,
}

/// `POST /api/product/update`
#[instrument(skip(state, body), fields(admin_id = %admin.id, product_id = %body.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppJson(body): AppJson<UpdateBody>,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.pool());
    let current = products
        .get(body.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;

    let draft = body.patch.apply(current.into());
    draft.validate()?;
    let product = products.update(body.id, &draft).await?;

    tracing::info!("Product updated");
    Ok(Json(json!({ "success": true, "message": "Product updated", "product": product })))
}

/// Body carrying a single product id.
#[derive(Debug, Deserialize)]
pub struct IdBody<T> {
    #[serde(rename = "_id")]
    pub id: T,
}

/// `POST /api/product/remove`
#[instrument(skip(state, body), fields(admin_id = %admin.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppJson(body): AppJson<IdBody<ProductId>>,
) -> Result<impl IntoResponse> {
    ProductRepository::new(state.pool()).delete(body.id).await?;
    tracing::info!(product_id = %body.id, "Product removed");
    Ok(Json(json!({ "success": true, "message": "Product removed" })))
}
