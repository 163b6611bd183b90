//! Order and mock-payment route handlers.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use storehouse_core::order::CreateOrderRequest;
use storehouse_core::{OrderId, OrderStatus, PaymentStatus};

use crate::error::{Result, add_breadcrumb};
use crate::extract::{AppJson, AppPath};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::services::OrderService;
use crate::state::AppState;

/// Header carrying a client-generated idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Body naming one order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderIdBody {
    #[serde(alias = "_id")]
    pub order_id: OrderId,
}

/// `POST /api/order/status` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    #[serde(alias = "_id")]
    pub order_id: OrderId,
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
}

/// The header key wins over a key in the body.
fn with_header_key(mut request: CreateOrderRequest, headers: &HeaderMap) -> CreateOrderRequest {
    if let Some(key) = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
    {
        request.idempotency_key = Some(key.to_owned());
    }
    request
}

/// `POST /api/order/create`
///
/// 201 for a new order; 200 with the original order when the idempotency
/// key was seen before.
#[instrument(skip(state, headers, request), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    AppJson(request): AppJson<CreateOrderRequest>,
) -> Result<impl IntoResponse> {
    let request = with_header_key(request, &headers);
    let created = OrderService::new(state.pool()).create(user.id, &request).await?;

    let status = if created.is_new {
        add_breadcrumb("orders", "Order placed", None);
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(json!({ "success": true, "message": "Order placed", "order": created.order })),
    ))
}

/// `GET /api/order/my-orders`
pub async fn my_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let orders = OrderService::new(state.pool()).list_for_user(user.id).await?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

/// `POST /api/order/cancel`
#[instrument(skip(state, body), fields(user_id = %user.id, order_id = %body.order_id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<OrderIdBody>,
) -> Result<impl IntoResponse> {
    let order = OrderService::new(state.pool())
        .cancel(body.order_id, user.id)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Order cancelled", "order": order })))
}

/// `POST /api/payment/process-mock-payment`
#[instrument(skip(state, body), fields(user_id = %user.id, order_id = %body.order_id))]
pub async fn mock_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<OrderIdBody>,
) -> Result<impl IntoResponse> {
    let order = OrderService::new(state.pool())
        .pay(body.order_id, user.id)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Payment successful", "order": order })))
}

/// `GET /api/order/{id}`: owner or admin.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<OrderId>,
) -> Result<impl IntoResponse> {
    let order = OrderService::new(state.pool())
        .get(id, user.id, user.is_admin())
        .await?;
    Ok(Json(json!({ "success": true, "order": order })))
}

/// `GET /api/order/list`
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let orders = OrderService::new(state.pool()).list_all().await?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

/// `POST /api/order/status`
#[instrument(skip(state, body), fields(admin_id = %admin.id, order_id = %body.order_id))]
pub async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppJson(body): AppJson<StatusBody>,
) -> Result<impl IntoResponse> {
    let order = OrderService::new(state.pool())
        .set_status(body.order_id, body.status, body.payment_status)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Order status updated", "order": order })))
}
