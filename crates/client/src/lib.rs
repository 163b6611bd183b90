//! Storehouse Client - typed HTTP access to the Storehouse REST API.
//!
//! [`ApiClient`] wraps the JSON envelope used by every endpoint
//! (`{"success": bool, "message": ..., ...payload}`) and returns core domain
//! types. It also implements [`OrderGateway`], so a
//! [`Checkout`](storehouse_core::checkout::Checkout) can submit through it:
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), storehouse_client::ClientError> {
//! use storehouse_client::ApiClient;
//!
//! let client = ApiClient::new("http://127.0.0.1:8000".parse().unwrap())?;
//! let session = client.login("asha@example.com", "correct horse").await?;
//! let client = client.with_token(session.token);
//! let orders = client.my_orders().await?;
//! # let _ = orders;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use url::Url;

use storehouse_core::analytics::QuickStats;
use storehouse_core::checkout::{GatewayError, OrderGateway, PincodeLookup, PostalArea};
use storehouse_core::content::ContactInput;
use storehouse_core::order::{CreateOrderRequest, Order};
use storehouse_core::product::Product;
use storehouse_core::{OrderId, OrderStatus, PaymentStatus, ProductId, UserId, UserRole};

/// Header carrying the idempotency key of an order submission.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when talking to the API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered 401; the token is missing, invalid or expired.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The server answered with an error envelope.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// HTTP status of an error response, if the server produced one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ClientError> for GatewayError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized(_) => Self::Unauthorized,
            ClientError::Api { message, .. } | ClientError::Parse(message) => {
                Self::Rejected(message)
            }
            ClientError::Http(e) => Self::Transport(e.to_string()),
            ClientError::Url(e) => Self::Transport(e.to_string()),
        }
    }
}

/// User summary returned with a token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionUser {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

/// Result of register and login.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}

/// Filters for `GET /api/products`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub search: Option<String>,
    pub product_type: Option<String>,
    /// `newest`, `price-low`, `price-high` or `name`.
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let text = [
            ("category", &self.category),
            ("brand", &self.brand),
            ("search", &self.search),
            ("_type", &self.product_type),
            ("sort", &self.sort),
        ];
        for (key, value) in text {
            if let Some(value) = value {
                pairs.push((key, value.clone()));
            }
        }
        if let Some(page) = self.page {
            pairs.push(("_page", page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            pairs.push(("_perPage", per_page.to_string()));
        }
        pairs
    }
}

/// One page of catalog results.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct ProductEnvelope {
    product: Product,
}

#[derive(Deserialize)]
struct OrderEnvelope {
    order: Order,
}

#[derive(Deserialize)]
struct OrdersEnvelope {
    orders: Vec<Order>,
}

#[derive(Deserialize)]
struct StatsEnvelope {
    stats: QuickStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderIdBody {
    order_id: OrderId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    order_id: OrderId,
    status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_status: Option<PaymentStatus>,
}

/// Pull the `message` out of an error envelope, falling back to raw text.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .filter(|m| !m.trim().is_empty())
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_owned();
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_owned()
        })
}

/// Turn a status and body into the payload or a [`ClientError`].
fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, ClientError> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized(error_message(status, body)));
    }
    if !status.is_success() {
        return Err(ClientError::Api {
            status: status.as_u16(),
            message: error_message(status, body),
        });
    }
    serde_json::from_slice(body).map_err(|e| ClientError::Parse(e.to_string()))
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
}

/// Client for the Storehouse REST API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
    token: Option<SecretString>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl ApiClient {
    /// Create an anonymous client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            inner: Arc::new(ApiClientInner { http, base_url }),
            token: None,
        })
    }

    /// Create an anonymous client on top of a preconfigured `reqwest::Client`
    /// (default headers, proxies, custom timeouts).
    #[must_use]
    pub fn with_http_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            inner: Arc::new(ApiClientInner { http, base_url }),
            token: None,
        }
    }

    /// A copy of this client that sends `token` as a bearer credential.
    #[must_use]
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            token: Some(SecretString::from(token.into())),
        }
    }

    /// Whether a bearer token is attached.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> RequestBuilder {
        let builder = self.inner.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "API request failed");
        }
        decode(status, &body)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path)?;
        self.send(self.request(reqwest::Method::GET, url)).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.url(path)?;
        self.send(self.request(reqwest::Method::POST, url).json(body))
            .await
    }

    /// Create a customer account.
    ///
    /// # Errors
    ///
    /// Returns error on validation failure (400), duplicate email (409) or
    /// transport failure.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        self.post(
            "/api/user/register",
            &serde_json::json!({ "name": name, "email": email, "password": password }),
        )
        .await
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] for wrong credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        self.post(
            "/api/user/login",
            &serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Sign in to the admin panel.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] for wrong credentials and a 403
    /// [`ClientError::Api`] for non-admin accounts.
    pub async fn admin_login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        self.post(
            "/api/user/admin",
            &serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// List catalog products.
    ///
    /// # Errors
    ///
    /// Returns error if the query is rejected or the request fails.
    pub async fn products(&self, query: &ProductQuery) -> Result<ProductPage, ClientError> {
        let mut url = self.url("/api/products")?;
        let pairs = query.pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        self.send(self.request(reqwest::Method::GET, url)).await
    }

    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// Returns a 404 [`ClientError::Api`] when the product does not exist.
    pub async fn product(&self, id: ProductId) -> Result<Product, ClientError> {
        let mut url = self.url("/api/products")?;
        url.query_pairs_mut().append_pair("_id", &id.to_string());
        let envelope: ProductEnvelope = self.send(self.request(reqwest::Method::GET, url)).await?;
        Ok(envelope.product)
    }

    /// Place an order. The request's idempotency key, if any, is also sent as
    /// the `Idempotency-Key` header.
    ///
    /// # Errors
    ///
    /// Returns error if the order is rejected or the request fails.
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ClientError> {
        let url = self.url("/api/order/create")?;
        let mut builder = self.request(reqwest::Method::POST, url).json(request);
        if let Some(key) = &request.idempotency_key {
            builder = builder.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        let envelope: OrderEnvelope = self.send(builder).await?;
        Ok(envelope.order)
    }

    /// The signed-in user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] without a valid token.
    pub async fn my_orders(&self) -> Result<Vec<Order>, ClientError> {
        let envelope: OrdersEnvelope = self.get("/api/order/my-orders").await?;
        Ok(envelope.orders)
    }

    /// One order visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns a 404 [`ClientError::Api`] for unknown orders and a 403 for
    /// orders owned by someone else.
    pub async fn order(&self, id: OrderId) -> Result<Order, ClientError> {
        let envelope: OrderEnvelope = self.get(&format!("/api/order/{id}")).await?;
        Ok(envelope.order)
    }

    /// Cancel one of the caller's orders.
    ///
    /// # Errors
    ///
    /// Returns a 409 [`ClientError::Api`] once the order has shipped.
    pub async fn cancel_order(&self, id: OrderId) -> Result<Order, ClientError> {
        let envelope: OrderEnvelope = self
            .post("/api/order/cancel", &OrderIdBody { order_id: id })
            .await?;
        Ok(envelope.order)
    }

    /// Capture the mock payment for one of the caller's orders.
    ///
    /// # Errors
    ///
    /// Returns a 409 [`ClientError::Api`] when the order is already paid.
    pub async fn pay_order(&self, id: OrderId) -> Result<Order, ClientError> {
        let envelope: OrderEnvelope = self
            .post(
                "/api/payment/process-mock-payment",
                &OrderIdBody { order_id: id },
            )
            .await?;
        Ok(envelope.order)
    }

    /// Every order (admin).
    ///
    /// # Errors
    ///
    /// Returns a 403 [`ClientError::Api`] for non-admin tokens.
    pub async fn all_orders(&self) -> Result<Vec<Order>, ClientError> {
        let envelope: OrdersEnvelope = self.get("/api/order/list").await?;
        Ok(envelope.orders)
    }

    /// Set an order's status (admin).
    ///
    /// # Errors
    ///
    /// Returns a 403 [`ClientError::Api`] for non-admin tokens.
    pub async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Order, ClientError> {
        let body = StatusBody {
            order_id: id,
            status,
            payment_status,
        };
        let envelope: OrderEnvelope = self.post("/api/order/status", &body).await?;
        Ok(envelope.order)
    }

    /// Today's order count and sales (admin).
    ///
    /// # Errors
    ///
    /// Returns a 403 [`ClientError::Api`] for non-admin tokens.
    pub async fn quick_stats(&self) -> Result<QuickStats, ClientError> {
        let envelope: StatsEnvelope = self.get("/api/dashboard/quick-stats").await?;
        Ok(envelope.stats)
    }

    /// Send a contact-form message.
    ///
    /// # Errors
    ///
    /// Returns a 400 [`ClientError::Api`] when a field is missing.
    pub async fn submit_contact(&self, input: &ContactInput) -> Result<(), ClientError> {
        let _: serde_json::Value = self.post("/api/contact", input).await?;
        Ok(())
    }

    /// Resolve a 6-digit pincode to city and state.
    ///
    /// # Errors
    ///
    /// Returns a 404 [`ClientError::Api`] for unknown pincodes.
    pub async fn pincode(&self, pincode: &str) -> Result<PostalArea, ClientError> {
        self.get(&format!("/api/pincode/{pincode}")).await
    }

    /// Pincode lookup in the shape the checkout address form consumes.
    pub async fn lookup_pincode(&self, pincode: &str) -> PincodeLookup {
        match self.pincode(pincode).await {
            Ok(area) => PincodeLookup::Found(area),
            Err(ClientError::Api { status: 400 | 404, .. }) => PincodeLookup::NotFound,
            Err(e) => {
                tracing::warn!(error = %e, "Pincode lookup failed");
                PincodeLookup::Failed
            }
        }
    }
}

impl OrderGateway for ApiClient {
    async fn submit(&self, request: CreateOrderRequest) -> Result<Order, GatewayError> {
        Ok(self.create_order(&request).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_message() {
        let body = br#"{"success": false, "message": "Order is already paid"}"#;
        let err = decode::<serde_json::Value>(StatusCode::CONFLICT, body).unwrap_err();
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "Order is already paid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unauthorized_is_distinct() {
        let body = br#"{"success": false, "message": "Invalid or expired token"}"#;
        let err = decode::<serde_json::Value>(StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized(_)));
        assert_eq!(err.status(), Some(401));
        assert_eq!(GatewayError::from(err), GatewayError::Unauthorized);
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, b"upstream down"),
            "upstream down"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, b""), "Bad Gateway");
    }

    #[test]
    fn test_rejection_maps_to_gateway_message() {
        let err = ClientError::Api {
            status: 409,
            message: "Insufficient stock for Desk Lamp".to_owned(),
        };
        assert_eq!(
            GatewayError::from(err),
            GatewayError::Rejected("Insufficient stock for Desk Lamp".to_owned())
        );
    }

    #[test]
    fn test_session_parse() {
        let body = br#"{
            "success": true,
            "message": "Login successful",
            "token": "abc.def",
            "user": {"_id": 3, "name": "Asha", "email": "asha@example.com", "role": "admin"}
        }"#;
        let session: Session = decode(StatusCode::OK, body).unwrap();
        assert_eq!(session.token, "abc.def");
        assert_eq!(session.user.id, UserId::new(3));
        assert_eq!(session.user.role, UserRole::Admin);
    }

    #[test]
    fn test_url_join_keeps_base_path() {
        let client = ApiClient::new("http://shop.test/backend/".parse().unwrap()).unwrap();
        assert_eq!(
            client.url("/api/order/list").unwrap().as_str(),
            "http://shop.test/backend/api/order/list"
        );
        assert!(!client.is_authenticated());
        assert!(client.with_token("t").is_authenticated());
    }

    #[test]
    fn test_product_query_pairs() {
        let query = ProductQuery {
            category: Some("Lighting".to_owned()),
            product_type: Some("offers".to_owned()),
            page: Some(2),
            ..ProductQuery::default()
        };
        assert_eq!(
            query.pairs(),
            vec![
                ("category", "Lighting".to_owned()),
                ("_type", "offers".to_owned()),
                ("_page", "2".to_owned()),
            ]
        );
        assert!(ProductQuery::default().pairs().is_empty());
    }

    #[test]
    fn test_debug_hides_token() {
        let client = ApiClient::new("http://shop.test/".parse().unwrap())
            .unwrap()
            .with_token("secret-token");
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("authenticated: true"));
    }
}
