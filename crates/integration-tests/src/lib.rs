//! Integration tests for Storehouse.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate the database and start the server
//! cargo run -p storehouse-cli -- migrate
//! cargo run -p storehouse-api
//!
//! # Run the ignored scenarios against it
//! STOREHOUSE_BASE_URL=http://127.0.0.1:8000 cargo test -p storehouse-integration-tests -- --ignored
//! ```
//!
//! The tests talk to the server over HTTP and use the same database
//! (`STOREHOUSE_DATABASE_URL` or `DATABASE_URL`) directly to seed products and
//! admin accounts.

use std::net::{IpAddr, Ipv4Addr};

use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use sqlx::PgPool;
use url::Url;
use uuid::Uuid;

use storehouse_api::config::database_url_from_env;
use storehouse_api::db::{self, ProductRepository};
use storehouse_api::services::auth::ensure_admin;
use storehouse_client::{ApiClient, Session};
use storehouse_core::order::{CreateOrderRequest, OrderAddress, OrderItemInput};
use storehouse_core::product::{Product, ProductDraft};
use storehouse_core::{PaymentMethod, ProductId, ProductType};

/// Password used for every account the tests create.
pub const TEST_PASSWORD: &str = "integration-pass-1";

/// Base URL for the API (configurable via environment).
pub fn base_url() -> Url {
    std::env::var("STOREHOUSE_BASE_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string())
        .parse()
        .expect("STOREHOUSE_BASE_URL must be a URL")
}

/// A fresh address for a test account.
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

/// Shared handles for one test.
///
/// Every context presents its own client address so credential endpoints
/// are rate limited per test rather than across the whole run.
pub struct TestContext {
    pub base_url: Url,
    pub pool: PgPool,
    client_ip: IpAddr,
}

impl TestContext {
    /// Connect to the database and pick a client address.
    ///
    /// # Panics
    ///
    /// Panics if the database URL is missing or unreachable.
    pub async fn new() -> Self {
        let database_url = database_url_from_env().expect("database URL not set");
        let pool = db::create_pool(&database_url)
            .await
            .expect("Failed to connect to database");
        let [a, b, c, ..] = Uuid::new_v4().into_bytes();
        Self {
            base_url: base_url(),
            pool,
            client_ip: IpAddr::V4(Ipv4Addr::new(10, a, b, c)),
        }
    }

    /// A client without credentials.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    pub fn anonymous(&self) -> ApiClient {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_str(&self.client_ip.to_string()).expect("IP is a valid header"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .expect("Failed to create HTTP client");
        ApiClient::with_http_client(http, self.base_url.clone())
    }

    /// Register a new customer and return a client signed in as them.
    ///
    /// # Panics
    ///
    /// Panics if registration fails.
    pub async fn customer(&self) -> (ApiClient, Session) {
        let anonymous = self.anonymous();
        let session = anonymous
            .register("Test Customer", &unique_email("customer"), TEST_PASSWORD)
            .await
            .expect("Failed to register customer");
        (anonymous.with_token(session.token.clone()), session)
    }

    /// Create an admin account directly in the database and sign in.
    ///
    /// # Panics
    ///
    /// Panics if the account cannot be created or signed in.
    pub async fn admin(&self) -> ApiClient {
        let email = unique_email("admin");
        ensure_admin(&self.pool, "Test Admin", &email, TEST_PASSWORD)
            .await
            .expect("Failed to create admin");
        let anonymous = self.anonymous();
        let session = anonymous
            .admin_login(&email, TEST_PASSWORD)
            .await
            .expect("Failed to sign in as admin");
        anonymous.with_token(session.token)
    }

    /// Insert a product straight into the catalog.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn seed_product(&self, price: Decimal, discount: Decimal, stock: i32) -> Product {
        let draft = ProductDraft {
            name: format!("Test Product {}", Uuid::new_v4().simple()),
            description: "Seeded by integration tests".to_owned(),
            price,
            discounted_percentage: discount,
            stock,
            category: "Integration".to_owned(),
            brand: None,
            images: vec!["https://media.example.com/test.jpg".to_owned()],
            is_available: true,
            offer: false,
            badge: false,
            product_type: ProductType::None,
            tags: Vec::new(),
        };
        ProductRepository::new(&self.pool)
            .create(&draft)
            .await
            .expect("Failed to seed product")
    }

    /// Current stock of a product.
    ///
    /// # Panics
    ///
    /// Panics if the product does not exist.
    pub async fn stock_of(&self, id: ProductId) -> i32 {
        ProductRepository::new(&self.pool)
            .get(id)
            .await
            .expect("Failed to load product")
            .expect("Product not found")
            .stock
    }
}

/// A complete delivery address.
pub fn test_address() -> OrderAddress {
    OrderAddress {
        first_name: "Asha".to_owned(),
        last_name: "Verma".to_owned(),
        email: "asha@example.com".to_owned(),
        street: "12, MG Road".to_owned(),
        city: "Bengaluru".to_owned(),
        state: "Karnataka".to_owned(),
        zipcode: "560001".to_owned(),
        country: "India".to_owned(),
        phone: "9876543210".to_owned(),
    }
}

/// An order for `quantity` units of one product.
pub fn order_for(product: &Product, quantity: u32, method: PaymentMethod) -> CreateOrderRequest {
    CreateOrderRequest {
        items: vec![OrderItemInput {
            product_id: Some(product.id),
            name: Some(product.name.clone()),
            price: Some(product.price),
            quantity,
            image: product.images.first().cloned(),
            images: Vec::new(),
        }],
        address: Some(test_address()),
        payment_method: method,
        amount: None,
        idempotency_key: None,
    }
}
