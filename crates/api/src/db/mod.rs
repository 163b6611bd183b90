//! Database operations for the Storehouse `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Accounts with argon2 password hashes and a role
//! - `addresses` - Address-book entries, at most one default per user
//! - `categories` / `brands` - Catalog taxonomy (free-text join to products)
//! - `products` - Catalog with price, discount and stock
//! - `orders` - Orders with embedded item and address snapshots (JSONB)
//! - `contacts` - Contact form inbox
//! - `docs` - Admin documentation pages
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p storehouse-cli -- migrate
//! ```

pub mod addresses;
pub mod contacts;
pub mod dashboard;
pub mod docs;
pub mod orders;
pub mod products;
pub mod taxonomy;
pub mod users;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use contacts::ContactRepository;
pub use dashboard::DashboardRepository;
pub use docs::DocRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use taxonomy::{BrandRepository, CategoryRepository};
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is invalid or corrupted.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
