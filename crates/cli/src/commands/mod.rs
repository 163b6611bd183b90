//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod products;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use storehouse_api::config::{ConfigError, database_url_from_env};
use storehouse_api::db::{self, RepositoryError};
use storehouse_api::services::AuthError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Database URL missing from the environment.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Query failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Invalid admin account input.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Catalog file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Catalog file is not valid YAML for products.
    #[error("Invalid catalog file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// One or more catalog entries failed validation.
    #[error("Catalog has {0} invalid product(s)")]
    InvalidCatalog(usize),
}

/// Connect to the database named by `STOREHOUSE_DATABASE_URL` or `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, CliError> {
    let database_url: SecretString = database_url_from_env()?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}
