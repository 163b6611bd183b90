//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! storehouse-cli migrate
//! ```
//!
//! Applies the migrations in `crates/api/migrations/`. The server never runs
//! them on startup.

use super::{CliError, connect};

/// Apply all pending migrations.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
