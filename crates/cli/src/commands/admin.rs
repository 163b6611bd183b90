//! Admin account commands.
//!
//! # Usage
//!
//! ```bash
//! storehouse-cli admin create -e admin@example.com -n "Admin Name" -p 'long password'
//! ```
//!
//! An existing account with the same email is promoted to admin and its
//! password replaced.

use storehouse_api::services::auth::ensure_admin;

use super::{CliError, connect};

/// Create or promote an admin account. Returns the account id.
pub async fn create(email: &str, name: &str, password: &str) -> Result<i32, CliError> {
    let pool = connect().await?;

    tracing::info!("Creating admin account: {}", email);
    let user = ensure_admin(&pool, name, email, password).await?;

    tracing::info!(
        "Admin account ready! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user.id.as_i32())
}
