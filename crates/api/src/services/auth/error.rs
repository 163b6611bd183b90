//! Authentication error types.

use thiserror::Error;

use storehouse_core::account::AccountError;

use super::token::TokenError;
use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] storehouse_core::EmailError),

    /// Registration or profile input rejected.
    #[error("{0}")]
    InvalidInput(#[from] AccountError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Authenticated, but not an admin.
    #[error("admin access required")]
    NotAdmin,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Bearer token could not be issued or verified.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
