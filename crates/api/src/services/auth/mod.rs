//! Authentication service.
//!
//! Password accounts with argon2 hashes and HMAC-signed bearer tokens.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{Claims, TokenError, TokenSigner};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::instrument;

use storehouse_core::account::Registration;
use storehouse_core::{Email, UserRole};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// A user together with a freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Authentication service.
///
/// Handles registration, login and admin provisioning.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenSigner,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenSigner) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
        }
    }

    /// Register a customer account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::InvalidInput` for a blank name or short password.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Session, AuthError> {
        let registration = Registration {
            name: name.trim().to_owned(),
            email: Email::parse(email)?,
            password: password.to_owned(),
        };
        registration.validate()?;

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .create(&registration.name, &registration.email, &password_hash, UserRole::User)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        self.session(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;
        self.session(user)
    }

    /// Login for the admin panel.
    ///
    /// # Errors
    ///
    /// As [`Self::login`], plus `AuthError::NotAdmin` for customer accounts.
    #[instrument(skip(self, password))]
    pub async fn admin_login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.login(email, password).await?;
        if !session.user.is_admin() {
            tracing::warn!(user_id = %session.user.id, "Non-admin attempted admin login");
            return Err(AuthError::NotAdmin);
        }
        Ok(session)
    }

    fn session(&self, user: User) -> Result<Session, AuthError> {
        let token = self.tokens.issue(user.id, user.role)?;
        Ok(Session { user, token })
    }
}

/// Create an admin account, or promote an existing account and reset its
/// password.
///
/// # Errors
///
/// Returns `AuthError` for invalid input or database failures.
pub async fn ensure_admin(
    pool: &PgPool,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    let registration = Registration {
        name: name.trim().to_owned(),
        email: Email::parse(email)?,
        password: password.to_owned(),
    };
    registration.validate()?;
    let password_hash = hash_password(password)?;

    let users = UserRepository::new(pool);
    match users.get_by_email(&registration.email).await? {
        Some(existing) => Ok(users
            .set_role(existing.id, UserRole::Admin, Some(&password_hash))
            .await?),
        None => Ok(users
            .create(&registration.name, &registration.email, &password_hash, UserRole::Admin)
            .await?),
    }
}

/// Hash a password using Argon2.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the password doesn't match.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHash)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let password = "correct horse battery";
        let hash = hash_password(password).unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(password, &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_corrupt_hash_is_not_a_credential_error() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::PasswordHash)
        ));
    }
}
