//! Signed bearer tokens.
//!
//! Format: `base64url(claims_json) "." base64url(HMAC-SHA256(claims_json))`,
//! both unpadded. Claims carry the user id, role and an expiry in Unix
//! seconds.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use storehouse_core::{UserId, UserRole};

type HmacSha256 = Hmac<Sha256>;

/// Token verification failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid signing key")]
    Key,
}

/// Token payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub role: UserRole,
    /// Expiry, Unix seconds
    pub exp: i64,
}

/// Issues and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    #[must_use]
    pub const fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    /// Issue a token valid for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Key` if the MAC cannot be keyed.
    pub fn issue(&self, user: UserId, role: UserRole) -> Result<String, TokenError> {
        self.issue_at(user, role, Utc::now())
    }

    fn issue_at(&self, user: UserId, role: UserRole, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user,
            role,
            exp: (now + self.ttl).timestamp(),
        };
        let payload = serde_json::to_vec(&claims).map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Verify signature and expiry, returning the claims.
    ///
    /// # Errors
    ///
    /// `TokenError::Malformed`, `BadSignature` or `Expired`.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (payload, signature) = token.trim().split_once('.').ok_or(TokenError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        // verify_slice compares in constant time
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes()).map_err(|_| TokenError::Key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(
            SecretString::from("Zr8#pQ2!xN7@vL4$mK9%tB3^wD6&hF1*"),
            Duration::hours(1),
        )
    }

    #[test]
    fn test_issue_then_verify() {
        let signer = signer();
        let token = signer.issue(UserId::new(7), UserRole::Admin).unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, UserId::new(7));
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = signer();
        let issued = Utc::now() - Duration::hours(2);
        let token = signer.issue_at(UserId::new(1), UserRole::User, issued).unwrap();
        assert_eq!(signer.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let signer = signer();
        let token = signer.issue(UserId::new(1), UserRole::User).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged = Claims {
            sub: UserId::new(1),
            role: UserRole::Admin,
            exp: i64::MAX,
        };
        let forged = format!(
            "{}.{signature}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap())
        );
        assert_eq!(signer.verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = signer().issue(UserId::new(1), UserRole::User).unwrap();
        let other = TokenSigner::new(
            SecretString::from("Qm3!vT8@kR2#yH6$pW9%zC4^nJ7&bL5*"),
            Duration::hours(1),
        );
        assert_eq!(other.verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_garbage_rejected() {
        let signer = signer();
        assert_eq!(signer.verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(signer.verify("!!!.???"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", signer());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("Zr8#"));
    }
}
