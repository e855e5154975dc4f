// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing and refresh token handling.
//!
//! Access tokens (JWTs) live in `middleware::auth`; this module covers the
//! credentials that are stored.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::models::RefreshToken;
use crate::time_utils::format_utc_rfc3339;

const SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("stored password hash is malformed")]
    Malformed,
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(anyhow::anyhow!(err))
    }
}

/// Hash a password into an Argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Check a password against a stored PHC string.
pub fn verify_password(password: &str, phc: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(phc).map_err(|_| PasswordError::Malformed)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// A freshly issued refresh token: the record to store and the value handed
/// to the client.
pub struct IssuedRefreshToken {
    pub record: RefreshToken,
    /// `{id}.{secret}`
    pub token: String,
}

/// Issue a new refresh token for `user_id` valid for `ttl_days`.
pub fn issue_refresh_token(user_id: &str, ttl_days: i64) -> Result<IssuedRefreshToken, AppError> {
    let mut bytes = [0u8; SECRET_LEN];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("random generator failure")))?;
    let secret = URL_SAFE_NO_PAD.encode(bytes);

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now();

    Ok(IssuedRefreshToken {
        token: format!("{}.{}", id, secret),
        record: RefreshToken {
            id,
            user_id: user_id.to_string(),
            token_hash: hash_secret(&secret),
            expires_at: format_utc_rfc3339(now + chrono::Duration::days(ttl_days)),
            revoked: false,
            created_at: format_utc_rfc3339(now),
        },
    })
}

/// Split a client token into `(id, secret)`.
pub fn split_refresh_token(token: &str) -> Option<(&str, &str)> {
    let (id, secret) = token.split_once('.')?;
    if id.is_empty() || secret.is_empty() {
        return None;
    }
    Some((id, secret))
}

/// Whether `secret` matches a stored, unrevoked, unexpired record.
pub fn refresh_token_valid(record: &RefreshToken, secret: &str, now: chrono::DateTime<chrono::Utc>) -> bool {
    if record.revoked {
        return false;
    }

    let expired = chrono::DateTime::parse_from_rfc3339(&record.expires_at)
        .map(|exp| exp.with_timezone(&chrono::Utc) <= now)
        .unwrap_or(true);
    if expired {
        return false;
    }

    let presented = hash_secret(secret);
    presented
        .as_bytes()
        .ct_eq(record.token_hash.as_bytes())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(PasswordError::Malformed)
        ));
    }

    #[test]
    fn test_refresh_token_lifecycle() {
        let issued = issue_refresh_token("user-1", 7).unwrap();
        let (id, secret) = split_refresh_token(&issued.token).unwrap();
        assert_eq!(id, issued.record.id);
        assert_ne!(issued.record.token_hash, secret);

        let now = chrono::Utc::now();
        assert!(refresh_token_valid(&issued.record, secret, now));
        assert!(!refresh_token_valid(&issued.record, "tampered", now));

        let later = now + chrono::Duration::days(8);
        assert!(!refresh_token_valid(&issued.record, secret, later));

        let mut revoked = issued.record.clone();
        revoked.revoked = true;
        assert!(!refresh_token_valid(&revoked, secret, now));
    }

    #[test]
    fn test_split_refresh_token_rejects_garbage() {
        assert!(split_refresh_token("nodot").is_none());
        assert!(split_refresh_token(".secret").is_none());
        assert!(split_refresh_token("id.").is_none());
    }
}
