// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.

use crate::models::Role;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Session cookie carrying the access token.
pub const TOKEN_COOKIE: &str = "tfcost_token";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Decode and validate an access token.
pub fn decode_jwt(token: &str, signing_key: &[u8]) -> Option<Claims> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims)
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(TOKEN_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(t) => t.to_string(),
            None => return Err(StatusCode::UNAUTHORIZED),
        }
    };

    let claims =
        decode_jwt(&token, &state.config.jwt_signing_key).ok_or(StatusCode::UNAUTHORIZED)?;

    if claims.sub.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        email: claims.email,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

/// Middleware for admin-only routes. Must run after `require_auth`.
///
/// The role in the token is checked first, then the stored account: it must
/// still exist, be active, and hold the admin role. A demoted or deactivated
/// admin loses access on the next request rather than at token expiry.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user_id = match request.extensions().get::<AuthUser>() {
        Some(user) if user.is_admin() => user.user_id.clone(),
        Some(user) => {
            tracing::warn!(user_id = %user.user_id, "Non-admin attempted admin route");
            return Err(StatusCode::FORBIDDEN);
        }
        None => return Err(StatusCode::UNAUTHORIZED),
    };

    let account = state.db.get_user(&user_id).await.map_err(|e| {
        tracing::error!(user_id = %user_id, error = %e, "Failed to load admin account");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    match account {
        Some(account) if account.is_active && account.role == Role::Admin => {
            Ok(next.run(request).await)
        }
        _ => {
            tracing::warn!(user_id = %user_id, "Admin token no longer matches account");
            Err(StatusCode::FORBIDDEN)
        }
    }
}

/// Create an access token for a user session.
pub fn create_jwt(
    user_id: &str,
    email: &str,
    role: Role,
    signing_key: &[u8],
    ttl: Duration,
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        iat: now,
        exp: now + ttl.as_secs() as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test_jwt_key_32_bytes_minimum!!";

    #[test]
    fn test_jwt_round_trip() {
        let token = create_jwt("u1", "a@example.com", Role::Admin, KEY, Duration::from_secs(900))
            .unwrap();
        let claims = decode_jwt(&token, KEY).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_jwt_wrong_key_rejected() {
        let token =
            create_jwt("u1", "a@example.com", Role::User, KEY, Duration::from_secs(900)).unwrap();
        assert!(decode_jwt(&token, b"another_key_that_is_32_bytes!!!").is_none());
    }
}
