// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication tests.
//!
//! These tests verify that JWT tokens created by auth routes can be decoded
//! by the auth middleware, catching compatibility issues early.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tfcost::middleware::auth::{create_jwt, decode_jwt};
use tfcost::models::Role;

const SIGNING_KEY: &[u8] = b"test_signing_key_32_bytes_long!!";

/// Claims as any HS256 consumer of our tokens would see them.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: String,
    email: String,
    role: String,
    exp: usize,
    iat: usize,
}

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

#[test]
fn test_jwt_roundtrip() {
    let token = create_jwt(
        "0b6f3c1e-user",
        "dev@example.com",
        Role::Admin,
        SIGNING_KEY,
        Duration::from_secs(900),
    )
    .unwrap();

    let claims = decode_jwt(&token, SIGNING_KEY).expect("token should decode");
    assert_eq!(claims.sub, "0b6f3c1e-user");
    assert_eq!(claims.email, "dev@example.com");
    assert_eq!(claims.role, Role::Admin);
    assert_eq!(claims.exp - claims.iat, 900);
}

#[test]
fn test_jwt_wire_format() {
    let token = create_jwt(
        "u1",
        "u1@example.com",
        Role::Viewer,
        SIGNING_KEY,
        Duration::from_secs(900),
    )
    .unwrap();

    let data = decode::<WireClaims>(
        &token,
        &DecodingKey::from_secret(SIGNING_KEY),
        &Validation::new(Algorithm::HS256),
    )
    .expect("Failed to decode JWT - check Claims struct compatibility");

    assert_eq!(data.header.alg, Algorithm::HS256);
    assert_eq!(data.claims.role, "viewer");
    assert!(data.claims.exp > now());
}

#[test]
fn test_expired_token_rejected() {
    let issued = now() - 7200;
    let claims = WireClaims {
        sub: "u1".to_string(),
        email: "u1@example.com".to_string(),
        role: "user".to_string(),
        iat: issued,
        exp: issued + 900,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SIGNING_KEY),
    )
    .unwrap();

    assert!(decode_jwt(&token, SIGNING_KEY).is_none());
}

#[test]
fn test_unknown_role_rejected() {
    let claims = WireClaims {
        sub: "u1".to_string(),
        email: "u1@example.com".to_string(),
        role: "superuser".to_string(),
        iat: now(),
        exp: now() + 900,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SIGNING_KEY),
    )
    .unwrap();

    assert!(decode_jwt(&token, SIGNING_KEY).is_none());
}

#[test]
fn test_wrong_key_rejected() {
    let token = create_jwt(
        "u1",
        "u1@example.com",
        Role::User,
        SIGNING_KEY,
        Duration::from_secs(900),
    )
    .unwrap();

    assert!(decode_jwt(&token, b"another_key_entirely_32_bytes!!!").is_none());
}
