// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account registration and session routes.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser, TOKEN_COOKIE};
use crate::models::{Role, User, UserProfile};
use crate::services::audit::{self, client_ip, AuditEvent};
use crate::services::auth::{
    hash_password, issue_refresh_token, refresh_token_valid, split_refresh_token, verify_password,
};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

/// Endpoints that take a password; rate limited in routes/mod.rs.
pub fn credential_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

/// Session routes that need an access token.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/logout-all", post(logout_all))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Session tokens issued on register, login, and refresh.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Session cookies are only `Secure` when the frontend is served over HTTPS.
fn cookie_secure(config: &Config) -> bool {
    config.frontend_url.starts_with("https://")
}

fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cookie_secure(config))
        .max_age(time::Duration::seconds(
            config.access_token_ttl.as_secs() as i64
        ))
        .build()
}

pub(crate) fn clear_session_cookie(config: &Config, jar: CookieJar) -> CookieJar {
    jar.remove(
        Cookie::build(TOKEN_COOKIE)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(cookie_secure(config)),
    )
}

/// Issue an access token and a stored refresh token for `user`.
async fn start_session(state: &AppState, jar: CookieJar, user: &User) -> Result<(CookieJar, AuthResponse)> {
    let config = &state.config;
    let access_token = create_jwt(
        &user.id,
        &user.email,
        user.role,
        &config.jwt_signing_key,
        config.access_token_ttl,
    )?;

    let issued = issue_refresh_token(&user.id, config.refresh_token_ttl_days)?;
    state.db.set_refresh_token(&issued.record).await?;

    let jar = jar.add(session_cookie(config, access_token.clone()));
    Ok((
        jar,
        AuthResponse {
            user: UserProfile::from(user),
            access_token,
            refresh_token: issued.token,
            expires_in: config.access_token_ttl.as_secs(),
        },
    ))
}

async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>)> {
    req.validate()?;
    let email = req.email.trim().to_lowercase();

    if state.db.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let now = format_utc_rfc3339(chrono::Utc::now());
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        password_hash: hash_password(&req.password)?,
        name: req.name.filter(|n| !n.trim().is_empty()),
        role: Role::User,
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
        last_login_at: None,
    };
    state.db.create_user(&user).await?;

    tracing::info!(user_id = %user.id, "User registered");
    audit::record(
        &state.db,
        AuditEvent::new(&user.id, "user.register", "user", &user.id).ip(client_ip(&headers)),
    )
    .await;

    let (jar, body) = start_session(&state, jar, &user).await?;
    Ok((StatusCode::CREATED, jar, Json(body)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    let email = req.email.trim().to_lowercase();
    let Some(mut user) = state.db.get_user_by_email(&email).await? else {
        tracing::debug!("Login for unknown email");
        return Err(AppError::Unauthorized);
    };

    if !verify_password(&req.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "Login with wrong password");
        return Err(AppError::Unauthorized);
    }
    if !user.is_active {
        tracing::info!(user_id = %user.id, "Login for deactivated user");
        return Err(AppError::Unauthorized);
    }

    let now = format_utc_rfc3339(chrono::Utc::now());
    user.last_login_at = Some(now.clone());
    user.updated_at = now;
    state.db.upsert_user(&user).await?;

    audit::record(
        &state.db,
        AuditEvent::new(&user.id, "user.login", "user", &user.id).ip(client_ip(&headers)),
    )
    .await;

    let (jar, body) = start_session(&state, jar, &user).await?;
    Ok((jar, Json(body)))
}

/// Exchange a refresh token for a new session.
///
/// The presented token is revoked in the same transaction that validates
/// it, so each refresh token mints at most one new session.
async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<RefreshRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    let (token_id, secret) =
        split_refresh_token(&req.refresh_token).ok_or(AppError::InvalidToken)?;

    let now = chrono::Utc::now();
    let record = state
        .db
        .consume_refresh_token(token_id, |record| refresh_token_valid(record, secret, now))
        .await?
        .ok_or_else(|| {
            tracing::info!(token_id, "Rejected refresh token");
            AppError::InvalidToken
        })?;

    let user = state
        .db
        .get_user(&record.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or(AppError::InvalidToken)?;

    let (jar, body) = start_session(&state, jar, &user).await?;
    Ok((jar, Json(body)))
}

/// End the session: revoke the refresh token if given and clear the cookie.
///
/// The body is optional; logout without one just clears the cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    body: Bytes,
) -> Result<(StatusCode, CookieJar)> {
    let token_id = serde_json::from_slice::<RefreshRequest>(&body)
        .ok()
        .and_then(|req| split_refresh_token(&req.refresh_token).map(|(id, _)| id.to_string()));

    if let Some(token_id) = token_id {
        if let Some(record) = state.db.get_refresh_token(&token_id).await? {
            state.db.revoke_refresh_token(&token_id).await?;
            audit::record(
                &state.db,
                AuditEvent::new(&record.user_id, "user.logout", "user", &record.user_id)
                    .ip(client_ip(&headers)),
            )
            .await;
        }
    }

    Ok((StatusCode::NO_CONTENT, clear_session_cookie(&state.config, jar)))
}

/// Revoke every refresh token of the caller and clear the cookie.
///
/// Access tokens already issued stay valid until they expire.
async fn logout_all(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar)> {
    let revoked = state.db.revoke_user_refresh_tokens(&user.user_id).await?;

    audit::record(
        &state.db,
        AuditEvent::new(&user.user_id, "user.logout_all", "user", &user.user_id)
            .values(None, Some(serde_json::json!({"revoked_sessions": revoked})))
            .ip(client_ip(&headers)),
    )
    .await;

    Ok((StatusCode::NO_CONTENT, clear_session_cookie(&state.config, jar)))
}
