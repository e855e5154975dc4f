// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::UserProfile;
use crate::routes::auth::clear_session_cookie;
use crate::services::audit::{self, client_ip, AuditEvent};
use crate::services::auth::{hash_password, verify_password};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).put(update_me))
        .route("/api/me/password", post(change_password))
        .route("/api/account", delete(delete_account))
}

// ─── User Profile ────────────────────────────────────────────

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    let account = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    Ok(Json(UserProfile::from(&account)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    /// Display name; empty clears it
    #[validate(length(max = 100))]
    pub name: Option<String>,
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>> {
    req.validate()?;

    let mut account = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    let old_name = account.name.take();
    account.name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    account.updated_at = format_utc_rfc3339(chrono::Utc::now());
    state.db.upsert_user(&account).await?;

    audit::record(
        &state.db,
        AuditEvent::new(&user.user_id, "user.update", "user", &user.user_id)
            .values(
                Some(serde_json::json!({"name": old_name})),
                Some(serde_json::json!({"name": account.name})),
            )
            .ip(client_ip(&headers)),
    )
    .await;

    Ok(Json(UserProfile::from(&account)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Replace the caller's password and end their other sessions.
///
/// All refresh tokens are revoked; the caller keeps the current access token
/// until it expires and must log in again after that.
async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    req.validate()?;

    let mut account = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    if !verify_password(&req.current_password, &account.password_hash)? {
        tracing::info!(user_id = %user.user_id, "Password change with wrong current password");
        return Err(AppError::Unauthorized);
    }

    account.password_hash = hash_password(&req.new_password)?;
    account.updated_at = format_utc_rfc3339(chrono::Utc::now());
    state.db.upsert_user(&account).await?;
    let revoked = state.db.revoke_user_refresh_tokens(&user.user_id).await?;

    tracing::info!(user_id = %user.user_id, revoked, "Password changed");
    audit::record(
        &state.db,
        AuditEvent::new(&user.user_id, "user.password", "user", &user.user_id)
            .ip(client_ip(&headers)),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

// ─── Account Deletion ────────────────────────────────────────

/// Response for account deletion.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub deleted_documents: usize,
}

/// Delete the caller's account with its reports, notifications, and sessions.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<DeleteAccountResponse>)> {
    tracing::info!(user_id = %user.user_id, "User-initiated account deletion");

    let deleted_documents = state.db.delete_user_data(&user.user_id).await?;

    audit::record(
        &state.db,
        AuditEvent::new(&user.user_id, "user.delete", "user", &user.user_id)
            .ip(client_ip(&headers)),
    )
    .await;

    Ok((
        clear_session_cookie(&state.config, jar),
        Json(DeleteAccountResponse {
            success: true,
            deleted_documents,
        }),
    ))
}
