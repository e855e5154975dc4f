// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin-only routes. Guarded by `require_admin` in routes/mod.rs.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::audit::AuditFilter;
use crate::models::{AuditEntry, Role, UserProfile};
use crate::services::audit::{self, client_ip, AuditEvent};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 500;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{id}/role", put(set_role))
        .route("/api/admin/users/{id}/active", put(set_active))
        .route("/api/admin/audit", get(list_audit))
        .route("/api/admin/pricing/cache", delete(clear_price_cache))
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct ActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    actor_id: Option<String>,
    entity_type: Option<String>,
    limit: Option<u32>,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<UserProfile>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let users = state.db.list_users(limit).await?;
    Ok(Json(users.iter().map(UserProfile::from).collect()))
}

async fn set_role(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<RoleRequest>,
) -> Result<Json<UserProfile>> {
    if id == admin.user_id && req.role != Role::Admin {
        return Err(AppError::BadRequest("Cannot remove your own admin role".to_string()));
    }

    let mut user = state
        .db
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

    let old_role = user.role;
    user.role = req.role;
    user.updated_at = format_utc_rfc3339(chrono::Utc::now());
    state.db.upsert_user(&user).await?;

    tracing::info!(admin_id = %admin.user_id, user_id = %id, role = req.role.as_str(), "Role changed");
    audit::record(
        &state.db,
        AuditEvent::new(&admin.user_id, "user.role", "user", &id)
            .values(Some(json!({"role": old_role})), Some(json!({"role": req.role})))
            .ip(client_ip(&headers)),
    )
    .await;

    Ok(Json(UserProfile::from(&user)))
}

async fn set_active(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<ActiveRequest>,
) -> Result<Json<UserProfile>> {
    if id == admin.user_id && !req.is_active {
        return Err(AppError::BadRequest("Cannot deactivate yourself".to_string()));
    }

    let mut user = state
        .db
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

    let was_active = user.is_active;
    user.is_active = req.is_active;
    user.updated_at = format_utc_rfc3339(chrono::Utc::now());
    state.db.upsert_user(&user).await?;

    // A deactivated user must not be able to refresh back in
    if !req.is_active {
        state.db.revoke_user_refresh_tokens(&id).await?;
    }

    tracing::info!(admin_id = %admin.user_id, user_id = %id, is_active = req.is_active, "Active flag changed");
    audit::record(
        &state.db,
        AuditEvent::new(&admin.user_id, "user.active", "user", &id)
            .values(
                Some(json!({"is_active": was_active})),
                Some(json!({"is_active": req.is_active})),
            )
            .ip(client_ip(&headers)),
    )
    .await;

    Ok(Json(UserProfile::from(&user)))
}

async fn list_audit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>> {
    let filter = AuditFilter {
        actor_id: query.actor_id.filter(|a| !a.is_empty()),
        entity_type: query.entity_type.filter(|t| !t.is_empty()),
        limit: query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
    };
    let entries = state.db.list_audit_entries(&filter).await?;
    Ok(Json(entries))
}

/// Drop cached prices so the next lookups hit the remote endpoint again.
async fn clear_price_cache(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    headers: HeaderMap,
) -> StatusCode {
    let cleared = state.pricing.cache_len();
    state.pricing.clear_cache();
    audit::record(
        &state.db,
        AuditEvent::new(&admin.user_id, "pricing.cache_clear", "pricing", "cache")
            .values(None, Some(json!({ "cleared": cleared })))
            .ip(client_ip(&headers)),
    )
    .await;
    StatusCode::NO_CONTENT
}
