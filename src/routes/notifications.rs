// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification routes, including the live SSE stream.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::notification::NotificationFilter;
use crate::models::Notification;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, put},
    Extension, Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 100;
const KEEP_ALIVE_SECS: u64 = 15;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/read-all", put(mark_all_read))
        .route("/api/notifications/stream", get(stream_notifications))
        .route("/api/notifications/{id}/read", put(mark_read))
        .route("/api/notifications/{id}", delete(delete_notification))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    read: Option<bool>,
    kind: Option<String>,
    limit: Option<u32>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CountResponse {
    pub count: usize,
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Notification>>> {
    let filter = NotificationFilter {
        read: query.read,
        kind: query.kind.filter(|k| !k.is_empty()),
        limit: query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
    };
    let notifications = state.db.list_notifications(&user.user_id, &filter).await?;
    Ok(Json(notifications))
}

async fn unread_count(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CountResponse>> {
    let count = state.db.unread_count(&user.user_id).await?;
    Ok(Json(CountResponse { count }))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Notification>> {
    let notification = state
        .db
        .mark_notification_read(&user.user_id, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))?;
    Ok(Json(notification))
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CountResponse>> {
    let count = state.db.mark_all_notifications_read(&user.user_id).await?;
    tracing::debug!(user_id = %user.user_id, count, "Marked notifications read");
    Ok(Json(CountResponse { count }))
}

async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.db.delete_notification(&user.user_id, &id).await? {
        return Err(AppError::NotFound(format!("Notification {} not found", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn notification_event(notification: &Notification) -> Event {
    match Event::default()
        .event("notification")
        .id(notification.id.clone())
        .json_data(notification)
    {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, notification_id = %notification.id, "Failed to encode notification");
            Event::default().comment("encoding error")
        }
    }
}

/// Live notifications for the caller as server-sent events.
async fn stream_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    tracing::debug!(user_id = %user.user_id, "Notification stream opened");

    let stream = state
        .notifications
        .subscribe(user.user_id)
        .map(|notification| Ok(notification_event(&notification)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("keep-alive"),
    )
}
