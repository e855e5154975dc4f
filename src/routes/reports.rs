// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Saved report routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::report::{Report, ReportFilter, ReportKind, TrendPoint};
use crate::services::audit::{self, client_ip, AuditEvent};
use crate::services::export::{cost_trends, report_csv, DEFAULT_TREND_DAYS};
use crate::services::notifications::{deliver, new_notification};
use crate::time_utils::{format_utc_rfc3339, parse_date_bound, DateBound};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;
const MAX_TREND_DAYS: i64 = 365;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reports", get(list_reports).post(create_report))
        .route("/api/reports/trends", get(get_trends))
        .route("/api/reports/{id}", get(get_report).delete(delete_report))
        .route("/api/reports/{id}/csv", get(export_csv))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportRequest {
    pub kind: ReportKind,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub data: Value,
    /// Defaults to `data.totals.monthly` when omitted
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub total_monthly_cost: Option<f64>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    kind: Option<ReportKind>,
    /// RFC3339 timestamp or `YYYY-MM-DD`
    start: Option<String>,
    end: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TrendsQuery {
    days: Option<i64>,
}

async fn list_reports(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Report>>> {
    let start = query
        .start
        .as_deref()
        .map(|s| parse_date_bound(s, DateBound::Start))
        .transpose()?;
    let end = query
        .end
        .as_deref()
        .map(|s| parse_date_bound(s, DateBound::End))
        .transpose()?;

    let filter = ReportFilter {
        kind: query.kind,
        start,
        end,
        limit: query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
    };

    let reports = state.db.list_reports(&user.user_id, &filter).await?;
    Ok(Json(reports))
}

async fn create_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    Json(req): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<Report>)> {
    req.validate()?;

    let total_monthly_cost = req
        .total_monthly_cost
        .or_else(|| req.data.pointer("/totals/monthly").and_then(Value::as_f64))
        .unwrap_or(0.0);

    let report = Report {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.user_id.clone(),
        kind: req.kind,
        name: req.name.trim().to_string(),
        data: req.data,
        total_monthly_cost,
        metadata: req.metadata,
        created_at: format_utc_rfc3339(chrono::Utc::now()),
    };
    state.db.create_report(&report).await?;

    tracing::info!(
        user_id = %user.user_id,
        report_id = %report.id,
        kind = report.kind.as_str(),
        "Report saved"
    );

    audit::record(
        &state.db,
        AuditEvent::new(&user.user_id, "report.create", "report", &report.id)
            .values(None, Some(json!({"name": report.name, "kind": report.kind})))
            .ip(client_ip(&headers)),
    )
    .await;

    let notification = new_notification(
        &user.user_id,
        "report_created",
        "Report saved",
        format!(
            "\"{}\" saved with an estimated ${:.2}/month",
            report.name, report.total_monthly_cost
        ),
        Some(json!({"report_id": report.id})),
    );
    if let Err(e) = deliver(&state.db, &state.notifications, notification).await {
        tracing::warn!(error = %e, report_id = %report.id, "Failed to send report notification");
    }

    Ok((StatusCode::CREATED, Json(report)))
}

async fn get_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Report>> {
    let report = state
        .db
        .get_report(&user.user_id, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;
    Ok(Json(report))
}

async fn delete_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.db.delete_report(&user.user_id, &id).await? {
        return Err(AppError::NotFound(format!("Report {} not found", id)));
    }

    audit::record(
        &state.db,
        AuditEvent::new(&user.user_id, "report.delete", "report", &id).ip(client_ip(&headers)),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let report = state
        .db
        .get_report(&user.user_id, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;

    let disposition = format!("attachment; filename=\"report-{}.csv\"", report.id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report_csv(&report),
    ))
}

async fn get_trends(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<Vec<TrendPoint>>> {
    let days = query.days.unwrap_or(DEFAULT_TREND_DAYS);
    if !(1..=MAX_TREND_DAYS).contains(&days) {
        return Err(AppError::BadRequest(format!(
            "days must be between 1 and {}",
            MAX_TREND_DAYS
        )));
    }

    let since = format_utc_rfc3339(chrono::Utc::now() - chrono::Duration::days(days));
    let reports = state.db.list_reports_since(&user.user_id, &since).await?;
    Ok(Json(cost_trends(&reports)))
}
