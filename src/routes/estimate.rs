// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Terraform cost estimate routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::cost::{CostReport, DiffReport};
use crate::models::plan::ResourceChange;
use crate::routes::resolve_region;
use crate::services::estimator::CostEstimator;
use crate::services::terraform::{managed_changes, parse_plan, parse_plan_value, resources_from_hcl};
use crate::AppState;
use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/estimate/plan", post(estimate_plan))
        .route("/api/estimate/hcl", post(estimate_hcl))
        .route("/api/estimate/diff", post(estimate_diff))
}

#[derive(Debug, Deserialize)]
pub struct PlanEstimateRequest {
    /// `terraform show -json` output, as an object or as its text
    pub plan: Value,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct HclEstimateRequest {
    /// Contents of the `.tf` files
    #[validate(length(min = 1, max = 200))]
    pub files: Vec<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// One side of a comparison.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DiffInput {
    /// A previously produced estimate
    Report(Box<CostReport>),
    Hcl { files: Vec<String> },
    Plan(Value),
}

#[derive(Debug, Deserialize)]
pub struct DiffRequest {
    pub old: DiffInput,
    pub new: DiffInput,
    #[serde(default)]
    pub region: Option<String>,
}

fn plan_resources(plan: Value) -> Result<Vec<ResourceChange>> {
    let plan = match plan {
        Value::String(text) => parse_plan(&text)?,
        other => parse_plan_value(other)?,
    };
    Ok(managed_changes(&plan))
}

async fn estimate_plan(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<PlanEstimateRequest>,
) -> Result<Json<CostReport>> {
    let region = resolve_region(&state, req.region.as_deref())?;
    let resources = plan_resources(req.plan)?;

    let report = state.estimator.estimate(resources, &region).await;
    tracing::info!(
        user_id = %user.user_id,
        items = report.items.len(),
        monthly = report.totals.monthly,
        "Estimated plan"
    );
    Ok(Json(report))
}

async fn estimate_hcl(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<HclEstimateRequest>,
) -> Result<Json<CostReport>> {
    req.validate()?;
    let region = resolve_region(&state, req.region.as_deref())?;
    let resources = resources_from_hcl(&req.files);

    let report = state.estimator.estimate(resources, &region).await;
    tracing::info!(
        user_id = %user.user_id,
        files = req.files.len(),
        items = report.items.len(),
        monthly = report.totals.monthly,
        "Estimated HCL sources"
    );
    Ok(Json(report))
}

async fn report_for(state: &AppState, input: DiffInput, region: &str) -> Result<CostReport> {
    let resources = match input {
        DiffInput::Report(report) => return Ok(*report),
        DiffInput::Hcl { files } => resources_from_hcl(&files),
        DiffInput::Plan(plan) => plan_resources(plan)?,
    };
    Ok(state.estimator.estimate(resources, region).await)
}

async fn estimate_diff(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<DiffRequest>,
) -> Result<Json<DiffReport>> {
    let region = resolve_region(&state, req.region.as_deref())?;

    let old = report_for(&state, req.old, &region).await?;
    let new = report_for(&state, req.new, &region).await?;
    let diff = CostEstimator::diff(&old, &new);

    tracing::info!(
        user_id = %user.user_id,
        added = diff.added.len(),
        removed = diff.removed.len(),
        modified = diff.modified.len(),
        "Compared estimates"
    );
    Ok(Json(diff))
}
