// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Price lookup and per-service calculator routes.

use crate::error::Result;
use crate::routes::resolve_region;
use crate::services::calculators::{
    self, EksEstimate, EksRequest, Ec2Estimate, Ec2Request, RdsEstimate, RdsRequest, S3Estimate,
    S3Request,
};
use crate::services::pricing::calculator::convert_currency;
use crate::services::pricing::{PricePoint, PriceQuery, REGIONS};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Routes open to anonymous callers.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/pricing/regions", get(list_regions))
        .route("/api/pricing", post(lookup_price))
}

/// Calculator routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/pricing/ec2", post(calculate_ec2))
        .route("/api/pricing/rds", post(calculate_rds))
        .route("/api/pricing/s3", post(calculate_s3))
        .route("/api/pricing/eks", post(calculate_eks))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RegionInfo {
    pub code: String,
    pub location: String,
}

async fn list_regions() -> impl IntoResponse {
    let regions: Vec<RegionInfo> = REGIONS
        .iter()
        .map(|(code, location)| RegionInfo {
            code: code.to_string(),
            location: location.to_string(),
        })
        .collect();
    ([(header::CACHE_CONTROL, "public, max-age=3600")], Json(regions))
}

#[derive(Deserialize)]
pub struct LookupParams {
    /// Report the price in this currency instead of USD
    pub currency: Option<String>,
}

async fn lookup_price(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LookupParams>,
    Json(query): Json<PriceQuery>,
) -> Result<Json<PricePoint>> {
    let mut point = state.pricing.lookup(&query).await?;
    if let Some(currency) = params.currency.as_deref() {
        point.price = convert_currency(point.price, "USD", currency);
    }
    Ok(Json(point))
}

async fn calculate_ec2(
    State(state): State<Arc<AppState>>,
    Json(mut req): Json<Ec2Request>,
) -> Result<Json<Ec2Estimate>> {
    req.region = Some(resolve_region(&state, req.region.as_deref())?);
    let estimate = calculators::ec2(&state.pricing, &req, &state.config.default_region).await?;
    Ok(Json(estimate))
}

async fn calculate_rds(
    State(state): State<Arc<AppState>>,
    Json(mut req): Json<RdsRequest>,
) -> Result<Json<RdsEstimate>> {
    req.region = Some(resolve_region(&state, req.region.as_deref())?);
    let estimate = calculators::rds(&state.pricing, &req, &state.config.default_region).await?;
    Ok(Json(estimate))
}

async fn calculate_s3(
    State(state): State<Arc<AppState>>,
    Json(mut req): Json<S3Request>,
) -> Result<Json<S3Estimate>> {
    req.region = Some(resolve_region(&state, req.region.as_deref())?);
    let estimate = calculators::s3(&state.pricing, &req, &state.config.default_region).await?;
    Ok(Json(estimate))
}

async fn calculate_eks(
    State(state): State<Arc<AppState>>,
    Json(mut req): Json<EksRequest>,
) -> Result<Json<EksEstimate>> {
    req.region = Some(resolve_region(&state, req.region.as_deref())?);
    let estimate = calculators::eks(&state.pricing, &req, &state.config.default_region).await?;
    Ok(Json(estimate))
}
