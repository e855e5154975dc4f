// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! tfcost: AWS cost estimates for Terraform configurations
//!
//! This crate provides the backend API that prices Terraform plans and
//! `.tf` sources, offers direct per-service calculators, and stores saved
//! reports, notifications, and an audit trail.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use middleware::rate_limit::RateLimiter;
use services::{CostEstimator, NotificationHub, PricingService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub pricing: Arc<PricingService>,
    pub estimator: CostEstimator,
    pub notifications: NotificationHub,
    pub api_limiter: RateLimiter,
    pub auth_limiter: RateLimiter,
}

impl AppState {
    /// Wire services from config around an existing database handle.
    pub fn new(config: Config, db: FirestoreDb) -> Self {
        let pricing = Arc::new(PricingService::from_config(&config));
        let estimator = CostEstimator::new(pricing.clone(), config.usage.clone());
        Self {
            api_limiter: RateLimiter::api(&config.rate_limit),
            auth_limiter: RateLimiter::auth(&config.rate_limit),
            config,
            db,
            pricing,
            estimator,
            notifications: NotificationHub::default(),
        }
    }
}
