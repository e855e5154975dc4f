// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod audit;
pub mod auth;
pub mod calculators;
pub mod estimator;
pub mod export;
pub mod notifications;
pub mod pricing;
pub mod terraform;

pub use estimator::CostEstimator;
pub use notifications::NotificationHub;
pub use pricing::PricingService;
