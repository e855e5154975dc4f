// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod audit;
pub mod cost;
pub mod notification;
pub mod plan;
pub mod report;
pub mod user;

pub use audit::AuditEntry;
pub use cost::{CostItem, CostReport, DiffReport, MockingReport};
pub use notification::Notification;
pub use plan::{Action, ResourceChange, TfPlan};
pub use report::{Report, ReportKind};
pub use user::{RefreshToken, Role, User, UserProfile};
