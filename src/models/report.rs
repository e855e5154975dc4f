// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Saved cost reports.

use serde::{Deserialize, Serialize};
use serde_json::Value;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// What produced the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Terraform,
    AwsCalculator,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Terraform => "terraform",
            ReportKind::AwsCalculator => "aws_calculator",
        }
    }
}

/// A saved estimate, stored in the `reports` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Report {
    pub id: String,
    pub user_id: String,
    pub kind: ReportKind,
    pub name: String,
    /// Estimate payload, usually a serialized `CostReport`
    #[cfg_attr(feature = "binding-generation", ts(type = "unknown"))]
    pub data: Value,
    pub total_monthly_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "binding-generation", ts(type = "unknown"))]
    pub metadata: Option<Value>,
    pub created_at: String,
}

/// Listing filters.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub kind: Option<ReportKind>,
    /// RFC3339 lower bound (inclusive)
    pub start: Option<String>,
    /// RFC3339 upper bound (inclusive)
    pub end: Option<String>,
    pub limit: u32,
}

/// Daily aggregate of saved report costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TrendPoint {
    /// UTC day, `YYYY-MM-DD`
    pub date: String,
    pub total_monthly_cost: f64,
    pub count: u32,
}
