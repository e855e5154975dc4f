// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Parsing of `terraform show -json` plan output.

use crate::error::AppError;
use crate::models::plan::{Action, ResourceChange, TfPlan};
use serde_json::Value;

/// Why a plan document was rejected.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Not a Terraform plan: {0}")]
    NotAPlan(String),
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Parse a plan document.
///
/// Any JSON object carrying `resource_changes` or `planned_values` is accepted;
/// a plan with no changes yields an empty `resource_changes`.
pub fn parse_plan(json: &str) -> Result<TfPlan, PlanError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| PlanError::InvalidJson(e.to_string()))?;
    parse_plan_value(value)
}

/// Same as [`parse_plan`] for an already-decoded document.
pub fn parse_plan_value(value: Value) -> Result<TfPlan, PlanError> {
    let obj = value
        .as_object()
        .ok_or_else(|| PlanError::NotAPlan("expected a JSON object".to_string()))?;

    if !obj.contains_key("resource_changes") && !obj.contains_key("planned_values") {
        return Err(PlanError::NotAPlan(
            "missing resource_changes and planned_values".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| PlanError::NotAPlan(e.to_string()))
}

/// AWS resources whose cost can change: created, updated, or deleted.
///
/// Each instance of a counted resource is its own entry.
pub fn managed_changes(plan: &TfPlan) -> Vec<ResourceChange> {
    plan.resource_changes
        .iter()
        .filter(|rc| rc.resource_type.starts_with("aws_"))
        .filter(|rc| rc.mode.as_deref() != Some("data"))
        .filter(|rc| {
            rc.has_action(Action::Create)
                || rc.has_action(Action::Update)
                || rc.has_action(Action::Delete)
        })
        .cloned()
        .collect()
}
