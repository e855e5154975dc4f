// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cost estimate and diff report models.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One priced line of a resource estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CostComponent {
    pub description: String,
    pub unit: String,
    pub rate: f64,
    pub quantity: f64,
    pub monthly_cost: f64,
}

impl CostComponent {
    pub fn new(description: impl Into<String>, unit: &str, rate: f64, quantity: f64) -> Self {
        Self {
            description: description.into(),
            unit: unit.to_string(),
            rate,
            quantity,
            monthly_cost: rate * quantity,
        }
    }
}

/// Estimated cost for a single resource instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CostItem {
    pub address: String,
    pub name: String,
    pub resource_type: String,
    /// Human readable service label used for grouping
    pub service: String,
    pub region: String,
    pub hourly_cost: f64,
    pub monthly_cost: f64,
    pub components: Vec<CostComponent>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    #[cfg_attr(feature = "binding-generation", ts(type = "Record<string, unknown>"))]
    pub metadata: BTreeMap<String, Value>,
}

impl CostItem {
    /// Component descriptions joined for flat exports.
    pub fn details(&self) -> String {
        self.components
            .iter()
            .map(|c| c.description.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A resource that could not be priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ResourceError {
    pub address: String,
    pub resource_type: String,
    pub message: String,
}

/// An attribute filled with a default because the configuration left it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MockedAttribute {
    pub attribute: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "unknown"))]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MockedResource {
    pub address: String,
    pub resource_type: String,
    pub attributes: Vec<MockedAttribute>,
}

/// Which attributes were filled with defaults before pricing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MockingReport {
    pub resources: Vec<MockedResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl MockingReport {
    pub fn total_mocked(&self) -> usize {
        self.resources.iter().map(|r| r.attributes.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CostTotals {
    pub hourly: f64,
    pub daily: f64,
    pub monthly: f64,
    pub yearly: f64,
}

/// Full estimate for a set of resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CostReport {
    pub currency: String,
    pub region: String,
    pub items: Vec<CostItem>,
    pub totals: CostTotals,
    pub summary_by_service: BTreeMap<String, f64>,
    /// Resource types present in the input that have no pricing formula
    pub unsupported: Vec<String>,
    pub errors: Vec<ResourceError>,
    pub mocking: MockingReport,
    pub generated_at: String,
}

/// Cost change of a resource present in both snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CostChange {
    pub address: String,
    pub resource_type: String,
    pub old_monthly_cost: f64,
    pub new_monthly_cost: f64,
    pub diff: f64,
}

/// Comparison of two estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DiffReport {
    pub added: Vec<CostItem>,
    pub removed: Vec<CostItem>,
    pub modified: Vec<CostChange>,
    pub old_monthly_total: f64,
    pub new_monthly_total: f64,
    pub diff: f64,
    pub percent_change: f64,
}
