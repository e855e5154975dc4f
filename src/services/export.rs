// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Report export and aggregation.

use crate::models::report::{Report, TrendPoint};
use crate::services::pricing::calculator::round_money;
use serde_json::Value;
use std::collections::BTreeMap;

pub const CSV_HEADER: &str = "Resource Name,Resource Type,Monthly Cost,Hourly Cost,Details";
pub const DEFAULT_TREND_DAYS: i64 = 30;

fn csv_field(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

fn value_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Details column: explicit `details`, else component descriptions joined.
fn item_details(item: &Value) -> String {
    if let Some(details) = item.get("details").and_then(Value::as_str) {
        return details.to_string();
    }
    item.get("components")
        .and_then(Value::as_array)
        .map(|components| {
            components
                .iter()
                .filter_map(|c| c.get("description").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("; ")
        })
        .unwrap_or_default()
}

/// Render a report's `data.items` as CSV. Every field is quoted.
pub fn report_csv(report: &Report) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    let items = report
        .data
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for item in items {
        let name = item
            .get("name")
            .or_else(|| item.get("address"))
            .map(|v| value_text(Some(v)))
            .unwrap_or_default();
        let row = [
            name,
            value_text(item.get("resource_type")),
            value_text(item.get("monthly_cost")),
            value_text(item.get("hourly_cost")),
            item_details(item),
        ];
        let row: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

/// Sum and count reports per UTC day, oldest day first.
///
/// Reports whose timestamp does not parse are skipped.
pub fn cost_trends(reports: &[Report]) -> Vec<TrendPoint> {
    let mut by_day: BTreeMap<String, (f64, u32)> = BTreeMap::new();

    for report in reports {
        let Ok(created) = chrono::DateTime::parse_from_rfc3339(&report.created_at) else {
            tracing::debug!(report_id = %report.id, "Skipping report with bad timestamp");
            continue;
        };
        let day = created
            .with_timezone(&chrono::Utc)
            .format("%Y-%m-%d")
            .to_string();
        let entry = by_day.entry(day).or_default();
        entry.0 += report.total_monthly_cost;
        entry.1 += 1;
    }

    by_day
        .into_iter()
        .map(|(date, (total, count))| TrendPoint {
            date,
            total_monthly_cost: round_money(total),
            count,
        })
        .collect()
}
