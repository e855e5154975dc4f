// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cost estimation for Terraform resources.

pub mod defaults;
pub mod resources;

use crate::config::UsageDefaults;
use crate::models::cost::{
    CostChange, CostItem, CostReport, CostTotals, DiffReport, ResourceError,
};
use crate::models::plan::ResourceChange;
use crate::services::pricing::calculator::{round_hourly, round_money, round_price};
use crate::services::pricing::PricingService;
use crate::time_utils::format_utc_rfc3339;
use futures_util::{stream, StreamExt};
use resources::{is_supported, price_resource, PricingContext};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Concurrent price lookups per estimate.
const MAX_CONCURRENT_LOOKUPS: usize = 16;
/// Cost changes at or below this are reported as unchanged.
const DIFF_THRESHOLD: f64 = 0.01;
const HOURS_PER_DAY: f64 = 24.0;
const HOURS_PER_YEAR: f64 = 8760.0;

/// Turns resource changes into cost reports.
pub struct CostEstimator {
    pricing: Arc<PricingService>,
    usage: UsageDefaults,
}

impl CostEstimator {
    pub fn new(pricing: Arc<PricingService>, usage: UsageDefaults) -> Self {
        Self { pricing, usage }
    }

    pub fn pricing(&self) -> &PricingService {
        &self.pricing
    }

    /// Estimate monthly cost for the given resources in `region`.
    ///
    /// A resource that fails to price is listed in `errors`; it never fails
    /// the whole report.
    pub async fn estimate(&self, resources: Vec<ResourceChange>, region: &str) -> CostReport {
        let mut resources: Vec<ResourceChange> = resources
            .into_iter()
            .filter(|r| !r.is_pure_delete())
            .collect();

        let mocking = defaults::mock_resources(&mut resources);

        let (supported, unsupported): (Vec<ResourceChange>, Vec<ResourceChange>) = resources
            .into_iter()
            .partition(|r| is_supported(&r.resource_type));

        let unsupported: Vec<String> = unsupported
            .iter()
            .map(|r| r.resource_type.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let ctx = PricingContext {
            pricing: &self.pricing,
            region,
            usage: &self.usage,
        };

        // Owned items keep the future `Send` for any borrow lifetime.
        let results = stream::iter(supported)
            .map(|rc: ResourceChange| {
                let ctx = &ctx;
                async move {
                    let result = price_resource(ctx, &rc).await;
                    (rc, result)
                }
            })
            .buffer_unordered(MAX_CONCURRENT_LOOKUPS)
            .collect::<Vec<_>>()
            .await;

        let hours = self.usage.hours_per_month;
        let mut items = Vec::new();
        let mut errors = Vec::new();

        for (rc, result) in results {
            match result {
                Ok(priced) => {
                    let monthly = priced.monthly_cost();
                    let hourly = if hours > 0.0 { monthly / hours } else { 0.0 };
                    items.push(CostItem {
                        address: rc.address.clone(),
                        name: rc.name.clone(),
                        resource_type: rc.resource_type.clone(),
                        service: priced.service.to_string(),
                        region: region.to_string(),
                        hourly_cost: hourly,
                        monthly_cost: monthly,
                        components: priced.components,
                        metadata: priced.metadata,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        address = %rc.address,
                        error = %e,
                        "Failed to price resource"
                    );
                    errors.push(ResourceError {
                        address: rc.address.clone(),
                        resource_type: rc.resource_type.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        items.sort_by(|a, b| a.address.cmp(&b.address));
        errors.sort_by(|a, b| a.address.cmp(&b.address));

        let hourly_total: f64 = items.iter().map(|i| i.hourly_cost).sum();
        let mut summary_by_service: BTreeMap<String, f64> = BTreeMap::new();
        for item in &items {
            *summary_by_service.entry(item.service.clone()).or_default() += item.monthly_cost;
        }

        let totals = CostTotals {
            hourly: round_hourly(hourly_total),
            daily: round_money(hourly_total * HOURS_PER_DAY),
            monthly: round_money(hourly_total * hours),
            yearly: round_money(hourly_total * HOURS_PER_YEAR),
        };

        for item in &mut items {
            item.hourly_cost = round_hourly(item.hourly_cost);
            item.monthly_cost = round_money(item.monthly_cost);
            for component in &mut item.components {
                component.monthly_cost = round_money(component.monthly_cost);
            }
        }
        for cost in summary_by_service.values_mut() {
            *cost = round_money(*cost);
        }

        tracing::info!(
            region,
            priced = items.len(),
            errors = errors.len(),
            unsupported = unsupported.len(),
            monthly = totals.monthly,
            "Estimate complete"
        );

        CostReport {
            currency: "USD".to_string(),
            region: region.to_string(),
            items,
            totals,
            summary_by_service,
            unsupported,
            errors,
            mocking,
            generated_at: format_utc_rfc3339(chrono::Utc::now()),
        }
    }

    /// Compare two estimates resource by resource.
    pub fn diff(old: &CostReport, new: &CostReport) -> DiffReport {
        let old_items: HashMap<&str, &CostItem> = old
            .items
            .iter()
            .map(|item| (item.address.as_str(), item))
            .collect();
        let new_items: HashMap<&str, &CostItem> = new
            .items
            .iter()
            .map(|item| (item.address.as_str(), item))
            .collect();

        let added: Vec<CostItem> = new
            .items
            .iter()
            .filter(|item| !old_items.contains_key(item.address.as_str()))
            .cloned()
            .collect();

        let removed: Vec<CostItem> = old
            .items
            .iter()
            .filter(|item| !new_items.contains_key(item.address.as_str()))
            .cloned()
            .collect();

        let modified: Vec<CostChange> = new
            .items
            .iter()
            .filter_map(|item| {
                let before = old_items.get(item.address.as_str())?;
                let diff = item.monthly_cost - before.monthly_cost;
                (diff.abs() > DIFF_THRESHOLD).then(|| CostChange {
                    address: item.address.clone(),
                    resource_type: item.resource_type.clone(),
                    old_monthly_cost: before.monthly_cost,
                    new_monthly_cost: item.monthly_cost,
                    diff: round_money(diff),
                })
            })
            .collect();

        let old_total = old.totals.monthly;
        let new_total = new.totals.monthly;
        let diff = new_total - old_total;

        DiffReport {
            added,
            removed,
            modified,
            old_monthly_total: old_total,
            new_monthly_total: new_total,
            diff: round_money(diff),
            percent_change: round_price(percent_change(old_total, new_total), 2),
        }
    }
}

/// Relative change; a change from zero counts as 100%.
fn percent_change(old_total: f64, new_total: f64) -> f64 {
    if old_total > 0.0 {
        (new_total - old_total) / old_total * 100.0
    } else if new_total > 0.0 {
        100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plan::Action;
    use serde_json::json;

    fn estimator() -> CostEstimator {
        CostEstimator::new(
            Arc::new(PricingService::offline()),
            UsageDefaults::default(),
        )
    }

    fn resource(resource_type: &str, name: &str, after: serde_json::Value) -> ResourceChange {
        ResourceChange::planned_create(resource_type, name, None, after)
    }

    #[tokio::test]
    async fn test_estimate_totals_and_grouping() {
        let resources = vec![
            resource("aws_nat_gateway", "nat", json!({})),
            resource("aws_instance", "web", json!({"instance_type": "t3.micro"})),
            resource("aws_iam_role", "role", json!({})),
            resource("aws_kms_key", "key", json!({})),
        ];

        let report = estimator().estimate(resources, "us-east-1").await;

        let addresses: Vec<&str> = report.items.iter().map(|i| i.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec!["aws_instance.web", "aws_kms_key.key", "aws_nat_gateway.nat"]
        );
        assert_eq!(report.unsupported, vec!["aws_iam_role".to_string()]);
        assert!(report.errors.is_empty());

        let expected_monthly = 0.0104 * 730.0 + 0.8 + 1.0 + 0.045 * 730.0;
        assert!((report.totals.monthly - expected_monthly).abs() < 0.01);
        assert!((report.totals.yearly - report.totals.hourly * 8760.0).abs() < 1.0);
        assert_eq!(report.summary_by_service.len(), 3);
        assert!((report.summary_by_service["VPC"] - 32.85).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_pure_deletes_are_skipped() {
        let mut gone = resource("aws_instance", "old", json!(null));
        gone.change.actions = vec![Action::Delete];
        let mut replaced = resource("aws_eip", "ip", json!({}));
        replaced.change.actions = vec![Action::Delete, Action::Create];

        let report = estimator().estimate(vec![gone, replaced], "us-east-1").await;
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].address, "aws_eip.ip");
        assert!(report.mocking.resources.is_empty());
    }

    #[tokio::test]
    async fn test_pricing_failure_is_recorded_not_fatal() {
        let resources = vec![
            resource("aws_ebs_volume", "bad", json!({"type": "gp9", "size": 10})),
            resource("aws_eip", "ip", json!({})),
        ];
        let report = estimator().estimate(resources, "us-east-1").await;
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].address, "aws_ebs_volume.bad");
    }

    #[tokio::test]
    async fn test_mocking_report_included() {
        let report = estimator()
            .estimate(vec![resource("aws_instance", "bare", json!({}))], "us-east-1")
            .await;
        assert_eq!(report.mocking.total_mocked(), 1);
        assert_eq!(
            report.items[0].metadata.get("instance_type"),
            Some(&json!("t3.micro"))
        );
    }

    #[tokio::test]
    async fn test_empty_estimate() {
        let report = estimator().estimate(Vec::new(), "eu-west-1").await;
        assert!(report.items.is_empty());
        assert_eq!(report.totals, CostTotals::default());
        assert_eq!(report.region, "eu-west-1");
    }

    #[tokio::test]
    async fn test_diff() {
        let est = estimator();
        let old = est
            .estimate(
                vec![
                    resource("aws_instance", "web", json!({"instance_type": "t3.micro"})),
                    resource("aws_eip", "ip", json!({})),
                    resource("aws_kms_key", "key", json!({})),
                ],
                "us-east-1",
            )
            .await;
        let new = est
            .estimate(
                vec![
                    resource("aws_instance", "web", json!({"instance_type": "t3.large"})),
                    resource("aws_kms_key", "key", json!({})),
                    resource("aws_nat_gateway", "nat", json!({})),
                ],
                "us-east-1",
            )
            .await;

        let diff = CostEstimator::diff(&old, &new);
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.added[0].address, "aws_nat_gateway.nat");
        assert_eq!(diff.removed.len(), 1);
        assert_eq!(diff.removed[0].address, "aws_eip.ip");
        assert_eq!(diff.modified.len(), 1);
        assert_eq!(diff.modified[0].address, "aws_instance.web");
        assert!(diff.diff > 0.0);
        assert!(diff.percent_change > 0.0);
    }

    #[test]
    fn test_estimate_future_is_send() {
        // Handlers awaiting an estimate must stay `Send` for axum.
        fn assert_send<T: Send>(_: &T) {}
        let est = estimator();
        let future = est.estimate(vec![resource("aws_eip", "ip", json!({}))], "us-east-1");
        assert_send(&future);
    }

    #[test]
    fn test_percent_change_edges() {
        assert_eq!(percent_change(100.0, 150.0), 50.0);
        assert_eq!(percent_change(0.0, 10.0), 100.0);
        assert_eq!(percent_change(0.0, 0.0), 0.0);
        assert_eq!(percent_change(10.0, 0.0), -100.0);
    }
}
