// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Direct cost calculators for individual AWS services.
//!
//! Unlike the estimator these take explicit usage parameters instead of a
//! Terraform configuration.

use crate::error::AppError;
use crate::services::pricing::calculator::{
    apply_discount, apply_markup, monthly_cost, round_hourly, round_money, tiered_cost, PriceTier,
};
use crate::services::pricing::PricingService;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Licensing surcharge over the Linux rate (percent).
const WINDOWS_MARKUP_PCT: f64 = 30.0;
const RESERVED_DISCOUNT_PCT: f64 = 40.0;
const SPOT_DISCOUNT_PCT: f64 = 50.0;
/// Free outbound transfer per month (GB).
const FREE_TRANSFER_GB: f64 = 1.0;
/// EKS node storage per GB-month.
const NODE_STORAGE_GB_MONTH: f64 = 0.10;

fn default_hours() -> f64 {
    730.0
}

fn default_one() -> u32 {
    1
}

fn default_rds_storage_gb() -> f64 {
    20.0
}

fn default_node_storage_gb() -> f64 {
    20.0
}

fn default_storage_type() -> String {
    "gp2".to_string()
}

fn default_storage_class() -> String {
    "STANDARD".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    #[default]
    Linux,
    Windows,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "kebab-case")]
pub enum PurchaseOption {
    #[default]
    OnDemand,
    Reserved,
    Spot,
}

impl PurchaseOption {
    fn discount_pct(self) -> f64 {
        match self {
            PurchaseOption::OnDemand => 0.0,
            PurchaseOption::Reserved => RESERVED_DISCOUNT_PCT,
            PurchaseOption::Spot => SPOT_DISCOUNT_PCT,
        }
    }
}

// ─── EC2 ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Ec2Request {
    #[validate(length(min = 1, max = 64))]
    pub instance_type: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub operating_system: OperatingSystem,
    #[serde(default)]
    pub purchase_option: PurchaseOption,
    #[serde(default = "default_one")]
    #[validate(range(min = 1, max = 10000))]
    pub quantity: u32,
    #[serde(default = "default_hours")]
    #[validate(range(min = 0.0, max = 744.0))]
    pub hours_per_month: f64,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Ec2Estimate {
    pub instance_type: String,
    pub region: String,
    pub operating_system: OperatingSystem,
    pub purchase_option: PurchaseOption,
    pub quantity: u32,
    /// Per-instance hourly rate after adjustments
    pub hourly_rate: f64,
    pub monthly_cost: f64,
    pub yearly_cost: f64,
}

pub async fn ec2(
    pricing: &PricingService,
    req: &Ec2Request,
    default_region: &str,
) -> Result<Ec2Estimate, AppError> {
    req.validate()?;
    let region = req.region.as_deref().unwrap_or(default_region);

    let mut rate = pricing.ec2_hourly(&req.instance_type, region).await?;
    if req.operating_system == OperatingSystem::Windows {
        rate = apply_markup(rate, WINDOWS_MARKUP_PCT)?;
    }
    rate = apply_discount(rate, req.purchase_option.discount_pct())?;

    let monthly = monthly_cost(rate, f64::from(req.quantity), req.hours_per_month);

    Ok(Ec2Estimate {
        instance_type: req.instance_type.clone(),
        region: region.to_string(),
        operating_system: req.operating_system,
        purchase_option: req.purchase_option,
        quantity: req.quantity,
        hourly_rate: round_hourly(rate),
        monthly_cost: round_money(monthly),
        yearly_cost: round_money(monthly * 12.0),
    })
}

// ─── RDS ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RdsRequest {
    #[validate(length(min = 1, max = 32))]
    pub engine: String,
    #[validate(length(min = 1, max = 64))]
    pub instance_class: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default = "default_storage_type")]
    pub storage_type: String,
    #[serde(default = "default_rds_storage_gb")]
    #[validate(range(min = 20.0, max = 65536.0))]
    pub storage_gb: f64,
    #[serde(default)]
    pub multi_az: bool,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub backup_storage_gb: f64,
    #[serde(default = "default_hours")]
    #[validate(range(min = 0.0, max = 744.0))]
    pub hours_per_month: f64,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RdsEstimate {
    pub engine: String,
    pub instance_class: String,
    pub region: String,
    pub multi_az: bool,
    pub hourly_rate: f64,
    pub instance_cost: f64,
    pub storage_cost: f64,
    pub backup_cost: f64,
    pub monthly_cost: f64,
}

pub async fn rds(
    pricing: &PricingService,
    req: &RdsRequest,
    default_region: &str,
) -> Result<RdsEstimate, AppError> {
    req.validate()?;
    let region = req.region.as_deref().unwrap_or(default_region);
    let deployments = if req.multi_az { 2.0 } else { 1.0 };

    let rate = pricing
        .rds_hourly(&req.instance_class, &req.engine, region)
        .await?;
    let storage_rate = pricing.rds_storage_gb_month(&req.storage_type, region).await?;
    let backup_rate = pricing
        .usage_rate("AmazonRDS", "RDS:ChargedBackupUsage", region)
        .await?;

    let instance_cost = rate * req.hours_per_month * deployments;
    let storage_cost = storage_rate * req.storage_gb;
    let backup_cost = backup_rate * req.backup_storage_gb;

    Ok(RdsEstimate {
        engine: req.engine.clone(),
        instance_class: req.instance_class.clone(),
        region: region.to_string(),
        multi_az: req.multi_az,
        hourly_rate: round_hourly(rate * deployments),
        instance_cost: round_money(instance_cost),
        storage_cost: round_money(storage_cost),
        backup_cost: round_money(backup_cost),
        monthly_cost: round_money(instance_cost + storage_cost + backup_cost),
    })
}

// ─── S3 ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct S3Request {
    #[serde(default = "default_storage_class")]
    #[validate(length(min = 1, max = 32))]
    pub storage_class: String,
    #[serde(default)]
    pub region: Option<String>,
    #[validate(range(min = 0.0))]
    pub storage_gb: f64,
    #[serde(default)]
    pub put_requests: u64,
    #[serde(default)]
    pub get_requests: u64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub data_transfer_gb: f64,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct S3Estimate {
    pub storage_class: String,
    pub region: String,
    pub storage_cost: f64,
    pub request_cost: f64,
    pub transfer_cost: f64,
    pub monthly_cost: f64,
}

pub async fn s3(
    pricing: &PricingService,
    req: &S3Request,
    default_region: &str,
) -> Result<S3Estimate, AppError> {
    req.validate()?;
    let region = req.region.as_deref().unwrap_or(default_region);

    let storage_rate = pricing.s3_gb_month(&req.storage_class, region).await?;
    let put_rate = pricing
        .usage_rate("AmazonS3", "Requests-Tier1", region)
        .await?;
    let get_rate = pricing
        .usage_rate("AmazonS3", "Requests-Tier2", region)
        .await?;
    let transfer_rate = pricing
        .usage_rate("AmazonS3", "DataTransfer-Out-Bytes", region)
        .await?;

    let storage_cost = storage_rate * req.storage_gb;
    let request_cost = put_rate * req.put_requests as f64 + get_rate * req.get_requests as f64;
    let transfer_cost = tiered_cost(
        req.data_transfer_gb,
        &[
            PriceTier {
                limit: FREE_TRANSFER_GB,
                price_per_unit: 0.0,
            },
            PriceTier {
                limit: f64::INFINITY,
                price_per_unit: transfer_rate,
            },
        ],
    );

    Ok(S3Estimate {
        storage_class: req.storage_class.clone(),
        region: region.to_string(),
        storage_cost: round_money(storage_cost),
        request_cost: round_money(request_cost),
        transfer_cost: round_money(transfer_cost),
        monthly_cost: round_money(storage_cost + request_cost + transfer_cost),
    })
}

// ─── EKS ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NodeGroupSpec {
    #[validate(length(min = 1, max = 64))]
    pub instance_type: String,
    #[validate(range(min = 1, max = 1000))]
    pub count: u32,
    #[serde(default = "default_node_storage_gb")]
    #[validate(range(min = 0.0))]
    pub storage_gb: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EksRequest {
    #[serde(default = "default_one")]
    #[validate(range(max = 100))]
    pub clusters: u32,
    #[serde(default)]
    #[validate(nested)]
    pub node_groups: Vec<NodeGroupSpec>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub fargate_vcpu: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub fargate_memory_gb: f64,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default = "default_hours")]
    #[validate(range(min = 0.0, max = 744.0))]
    pub hours_per_month: f64,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NodeGroupCost {
    pub instance_type: String,
    pub count: u32,
    pub compute_cost: f64,
    pub storage_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EksEstimate {
    pub region: String,
    pub cluster_cost: f64,
    pub node_groups: Vec<NodeGroupCost>,
    pub fargate_cost: f64,
    pub monthly_cost: f64,
}

pub async fn eks(
    pricing: &PricingService,
    req: &EksRequest,
    default_region: &str,
) -> Result<EksEstimate, AppError> {
    req.validate()?;
    let region = req.region.as_deref().unwrap_or(default_region);
    let hours = req.hours_per_month;

    let cluster_rate = pricing
        .usage_rate("AmazonEKS", "AmazonEKS-Hours:perCluster", region)
        .await?;
    let cluster_cost = cluster_rate * f64::from(req.clusters) * hours;

    let mut node_groups = Vec::with_capacity(req.node_groups.len());
    let mut node_total = 0.0;
    for group in &req.node_groups {
        let rate = pricing.ec2_hourly(&group.instance_type, region).await?;
        let count = f64::from(group.count);
        let compute_cost = rate * count * hours;
        let storage_cost = group.storage_gb * NODE_STORAGE_GB_MONTH * count;
        node_total += compute_cost + storage_cost;
        node_groups.push(NodeGroupCost {
            instance_type: group.instance_type.clone(),
            count: group.count,
            compute_cost: round_money(compute_cost),
            storage_cost: round_money(storage_cost),
        });
    }

    let vcpu_rate = pricing
        .usage_rate("AmazonEKS", "Fargate-vCPU-Hours:perCPU", region)
        .await?;
    let memory_rate = pricing
        .usage_rate("AmazonEKS", "Fargate-GB-Hours", region)
        .await?;
    let fargate_cost =
        (req.fargate_vcpu * vcpu_rate + req.fargate_memory_gb * memory_rate) * hours;

    Ok(EksEstimate {
        region: region.to_string(),
        cluster_cost: round_money(cluster_cost),
        node_groups,
        fargate_cost: round_money(fargate_cost),
        monthly_cost: round_money(cluster_cost + node_total + fargate_cost),
    })
}
