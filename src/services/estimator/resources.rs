// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-resource-type cost formulas.
//!
//! Each formula returns monthly cost components. Hourly charges are billed
//! for `hours_per_month`; flat fees are one unit per month.

use crate::config::UsageDefaults;
use crate::error::AppError;
use crate::models::cost::CostComponent;
use crate::models::plan::{value_as_f64, ResourceChange};
use crate::services::pricing::PricingService;
use crate::services::terraform::is_unresolved_reference;
use crate::services::terraform::resolve::LAUNCH_TEMPLATE_INSTANCE_TYPE;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Share of the on-demand rate charged for spot capacity.
const SPOT_FACTOR: f64 = 0.3;
/// Storage attached to each autoscaled instance (GB, gp2).
const ASG_VOLUME_GB: f64 = 8.0;
const DEFAULT_ROOT_VOLUME_GB: f64 = 8.0;
const GP3_BASELINE_IOPS: f64 = 3000.0;
const GP3_BASELINE_THROUGHPUT: f64 = 125.0;
/// Lambda runs are assumed to take this share of the configured timeout.
const LAMBDA_DURATION_SHARE: f64 = 0.1;
const LAMBDA_DEFAULT_TIMEOUT_SECS: f64 = 3.0;

const SUPPORTED_TYPES: &[&str] = &[
    "aws_instance",
    "aws_spot_instance_request",
    "aws_ebs_volume",
    "aws_ebs_snapshot",
    "aws_autoscaling_group",
    "aws_launch_template",
    "aws_launch_configuration",
    "aws_db_instance",
    "aws_s3_bucket",
    "aws_lb",
    "aws_alb",
    "aws_nat_gateway",
    "aws_eip",
    "aws_cloudwatch_metric_alarm",
    "aws_elasticache_cluster",
    "aws_elasticache_replication_group",
    "aws_eks_cluster",
    "aws_eks_node_group",
    "aws_lambda_function",
    "aws_dynamodb_table",
    "aws_vpc_endpoint",
    "aws_kms_key",
    "aws_secretsmanager_secret",
    "aws_route53_zone",
];

pub fn is_supported(resource_type: &str) -> bool {
    SUPPORTED_TYPES.contains(&resource_type)
}

pub fn supported_types() -> &'static [&'static str] {
    SUPPORTED_TYPES
}

/// Inputs shared by every formula of one estimate.
pub struct PricingContext<'a> {
    pub pricing: &'a PricingService,
    pub region: &'a str,
    pub usage: &'a UsageDefaults,
}

impl PricingContext<'_> {
    fn hours(&self) -> f64 {
        self.usage.hours_per_month
    }
}

/// Priced breakdown of one resource.
#[derive(Debug, Clone)]
pub struct PricedResource {
    pub service: &'static str,
    pub components: Vec<CostComponent>,
    pub metadata: BTreeMap<String, Value>,
}

impl PricedResource {
    fn new(service: &'static str) -> Self {
        Self {
            service,
            components: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    fn component(mut self, component: CostComponent) -> Self {
        self.components.push(component);
        self
    }

    fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn monthly_cost(&self) -> f64 {
        self.components.iter().map(|c| c.monthly_cost).sum()
    }
}

/// Price one resource. Callers only pass supported types.
pub async fn price_resource(
    ctx: &PricingContext<'_>,
    rc: &ResourceChange,
) -> Result<PricedResource, AppError> {
    match rc.resource_type.as_str() {
        "aws_instance" => ec2_instance(ctx, rc, 1.0).await,
        "aws_spot_instance_request" => ec2_instance(ctx, rc, SPOT_FACTOR).await,
        "aws_ebs_volume" => ebs_volume(ctx, rc).await,
        "aws_ebs_snapshot" => ebs_snapshot(ctx, rc).await,
        "aws_autoscaling_group" => autoscaling_group(ctx, rc).await,
        "aws_launch_template" | "aws_launch_configuration" => Ok(PricedResource::new("EC2")
            .component(CostComponent::new("No direct cost", "Mo", 0.0, 1.0))),
        "aws_db_instance" => db_instance(ctx, rc).await,
        "aws_s3_bucket" => s3_bucket(ctx, rc).await,
        "aws_lb" | "aws_alb" => load_balancer(ctx, rc).await,
        "aws_nat_gateway" => nat_gateway(ctx).await,
        "aws_eip" => {
            let rate = ctx
                .pricing
                .usage_rate("AmazonEC2", "ElasticIP:IdleAddress", ctx.region)
                .await?;
            Ok(PricedResource::new("VPC").component(CostComponent::new(
                "Elastic IP address",
                "Hrs",
                rate,
                ctx.hours(),
            )))
        }
        "aws_cloudwatch_metric_alarm" => metric_alarm(ctx, rc).await,
        "aws_elasticache_cluster" => elasticache(ctx, rc, "num_cache_nodes").await,
        "aws_elasticache_replication_group" => elasticache(ctx, rc, "num_cache_clusters").await,
        "aws_eks_cluster" => {
            let rate = ctx
                .pricing
                .usage_rate("AmazonEKS", "AmazonEKS-Hours:perCluster", ctx.region)
                .await?;
            Ok(PricedResource::new("EKS").component(CostComponent::new(
                "EKS cluster",
                "Hrs",
                rate,
                ctx.hours(),
            )))
        }
        "aws_eks_node_group" => eks_node_group(ctx, rc).await,
        "aws_lambda_function" => lambda_function(ctx, rc).await,
        "aws_dynamodb_table" => dynamodb_table(ctx, rc).await,
        "aws_vpc_endpoint" => vpc_endpoint(ctx, rc).await,
        "aws_kms_key" => flat_fee(ctx, "KMS", "awskms", "KMS-Keys", "Customer managed key").await,
        "aws_secretsmanager_secret" => {
            flat_fee(
                ctx,
                "Secrets Manager",
                "AWSSecretsManager",
                "AWSSecretsManager-Secrets",
                "Secret",
            )
            .await
        }
        "aws_route53_zone" => {
            flat_fee(ctx, "Route 53", "AmazonRoute53", "HostedZone", "Hosted zone").await
        }
        other => Err(AppError::BadRequest(format!(
            "No pricing formula for {}",
            other
        ))),
    }
}

// ─── Helpers ────────────────────────────────────────────────

/// String attribute that is present and not a reference.
fn concrete_str<'a>(rc: &'a ResourceChange, key: &str) -> Option<&'a str> {
    rc.attr_str(key).filter(|v| !is_unresolved_reference(v))
}

fn block_f64(block: &Map<String, Value>, key: &str) -> Option<f64> {
    block.get(key).and_then(value_as_f64)
}

fn block_str<'a>(block: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    block
        .get(key)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty() && !is_unresolved_reference(v))
}

/// First value that is a positive number. Zero counts as unset.
fn first_positive(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().copied().find(|v| *v > 0.0)
}

/// Storage, provisioned IOPS, and throughput for an EBS volume.
async fn volume_components(
    ctx: &PricingContext<'_>,
    description: &str,
    volume_type: &str,
    size_gb: f64,
    iops: Option<f64>,
    throughput: Option<f64>,
) -> Result<Vec<CostComponent>, AppError> {
    let rate = ctx.pricing.ebs_gb_month(volume_type, ctx.region).await?;
    let mut components = vec![CostComponent::new(
        format!("{} ({})", description, volume_type),
        "GB-Mo",
        rate,
        size_gb,
    )];

    match volume_type {
        "gp3" => {
            let extra_iops = iops.unwrap_or(0.0) - GP3_BASELINE_IOPS;
            if extra_iops > 0.0 {
                let rate = ctx
                    .pricing
                    .usage_rate("AmazonEC2", "EBS:VolumeP-IOPS.gp3", ctx.region)
                    .await?;
                components.push(CostComponent::new(
                    "Provisioned IOPS above baseline",
                    "IOPS-Mo",
                    rate,
                    extra_iops,
                ));
            }
            let extra_throughput = throughput.unwrap_or(0.0) - GP3_BASELINE_THROUGHPUT;
            if extra_throughput > 0.0 {
                let rate = ctx
                    .pricing
                    .usage_rate("AmazonEC2", "EBS:VolumeP-Throughput.gp3", ctx.region)
                    .await?;
                components.push(CostComponent::new(
                    "Provisioned throughput above baseline",
                    "MiBps-Mo",
                    rate,
                    extra_throughput,
                ));
            }
        }
        "io1" | "io2" => {
            if let Some(iops) = iops.filter(|i| *i > 0.0) {
                let usage = format!("EBS:VolumeP-IOPS.{}", volume_type);
                let rate = ctx.pricing.usage_rate("AmazonEC2", &usage, ctx.region).await?;
                components.push(CostComponent::new(
                    "Provisioned IOPS",
                    "IOPS-Mo",
                    rate,
                    iops,
                ));
            }
        }
        _ => {}
    }

    Ok(components)
}

async fn flat_fee(
    ctx: &PricingContext<'_>,
    service: &'static str,
    service_code: &str,
    usage_type: &str,
    description: &str,
) -> Result<PricedResource, AppError> {
    let rate = ctx
        .pricing
        .usage_rate(service_code, usage_type, ctx.region)
        .await?;
    Ok(PricedResource::new(service).component(CostComponent::new(description, "Mo", rate, 1.0)))
}

// ─── Compute ────────────────────────────────────────────────

async fn ec2_instance(
    ctx: &PricingContext<'_>,
    rc: &ResourceChange,
    rate_factor: f64,
) -> Result<PricedResource, AppError> {
    let instance_type = concrete_str(rc, "instance_type").unwrap_or("t3.micro");
    let hourly = ctx.pricing.ec2_hourly(instance_type, ctx.region).await? * rate_factor;

    let label = if rate_factor < 1.0 {
        format!("Compute ({}, spot)", instance_type)
    } else {
        format!("Compute ({})", instance_type)
    };
    let mut priced = PricedResource::new("EC2")
        .component(CostComponent::new(label, "Hrs", hourly, ctx.hours()))
        .meta("instance_type", instance_type);

    let root = rc.block("root_block_device");
    let root_size = root
        .and_then(|b| block_f64(b, "volume_size"))
        .unwrap_or(DEFAULT_ROOT_VOLUME_GB);
    let root_type = root.and_then(|b| block_str(b, "volume_type")).unwrap_or("gp2");
    let root_iops = root.and_then(|b| block_f64(b, "iops"));
    let root_throughput = root.and_then(|b| block_f64(b, "throughput"));
    priced.components.extend(
        volume_components(
            ctx,
            "Root volume",
            root_type,
            root_size,
            root_iops,
            root_throughput,
        )
        .await?,
    );

    for device in rc.blocks("ebs_block_device") {
        let size = block_f64(device, "volume_size").unwrap_or(DEFAULT_ROOT_VOLUME_GB);
        let volume_type = block_str(device, "volume_type").unwrap_or("gp2");
        let name = block_str(device, "device_name").unwrap_or("attached");
        priced.components.extend(
            volume_components(
                ctx,
                &format!("EBS volume {}", name),
                volume_type,
                size,
                block_f64(device, "iops"),
                block_f64(device, "throughput"),
            )
            .await?,
        );
    }

    if rc.attr_bool("monitoring") == Some(true) {
        let rate = ctx
            .pricing
            .usage_rate("AmazonEC2", "CW:DetailedMonitoring", ctx.region)
            .await?;
        priced = priced.component(CostComponent::new("Detailed monitoring", "Mo", rate, 1.0));
    }

    Ok(priced)
}

async fn ebs_volume(
    ctx: &PricingContext<'_>,
    rc: &ResourceChange,
) -> Result<PricedResource, AppError> {
    let volume_type = concrete_str(rc, "type").unwrap_or("gp3");
    let size = rc.attr_f64("size").unwrap_or(20.0);
    let components = volume_components(
        ctx,
        "Storage",
        volume_type,
        size,
        rc.attr_f64("iops"),
        rc.attr_f64("throughput"),
    )
    .await?;

    let mut priced = PricedResource::new("EBS")
        .meta("volume_type", volume_type)
        .meta("size_gb", size);
    priced.components = components;
    Ok(priced)
}

async fn ebs_snapshot(
    ctx: &PricingContext<'_>,
    rc: &ResourceChange,
) -> Result<PricedResource, AppError> {
    let size = rc.attr_f64("volume_size").unwrap_or(DEFAULT_ROOT_VOLUME_GB);
    let rate = ctx
        .pricing
        .usage_rate("AmazonEC2", "EBS:SnapshotUsage", ctx.region)
        .await?;
    Ok(PricedResource::new("EBS")
        .component(CostComponent::new("Snapshot storage", "GB-Mo", rate, size))
        .meta("size_gb", size))
}

async fn autoscaling_group(
    ctx: &PricingContext<'_>,
    rc: &ResourceChange,
) -> Result<PricedResource, AppError> {
    let instances = first_positive(&[rc.attr_f64("desired_capacity"), rc.attr_f64("min_size")])
        .unwrap_or(1.0);
    let instance_type = concrete_str(rc, LAUNCH_TEMPLATE_INSTANCE_TYPE).unwrap_or("t3.micro");

    let hourly = ctx.pricing.ec2_hourly(instance_type, ctx.region).await?;
    let storage_rate = ctx.pricing.ebs_gb_month("gp2", ctx.region).await?;

    Ok(PricedResource::new("EC2")
        .component(CostComponent::new(
            format!("Compute ({} x {})", instances, instance_type),
            "Hrs",
            hourly,
            instances * ctx.hours(),
        ))
        .component(CostComponent::new(
            "Instance storage (gp2)",
            "GB-Mo",
            storage_rate,
            instances * ASG_VOLUME_GB,
        ))
        .meta("instance_type", instance_type)
        .meta("instances", instances))
}

async fn eks_node_group(
    ctx: &PricingContext<'_>,
    rc: &ResourceChange,
) -> Result<PricedResource, AppError> {
    let scaling = rc.block("scaling_config");
    let nodes = first_positive(&[
        scaling.and_then(|s| block_f64(s, "desired_size")),
        scaling.and_then(|s| block_f64(s, "min_size")),
    ])
    .unwrap_or(1.0);
    let instance_type = rc
        .attr("instance_types")
        .and_then(Value::as_array)
        .and_then(|types| types.first())
        .and_then(Value::as_str)
        .filter(|t| !is_unresolved_reference(t))
        .unwrap_or("t3.medium");
    let disk_size = rc.attr_f64("disk_size").unwrap_or(20.0);

    let hourly = ctx.pricing.ec2_hourly(instance_type, ctx.region).await?;
    let storage_rate = ctx.pricing.ebs_gb_month("gp2", ctx.region).await?;

    Ok(PricedResource::new("EKS")
        .component(CostComponent::new(
            format!("Nodes ({} x {})", nodes, instance_type),
            "Hrs",
            hourly,
            nodes * ctx.hours(),
        ))
        .component(CostComponent::new(
            "Node storage (gp2)",
            "GB-Mo",
            storage_rate,
            nodes * disk_size,
        ))
        .meta("instance_type", instance_type)
        .meta("nodes", nodes))
}

async fn lambda_function(
    ctx: &PricingContext<'_>,
    rc: &ResourceChange,
) -> Result<PricedResource, AppError> {
    let memory_mb = rc.attr_f64("memory_size").unwrap_or(128.0);
    let timeout = rc.attr_f64("timeout").unwrap_or(LAMBDA_DEFAULT_TIMEOUT_SECS);
    let requests = ctx.usage.lambda_monthly_requests;
    let gb_seconds = requests * timeout * LAMBDA_DURATION_SHARE * (memory_mb / 1024.0);

    let request_rate = ctx
        .pricing
        .usage_rate("AWSLambda", "Request", ctx.region)
        .await?;
    let duration_rate = ctx
        .pricing
        .usage_rate("AWSLambda", "Lambda-GB-Second", ctx.region)
        .await?;

    Ok(PricedResource::new("Lambda")
        .component(CostComponent::new(
            "Requests",
            "Requests",
            request_rate,
            requests,
        ))
        .component(CostComponent::new(
            "Duration",
            "GB-Seconds",
            duration_rate,
            gb_seconds,
        ))
        .meta("memory_mb", memory_mb))
}

// ─── Databases ──────────────────────────────────────────────

async fn db_instance(
    ctx: &PricingContext<'_>,
    rc: &ResourceChange,
) -> Result<PricedResource, AppError> {
    let instance_class = concrete_str(rc, "instance_class").unwrap_or("db.t3.micro");
    let engine = concrete_str(rc, "engine").unwrap_or("mysql");
    let multi_az = rc.attr_bool("multi_az").unwrap_or(false);
    let storage_gb = rc.attr_f64("allocated_storage").unwrap_or(20.0);
    let storage_type = concrete_str(rc, "storage_type").unwrap_or("gp2");

    let hourly = ctx
        .pricing
        .rds_hourly(instance_class, engine, ctx.region)
        .await?;
    let instances = if multi_az { 2.0 } else { 1.0 };
    let storage_rate = ctx
        .pricing
        .rds_storage_gb_month(storage_type, ctx.region)
        .await?;

    let mut priced = PricedResource::new("RDS")
        .component(CostComponent::new(
            format!(
                "Database instance ({}, {})",
                instance_class,
                if multi_az { "Multi-AZ" } else { "Single-AZ" }
            ),
            "Hrs",
            hourly,
            instances * ctx.hours(),
        ))
        .component(CostComponent::new(
            format!("Storage ({})", storage_type),
            "GB-Mo",
            storage_rate,
            storage_gb,
        ))
        .meta("instance_class", instance_class)
        .meta("engine", engine)
        .meta("multi_az", multi_az);

    if storage_type == "io1" {
        if let Some(iops) = rc.attr_f64("iops").filter(|i| *i > 0.0) {
            let rate = ctx
                .pricing
                .usage_rate("AmazonRDS", "RDS:PIOPS", ctx.region)
                .await?;
            priced = priced.component(CostComponent::new(
                "Provisioned IOPS",
                "IOPS-Mo",
                rate,
                iops,
            ));
        }
    }

    Ok(priced)
}

async fn elasticache(
    ctx: &PricingContext<'_>,
    rc: &ResourceChange,
    node_count_attr: &str,
) -> Result<PricedResource, AppError> {
    let node_type = concrete_str(rc, "node_type").unwrap_or("cache.t3.micro");
    let nodes = first_positive(&[rc.attr_f64(node_count_attr)]).unwrap_or(1.0);
    let hourly = ctx.pricing.elasticache_hourly(node_type, ctx.region).await?;

    Ok(PricedResource::new("ElastiCache")
        .component(CostComponent::new(
            format!("Cache nodes ({} x {})", nodes, node_type),
            "Hrs",
            hourly,
            nodes * ctx.hours(),
        ))
        .meta("node_type", node_type)
        .meta("nodes", nodes))
}

async fn dynamodb_table(
    ctx: &PricingContext<'_>,
    rc: &ResourceChange,
) -> Result<PricedResource, AppError> {
    let billing_mode = concrete_str(rc, "billing_mode").unwrap_or("PAY_PER_REQUEST");
    let priced = PricedResource::new("DynamoDB").meta("billing_mode", billing_mode);

    if billing_mode != "PROVISIONED" {
        return Ok(priced.component(CostComponent::new(
            "On-demand requests (usage based)",
            "Requests",
            0.0,
            0.0,
        )));
    }

    let read_units = rc.attr_f64("read_capacity").unwrap_or(0.0);
    let write_units = rc.attr_f64("write_capacity").unwrap_or(0.0);
    let read_rate = ctx
        .pricing
        .usage_rate("AmazonDynamoDB", "ReadCapacityUnit-Hrs", ctx.region)
        .await?;
    let write_rate = ctx
        .pricing
        .usage_rate("AmazonDynamoDB", "WriteCapacityUnit-Hrs", ctx.region)
        .await?;

    Ok(priced
        .component(CostComponent::new(
            "Read capacity",
            "RCU-Hrs",
            read_rate,
            read_units * ctx.hours(),
        ))
        .component(CostComponent::new(
            "Write capacity",
            "WCU-Hrs",
            write_rate,
            write_units * ctx.hours(),
        )))
}

// ─── Storage ────────────────────────────────────────────────

async fn s3_bucket(
    ctx: &PricingContext<'_>,
    rc: &ResourceChange,
) -> Result<PricedResource, AppError> {
    let storage_class = concrete_str(rc, "storage_class").unwrap_or("STANDARD");
    let gb = ctx.usage.s3_storage_gb;
    let rate = ctx.pricing.s3_gb_month(storage_class, ctx.region).await?;
    let bucket = concrete_str(rc, "bucket").unwrap_or(&rc.name);

    Ok(PricedResource::new("S3")
        .component(CostComponent::new(
            format!("{} storage (estimated {} GB)", storage_class, gb),
            "GB-Mo",
            rate,
            gb,
        ))
        .meta("bucket", bucket))
}

// ─── Networking ─────────────────────────────────────────────

async fn load_balancer(
    ctx: &PricingContext<'_>,
    rc: &ResourceChange,
) -> Result<PricedResource, AppError> {
    let lb_type = concrete_str(rc, "load_balancer_type").unwrap_or("application");
    let usage = if lb_type == "gateway" {
        "GatewayLoadBalancerUsage"
    } else {
        "LoadBalancerUsage"
    };
    let hourly = ctx.pricing.usage_rate("AWSELB", usage, ctx.region).await?;
    let lcu_rate = ctx
        .pricing
        .usage_rate("AWSELB", "LCUUsage", ctx.region)
        .await?;

    Ok(PricedResource::new("ELB")
        .component(CostComponent::new(
            format!("Load balancer ({})", lb_type),
            "Hrs",
            hourly,
            ctx.hours(),
        ))
        .component(CostComponent::new(
            "Capacity units (baseline)",
            "LCU-Hrs",
            lcu_rate,
            0.0,
        ))
        .meta("type", lb_type))
}

async fn nat_gateway(ctx: &PricingContext<'_>) -> Result<PricedResource, AppError> {
    let hourly = ctx
        .pricing
        .usage_rate("AmazonEC2", "NatGateway-Hours", ctx.region)
        .await?;
    let data_rate = ctx
        .pricing
        .usage_rate("AmazonEC2", "NatGateway-Bytes", ctx.region)
        .await?;

    Ok(PricedResource::new("VPC")
        .component(CostComponent::new(
            "NAT gateway",
            "Hrs",
            hourly,
            ctx.hours(),
        ))
        .component(CostComponent::new(
            "Data processed (baseline)",
            "GB",
            data_rate,
            0.0,
        )))
}

async fn vpc_endpoint(
    ctx: &PricingContext<'_>,
    rc: &ResourceChange,
) -> Result<PricedResource, AppError> {
    let endpoint_type = concrete_str(rc, "vpc_endpoint_type").unwrap_or("Gateway");
    let priced = PricedResource::new("VPC").meta("endpoint_type", endpoint_type);

    if !endpoint_type.eq_ignore_ascii_case("interface") {
        return Ok(priced.component(CostComponent::new(
            "Gateway endpoint",
            "Hrs",
            0.0,
            ctx.hours(),
        )));
    }

    let subnets = rc
        .attr("subnet_ids")
        .and_then(Value::as_array)
        .map(|ids| ids.len())
        .unwrap_or(0)
        .max(1) as f64;
    let hourly = ctx
        .pricing
        .usage_rate("AmazonVPC", "VpcEndpoint-Hours", ctx.region)
        .await?;

    Ok(priced.component(CostComponent::new(
        format!("Interface endpoint ({} subnets)", subnets),
        "Hrs",
        hourly,
        subnets * ctx.hours(),
    )))
}

// ─── Monitoring ─────────────────────────────────────────────

async fn metric_alarm(
    ctx: &PricingContext<'_>,
    rc: &ResourceChange,
) -> Result<PricedResource, AppError> {
    let high_resolution = rc.attr_f64("period").is_some_and(|p| p < 60.0);
    let (usage, label) = if high_resolution {
        ("HighResAlarmMonitorUsage", "High resolution alarm")
    } else {
        ("AlarmMonitorUsage", "Standard alarm")
    };
    let rate = ctx
        .pricing
        .usage_rate("AmazonCloudWatch", usage, ctx.region)
        .await?;
    Ok(PricedResource::new("CloudWatch").component(CostComponent::new(label, "Mo", rate, 1.0)))
}
