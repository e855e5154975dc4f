// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Built-in on-demand rates (us-east-1, USD).
//!
//! Used when no remote pricing endpoint is configured or it fails. Other
//! regions are approximated with a flat multiplier.

use super::{region_from_query, PricePoint, PriceQuery, PriceSource};

/// Markup applied to regions outside the US.
pub const NON_US_MULTIPLIER: f64 = 1.1;

pub const DEFAULT_EC2_HOURLY: f64 = 0.10;
pub const DEFAULT_RDS_HOURLY: f64 = 0.068;
pub const DEFAULT_ELASTICACHE_HOURLY: f64 = 0.034;

const EC2_HOURLY: &[(&str, f64)] = &[
    ("t2.micro", 0.0116),
    ("t2.small", 0.023),
    ("t2.medium", 0.0464),
    ("t2.large", 0.0928),
    ("t3.nano", 0.0052),
    ("t3.micro", 0.0104),
    ("t3.small", 0.0208),
    ("t3.medium", 0.0416),
    ("t3.large", 0.0832),
    ("t3.xlarge", 0.1664),
    ("t3.2xlarge", 0.3328),
    ("t3a.micro", 0.0094),
    ("t3a.small", 0.0188),
    ("t3a.medium", 0.0376),
    ("t4g.micro", 0.0084),
    ("t4g.small", 0.0168),
    ("t4g.medium", 0.0336),
    ("m5.large", 0.096),
    ("m5.xlarge", 0.192),
    ("m5.2xlarge", 0.384),
    ("m6i.large", 0.096),
    ("m6i.xlarge", 0.192),
    ("c5.large", 0.085),
    ("c5.xlarge", 0.17),
    ("c7i-flex.large", 0.08479),
    ("r5.large", 0.126),
    ("r5.xlarge", 0.252),
];

const RDS_HOURLY: &[(&str, f64)] = &[
    ("db.t3.micro", 0.017),
    ("db.t3.small", 0.034),
    ("db.t3.medium", 0.068),
    ("db.t3.large", 0.136),
    ("db.t4g.micro", 0.016),
    ("db.t4g.small", 0.032),
    ("db.m5.large", 0.171),
    ("db.r5.large", 0.25),
    ("db.r5.xlarge", 0.50),
];

const ELASTICACHE_HOURLY: &[(&str, f64)] = &[
    ("cache.t3.micro", 0.017),
    ("cache.t3.small", 0.034),
    ("cache.t3.medium", 0.068),
    ("cache.m6g.large", 0.112),
    ("cache.r6g.large", 0.139),
    ("cache.r6g.xlarge", 0.278),
];

/// EBS volume storage per GB-month.
const EBS_GB_MONTH: &[(&str, f64)] = &[
    ("gp2", 0.10),
    ("gp3", 0.08),
    ("io1", 0.125),
    ("io2", 0.125),
    ("st1", 0.045),
    ("sc1", 0.025),
    ("standard", 0.05),
];

/// RDS storage per GB-month.
const RDS_STORAGE_GB_MONTH: &[(&str, f64)] = &[
    ("gp2", 0.115),
    ("gp3", 0.08),
    ("io1", 0.125),
    ("standard", 0.10),
];

const S3_STORAGE_GB_MONTH: &[(&str, f64)] = &[
    ("STANDARD", 0.023),
    ("INTELLIGENT_TIERING", 0.023),
    ("STANDARD_IA", 0.0125),
    ("ONEZONE_IA", 0.01),
    ("GLACIER_IR", 0.004),
    ("GLACIER", 0.0036),
    ("DEEP_ARCHIVE", 0.00099),
];

/// (service code, usage type, price, unit)
const USAGE_RATES: &[(&str, &str, f64, &str)] = &[
    ("AmazonEC2", "NatGateway-Hours", 0.045, "Hrs"),
    ("AmazonEC2", "NatGateway-Bytes", 0.045, "GB"),
    ("AmazonEC2", "ElasticIP:IdleAddress", 0.005, "Hrs"),
    ("AmazonEC2", "EBS:SnapshotUsage", 0.05, "GB-Mo"),
    ("AmazonEC2", "EBS:VolumeP-IOPS.gp3", 0.005, "IOPS-Mo"),
    ("AmazonEC2", "EBS:VolumeP-IOPS.io1", 0.065, "IOPS-Mo"),
    ("AmazonEC2", "EBS:VolumeP-IOPS.io2", 0.065, "IOPS-Mo"),
    ("AmazonEC2", "EBS:VolumeP-Throughput.gp3", 0.04, "MiBps-Mo"),
    ("AmazonEC2", "CW:DetailedMonitoring", 2.10, "Mo"),
    ("AmazonRDS", "RDS:PIOPS", 0.10, "IOPS-Mo"),
    ("AmazonRDS", "RDS:ChargedBackupUsage", 0.095, "GB-Mo"),
    ("AmazonS3", "Requests-Tier1", 0.000005, "Requests"),
    ("AmazonS3", "Requests-Tier2", 0.0000004, "Requests"),
    ("AmazonS3", "DataTransfer-Out-Bytes", 0.09, "GB"),
    ("AWSELB", "LoadBalancerUsage", 0.0225, "Hrs"),
    ("AWSELB", "GatewayLoadBalancerUsage", 0.0125, "Hrs"),
    ("AWSELB", "LCUUsage", 0.008, "LCU-Hrs"),
    ("AmazonEKS", "AmazonEKS-Hours:perCluster", 0.10, "Hrs"),
    ("AmazonEKS", "Fargate-vCPU-Hours:perCPU", 0.04048, "Hrs"),
    ("AmazonEKS", "Fargate-GB-Hours", 0.004445, "Hrs"),
    ("AWSLambda", "Request", 0.0000002, "Requests"),
    ("AWSLambda", "Lambda-GB-Second", 0.0000166667, "Lambda-GB-Second"),
    ("AmazonDynamoDB", "ReadCapacityUnit-Hrs", 0.00013, "ReadCapacityUnit-Hrs"),
    ("AmazonDynamoDB", "WriteCapacityUnit-Hrs", 0.00065, "WriteCapacityUnit-Hrs"),
    ("AmazonCloudWatch", "AlarmMonitorUsage", 0.10, "Alarms"),
    ("AmazonCloudWatch", "HighResAlarmMonitorUsage", 0.30, "Alarms"),
    ("AmazonVPC", "VpcEndpoint-Hours", 0.01, "Hrs"),
    ("awskms", "KMS-Keys", 1.0, "Keys"),
    ("AWSSecretsManager", "AWSSecretsManager-Secrets", 0.40, "Secrets"),
    ("AmazonRoute53", "HostedZone", 0.50, "HostedZone"),
];

fn table_rate(table: &[(&str, f64)], key: &str) -> Option<f64> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, rate)| *rate)
}

/// Multiplier for a region code.
pub fn region_multiplier(region: &str) -> f64 {
    if region.starts_with("us-") {
        1.0
    } else {
        NON_US_MULTIPLIER
    }
}

/// Known EC2 instance types.
pub fn ec2_instance_types() -> impl Iterator<Item = &'static str> {
    EC2_HOURLY.iter().map(|(name, _)| *name)
}

/// Price a query from the built-in tables.
///
/// Recognized filters: `instanceType`, `volumeApiName` (EBS), `volumeType`
/// (RDS storage), `storageClass` (S3), and `usagetype` for everything else.
pub fn lookup(query: &PriceQuery) -> Option<PricePoint> {
    let filter = |key: &str| query.filters.get(key).map(String::as_str);
    let service = query.service_code.as_str();

    let (price, unit) = if let Some(usage) = filter("usagetype") {
        USAGE_RATES
            .iter()
            .find(|(code, usagetype, _, _)| *code == service && *usagetype == usage)
            .map(|(_, _, price, unit)| (*price, *unit))?
    } else {
        match service {
            "AmazonEC2" => {
                if let Some(instance_type) = filter("instanceType") {
                    (
                        table_rate(EC2_HOURLY, instance_type).unwrap_or(DEFAULT_EC2_HOURLY),
                        "Hrs",
                    )
                } else {
                    (table_rate(EBS_GB_MONTH, filter("volumeApiName")?)?, "GB-Mo")
                }
            }
            "AmazonRDS" => {
                if let Some(instance_type) = filter("instanceType") {
                    (
                        table_rate(RDS_HOURLY, instance_type).unwrap_or(DEFAULT_RDS_HOURLY),
                        "Hrs",
                    )
                } else {
                    (table_rate(RDS_STORAGE_GB_MONTH, filter("volumeType")?)?, "GB-Mo")
                }
            }
            "AmazonElastiCache" => (
                table_rate(ELASTICACHE_HOURLY, filter("instanceType")?)
                    .unwrap_or(DEFAULT_ELASTICACHE_HOURLY),
                "Hrs",
            ),
            "AmazonS3" => {
                let class = normalize_storage_class(filter("storageClass").unwrap_or("STANDARD"));
                (table_rate(S3_STORAGE_GB_MONTH, &class)?, "GB-Mo")
            }
            _ => return None,
        }
    };

    let multiplier = match service {
        "AmazonRoute53" => 1.0,
        _ => region_multiplier(region_from_query(query)),
    };

    Some(PricePoint {
        price: price * multiplier,
        unit: unit.to_string(),
        source: PriceSource::Catalog,
    })
}

/// Cache key for a catalog answer.
///
/// Built only from what `lookup` reads: instance types missing from the
/// tables share their family default row and regions collapse to their
/// multiplier. Each distinct key names a distinct catalog price, so the
/// number of keys is bounded by the tables whatever filters callers send.
pub fn cache_key(query: &PriceQuery) -> String {
    let filter = |key: &str| query.filters.get(key).map(String::as_str);
    let service = query.service_code.as_str();

    let region = if service == "AmazonRoute53" {
        "global"
    } else if region_multiplier(region_from_query(query)) == 1.0 {
        "us"
    } else {
        "non-us"
    };

    let row = if let Some(usage) = filter("usagetype") {
        format!("usage={}", usage)
    } else {
        match (service, filter("instanceType")) {
            ("AmazonEC2", Some(t)) => format!("instance={}", row_name(EC2_HOURLY, t)),
            ("AmazonRDS", Some(t)) => format!("instance={}", row_name(RDS_HOURLY, t)),
            ("AmazonElastiCache", Some(t)) => {
                format!("instance={}", row_name(ELASTICACHE_HOURLY, t))
            }
            ("AmazonEC2", None) => format!(
                "volume={}",
                filter("volumeApiName").unwrap_or_default().to_ascii_lowercase()
            ),
            ("AmazonRDS", None) => format!(
                "storage={}",
                filter("volumeType").unwrap_or_default().to_ascii_lowercase()
            ),
            ("AmazonS3", _) => format!(
                "class={}",
                normalize_storage_class(filter("storageClass").unwrap_or("STANDARD"))
            ),
            _ => String::new(),
        }
    };

    format!("catalog|{}|{}|{}", service, region, row)
}

/// Table row an instance type is priced from.
fn row_name(table: &[(&'static str, f64)], key: &str) -> &'static str {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(name, _)| *name)
        .unwrap_or("default")
}

/// `Standard-IA`, `standard_ia`, and `STANDARD IA` all name the same class.
fn normalize_storage_class(class: &str) -> String {
    class
        .trim()
        .to_ascii_uppercase()
        .replace(['-', ' '], "_")
}
