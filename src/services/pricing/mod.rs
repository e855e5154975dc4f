// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Price lookup service.
//!
//! Lookups go through an in-memory TTL cache, then the optional remote
//! pricing endpoint, then the built-in catalog. A remote failure only costs
//! a warning; a catalog miss is an error.
//!
//! Remote answers are cached under the full query. Catalog answers are
//! cached under the catalog row they came from, and the cache as a whole
//! holds at most `max_entries` prices.

pub mod calculator;
pub mod catalog;

use crate::config::Config;
use crate::error::AppError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub const DEFAULT_LOCATION: &str = "US East (N. Virginia)";

/// Region codes and their AWS Pricing `location` names.
pub const REGIONS: &[(&str, &str)] = &[
    ("us-east-1", "US East (N. Virginia)"),
    ("us-east-2", "US East (Ohio)"),
    ("us-west-1", "US West (N. California)"),
    ("us-west-2", "US West (Oregon)"),
    ("ca-central-1", "Canada (Central)"),
    ("eu-central-1", "EU (Frankfurt)"),
    ("eu-west-1", "EU (Ireland)"),
    ("eu-west-2", "EU (London)"),
    ("eu-west-3", "EU (Paris)"),
    ("eu-north-1", "EU (Stockholm)"),
    ("eu-south-1", "EU (Milan)"),
    ("ap-south-1", "Asia Pacific (Mumbai)"),
    ("ap-southeast-1", "Asia Pacific (Singapore)"),
    ("ap-southeast-2", "Asia Pacific (Sydney)"),
    ("ap-northeast-1", "Asia Pacific (Tokyo)"),
    ("ap-northeast-2", "Asia Pacific (Seoul)"),
    ("ap-east-1", "Asia Pacific (Hong Kong)"),
    ("sa-east-1", "South America (Sao Paulo)"),
    ("me-south-1", "Middle East (Bahrain)"),
];

/// Pricing `location` for a region code. Unknown codes map to us-east-1.
pub fn region_location(code: &str) -> &'static str {
    REGIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, location)| *location)
        .unwrap_or(DEFAULT_LOCATION)
}

pub fn is_known_region(code: &str) -> bool {
    REGIONS.iter().any(|(c, _)| *c == code)
}

/// Region code named by a query's `regionCode` or `location` filter.
pub(crate) fn region_from_query(query: &PriceQuery) -> &str {
    if let Some(code) = query.filters.get("regionCode") {
        return code;
    }
    query
        .filters
        .get("location")
        .and_then(|location| REGIONS.iter().find(|(_, l)| *l == location.as_str()))
        .map(|(code, _)| *code)
        .unwrap_or("us-east-1")
}

/// A price request in AWS Pricing API terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuery {
    pub service_code: String,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

impl PriceQuery {
    pub fn new(service_code: &str) -> Self {
        Self {
            service_code: service_code.to_string(),
            filters: BTreeMap::new(),
            resource_type: None,
        }
    }

    pub fn filter(mut self, key: &str, value: impl Into<String>) -> Self {
        self.filters.insert(key.to_string(), value.into());
        self
    }

    pub fn for_region(self, region: &str) -> Self {
        self.filter("regionCode", region)
            .filter("location", region_location(region))
    }

    pub fn resource_type(mut self, resource_type: &str) -> Self {
        self.resource_type = Some(resource_type.to_string());
        self
    }

    /// Service code plus sorted filters.
    fn cache_key(&self) -> String {
        let filters = self
            .filters
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}|{}", self.service_code, filters)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Catalog,
    Remote,
    Cache,
}

/// A resolved unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PricePoint {
    pub price: f64,
    pub unit: String,
    pub source: PriceSource,
}

/// Remote endpoint response body.
#[derive(Deserialize)]
struct RemotePrice {
    price: f64,
    #[serde(default)]
    unit: Option<String>,
}

struct CachedPrice {
    price: f64,
    unit: String,
    stored_at: Instant,
}

pub const DEFAULT_MAX_CACHE_ENTRIES: usize = 10_000;

/// Price lookups shared by all requests.
pub struct PricingService {
    http: reqwest::Client,
    remote_url: Option<String>,
    ttl: Duration,
    max_entries: usize,
    cache: DashMap<String, CachedPrice>,
}

impl PricingService {
    pub fn new(remote_url: Option<String>, ttl: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            remote_url,
            ttl,
            max_entries: DEFAULT_MAX_CACHE_ENTRIES,
            cache: DashMap::new(),
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.pricing_api_url.clone(), config.price_cache_ttl)
            .with_max_entries(config.price_cache_max_entries)
    }

    /// Catalog-only service, as used offline and in tests.
    pub fn offline() -> Self {
        Self::new(None, Duration::from_secs(86_400))
    }

    /// Resolve a unit price.
    pub async fn lookup(&self, query: &PriceQuery) -> Result<PricePoint, AppError> {
        let key = query.cache_key();

        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        if let Some(url) = &self.remote_url {
            match self.fetch_remote(url, query).await {
                Ok(point) => {
                    self.store(key, &point);
                    return Ok(point);
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        service_code = %query.service_code,
                        resource_type = query.resource_type.as_deref().unwrap_or("unknown"),
                        "Remote pricing lookup failed, using catalog"
                    );
                }
            }
        }

        let catalog_key = catalog::cache_key(query);
        if let Some(hit) = self.cached(&catalog_key) {
            return Ok(hit);
        }

        let point = catalog::lookup(query).ok_or_else(|| {
            AppError::NotFound(format!(
                "No price for {} with filters {:?}",
                query.service_code, query.filters
            ))
        })?;
        self.store(catalog_key, &point);
        Ok(point)
    }

    fn cached(&self, key: &str) -> Option<PricePoint> {
        let fresh = {
            let entry = self.cache.get(key)?;
            (entry.stored_at.elapsed() < self.ttl).then(|| PricePoint {
                price: entry.price,
                unit: entry.unit.clone(),
                source: PriceSource::Cache,
            })
        };
        if fresh.is_none() {
            self.cache.remove(key);
        }
        fresh
    }

    fn store(&self, key: String, point: &PricePoint) {
        if self.cache.len() >= self.max_entries && !self.cache.contains_key(&key) {
            let ttl = self.ttl;
            self.cache.retain(|_, entry| entry.stored_at.elapsed() < ttl);
            if self.cache.len() >= self.max_entries {
                tracing::warn!(
                    entries = self.cache.len(),
                    "Price cache full, not caching lookup"
                );
                return;
            }
        }

        self.cache.insert(
            key,
            CachedPrice {
                price: point.price,
                unit: point.unit.clone(),
                stored_at: Instant::now(),
            },
        );
    }

    async fn fetch_remote(&self, url: &str, query: &PriceQuery) -> Result<PricePoint, AppError> {
        let response = self
            .http
            .post(url)
            .json(query)
            .send()
            .await
            .map_err(|e| AppError::PricingApi(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::PricingApi(format!(
                "Pricing endpoint returned {}",
                response.status()
            )));
        }

        let body: RemotePrice = response
            .json()
            .await
            .map_err(|e| AppError::PricingApi(format!("Invalid response: {}", e)))?;

        if !body.price.is_finite() || body.price < 0.0 {
            return Err(AppError::PricingApi(format!(
                "Invalid price {}",
                body.price
            )));
        }

        Ok(PricePoint {
            price: body.price,
            unit: body.unit.unwrap_or_else(|| "Hrs".to_string()),
            source: PriceSource::Remote,
        })
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!("Price cache cleared");
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    // ─── Convenience Lookups ─────────────────────────────────────

    /// On-demand Linux hourly rate.
    pub async fn ec2_hourly(&self, instance_type: &str, region: &str) -> Result<f64, AppError> {
        let query = PriceQuery::new("AmazonEC2")
            .filter("instanceType", instance_type)
            .filter("operatingSystem", "Linux")
            .filter("tenancy", "Shared")
            .filter("preInstalledSw", "NA")
            .filter("capacitystatus", "Used")
            .for_region(region)
            .resource_type("aws_instance");
        Ok(self.lookup(&query).await?.price)
    }

    pub async fn rds_hourly(
        &self,
        instance_class: &str,
        engine: &str,
        region: &str,
    ) -> Result<f64, AppError> {
        let query = PriceQuery::new("AmazonRDS")
            .filter("instanceType", instance_class)
            .filter("databaseEngine", engine)
            .filter("deploymentOption", "Single-AZ")
            .for_region(region)
            .resource_type("aws_db_instance");
        Ok(self.lookup(&query).await?.price)
    }

    pub async fn ebs_gb_month(&self, volume_type: &str, region: &str) -> Result<f64, AppError> {
        let query = PriceQuery::new("AmazonEC2")
            .filter("volumeApiName", volume_type)
            .for_region(region)
            .resource_type("aws_ebs_volume");
        Ok(self.lookup(&query).await?.price)
    }

    pub async fn rds_storage_gb_month(
        &self,
        storage_type: &str,
        region: &str,
    ) -> Result<f64, AppError> {
        let query = PriceQuery::new("AmazonRDS")
            .filter("volumeType", storage_type)
            .for_region(region)
            .resource_type("aws_db_instance");
        Ok(self.lookup(&query).await?.price)
    }

    pub async fn elasticache_hourly(&self, node_type: &str, region: &str) -> Result<f64, AppError> {
        let query = PriceQuery::new("AmazonElastiCache")
            .filter("instanceType", node_type)
            .for_region(region)
            .resource_type("aws_elasticache_cluster");
        Ok(self.lookup(&query).await?.price)
    }

    pub async fn s3_gb_month(&self, storage_class: &str, region: &str) -> Result<f64, AppError> {
        let query = PriceQuery::new("AmazonS3")
            .filter("storageClass", storage_class)
            .for_region(region)
            .resource_type("aws_s3_bucket");
        Ok(self.lookup(&query).await?.price)
    }

    /// Rate for a usage type of a service (`NatGateway-Hours`, `Request`, ...).
    pub async fn usage_rate(
        &self,
        service_code: &str,
        usage_type: &str,
        region: &str,
    ) -> Result<f64, AppError> {
        let query = PriceQuery::new(service_code)
            .filter("usagetype", usage_type)
            .for_region(region);
        Ok(self.lookup(&query).await?.price)
    }
}
