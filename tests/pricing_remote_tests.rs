// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote pricing endpoint tests against a mock server.

use std::time::Duration;
use tfcost::services::pricing::{PriceQuery, PriceSource, PricingService};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ec2_query() -> PriceQuery {
    PriceQuery::new("AmazonEC2")
        .filter("instanceType", "t3.micro")
        .for_region("us-east-1")
}

#[tokio::test]
async fn test_remote_price_used_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pricing"))
        .and(body_partial_json(serde_json::json!({"serviceCode": "AmazonEC2"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"price": 0.0123, "unit": "Hrs"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pricing = PricingService::new(
        Some(format!("{}/pricing", server.uri())),
        Duration::from_secs(60),
    );

    let first = pricing.lookup(&ec2_query()).await.unwrap();
    assert_eq!(first.price, 0.0123);
    assert_eq!(first.source, PriceSource::Remote);

    // Served from cache; the mock expects exactly one call.
    let second = pricing.lookup(&ec2_query()).await.unwrap();
    assert_eq!(second.price, 0.0123);
    assert_eq!(second.source, PriceSource::Cache);
}

#[tokio::test]
async fn test_remote_failure_falls_back_to_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let pricing = PricingService::new(Some(server.uri()), Duration::from_secs(60));

    let point = pricing.lookup(&ec2_query()).await.unwrap();
    assert_eq!(point.price, 0.0104);
    assert_eq!(point.source, PriceSource::Catalog);
}

#[tokio::test]
async fn test_remote_negative_price_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"price": -1.0})))
        .mount(&server)
        .await;

    let pricing = PricingService::new(Some(server.uri()), Duration::from_secs(60));

    let point = pricing.lookup(&ec2_query()).await.unwrap();
    assert_eq!(point.source, PriceSource::Catalog);
}

#[tokio::test]
async fn test_expired_cache_entry_refetched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"price": 0.5})))
        .expect(2)
        .mount(&server)
        .await;

    let pricing = PricingService::new(Some(server.uri()), Duration::ZERO);

    pricing.lookup(&ec2_query()).await.unwrap();
    let point = pricing.lookup(&ec2_query()).await.unwrap();
    assert_eq!(point.source, PriceSource::Remote);
    assert_eq!(point.unit, "Hrs");
}

#[tokio::test]
async fn test_remote_retried_after_catalog_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let pricing = PricingService::new(Some(server.uri()), Duration::from_secs(60));

    let first = pricing.lookup(&ec2_query()).await.unwrap();
    assert_eq!(first.source, PriceSource::Catalog);

    // The fallback price is cached, but the endpoint is asked again first
    let second = pricing.lookup(&ec2_query()).await.unwrap();
    assert_eq!(second.source, PriceSource::Cache);
    assert_eq!(second.price, 0.0104);
}
