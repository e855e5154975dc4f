// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pricing lookup and calculator route tests (catalog only).

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use tfcost::models::Role;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_regions_are_public() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/pricing/regions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );
    let regions = common::body_json(response).await;
    let regions = regions.as_array().unwrap();
    assert_eq!(regions.len(), 19);
    assert!(regions
        .iter()
        .any(|r| r["code"] == "eu-west-1" && r["location"] == "EU (Ireland)"));
}

#[tokio::test]
async fn test_price_lookup_then_cache() {
    let (app, state) = common::create_test_app();
    let query = json!({
        "serviceCode": "AmazonEC2",
        "filters": {"instanceType": "t3.micro", "regionCode": "us-east-1"}
    });

    let response = app
        .clone()
        .oneshot(common::json_request("POST", "/api/pricing", None, query.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let point = common::body_json(response).await;
    assert_eq!(point["price"], 0.0104);
    assert_eq!(point["unit"], "Hrs");
    assert_eq!(point["source"], "catalog");
    assert_eq!(state.pricing.cache_len(), 1);

    let response = app
        .oneshot(common::json_request("POST", "/api/pricing", None, query))
        .await
        .unwrap();
    let point = common::body_json(response).await;
    assert_eq!(point["source"], "cache");
}

#[tokio::test]
async fn test_price_lookup_unknown_service() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/pricing",
            None,
            json!({"serviceCode": "AmazonTimeMachine", "filters": {}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_calculators_require_auth() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/pricing/ec2",
            None,
            json!({"instance_type": "t3.micro"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ec2_calculator() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("u1", Role::Viewer, &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/pricing/ec2",
            Some(&token),
            json!({
                "instance_type": "t3.medium",
                "operating_system": "windows",
                "purchase_option": "on-demand",
                "quantity": 3
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let estimate = common::body_json(response).await;
    assert_eq!(estimate["region"], "us-east-1");
    assert_eq!(estimate["hourly_rate"], 0.0541);
    let expected = ((0.0416 * 1.3 * 3.0 * 730.0) * 100.0_f64).round() / 100.0;
    assert_eq!(estimate["monthly_cost"].as_f64().unwrap(), expected);
}

#[tokio::test]
async fn test_s3_calculator_free_transfer_tier() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("u1", Role::User, &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/pricing/s3",
            Some(&token),
            json!({"storage_gb": 100, "data_transfer_gb": 0.5}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let estimate = common::body_json(response).await;
    assert_eq!(estimate["transfer_cost"], 0.0);
    assert_eq!(estimate["storage_cost"], 2.3);
}

#[tokio::test]
async fn test_eks_calculator_defaults() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("u1", Role::User, &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::json_request("POST", "/api/pricing/eks", Some(&token), json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let estimate = common::body_json(response).await;
    assert_eq!(estimate["cluster_cost"], 73.0);
    assert_eq!(estimate["monthly_cost"], 73.0);
}

#[tokio::test]
async fn test_price_lookup_in_other_currency() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/pricing?currency=EUR",
            None,
            json!({"serviceCode": "AmazonEC2", "filters": {"instanceType": "m5.large"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let point = common::body_json(response).await;
    let price = point["price"].as_f64().unwrap();
    assert!((price - 0.096 * 0.85).abs() < 1e-9);
}

#[tokio::test]
async fn test_admin_clears_price_cache() {
    let (app, state) = common::create_test_app();
    state
        .pricing
        .ec2_hourly("t3.micro", "us-east-1")
        .await
        .unwrap();
    assert_eq!(state.pricing.cache_len(), 1);

    let user_token = common::create_test_jwt("u1", Role::User, &state.config.jwt_signing_key);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/admin/pricing/cache")
                .header(header::AUTHORIZATION, format!("Bearer {}", user_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(state.pricing.cache_len(), 1);

    // An admin claim alone is not enough: the role is re-read from storage,
    // which is unreachable offline.
    let admin_token = common::create_test_jwt("root", Role::Admin, &state.config.jwt_signing_key);
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/admin/pricing/cache")
                .header(header::AUTHORIZATION, format!("Bearer {}", admin_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(state.pricing.cache_len(), 1);
}

#[tokio::test]
async fn test_calculator_rejects_unknown_region() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("u1", Role::User, &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/pricing/ec2",
            Some(&token),
            json!({"instance_type": "m5.large", "region": "mars-north-9"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_junk_instance_types_do_not_grow_cache() {
    let (app, state) = common::create_test_app();

    for i in 0..50 {
        let response = app
            .clone()
            .oneshot(common::json_request(
                "POST",
                "/api/pricing",
                None,
                json!({"serviceCode": "AmazonEC2", "filters": {"instanceType": format!("zz{}.huge", i)}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(state.pricing.cache_len(), 1);
}
