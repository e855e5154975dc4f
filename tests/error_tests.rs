// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use tfcost::error::AppError;

mod common;

#[test]
fn test_status_codes() {
    assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        AppError::Validation("x".to_string()).status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        AppError::PricingApi("down".to_string()).status(),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        AppError::Conflict("dup".to_string()).status(),
        StatusCode::CONFLICT
    );
}

#[tokio::test]
async fn test_client_errors_carry_details() {
    let response = AppError::NotFound("Report abc".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = common::body_json(response).await;
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["details"], "Report abc");
}

#[tokio::test]
async fn test_server_errors_hide_details() {
    let response = AppError::Database("connection refused at 10.0.0.3".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());

    let response = AppError::Internal(anyhow::anyhow!("secret stack")).into_response();
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "internal_error");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_unauthorized_body() {
    let body = common::body_json(AppError::Unauthorized.into_response()).await;
    assert_eq!(body, serde_json::json!({"error": "unauthorized"}));
}

#[tokio::test]
async fn test_rate_limited_sets_retry_after() {
    let response = AppError::RateLimited(42).into_response();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[axum::http::header::RETRY_AFTER], "42");

    let body = common::body_json(response).await;
    assert_eq!(body["error"], "rate_limited");
    assert_eq!(body["details"], "Too many requests, please try again later");
}
