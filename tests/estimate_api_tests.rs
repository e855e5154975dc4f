// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end estimate tests through the router.
//!
//! Estimates never touch the database, so these run offline.

use axum::http::StatusCode;
use serde_json::json;
use tfcost::models::Role;
use tower::ServiceExt;

mod common;

fn approx(a: &serde_json::Value, b: f64) -> bool {
    (a.as_f64().unwrap() - b).abs() < 1e-6
}

#[tokio::test]
async fn test_plan_estimate() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("u1", Role::User, &state.config.jwt_signing_key);

    let plan = json!({
        "format_version": "1.2",
        "resource_changes": [
            {"address": "aws_instance.web[0]", "type": "aws_instance", "name": "web", "index": 0,
             "mode": "managed", "change": {"actions": ["create"], "before": null,
             "after": {"instance_type": "t3.micro"}}},
            {"address": "aws_instance.web[1]", "type": "aws_instance", "name": "web", "index": 1,
             "mode": "managed", "change": {"actions": ["create"], "before": null,
             "after": {"instance_type": "t3.micro"}}},
            {"address": "aws_eip.ip", "type": "aws_eip", "name": "ip",
             "mode": "managed", "change": {"actions": ["create"], "before": null, "after": {}}},
            {"address": "aws_iam_role.app", "type": "aws_iam_role", "name": "app",
             "mode": "managed", "change": {"actions": ["create"], "before": null, "after": {}}},
            {"address": "aws_instance.old", "type": "aws_instance", "name": "old",
             "mode": "managed", "change": {"actions": ["delete"],
             "before": {"instance_type": "m5.large"}, "after": null}},
            {"address": "aws_s3_bucket.same", "type": "aws_s3_bucket", "name": "same",
             "mode": "managed", "change": {"actions": ["no-op"], "before": {}, "after": {}}}
        ]
    });

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/estimate/plan",
            Some(&token),
            json!({"plan": plan}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = common::body_json(response).await;

    let items = report["items"].as_array().unwrap();
    let addresses: Vec<&str> = items
        .iter()
        .map(|i| i["address"].as_str().unwrap())
        .collect();
    assert_eq!(
        addresses,
        vec!["aws_eip.ip", "aws_instance.web[0]", "aws_instance.web[1]"]
    );

    // t3.micro compute plus the default 8 GB gp2 root volume
    assert!(approx(&items[1]["monthly_cost"], 8.39));
    assert!(approx(&items[0]["monthly_cost"], 3.65));
    assert!(approx(&report["totals"]["monthly"], 20.43));
    assert_eq!(report["unsupported"], json!(["aws_iam_role"]));
    assert_eq!(report["region"], "us-east-1");
    assert_eq!(report["currency"], "USD");
}

#[tokio::test]
async fn test_hcl_estimate_resolves_variables_and_count() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("u1", Role::User, &state.config.jwt_signing_key);

    let main_tf = r#"
variable "web_type" {
  default = "t3.small"
}

resource "aws_instance" "web" {
  count         = 2
  instance_type = var.web_type # sized for staging
}
"#;

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/estimate/hcl",
            Some(&token),
            json!({"files": [main_tf]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = common::body_json(response).await;

    let items = report["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["address"], "aws_instance.web[0]");
    assert_eq!(items[0]["metadata"]["instance_type"], "t3.small");
    // 0.0208 * 730 + 8 GB gp2
    assert!(approx(&items[0]["monthly_cost"], 15.98));
    assert!(report["mocking"]["warning"].is_null());
}

#[tokio::test]
async fn test_hcl_estimate_reports_mocked_attributes() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("u1", Role::User, &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/estimate/hcl",
            Some(&token),
            json!({"files": ["resource \"aws_instance\" \"bare\" {\n  ami = data.aws_ami.ubuntu.id\n}\n"]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = common::body_json(response).await;

    let mocked = report["mocking"]["resources"].as_array().unwrap();
    assert_eq!(mocked.len(), 1);
    assert_eq!(mocked[0]["address"], "aws_instance.bare");
    assert_eq!(mocked[0]["attributes"][0]["attribute"], "instance_type");
    assert_eq!(mocked[0]["attributes"][0]["value"], "t3.micro");
    assert!(report["mocking"]["warning"].is_string());
}

#[tokio::test]
async fn test_region_changes_prices() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("u1", Role::User, &state.config.jwt_signing_key);

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/estimate/hcl",
            Some(&token),
            json!({"files": ["resource \"aws_eip\" \"ip\" {}"], "region": "eu-west-1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = common::body_json(response).await;
    assert_eq!(report["region"], "eu-west-1");
    // Non-US regions carry a markup over us-east-1
    let monthly = report["totals"]["monthly"].as_f64().unwrap();
    assert!(monthly > 3.65 && monthly < 4.1);
}

#[tokio::test]
async fn test_diff_between_sources() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("u1", Role::User, &state.config.jwt_signing_key);

    let old = "resource \"aws_eip\" \"ip\" {}\nresource \"aws_nat_gateway\" \"nat\" {}\n";
    let new = "resource \"aws_eip\" \"ip\" {}\nresource \"aws_instance\" \"web\" {\n  instance_type = \"t3.micro\"\n}\n";

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/estimate/diff",
            Some(&token),
            json!({"old": {"files": [old]}, "new": {"files": [new]}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let diff = common::body_json(response).await;

    assert_eq!(diff["added"].as_array().unwrap().len(), 1);
    assert_eq!(diff["added"][0]["address"], "aws_instance.web");
    assert_eq!(diff["removed"].as_array().unwrap().len(), 1);
    assert_eq!(diff["removed"][0]["address"], "aws_nat_gateway.nat");
    assert!(diff["modified"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_diff_against_previous_report() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("u1", Role::User, &state.config.jwt_signing_key);

    let files = json!({"files": ["resource \"aws_eip\" \"ip\" {}"]});
    let first = app
        .clone()
        .oneshot(common::json_request(
            "POST",
            "/api/estimate/hcl",
            Some(&token),
            files.clone(),
        ))
        .await
        .unwrap();
    let previous = common::body_json(first).await;

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/estimate/diff",
            Some(&token),
            json!({"old": previous, "new": files}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let diff = common::body_json(response).await;
    assert!(approx(&diff["diff"], 0.0));
    assert!(approx(&diff["percent_change"], 0.0));
    assert!(diff["added"].as_array().unwrap().is_empty());
    assert!(diff["removed"].as_array().unwrap().is_empty());
}
