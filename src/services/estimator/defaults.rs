// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Defaults for attributes required to price a resource.
//!
//! When a configuration leaves a required attribute out, or it is still an
//! unresolved reference, a default is filled in and recorded so the caller
//! can see which numbers rest on assumptions.

use crate::models::cost::{MockedAttribute, MockedResource, MockingReport};
use crate::models::plan::ResourceChange;
use crate::services::terraform::is_unresolved_reference;
use serde_json::{json, Map, Value};

/// Attributes without which a resource cannot be priced.
const REQUIRED_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("aws_instance", &["instance_type"]),
    ("aws_spot_instance_request", &["instance_type"]),
    ("aws_db_instance", &["instance_class", "engine"]),
    ("aws_ebs_volume", &["size", "type"]),
    ("aws_elasticache_cluster", &["node_type"]),
    ("aws_elasticache_replication_group", &["node_type"]),
    ("aws_launch_template", &["instance_type"]),
    ("aws_lambda_function", &["memory_size"]),
    ("aws_eks_node_group", &["instance_types"]),
    ("aws_dynamodb_table", &["billing_mode"]),
];

pub fn required_attributes(resource_type: &str) -> &'static [&'static str] {
    REQUIRED_ATTRIBUTES
        .iter()
        .find(|(t, _)| *t == resource_type)
        .map(|(_, attrs)| *attrs)
        .unwrap_or(&[])
}

/// Value used when `attribute` is missing.
pub fn default_value(attribute: &str) -> Option<Value> {
    let value = match attribute {
        "instance_type" => json!("t3.micro"),
        "instance_class" => json!("db.t3.micro"),
        "engine" => json!("mysql"),
        "size" => json!(20),
        "type" => json!("gp3"),
        "node_type" => json!("cache.t3.micro"),
        "memory_size" => json!(128),
        "instance_types" => json!(["t3.medium"]),
        "billing_mode" => json!("PAY_PER_REQUEST"),
        _ => return None,
    };
    Some(value)
}

/// Whether a current attribute value is unusable for pricing.
pub fn needs_default(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty() || is_unresolved_reference(s),
        Some(Value::Array(items)) => {
            items.is_empty()
                || items
                    .iter()
                    .any(|v| v.as_str().is_some_and(is_unresolved_reference))
        }
        Some(_) => false,
    }
}

/// Fill required attributes of one resource, returning what was filled.
pub fn apply_defaults(resource: &mut ResourceChange) -> Vec<MockedAttribute> {
    let required = required_attributes(&resource.resource_type);
    if required.is_empty() {
        return Vec::new();
    }

    if !resource.change.after.is_object() {
        resource.change.after = Value::Object(Map::new());
    }
    let address = resource.address.clone();
    let Some(attrs) = resource.after_attrs_mut() else {
        return Vec::new();
    };

    let mut mocked = Vec::new();
    for attribute in required {
        if !needs_default(attrs.get(*attribute)) {
            continue;
        }
        let Some(value) = default_value(attribute) else {
            continue;
        };
        tracing::warn!(
            address = %address,
            attribute,
            previous = ?attrs.get(*attribute),
            default = %value,
            "Filling missing attribute with default"
        );
        attrs.insert(attribute.to_string(), value.clone());
        mocked.push(MockedAttribute {
            attribute: attribute.to_string(),
            value,
        });
    }
    mocked
}

/// Fill defaults across all resources and summarize.
pub fn mock_resources(resources: &mut [ResourceChange]) -> MockingReport {
    let mut report = MockingReport::default();

    for resource in resources.iter_mut() {
        let attributes = apply_defaults(resource);
        if !attributes.is_empty() {
            report.resources.push(MockedResource {
                address: resource.address.clone(),
                resource_type: resource.resource_type.clone(),
                attributes,
            });
        }
    }

    if !report.resources.is_empty() {
        report.warning = Some(format!(
            "{} resources had attributes filled with defaults because values were missing or \
             unresolved. Provide variable defaults for accurate pricing.",
            report.resources.len()
        ));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_unresolved_values_are_filled() {
        let mut resources = vec![
            ResourceChange::planned_create("aws_instance", "a", None, json!({})),
            ResourceChange::planned_create(
                "aws_db_instance",
                "db",
                None,
                json!({"instance_class": "var.db_class", "engine": "postgres"}),
            ),
            ResourceChange::planned_create(
                "aws_instance",
                "ok",
                None,
                json!({"instance_type": "m5.large"}),
            ),
            ResourceChange::planned_create("aws_s3_bucket", "b", None, json!({})),
        ];

        let report = mock_resources(&mut resources);

        assert_eq!(report.resources.len(), 2);
        assert_eq!(report.total_mocked(), 2);
        assert!(report.warning.is_some());
        assert_eq!(resources[0].attr_str("instance_type"), Some("t3.micro"));
        assert_eq!(resources[1].attr_str("instance_class"), Some("db.t3.micro"));
        assert_eq!(resources[1].attr_str("engine"), Some("postgres"));
        assert_eq!(resources[2].attr_str("instance_type"), Some("m5.large"));
    }

    #[test]
    fn test_list_defaults() {
        let mut rc = ResourceChange::planned_create(
            "aws_eks_node_group",
            "ng",
            None,
            json!({"instance_types": ["${var.node_type}"]}),
        );
        let mocked = apply_defaults(&mut rc);
        assert_eq!(mocked.len(), 1);
        assert_eq!(rc.attr("instance_types"), Some(&json!(["t3.medium"])));
    }

    #[test]
    fn test_null_after_gets_object() {
        let mut rc = ResourceChange::planned_create("aws_ebs_volume", "v", None, Value::Null);
        let mocked = apply_defaults(&mut rc);
        assert_eq!(mocked.len(), 2);
        assert_eq!(rc.attr_f64("size"), Some(20.0));
        assert_eq!(rc.attr_str("type"), Some("gp3"));
    }

    #[test]
    fn test_no_warning_when_complete() {
        let mut resources = vec![ResourceChange::planned_create(
            "aws_lambda_function",
            "f",
            None,
            json!({"memory_size": 512}),
        )];
        let report = mock_resources(&mut resources);
        assert!(report.resources.is_empty());
        assert!(report.warning.is_none());
    }
}
