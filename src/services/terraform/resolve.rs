// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reference resolution for scanned resources.

use crate::models::plan::ResourceChange;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Maximum nesting of values and reference chains followed.
const MAX_DEPTH: usize = 10;

/// Attribute added to autoscaling groups whose launch template was found.
pub const LAUNCH_TEMPLATE_INSTANCE_TYPE: &str = "_launch_template_instance_type";

static INTERPOLATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\s*(var|local)\.([\w-]+)\s*\}").expect("valid interpolation pattern")
});

const REFERENCE_PREFIXES: [&str; 5] = ["var.", "data.", "local.", "module.", "aws_"];

/// Whether a value is a Terraform expression we could not evaluate.
pub fn is_unresolved_reference(value: &str) -> bool {
    let value = value.trim();
    let value = value.strip_prefix("${").unwrap_or(value);
    REFERENCE_PREFIXES
        .iter()
        .any(|prefix| value.starts_with(prefix))
}

/// Replace `var.*` and `local.*` references in every resource's attributes
/// with known values. Unknown references are left as they are.
pub fn resolve_references(
    resources: &mut [ResourceChange],
    variables: &Map<String, Value>,
    locals: &Map<String, Value>,
) {
    for resource in resources.iter_mut() {
        let after = std::mem::take(&mut resource.change.after);
        resource.change.after = resolve_value(after, variables, locals, 0);
    }
}

fn resolve_value(
    value: Value,
    variables: &Map<String, Value>,
    locals: &Map<String, Value>,
    depth: usize,
) -> Value {
    if depth >= MAX_DEPTH {
        return value;
    }

    match value {
        Value::String(s) => {
            if let Some(found) = lookup_reference(&s, variables, locals) {
                return resolve_value(found.clone(), variables, locals, depth + 1);
            }
            Value::String(interpolate(&s, variables, locals))
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| resolve_value(v, variables, locals, depth + 1))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, resolve_value(v, variables, locals, depth + 1)))
                .collect(),
        ),
        other => other,
    }
}

/// Look up a whole-value reference (`var.x`, `${local.y}`).
pub fn lookup_reference<'m>(
    expr: &str,
    variables: &'m Map<String, Value>,
    locals: &'m Map<String, Value>,
) -> Option<&'m Value> {
    let expr = expr.trim();
    let expr = expr
        .strip_prefix("${")
        .and_then(|e| e.strip_suffix('}'))
        .unwrap_or(expr)
        .trim();

    if let Some(name) = expr.strip_prefix("var.") {
        is_identifier(name).then(|| variables.get(name)).flatten()
    } else if let Some(name) = expr.strip_prefix("local.") {
        is_identifier(name).then(|| locals.get(name)).flatten()
    } else {
        None
    }
}

/// Substitute scalar `${var.x}` / `${local.y}` inside a larger string.
fn interpolate(s: &str, variables: &Map<String, Value>, locals: &Map<String, Value>) -> String {
    if !s.contains("${") {
        return s.to_string();
    }
    INTERPOLATION_RE
        .replace_all(s, |caps: &regex::Captures<'_>| {
            let source = if &caps[1] == "var" { variables } else { locals };
            match source.get(&caps[2]) {
                Some(Value::String(v)) => v.clone(),
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::Bool(b)) => b.to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Copy each launch template's instance type onto the autoscaling groups
/// that reference it by `aws_launch_template.NAME.id`.
pub fn link_launch_templates(resources: &mut [ResourceChange]) {
    let templates: HashMap<String, String> = resources
        .iter()
        .filter(|r| r.resource_type == "aws_launch_template")
        .filter_map(|r| Some((r.name.clone(), r.attr_str("instance_type")?.to_string())))
        .collect();

    if templates.is_empty() {
        return;
    }

    for group in resources
        .iter_mut()
        .filter(|r| r.resource_type == "aws_autoscaling_group")
    {
        let Some(template_name) = group
            .block("launch_template")
            .and_then(|lt| lt.get("id"))
            .and_then(Value::as_str)
            .and_then(launch_template_name)
        else {
            continue;
        };

        let Some(instance_type) = templates.get(template_name).cloned() else {
            tracing::debug!(
                address = %group.address,
                template = template_name,
                "Launch template not found in configuration"
            );
            continue;
        };

        if let Some(attrs) = group.after_attrs_mut() {
            attrs.insert(
                LAUNCH_TEMPLATE_INSTANCE_TYPE.to_string(),
                Value::String(instance_type),
            );
        }
    }
}

fn launch_template_name(reference: &str) -> Option<&str> {
    let reference = reference.trim();
    let reference = reference
        .strip_prefix("${")
        .and_then(|r| r.strip_suffix('}'))
        .unwrap_or(reference);
    reference
        .strip_prefix("aws_launch_template.")?
        .split('.')
        .next()
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn maps() -> (Map<String, Value>, Map<String, Value>) {
        let variables = json!({"instance_type": "m5.large", "size": 50, "alias": "var.instance_type"});
        let locals = json!({"env": "prod", "type_ref": "var.instance_type", "loop_a": "local.loop_b", "loop_b": "local.loop_a"});
        (
            variables.as_object().cloned().unwrap(),
            locals.as_object().cloned().unwrap(),
        )
    }

    #[test]
    fn test_resolves_bare_and_interpolated_references() {
        let (variables, locals) = maps();
        let mut resources = vec![ResourceChange::planned_create(
            "aws_instance",
            "web",
            None,
            json!({
                "instance_type": "var.instance_type",
                "root_block_device": [{"volume_size": "${var.size}"}],
                "tags": {"Name": "${local.env}-web", "Other": "${var.missing}"},
                "chained": "local.type_ref",
                "unknown": "var.nope",
            }),
        )];

        resolve_references(&mut resources, &variables, &locals);
        let web = &resources[0];

        assert_eq!(web.attr_str("instance_type"), Some("m5.large"));
        assert_eq!(web.attr("root_block_device"), Some(&json!([{"volume_size": 50}])));
        assert_eq!(
            web.attr("tags"),
            Some(&json!({"Name": "prod-web", "Other": "${var.missing}"}))
        );
        assert_eq!(web.attr_str("chained"), Some("m5.large"));
        assert_eq!(web.attr_str("unknown"), Some("var.nope"));
    }

    #[test]
    fn test_reference_cycle_terminates() {
        let (variables, locals) = maps();
        let mut resources = vec![ResourceChange::planned_create(
            "aws_instance",
            "loop",
            None,
            json!({"instance_type": "local.loop_a"}),
        )];
        resolve_references(&mut resources, &variables, &locals);
        let value = resources[0].attr_str("instance_type").unwrap();
        assert!(value == "local.loop_a" || value == "local.loop_b");
    }

    #[test]
    fn test_unresolved_reference_detection() {
        assert!(is_unresolved_reference("var.instance_type"));
        assert!(is_unresolved_reference("${data.aws_ami.ubuntu.id}"));
        assert!(is_unresolved_reference("local.size"));
        assert!(is_unresolved_reference("module.vpc.subnet_id"));
        assert!(is_unresolved_reference("aws_launch_template.lt.id"));
        assert!(!is_unresolved_reference("t3.micro"));
        assert!(!is_unresolved_reference("gp3"));
    }

    #[test]
    fn test_link_launch_templates() {
        let mut resources = vec![
            ResourceChange::planned_create(
                "aws_launch_template",
                "app",
                None,
                json!({"instance_type": "c5.large"}),
            ),
            ResourceChange::planned_create(
                "aws_autoscaling_group",
                "asg",
                None,
                json!({"desired_capacity": 2, "launch_template": [{"id": "aws_launch_template.app.id"}]}),
            ),
            ResourceChange::planned_create(
                "aws_autoscaling_group",
                "orphan",
                None,
                json!({"launch_template": [{"id": "${aws_launch_template.missing.id}"}]}),
            ),
        ];

        link_launch_templates(&mut resources);

        assert_eq!(
            resources[1].attr_str(LAUNCH_TEMPLATE_INSTANCE_TYPE),
            Some("c5.large")
        );
        assert!(resources[2].attr(LAUNCH_TEMPLATE_INSTANCE_TYPE).is_none());
    }
}
