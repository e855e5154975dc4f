// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Terraform plan model (the subset of `terraform show -json` we consume).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A resource lifecycle action from a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[serde(rename = "no-op")]
    NoOp,
    Create,
    Read,
    Update,
    Delete,
}

/// Top-level Terraform plan document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TfPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terraform_version: Option<String>,
    #[serde(default)]
    pub resource_changes: Vec<ResourceChange>,
}

/// One resource instance and its planned change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceChange {
    /// Full address, e.g. `module.app.aws_instance.web[0]`
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_address: Option<String>,
    /// `managed` or `data`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    /// `count` or `for_each` key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<Value>,
    pub change: Change,
}

/// Before/after state of a planned change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    pub actions: Vec<Action>,
    #[serde(default)]
    pub before: Value,
    #[serde(default)]
    pub after: Value,
}

impl ResourceChange {
    /// Build a resource that is about to be created with the given attributes.
    pub fn planned_create(resource_type: &str, name: &str, index: Option<usize>, after: Value) -> Self {
        let address = match index {
            Some(i) => format!("{}.{}[{}]", resource_type, name, i),
            None => format!("{}.{}", resource_type, name),
        };
        Self {
            address,
            module_address: None,
            mode: Some("managed".to_string()),
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            index: index.map(Value::from),
            change: Change {
                actions: vec![Action::Create],
                before: Value::Null,
                after,
            },
        }
    }

    pub fn has_action(&self, action: Action) -> bool {
        self.change.actions.contains(&action)
    }

    /// Resource is only being destroyed (a replace also creates).
    pub fn is_pure_delete(&self) -> bool {
        self.has_action(Action::Delete) && !self.has_action(Action::Create)
    }

    /// Attributes after the change, if the change produced an object.
    pub fn after_attrs(&self) -> Option<&Map<String, Value>> {
        self.change.after.as_object()
    }

    pub fn after_attrs_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.change.after.as_object_mut()
    }

    /// Raw attribute value after the change.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.after_attrs()
            .and_then(|attrs| attrs.get(key))
            .filter(|v| !v.is_null())
    }

    /// Non-empty string attribute.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attr(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Numeric attribute; numeric strings are accepted since HCL scans keep
    /// some values quoted.
    pub fn attr_f64(&self, key: &str) -> Option<f64> {
        self.attr(key).and_then(value_as_f64)
    }

    pub fn attr_bool(&self, key: &str) -> Option<bool> {
        match self.attr(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// First object of a nested block (`root_block_device`, `scaling_config`, ...).
    pub fn block(&self, key: &str) -> Option<&Map<String, Value>> {
        first_block(self.attr(key)?)
    }

    /// All objects of a repeatable nested block.
    pub fn blocks(&self, key: &str) -> Vec<&Map<String, Value>> {
        match self.attr(key) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
            Some(Value::Object(obj)) => vec![obj],
            _ => Vec::new(),
        }
    }
}

/// Interpret a JSON value as a number.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Nested blocks appear as a one-element array in plans and as an object in
/// some hand-written inputs.
pub fn first_block(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Array(items) => items.first().and_then(Value::as_object),
        Value::Object(obj) => Some(obj),
        _ => None,
    }
}
