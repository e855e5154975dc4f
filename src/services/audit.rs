// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Audit trail recording.

use crate::db::FirestoreDb;
use crate::models::AuditEntry;
use crate::time_utils::format_utc_rfc3339;
use serde_json::Value;

/// One auditable change.
#[derive(Debug, Clone, Default)]
pub struct AuditEvent {
    pub actor_id: String,
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub ip_address: Option<String>,
}

impl AuditEvent {
    pub fn new(
        actor_id: impl Into<String>,
        action: &'static str,
        entity_type: &'static str,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            action,
            entity_type,
            entity_id: entity_id.into(),
            ..Default::default()
        }
    }

    pub fn values(mut self, old_value: Option<Value>, new_value: Option<Value>) -> Self {
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }

    pub fn ip(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }

    fn into_entry(self) -> AuditEntry {
        AuditEntry {
            id: uuid::Uuid::new_v4().to_string(),
            actor_id: self.actor_id,
            action: self.action.to_string(),
            entity_type: self.entity_type.to_string(),
            entity_id: self.entity_id,
            old_value: self.old_value,
            new_value: self.new_value,
            ip_address: self.ip_address,
            created_at: format_utc_rfc3339(chrono::Utc::now()),
        }
    }
}

/// Record an audit entry. Failures are logged, never returned.
pub async fn record(db: &FirestoreDb, event: AuditEvent) {
    let entry = event.into_entry();
    if let Err(e) = db.create_audit_entry(&entry).await {
        tracing::warn!(
            error = %e,
            action = %entry.action,
            actor_id = %entry.actor_id,
            entity_id = %entry.entity_id,
            "Failed to record audit entry"
        );
    }
}

/// Client address from proxy headers, if any.
pub fn client_ip(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|v| v.trim().to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    #[tokio::test]
    async fn test_record_swallows_database_errors() {
        let db = FirestoreDb::new_mock();
        record(&db, AuditEvent::new("u1", "user.login", "user", "u1")).await;
    }

    #[test]
    fn test_event_into_entry() {
        let entry = AuditEvent::new("admin", "user.role", "user", "u2")
            .values(
                Some(serde_json::json!({"role": "user"})),
                Some(serde_json::json!({"role": "admin"})),
            )
            .ip(Some("10.0.0.1".to_string()))
            .into_entry();

        assert_eq!(entry.action, "user.role");
        assert_eq!(entry.entity_id, "u2");
        assert_eq!(entry.new_value.unwrap()["role"], "admin");
        assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.1"));
        assert!(entry.created_at.ends_with('Z'));
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("5.6.7.8"));
        assert_eq!(client_ip(&headers).as_deref(), Some("1.2.3.4"));

        headers.remove("x-forwarded-for");
        assert_eq!(client_ip(&headers).as_deref(), Some("5.6.7.8"));

        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
