// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (accounts and roles, with one email claim per account)
//! - Refresh tokens (hashed session secrets)
//! - Reports (saved estimates)
//! - Notifications
//! - Audit log entries

use crate::db::collections;
use crate::error::AppError;
use crate::models::audit::AuditFilter;
use crate::models::notification::NotificationFilter;
use crate::models::report::ReportFilter;
use crate::models::{AuditEntry, Notification, RefreshToken, Report, User};
use crate::time_utils::format_utc_rfc3339;
use firestore::errors::FirestoreError;
use firestore::{FirestoreConsistencySelector, FirestoreWritePrecondition};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Marks an email as taken. Creating it fails when the email is registered.
#[derive(Debug, Serialize, Deserialize)]
struct EmailClaim {
    user_id: String,
}

/// Document id for an email claim. Emails may contain `/`, so ids are hashed.
fn email_claim_id(email: &str) -> String {
    hex::encode(Sha256::digest(email.to_lowercase().as_bytes()))
}

/// Commit failures caused by another writer touching the same documents.
fn is_contention(err: &FirestoreError) -> bool {
    match err {
        FirestoreError::DataConflictError(_) => true,
        FirestoreError::DatabaseError(e) => {
            e.retry_possible || e.public.code == "FailedPrecondition"
        }
        _ => false,
    }
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Look up a user by (lowercased) email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_lowercase();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field("email").eq(email.as_str())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// Create a new user and claim their email in one transaction.
    ///
    /// Fails with `Conflict` when the email is already claimed, including by a
    /// registration that commits concurrently.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let client = self.get_client()?;
        let claim = EmailClaim {
            user_id: user.id.clone(),
        };
        let claim_id = email_claim_id(&user.email);

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::USER_EMAILS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&claim_id)
            .object(&claim)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add email claim: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user: {}", e)))?;

        match transaction.commit().await {
            Ok(_) => Ok(()),
            Err(e) if is_contention(&e) => {
                tracing::info!(user_id = %user.id, error = %e, "Email already claimed");
                Err(AppError::Conflict("Email already registered".to_string()))
            }
            Err(e) => Err(AppError::Database(format!("Failed to commit new user: {}", e))),
        }
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List users, oldest first.
    pub async fn list_users(&self, limit: u32) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([("created_at", firestore::FirestoreQueryDirection::Ascending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Refresh Token Operations ────────────────────────────────

    pub async fn get_refresh_token(&self, token_id: &str) -> Result<Option<RefreshToken>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REFRESH_TOKENS)
            .obj()
            .one(token_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn set_refresh_token(&self, token: &RefreshToken) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REFRESH_TOKENS)
            .document_id(&token.id)
            .object(token)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Mark a refresh token revoked. Unknown ids are ignored.
    pub async fn revoke_refresh_token(&self, token_id: &str) -> Result<(), AppError> {
        if let Some(mut token) = self.get_refresh_token(token_id).await? {
            if !token.revoked {
                token.revoked = true;
                self.set_refresh_token(&token).await?;
            }
        }
        Ok(())
    }

    /// Revoke a refresh token if `accept` approves it, reading and writing in
    /// one transaction.
    ///
    /// Returns the token when this call revoked it. Two callers presenting
    /// the same token cannot both succeed: the loser sees the token revoked,
    /// or has its commit rejected, and gets `None`.
    pub async fn consume_refresh_token<F>(
        &self,
        token_id: &str,
        accept: F,
    ) -> Result<Option<RefreshToken>, AppError>
    where
        F: FnOnce(&RefreshToken) -> bool,
    {
        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Reads through this handle are part of the transaction
        let tx_client = client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );
        let token: Option<RefreshToken> = tx_client
            .fluent()
            .select()
            .by_id_in(collections::REFRESH_TOKENS)
            .obj()
            .one(token_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read token in transaction: {}", e))
            })?;

        let Some(mut token) = token.filter(|t| !t.revoked && accept(t)) else {
            let _ = transaction.rollback().await;
            return Ok(None);
        };

        token.revoked = true;
        client
            .fluent()
            .update()
            .in_col(collections::REFRESH_TOKENS)
            .document_id(&token.id)
            .object(&token)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add revocation: {}", e)))?;

        match transaction.commit().await {
            Ok(_) => Ok(Some(token)),
            Err(e) if is_contention(&e) => {
                tracing::info!(token_id, error = %e, "Refresh token consumed concurrently");
                Ok(None)
            }
            Err(e) => Err(AppError::Database(format!(
                "Failed to commit token rotation: {}",
                e
            ))),
        }
    }

    /// Revoke every live refresh token of a user. Returns how many changed.
    pub async fn revoke_user_refresh_tokens(&self, user_id: &str) -> Result<usize, AppError> {
        let tokens: Vec<RefreshToken> = self
            .documents_for_user(collections::REFRESH_TOKENS, user_id)
            .await?;
        let live: Vec<RefreshToken> = tokens
            .into_iter()
            .filter(|t| !t.revoked)
            .map(|mut t| {
                t.revoked = true;
                t
            })
            .collect();

        let client = self.get_client()?;
        for chunk in live.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for token in chunk {
                client
                    .fluent()
                    .update()
                    .in_col(collections::REFRESH_TOKENS)
                    .document_id(&token.id)
                    .object(token)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!("Failed to add revocation: {}", e))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit token revocation: {}", e))
            })?;
        }

        tracing::info!(user_id, count = live.len(), "Revoked refresh tokens");
        Ok(live.len())
    }

    // ─── Report Operations ───────────────────────────────────────

    pub async fn create_report(&self, report: &Report) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REPORTS)
            .document_id(&report.id)
            .object(report)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a report owned by `user_id`. Reports owned by others are reported as missing.
    pub async fn get_report(&self, user_id: &str, report_id: &str) -> Result<Option<Report>, AppError> {
        let report: Option<Report> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REPORTS)
            .obj()
            .one(report_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(report.filter(|r| r.user_id == user_id))
    }

    /// List a user's reports, newest first.
    pub async fn list_reports(
        &self,
        user_id: &str,
        filter: &ReportFilter,
    ) -> Result<Vec<Report>, AppError> {
        let kind = filter.kind.map(|k| k.as_str());
        let start = filter.start.clone();
        let end = filter.end.clone();

        self.get_client()?
            .fluent()
            .select()
            .from(collections::REPORTS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    kind.and_then(|k| q.field("kind").eq(k)),
                    start
                        .clone()
                        .and_then(|s| q.field("created_at").greater_than_or_equal(s)),
                    end.clone()
                        .and_then(|e| q.field("created_at").less_than_or_equal(e)),
                ])
            })
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(filter.limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All of a user's reports created at or after `since` (RFC3339).
    pub async fn list_reports_since(
        &self,
        user_id: &str,
        since: &str,
    ) -> Result<Vec<Report>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::REPORTS)
            .filter(|q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    q.field("created_at").greater_than_or_equal(since),
                ])
            })
            .order_by([("created_at", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a report. Returns `false` when the user owns no such report.
    pub async fn delete_report(&self, user_id: &str, report_id: &str) -> Result<bool, AppError> {
        if self.get_report(user_id, report_id).await?.is_none() {
            return Ok(false);
        }

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::REPORTS)
            .document_id(report_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    // ─── Notification Operations ─────────────────────────────────

    pub async fn create_notification(&self, notification: &Notification) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::NOTIFICATIONS)
            .document_id(&notification.id)
            .object(notification)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List a user's notifications, newest first.
    pub async fn list_notifications(
        &self,
        user_id: &str,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, AppError> {
        let read = filter.read;
        let kind = filter.kind.clone();

        self.get_client()?
            .fluent()
            .select()
            .from(collections::NOTIFICATIONS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    read.and_then(|r| q.field("read").eq(r)),
                    kind.clone().and_then(|k| q.field("kind").eq(k)),
                ])
            })
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(filter.limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::NOTIFICATIONS)
            .filter(|q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    q.field("read").eq(false),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<usize, AppError> {
        Ok(self.unread_notifications(user_id).await?.len())
    }

    async fn get_notification(
        &self,
        user_id: &str,
        notification_id: &str,
    ) -> Result<Option<Notification>, AppError> {
        let notification: Option<Notification> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::NOTIFICATIONS)
            .obj()
            .one(notification_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(notification.filter(|n| n.user_id == user_id))
    }

    /// Mark one notification read and return it.
    pub async fn mark_notification_read(
        &self,
        user_id: &str,
        notification_id: &str,
    ) -> Result<Option<Notification>, AppError> {
        let Some(mut notification) = self.get_notification(user_id, notification_id).await? else {
            return Ok(None);
        };

        if !notification.read {
            notification.read = true;
            notification.read_at = Some(format_utc_rfc3339(chrono::Utc::now()));
            self.create_notification(&notification).await?;
        }
        Ok(Some(notification))
    }

    /// Mark every unread notification read. Returns how many changed.
    pub async fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize, AppError> {
        let unread = self.unread_notifications(user_id).await?;
        let count = unread.len();
        let read_at = format_utc_rfc3339(chrono::Utc::now());

        stream::iter(unread)
            .map(|mut notification| {
                let read_at = read_at.clone();
                async move {
                    notification.read = true;
                    notification.read_at = Some(read_at);
                    self.create_notification(&notification).await
                }
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(count)
    }

    /// Delete a notification. Returns `false` when the user owns no such notification.
    pub async fn delete_notification(
        &self,
        user_id: &str,
        notification_id: &str,
    ) -> Result<bool, AppError> {
        if self.get_notification(user_id, notification_id).await?.is_none() {
            return Ok(false);
        }

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::NOTIFICATIONS)
            .document_id(notification_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    // ─── Audit Operations ────────────────────────────────────────

    pub async fn create_audit_entry(&self, entry: &AuditEntry) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::AUDIT_LOGS)
            .document_id(&entry.id)
            .object(entry)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List audit entries, newest first.
    pub async fn list_audit_entries(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AppError> {
        let actor_id = filter.actor_id.clone();
        let entity_type = filter.entity_type.clone();

        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::AUDIT_LOGS);

        let query = if actor_id.is_some() || entity_type.is_some() {
            query.filter(move |q| {
                q.for_all([
                    actor_id.clone().and_then(|a| q.field("actor_id").eq(a)),
                    entity_type.clone().and_then(|t| q.field("entity_type").eq(t)),
                ])
            })
        } else {
            query
        };

        query
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(filter.limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    /// Query every document in `collection` whose `user_id` matches.
    async fn documents_for_user<T>(&self, collection: &str, user_id: &str) -> Result<Vec<T>, AppError>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .from(collection)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Account Deletion ─────────────────────────────────────────

    /// Delete a user and everything they own.
    ///
    /// Removes reports, notifications, and refresh tokens, then the email
    /// claim and the user document. Audit entries are kept.
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_user_data(&self, user_id: &str) -> Result<usize, AppError> {
        let mut deleted_count = 0;

        let reports: Vec<Report> = self.documents_for_user(collections::REPORTS, user_id).await?;
        self.batch_delete(&reports, collections::REPORTS, |r: &Report| r.id.clone())
            .await?;
        deleted_count += reports.len();
        tracing::debug!(user_id, count = reports.len(), "Deleted reports");

        let notifications: Vec<Notification> = self
            .documents_for_user(collections::NOTIFICATIONS, user_id)
            .await?;
        self.batch_delete(
            &notifications,
            collections::NOTIFICATIONS,
            |n: &Notification| n.id.clone(),
        )
        .await?;
        deleted_count += notifications.len();
        tracing::debug!(user_id, count = notifications.len(), "Deleted notifications");

        let tokens: Vec<RefreshToken> = self
            .documents_for_user(collections::REFRESH_TOKENS, user_id)
            .await?;
        self.batch_delete(&tokens, collections::REFRESH_TOKENS, |t: &RefreshToken| {
            t.id.clone()
        })
        .await?;
        deleted_count += tokens.len();

        if let Some(user) = self.get_user(user_id).await? {
            self.get_client()?
                .fluent()
                .delete()
                .from(collections::USER_EMAILS)
                .document_id(email_claim_id(&user.email))
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(user_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        deleted_count += 1;

        tracing::info!(user_id, deleted_count, "User data deletion complete");

        Ok(deleted_count)
    }
}
