// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification creation and live fan-out.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::Notification;
use crate::time_utils::format_utc_rfc3339;
use futures_util::Stream;
use serde_json::Value;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for newly created notifications.
///
/// Every subscriber sees every notification and filters for its own user.
/// A subscriber that falls more than the channel capacity behind skips the
/// missed events.
#[derive(Clone)]
pub struct NotificationHub {
    tx: broadcast::Sender<Notification>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Send to live subscribers. Returns how many received it.
    pub fn publish(&self, notification: Notification) -> usize {
        // No subscribers is not an error.
        self.tx.send(notification).unwrap_or(0)
    }

    /// Stream of notifications for `user_id`.
    pub fn subscribe(&self, user_id: String) -> impl Stream<Item = Notification> + Send + 'static {
        let rx = self.tx.subscribe();

        futures_util::stream::unfold((rx, user_id), |(mut rx, user_id)| async move {
            loop {
                match rx.recv().await {
                    Ok(n) if n.user_id == user_id => return Some((n, (rx, user_id))),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(user_id = %user_id, skipped, "Notification subscriber lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Build an unread notification for `user_id`.
pub fn new_notification(
    user_id: &str,
    kind: &str,
    title: impl Into<String>,
    message: impl Into<String>,
    data: Option<Value>,
) -> Notification {
    Notification {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        kind: kind.to_string(),
        title: title.into(),
        message: message.into(),
        data,
        read: false,
        read_at: None,
        created_at: format_utc_rfc3339(chrono::Utc::now()),
    }
}

/// Store a notification and push it to live subscribers.
pub async fn deliver(
    db: &FirestoreDb,
    hub: &NotificationHub,
    notification: Notification,
) -> Result<Notification, AppError> {
    db.create_notification(&notification).await?;
    let receivers = hub.publish(notification.clone());
    tracing::debug!(
        user_id = %notification.user_id,
        kind = %notification.kind,
        receivers,
        "Notification delivered"
    );
    Ok(notification)
}
