//! Outbound notifications to farmers and cooperative staff
//!
//! Delivery is fire-and-forget: the ledger logs a failed send and moves on,
//! a committed transaction is never undone because a message was lost.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppResult;

/// Who a notification is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "audience", content = "farmer_id", rename_all = "snake_case")]
pub enum Recipient {
    Farmer(Uuid),
    /// Cooperative staff dashboard
    Staff,
}

impl Recipient {
    pub fn audience(&self) -> &'static str {
        match self {
            Recipient::Farmer(_) => "farmer",
            Recipient::Staff => "staff",
        }
    }

    pub fn farmer_id(&self) -> Option<Uuid> {
        match self {
            Recipient::Farmer(id) => Some(*id),
            Recipient::Staff => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(recipient: Recipient, message: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            recipient,
            message: message.into(),
            created_at,
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> AppResult<()>;
}

/// Stores notifications in the `notifications` table for the UI to poll
#[derive(Clone)]
pub struct PgNotificationSink {
    db: PgPool,
}

impl PgNotificationSink {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationSink for PgNotificationSink {
    async fn deliver(&self, notification: &Notification) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, audience, farmer_id, message, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(notification.recipient.audience())
        .bind(notification.recipient.farmer_id())
        .bind(&notification.message)
        .bind(notification.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

/// Keeps every delivered notification in memory
#[derive(Default)]
pub struct RecordingNotificationSink {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn deliver(&self, notification: &Notification) -> AppResult<()> {
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}
