//! Notification records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NotificationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::try_parse(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    OrderStatus,
    PaymentStatus,
    Prescription,
    Shipping,
}

/// A message for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    #[serde(rename = "type")]
    pub category: NotificationCategory,
    pub order_id: Option<AggregateId>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// A new unread notification.
    pub fn new(
        user_id: UserId,
        message: impl Into<String>,
        category: NotificationCategory,
        order_id: Option<AggregateId>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            message: message.into(),
            category,
            order_id,
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// A page of a user's notifications, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    /// Unread among `notifications`.
    pub unread_count: usize,
}

impl From<Vec<Notification>> for NotificationList {
    fn from(notifications: Vec<Notification>) -> Self {
        let unread_count = notifications.iter().filter(|n| !n.read).count();
        Self {
            notifications,
            unread_count,
        }
    }
}
