//! Notification storage.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::UserId;
use tokio::sync::RwLock;

use crate::error::{NotificationError, Result};
use crate::notification::{Notification, NotificationId};

/// Where notifications are kept.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create(&self, notification: Notification) -> Result<Notification>;

    /// A user's newest `limit` notifications, newest first.
    async fn list_for_user(&self, user_id: &UserId, limit: usize) -> Result<Vec<Notification>>;

    async fn mark_read(&self, id: NotificationId) -> Result<Notification>;

    /// Marks every unread notification of a user read. Returns how many changed.
    async fn mark_all_read(&self, user_id: &UserId) -> Result<usize>;

    async fn delete(&self, id: NotificationId) -> Result<()>;
}

/// In-memory sink for tests and the default binary.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationSink {
    notifications: Arc<RwLock<Vec<Notification>>>,
    fail_on_create: Arc<AtomicBool>,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `create` fail until switched off.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.fail_on_create.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.notifications.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.notifications.read().await.is_empty()
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn create(&self, notification: Notification) -> Result<Notification> {
        if self.fail_on_create.load(Ordering::SeqCst) {
            return Err(NotificationError::Storage(
                "notification store unavailable".to_string(),
            ));
        }
        self.notifications.write().await.push(notification.clone());
        Ok(notification)
    }

    async fn list_for_user(&self, user_id: &UserId, limit: usize) -> Result<Vec<Notification>> {
        // Insertion order is creation order.
        Ok(self
            .notifications
            .read()
            .await
            .iter()
            .rev()
            .filter(|n| &n.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, id: NotificationId) -> Result<Notification> {
        let mut notifications = self.notifications.write().await;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(NotificationError::NotFound(id))?;
        notification.read = true;
        Ok(notification.clone())
    }

    async fn mark_all_read(&self, user_id: &UserId) -> Result<usize> {
        let mut changed = 0;
        for notification in self
            .notifications
            .write()
            .await
            .iter_mut()
            .filter(|n| &n.user_id == user_id && !n.read)
        {
            notification.read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete(&self, id: NotificationId) -> Result<()> {
        let mut notifications = self.notifications.write().await;
        let index = notifications
            .iter()
            .position(|n| n.id == id)
            .ok_or(NotificationError::NotFound(id))?;
        notifications.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationCategory;

    fn note(user: &str, message: &str) -> Notification {
        Notification::new(
            UserId::new(user),
            message,
            NotificationCategory::OrderStatus,
            None,
        )
    }

    #[tokio::test]
    async fn lists_newest_first_with_limit() {
        let sink = InMemoryNotificationSink::new();
        for i in 0..5 {
            sink.create(note("u1", &format!("m{i}"))).await.unwrap();
        }
        sink.create(note("u2", "other")).await.unwrap();

        let listed = sink.list_for_user(&UserId::new("u1"), 3).await.unwrap();
        let messages: Vec<_> = listed.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["m4", "m3", "m2"]);
    }

    #[tokio::test]
    async fn mark_read_and_mark_all() {
        let sink = InMemoryNotificationSink::new();
        let first = sink.create(note("u1", "a")).await.unwrap();
        sink.create(note("u1", "b")).await.unwrap();
        sink.create(note("u1", "c")).await.unwrap();
        sink.create(note("u2", "d")).await.unwrap();

        assert!(sink.mark_read(first.id).await.unwrap().read);
        assert_eq!(sink.mark_all_read(&UserId::new("u1")).await.unwrap(), 2);
        assert_eq!(sink.mark_all_read(&UserId::new("u1")).await.unwrap(), 0);

        let u2 = sink.list_for_user(&UserId::new("u2"), 50).await.unwrap();
        assert!(!u2[0].read);
    }

    #[tokio::test]
    async fn delete_and_missing_ids() {
        let sink = InMemoryNotificationSink::new();
        let n = sink.create(note("u1", "a")).await.unwrap();

        sink.delete(n.id).await.unwrap();
        assert!(sink.is_empty().await);

        assert!(matches!(
            sink.delete(n.id).await,
            Err(NotificationError::NotFound(_))
        ));
        assert!(matches!(
            sink.mark_read(n.id).await,
            Err(NotificationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failing_create_stores_nothing() {
        let sink = InMemoryNotificationSink::new();
        sink.set_fail_on_create(true);

        assert!(sink.create(note("u1", "a")).await.is_err());
        assert_eq!(sink.len().await, 0);

        sink.set_fail_on_create(false);
        sink.create(note("u1", "a")).await.unwrap();
        assert_eq!(sink.len().await, 1);
    }
}
