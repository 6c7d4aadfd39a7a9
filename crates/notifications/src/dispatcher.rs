//! Best-effort notification delivery.

use std::sync::Arc;

use common::{AggregateId, UserId};

use crate::error::Result;
use crate::notification::{Notification, NotificationCategory, NotificationId, NotificationList};
use crate::sink::NotificationSink;

/// How many notifications a listing returns.
pub const LIST_LIMIT: usize = 50;

/// Front door to the notification sink.
///
/// [`notify`](Self::notify) never fails: a sink error is logged and counted,
/// and the caller carries on.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationDispatcher {
    pub fn new(sink: impl NotificationSink + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    #[tracing::instrument(skip(self, user_id, message), fields(user_id = %user_id))]
    pub async fn notify(
        &self,
        user_id: &UserId,
        message: impl Into<String>,
        category: NotificationCategory,
        order_id: Option<AggregateId>,
    ) -> Option<Notification> {
        let notification = Notification::new(user_id.clone(), message, category, order_id);
        match self.sink.create(notification).await {
            Ok(created) => {
                tracing::debug!(notification_id = %created.id, "notification created");
                Some(created)
            }
            Err(e) => {
                metrics::counter!("notifications_failed_total").increment(1);
                tracing::warn!(error = %e, "failed to create notification");
                None
            }
        }
    }

    /// The user's newest notifications with their unread count.
    pub async fn list(&self, user_id: &UserId) -> Result<NotificationList> {
        Ok(self.sink.list_for_user(user_id, LIST_LIMIT).await?.into())
    }

    pub async fn mark_read(&self, id: NotificationId) -> Result<Notification> {
        self.sink.mark_read(id).await
    }

    pub async fn mark_all_read(&self, user_id: &UserId) -> Result<usize> {
        self.sink.mark_all_read(user_id).await
    }

    pub async fn delete(&self, id: NotificationId) -> Result<()> {
        self.sink.delete(id).await
    }
}
