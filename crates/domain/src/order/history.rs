//! Per-order status history.

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

use super::OrderStatus;

/// One recorded status change. Never edited once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    /// Who made the change. `None` for anonymous booking requests.
    pub updated_by: Option<UserId>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Append-only log of an order's status changes, oldest first.
///
/// Only the order aggregate appends, and only while applying an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    entries: Vec<StatusHistoryEntry>,
}

impl AuditLog {
    pub(crate) fn append(&mut self, entry: StatusHistoryEntry) {
        self.entries.push(entry);
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[StatusHistoryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusHistoryEntry> {
        self.entries.iter()
    }

    /// Entries sorted newest first. Storage order is untouched.
    pub fn newest_first(&self) -> Vec<&StatusHistoryEntry> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        entries
    }

    pub fn latest(&self) -> Option<&StatusHistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::order::{BookingStatus, GoodsStatus};

    fn entry(status: OrderStatus, at: DateTime<Utc>) -> StatusHistoryEntry {
        StatusHistoryEntry {
            status,
            updated_by: Some(UserId::new("admin")),
            updated_at: at,
            note: None,
        }
    }

    #[test]
    fn keeps_insertion_order_and_sorts_copies() {
        let now = Utc::now();
        let mut log = AuditLog::default();
        log.append(entry(GoodsStatus::OrderPlaced.into(), now));
        log.append(entry(GoodsStatus::Shipped.into(), now + Duration::seconds(5)));

        let statuses: Vec<_> = log.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                OrderStatus::Goods(GoodsStatus::OrderPlaced),
                OrderStatus::Goods(GoodsStatus::Shipped)
            ]
        );

        let newest: Vec<_> = log.newest_first().into_iter().map(|e| e.status).collect();
        assert_eq!(newest[0], OrderStatus::Goods(GoodsStatus::Shipped));
        assert_eq!(log.entries()[0].status, OrderStatus::Goods(GoodsStatus::OrderPlaced));
        assert_eq!(log.latest().unwrap().status, OrderStatus::Goods(GoodsStatus::Shipped));
    }

    #[test]
    fn serializes_as_array() {
        let mut log = AuditLog::default();
        log.append(StatusHistoryEntry {
            status: BookingStatus::Approved.into(),
            updated_by: None,
            updated_at: Utc::now(),
            note: Some("See you then".to_string()),
        });

        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json[0]["status"], "approved");
        assert_eq!(json[0]["note"], "See you then");
        assert!(json[0]["updatedBy"].is_null());
    }
}
