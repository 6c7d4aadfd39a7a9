//! User notifications for order and booking status changes.
//!
//! - [`NotificationSink`] storage trait with an in-memory implementation
//! - [`NotificationDispatcher`], which never lets a sink failure escape
//! - [`StatusChangeNotifier`], a projection that notifies order owners from
//!   the committed event log

pub mod dispatcher;
pub mod error;
pub mod notification;
pub mod notifier;
pub mod sink;

pub use dispatcher::{LIST_LIMIT, NotificationDispatcher};
pub use error::{NotificationError, Result};
pub use notification::{Notification, NotificationCategory, NotificationId, NotificationList};
pub use notifier::{StatusChangeNotifier, booking_decision_message, goods_status_message};
pub use sink::{InMemoryNotificationSink, NotificationSink};
