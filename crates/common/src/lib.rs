//! Identifier and key types shared by every crate in the workspace.

mod types;

pub use types::{AggregateId, ProviderId, SlotKey, UserId};
