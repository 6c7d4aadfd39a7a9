//! User directory: display names for order listings.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

/// Read-only lookup of user profiles owned by the account service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find(&self, user_id: &UserId) -> Option<UserProfile>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, UserProfile>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(
        &self,
        user_id: impl Into<UserId>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) {
        self.users.write().await.insert(
            user_id.into(),
            UserProfile {
                name: name.into(),
                email: email.into(),
            },
        );
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find(&self, user_id: &UserId) -> Option<UserProfile> {
        self.users.read().await.get(user_id).cloned()
    }
}
