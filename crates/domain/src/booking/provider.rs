//! Provider directory trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ProviderId;
use tokio::sync::RwLock;

use crate::order::ProviderSnapshot;

/// Lookup of current provider display fields.
///
/// Profile management lives elsewhere; bookings only read from it.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    /// Returns the provider's current display fields, or `None` if unknown.
    async fn find(&self, provider_id: &ProviderId) -> Option<ProviderSnapshot>;
}

#[async_trait]
impl<T: ProviderDirectory + ?Sized> ProviderDirectory for Arc<T> {
    async fn find(&self, provider_id: &ProviderId) -> Option<ProviderSnapshot> {
        (**self).find(provider_id).await
    }
}

/// In-memory provider directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProviderDirectory {
    providers: Arc<RwLock<HashMap<ProviderId, ProviderSnapshot>>>,
}

impl InMemoryProviderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a provider profile.
    pub async fn upsert(&self, provider_id: impl Into<ProviderId>, profile: ProviderSnapshot) {
        self.providers
            .write()
            .await
            .insert(provider_id.into(), profile);
    }

    pub async fn len(&self) -> usize {
        self.providers.read().await.len()
    }
}

#[async_trait]
impl ProviderDirectory for InMemoryProviderDirectory {
    async fn find(&self, provider_id: &ProviderId) -> Option<ProviderSnapshot> {
        self.providers.read().await.get(provider_id).cloned()
    }
}
