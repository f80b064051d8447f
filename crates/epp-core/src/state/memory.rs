// # Memory Domain Store
//
// In-memory implementation of DomainStore.
//
// ## Purpose
//
// Holds the local domain table in a map behind a RwLock. Nothing survives
// a restart. Used by tests and by embedders that keep their own database
// and copy results out after a sync pass.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{BillingOrder, DomainTable, Mutation, StoredDomain};
use crate::Error;
use crate::traits::{DomainKey, DomainMeta, DomainStore, DomainSyncUpdate, LocalContact};

/// In-memory domain store
///
/// Clones share the same table.
///
/// # Example
///
/// ```rust,no_run
/// use epp_core::state::{MemoryDomainStore, StoredDomain};
/// use epp_core::traits::{DomainKey, DomainStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryDomainStore::new();
///     store.insert(StoredDomain::new(DomainKey::new("example", "tld"))).await;
///
///     assert_eq!(store.list_domains().await?.len(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDomainStore {
    inner: Arc<RwLock<DomainTable>>,
}

impl MemoryDomainStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a domain
    pub async fn insert(&self, domain: StoredDomain) {
        self.inner.write().await.insert(domain);
    }

    /// Snapshot of one domain
    pub async fn get(&self, key: &DomainKey) -> Option<StoredDomain> {
        self.inner.read().await.get(key).cloned()
    }

    /// Snapshot of the billing order of a domain (kept after deletion)
    pub async fn order(&self, key: &DomainKey) -> Option<BillingOrder> {
        self.inner.read().await.order(key).cloned()
    }

    /// Number of domains
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn apply(&self, key: &DomainKey, mutation: Mutation<'_>) -> Result<(), Error> {
        self.inner.write().await.apply(key, mutation);
        Ok(())
    }
}

#[async_trait]
impl DomainStore for MemoryDomainStore {
    async fn list_domains(&self) -> Result<Vec<DomainKey>, Error> {
        Ok(self.inner.read().await.keys())
    }

    async fn delete_domain(&self, key: &DomainKey) -> Result<(), Error> {
        self.inner.write().await.remove(key);
        Ok(())
    }

    async fn cancel_order(
        &self,
        key: &DomainKey,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.apply(key, Mutation::CancelOrder { reason, at }).await
    }

    async fn set_order_expiry(
        &self,
        key: &DomainKey,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), Error> {
        self.apply(key, Mutation::SetOrderExpiry(expires_at)).await
    }

    async fn update_sync_fields(
        &self,
        key: &DomainKey,
        update: &DomainSyncUpdate,
    ) -> Result<(), Error> {
        self.apply(key, Mutation::Sync(update)).await
    }

    async fn registrant_contact_id(&self, key: &DomainKey) -> Result<Option<String>, Error> {
        Ok(self.inner.read().await.registrant(key))
    }

    async fn update_contact_fields(
        &self,
        key: &DomainKey,
        contact: &LocalContact,
    ) -> Result<(), Error> {
        self.apply(key, Mutation::Contact(contact)).await
    }

    async fn upsert_metadata(&self, key: &DomainKey, meta: &DomainMeta) -> Result<(), Error> {
        self.apply(key, Mutation::Meta(meta)).await
    }

    async fn record_status(&self, key: &DomainKey, status: &str) -> Result<(), Error> {
        self.apply(key, Mutation::Status(status)).await
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
