// # Domain Store Trait
//
// Defines the interface to the local registrar database that the
// reconciliation job brings in line with the registry.
//
// ## Purpose
//
// The store holds, per service domain:
// - Nameserver slots, expiry, lock flag, auth code and sync timestamp
// - The registrant's contact fields
// - Registry metadata (ROID, contact ids per role) and status rows
// - The billing order that renews the domain
//
// ## Implementations
//
// - In-memory: `MemoryDomainStore` (tests, embedding)
// - File-based: `FileDomainStore` (JSON document)
//
// ## Usage
//
// ```rust,ignore
// use epp_core::DomainStore;
//
// for key in store.list_domains().await? {
//     store.update_sync_fields(&key, &update).await?;
// }
// store.flush().await?;
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a local service domain
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DomainKey {
    /// Second-level label
    pub sld: String,
    /// Top-level domain, without the leading dot
    pub tld: String,
}

impl DomainKey {
    /// Create a key
    pub fn new(sld: impl Into<String>, tld: impl Into<String>) -> Self {
        Self {
            sld: sld.into(),
            tld: tld.into().trim_start_matches('.').to_string(),
        }
    }

    /// Split a fully qualified name on its first dot
    pub fn from_fqdn(fqdn: &str) -> Option<Self> {
        let (sld, tld) = fqdn.split_once('.')?;
        if sld.is_empty() || tld.is_empty() {
            return None;
        }
        Some(Self::new(sld, tld))
    }

    /// Fully qualified domain name
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.sld, self.tld)
    }
}

impl std::fmt::Display for DomainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.sld, self.tld)
    }
}

/// Registry-derived fields written onto a service domain by one sync pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSyncUpdate {
    /// Nameserver slots 1-4
    pub nameservers: [Option<String>; 4],
    /// Registry expiration date
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the domain is transfer/delete/update locked
    pub locked: bool,
    /// Registry auth code
    pub transfer_code: Option<String>,
    /// Time of this sync
    pub synced_at: DateTime<Utc>,
}

/// Contact fields of a local client profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalContact {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub email: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub phone_cc: String,
    pub phone: String,
}

/// Registry identity of a domain and its contacts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainMeta {
    /// Registry object id
    pub roid: Option<String>,
    pub registrant: Option<String>,
    pub admin: Option<String>,
    pub tech: Option<String>,
    pub billing: Option<String>,
}

/// Local registrar database
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Cache state in memory (with explicit flush)
///
/// ## Forbidden Capabilities
/// - ❌ Talk to the registry (owned by `EppClient`)
/// - ❌ Decide what to write (owned by `ReconciliationJob`)
///
/// Every write on a domain that does not exist locally is a no-op, so a
/// record deleted mid-pass never resurrects.
#[async_trait]
pub trait DomainStore: Send + Sync {
    /// List all service domains
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<DomainKey>)`: Keys in a stable order
    /// - `Err(Error)`: Storage error
    async fn list_domains(&self) -> Result<Vec<DomainKey>, crate::Error>;

    /// Delete a service domain together with its metadata and status rows
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Deleted (or didn't exist)
    /// - `Err(Error)`: Storage error
    async fn delete_domain(&self, key: &DomainKey) -> Result<(), crate::Error>;

    /// Cancel the billing order for a domain
    ///
    /// Sets the order status to `cancelled`, records `reason` and stamps
    /// the cancellation time.
    async fn cancel_order(
        &self,
        key: &DomainKey,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<(), crate::Error>;

    /// Set the expiry of the billing order for a domain
    async fn set_order_expiry(
        &self,
        key: &DomainKey,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), crate::Error>;

    /// Write registry-derived fields onto a service domain
    async fn update_sync_fields(
        &self,
        key: &DomainKey,
        update: &DomainSyncUpdate,
    ) -> Result<(), crate::Error>;

    /// Registrant contact id recorded locally for a domain
    ///
    /// # Returns
    ///
    /// - `Ok(Some(id))`: A registrant is recorded
    /// - `Ok(None)`: No metadata, or no registrant in it
    async fn registrant_contact_id(
        &self,
        key: &DomainKey,
    ) -> Result<Option<String>, crate::Error>;

    /// Overwrite the contact fields of the client owning a domain
    async fn update_contact_fields(
        &self,
        key: &DomainKey,
        contact: &LocalContact,
    ) -> Result<(), crate::Error>;

    /// Insert or replace the registry metadata of a domain
    async fn upsert_metadata(&self, key: &DomainKey, meta: &DomainMeta)
    -> Result<(), crate::Error>;

    /// Record one status value on a domain (duplicates are ignored)
    async fn record_status(&self, key: &DomainKey, status: &str) -> Result<(), crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
