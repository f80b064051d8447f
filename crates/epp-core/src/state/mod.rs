// # Domain Store Implementations
//
// This module provides implementations of the DomainStore trait for
// different persistence strategies. Both share the same table model:
// service domains, and the billing orders attached to them. Orders are
// kept apart from domains so a cancelled order outlives its domain.

pub mod file;
pub mod memory;

pub use file::FileDomainStore;
pub use memory::MemoryDomainStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::traits::{DomainKey, DomainMeta, DomainSyncUpdate, LocalContact};

/// Order status written when a domain disappears at the registry
pub const ORDER_CANCELLED: &str = "cancelled";

/// Billing order attached to a service domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingOrder {
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
}

impl BillingOrder {
    /// An active order with no expiry yet
    pub fn active() -> Self {
        Self {
            status: "active".to_string(),
            expires_at: None,
            canceled_at: None,
            cancel_reason: None,
        }
    }
}

/// Everything stored locally about one service domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDomain {
    pub key: DomainKey,
    #[serde(default)]
    pub nameservers: [Option<String>; 4],
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub transfer_code: Option<String>,
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
    /// Contact fields of the owning client
    #[serde(default)]
    pub contact: LocalContact,
    #[serde(default)]
    pub meta: Option<DomainMeta>,
    #[serde(default)]
    pub statuses: BTreeSet<String>,
}

impl StoredDomain {
    /// A fresh domain with nothing synced yet
    pub fn new(key: DomainKey) -> Self {
        Self {
            key,
            nameservers: Default::default(),
            expires_at: None,
            locked: false,
            transfer_code: None,
            synced_at: None,
            contact: LocalContact::default(),
            meta: None,
            statuses: BTreeSet::new(),
        }
    }

    fn apply_sync(&mut self, update: &DomainSyncUpdate) {
        self.nameservers = update.nameservers.clone();
        self.expires_at = update.expires_at;
        self.locked = update.locked;
        self.transfer_code = update.transfer_code.clone();
        self.synced_at = Some(update.synced_at);
    }
}

/// Domains and orders keyed by fully qualified name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct DomainTable {
    #[serde(default)]
    domains: BTreeMap<String, StoredDomain>,
    #[serde(default)]
    orders: BTreeMap<String, BillingOrder>,
}

impl DomainTable {
    fn keys(&self) -> Vec<DomainKey> {
        self.domains.values().map(|d| d.key.clone()).collect()
    }

    fn get(&self, key: &DomainKey) -> Option<&StoredDomain> {
        self.domains.get(&key.fqdn())
    }

    /// Add or replace a domain; a new domain gets an active order
    fn insert(&mut self, domain: StoredDomain) {
        let fqdn = domain.key.fqdn();
        self.orders
            .entry(fqdn.clone())
            .or_insert_with(BillingOrder::active);
        self.domains.insert(fqdn, domain);
    }

    fn order(&self, key: &DomainKey) -> Option<&BillingOrder> {
        self.orders.get(&key.fqdn())
    }

    fn remove(&mut self, key: &DomainKey) -> bool {
        self.domains.remove(&key.fqdn()).is_some()
    }

    /// Run `f` on an existing order; returns false when it is unknown
    fn modify_order(&mut self, key: &DomainKey, f: impl FnOnce(&mut BillingOrder)) -> bool {
        match self.orders.get_mut(&key.fqdn()) {
            Some(order) => {
                f(order);
                true
            }
            None => {
                tracing::debug!("Ignoring order write for unknown domain {}", key);
                false
            }
        }
    }

    /// Run `f` on an existing domain; returns false when it is unknown
    fn modify(&mut self, key: &DomainKey, f: impl FnOnce(&mut StoredDomain)) -> bool {
        match self.domains.get_mut(&key.fqdn()) {
            Some(domain) => {
                f(domain);
                true
            }
            None => {
                tracing::debug!("Ignoring write for unknown domain {}", key);
                false
            }
        }
    }

    fn len(&self) -> usize {
        self.domains.len()
    }
}

/// Mutations shared by every store implementation
enum Mutation<'a> {
    CancelOrder { reason: &'a str, at: DateTime<Utc> },
    SetOrderExpiry(Option<DateTime<Utc>>),
    Sync(&'a DomainSyncUpdate),
    Contact(&'a LocalContact),
    Meta(&'a DomainMeta),
    Status(&'a str),
}

impl DomainTable {
    fn apply(&mut self, key: &DomainKey, mutation: Mutation<'_>) -> bool {
        match mutation {
            Mutation::CancelOrder { reason, at } => self.modify_order(key, |order| {
                order.status = ORDER_CANCELLED.to_string();
                order.cancel_reason = Some(reason.to_string());
                order.canceled_at = Some(at);
            }),
            Mutation::SetOrderExpiry(expires_at) => {
                self.modify_order(key, |order| order.expires_at = expires_at)
            }
            Mutation::Sync(update) => self.modify(key, |domain| domain.apply_sync(update)),
            Mutation::Contact(contact) => {
                self.modify(key, |domain| domain.contact = contact.clone())
            }
            Mutation::Meta(meta) => self.modify(key, |domain| domain.meta = Some(meta.clone())),
            Mutation::Status(status) => self.modify(key, |domain| {
                domain.statuses.insert(status.to_string());
            }),
        }
    }

    fn registrant(&self, key: &DomainKey) -> Option<String> {
        self.get(key)?
            .meta
            .as_ref()?
            .registrant
            .clone()
            .filter(|id| !id.is_empty())
    }
}
