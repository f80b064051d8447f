// # Registrar Capability Traits
//
// The EPP client exposes one named method per operation, grouped into a
// small set of capabilities. Consumers depend on the capabilities they use
// (the reconciliation job needs sessions, domain info and contact info),
// so they can be driven by any implementation.
//
// ## Implementations
//
// - `EppClient` implements all four traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::client::{DomainCreated, NameserverDiff};
use crate::model::{ContactRecord, DomainRecord, HostRecord};
use crate::response::{CheckResult, ContactInfo, DomainInfo, Greeting, HostInfo, TransferInfo};

/// Session lifecycle
#[async_trait]
pub trait SessionOps: Send {
    /// Authenticate the connected session
    async fn login(&mut self) -> Result<(), crate::Error>;

    /// End the session; a no-op when not authenticated
    async fn logout(&mut self) -> Result<(), crate::Error>;

    /// Whether commands other than login may be sent
    fn is_authenticated(&self) -> bool;

    /// Ask the server for a fresh greeting (keeps an idle session alive)
    async fn hello(&mut self) -> Result<Greeting, crate::Error>;
}

/// Domain object operations
#[async_trait]
pub trait DomainOps: Send {
    /// Whether the domain can be registered
    async fn check_availability(&mut self, name: &str) -> Result<bool, crate::Error>;

    /// Raw domain info
    async fn domain_info(&mut self, name: &str) -> Result<DomainInfo, crate::Error>;

    /// Check, create contacts and hosts as needed, then create the domain
    async fn register_domain(
        &mut self,
        domain: &DomainRecord,
        contact: &ContactRecord,
    ) -> Result<DomainCreated, crate::Error>;

    /// Bring the registry nameservers in line with `domain.nameservers`
    async fn update_nameservers(
        &mut self,
        domain: &DomainRecord,
    ) -> Result<NameserverDiff, crate::Error>;

    /// Renew for one year anchored on the registry expiration date
    ///
    /// # Returns
    ///
    /// - `Ok(Some(date))`: New expiration date reported by the registry
    /// - `Ok(None)`: Renewed, but the registry sent no expiration date
    async fn renew_domain(
        &mut self,
        domain: &DomainRecord,
    ) -> Result<Option<DateTime<Utc>>, crate::Error>;

    /// Request an inbound transfer for one year
    async fn transfer_domain(
        &mut self,
        domain: &DomainRecord,
        auth_info: &str,
    ) -> Result<TransferInfo, crate::Error>;

    /// Query the state of a pending transfer
    async fn transfer_status(&mut self, domain: &DomainRecord)
    -> Result<TransferInfo, crate::Error>;

    /// Add the client lock statuses; returns whether an update was sent
    async fn lock_domain(&mut self, domain: &DomainRecord) -> Result<bool, crate::Error>;

    /// Remove the client lock statuses; returns whether an update was sent
    async fn unlock_domain(&mut self, domain: &DomainRecord) -> Result<bool, crate::Error>;

    /// Registry auth-info password
    async fn get_transfer_auth_info(
        &mut self,
        domain: &DomainRecord,
    ) -> Result<String, crate::Error>;

    /// Copy registry state onto `domain` and return the full info
    async fn fetch_domain_details(
        &mut self,
        domain: &mut DomainRecord,
    ) -> Result<DomainInfo, crate::Error>;

    /// Delete the domain
    async fn delete_domain(&mut self, domain: &DomainRecord) -> Result<(), crate::Error>;

    /// Request restoration of a domain in its redemption grace period
    async fn restore_domain(&mut self, domain: &DomainRecord) -> Result<(), crate::Error>;
}

/// Contact object operations
#[async_trait]
pub trait ContactOps: Send {
    /// Availability of contact ids
    async fn contact_check(&mut self, ids: &[&str]) -> Result<Vec<CheckResult>, crate::Error>;

    /// Create a contact with a generated auth-info password
    ///
    /// An empty `contact.id` is replaced by a generated one.
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The id the registry assigned
    async fn contact_create(&mut self, contact: &ContactRecord) -> Result<String, crate::Error>;

    /// Raw contact info
    async fn contact_info(&mut self, id: &str) -> Result<ContactInfo, crate::Error>;

    /// Delete a contact object
    async fn contact_delete(&mut self, id: &str) -> Result<(), crate::Error>;

    /// Rewrite the registrant contact of `domain`
    async fn update_contact_profile(
        &mut self,
        domain: &DomainRecord,
        contact: &ContactRecord,
    ) -> Result<(), crate::Error>;

    /// Toggle disclosure on every distinct contact of `domain`; returns the
    /// number of contact updates sent
    async fn toggle_contact_disclosure(
        &mut self,
        domain: &DomainRecord,
        enable_privacy: bool,
    ) -> Result<usize, crate::Error>;
}

/// Host object operations
#[async_trait]
pub trait HostOps: Send {
    /// Availability of host names
    async fn host_check(&mut self, names: &[&str]) -> Result<Vec<CheckResult>, crate::Error>;

    /// Create a host object
    async fn host_create(&mut self, host: &HostRecord) -> Result<(), crate::Error>;

    /// Raw host info
    async fn host_info(&mut self, name: &str) -> Result<HostInfo, crate::Error>;

    /// Delete a host object
    async fn host_delete(&mut self, name: &str) -> Result<(), crate::Error>;
}
