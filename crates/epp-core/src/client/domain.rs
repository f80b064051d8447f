use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::EppClient;
use crate::credentials;
use crate::error::{Error, Result};
use crate::model::{
    ContactRecord, ContactRoles, DomainRecord, HostRecord, LOCK_STATUSES, Nameservers,
};
use crate::response::{CheckResult, DomainInfo, TransferInfo};
use crate::traits::{ContactOps, DomainOps, HostOps};

/// Reason used when the registry marks a domain unavailable without one
const DEFAULT_UNAVAILABLE_REASON: &str = "Domain is not available";

/// Result of a successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainCreated {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Generated domain auth-info password
    pub auth_info: String,
    /// Contact created for all four roles (full data set only)
    pub contact_id: Option<String>,
}

/// Nameserver changes needed to reach a desired set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameserverDiff {
    /// Desired hosts missing at the registry
    pub add: Vec<String>,
    /// Registry hosts no longer desired
    pub remove: Vec<String>,
}

impl NameserverDiff {
    /// Compare registry nameservers with the desired ones (case-insensitive)
    pub fn between(current: &[String], desired: &Nameservers) -> Self {
        let add = desired
            .iter()
            .filter(|ns| !current.iter().any(|c| c.eq_ignore_ascii_case(ns)))
            .map(str::to_string)
            .collect();
        let remove = current
            .iter()
            .filter(|c| !desired.contains(c))
            .cloned()
            .collect();
        Self { add, remove }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

fn require_name(domain: &DomainRecord) -> Result<&str> {
    let name = domain.name.trim();
    if name.is_empty() {
        return Err(Error::validation("Domain name cannot be empty"));
    }
    Ok(name)
}

/// Pick the entry for `name` out of check results
fn find_check(results: Vec<CheckResult>, name: &str) -> Result<CheckResult> {
    results
        .into_iter()
        .find(|r| r.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::data(format!("Check response has no entry for {}", name)))
}

impl EppClient {
    async fn check_domain(&mut self, name: &str) -> Result<CheckResult> {
        let response = self.execute(|f| f.domain_check(&[name])).await?;
        find_check(response.domain_check()?, name)
    }

    /// Create any nameserver host object the registry does not know yet
    async fn ensure_hosts(&mut self, nameservers: &Nameservers) -> Result<()> {
        for ns in nameservers.iter() {
            let check = find_check(self.host_check(&[ns]).await?, ns)?;
            if check.available {
                info!("Creating host {}", ns);
                self.host_create(&HostRecord::new(ns)).await?;
            } else {
                debug!("Host {} already exists", ns);
            }
        }
        Ok(())
    }

    async fn update_lock_statuses(&mut self, domain: &DomainRecord, lock: bool) -> Result<bool> {
        let name = require_name(domain)?;
        let info = self.domain_info(name).await?;

        let pending: Vec<&str> = LOCK_STATUSES
            .iter()
            .copied()
            .filter(|status| info.has_status(status) != lock)
            .collect();
        if pending.is_empty() {
            info!(
                "{} already {}, no update sent",
                name,
                if lock { "locked" } else { "unlocked" }
            );
            return Ok(false);
        }

        if lock {
            self.execute(|f| f.domain_update_status(name, &pending, &[]))
                .await?;
        } else {
            self.execute(|f| f.domain_update_status(name, &[], &pending))
                .await?;
        }
        Ok(true)
    }
}

#[async_trait]
impl DomainOps for EppClient {
    async fn check_availability(&mut self, name: &str) -> Result<bool> {
        info!("Checking availability of {}", name);
        let check = self.check_domain(name).await?;
        if let Some(reason) = &check.reason {
            debug!("{}: {}", name, reason);
        }
        Ok(check.available)
    }

    async fn domain_info(&mut self, name: &str) -> Result<DomainInfo> {
        debug!("Fetching info for {}", name);
        let response = self.execute(|f| f.domain_info(name)).await?;
        response.domain_info()
    }

    async fn register_domain(
        &mut self,
        domain: &DomainRecord,
        contact: &ContactRecord,
    ) -> Result<DomainCreated> {
        let name = require_name(domain)?;
        self.require_authenticated()?;
        info!(
            "Registering {} for {} year(s) with {} nameserver(s)",
            name,
            domain.period_years,
            domain.nameservers.len()
        );

        let check = self.check_domain(name).await?;
        if !check.available {
            let reason = check
                .reason
                .unwrap_or_else(|| DEFAULT_UNAVAILABLE_REASON.to_string());
            return Err(Error::unavailable(name, reason));
        }

        let mut request = domain.clone();
        let contact_id = if self.data_set().includes_contacts() {
            let new_contact = ContactRecord {
                id: credentials::generate_object_id(),
                ..contact.clone()
            };
            let id = self.contact_create(&new_contact).await?;
            request.contacts = ContactRoles::all(id.as_str());
            Some(id)
        } else {
            request.contacts = ContactRoles::default();
            None
        };

        self.ensure_hosts(&domain.nameservers).await?;

        let auth_info = credentials::generate_password();
        let response = self
            .execute(|f| f.domain_create(&request, &auth_info))
            .await?;
        let created = response.domain_created()?;
        info!("Registered {} (expires {:?})", created.name, created.expires_at);

        Ok(DomainCreated {
            name: created.name,
            created_at: created.created_at,
            expires_at: created.expires_at,
            auth_info,
            contact_id,
        })
    }

    async fn update_nameservers(&mut self, domain: &DomainRecord) -> Result<NameserverDiff> {
        let name = require_name(domain)?;
        info!("Updating nameservers of {}", name);

        let info = self.domain_info(name).await?;
        let mut diff = NameserverDiff::between(&info.nameservers, &domain.nameservers);
        // hostAttr delegations are never sent back as hostObj
        diff.add.retain(|ns| !info.host_attrs.iter().any(|h| h.eq_ignore_ascii_case(ns)));
        if diff.is_empty() {
            info!("Nameservers of {} already up to date", name);
            return Ok(diff);
        }

        debug!("{}: add {:?}, remove {:?}", name, diff.add, diff.remove);
        self.execute(|f| f.domain_update_nameservers(name, &diff.add, &diff.remove))
            .await?;
        Ok(diff)
    }

    async fn renew_domain(&mut self, domain: &DomainRecord) -> Result<Option<DateTime<Utc>>> {
        let name = require_name(domain)?;
        info!("Renewing {} for 1 year", name);

        let info = self.domain_info(name).await?;
        let current = info.expiry_date().ok_or_else(|| {
            Error::data(format!("Domain info for {} lacks an expiration date", name))
        })?;

        let response = self.execute(|f| f.domain_renew(name, current, 1)).await?;
        let renewed = response.domain_renewed();
        info!("Renewed {} (was {}, now {:?})", name, current, renewed);
        Ok(renewed)
    }

    async fn transfer_domain(
        &mut self,
        domain: &DomainRecord,
        auth_info: &str,
    ) -> Result<TransferInfo> {
        let name = require_name(domain)?;
        if auth_info.is_empty() {
            return Err(Error::validation("Transfer requires an auth-info password"));
        }
        info!("Requesting transfer of {}", name);

        let response = self
            .execute(|f| f.domain_transfer_request(name, 1, auth_info))
            .await?;
        let transfer = response.transfer_info()?;
        info!("Transfer of {} is {}", name, transfer.status);
        Ok(transfer)
    }

    async fn transfer_status(&mut self, domain: &DomainRecord) -> Result<TransferInfo> {
        let name = require_name(domain)?;
        debug!("Querying transfer status of {}", name);
        let response = self.execute(|f| f.domain_transfer_query(name)).await?;
        response.transfer_info()
    }

    async fn lock_domain(&mut self, domain: &DomainRecord) -> Result<bool> {
        info!("Locking {}", domain.name);
        self.update_lock_statuses(domain, true).await
    }

    async fn unlock_domain(&mut self, domain: &DomainRecord) -> Result<bool> {
        info!("Unlocking {}", domain.name);
        self.update_lock_statuses(domain, false).await
    }

    async fn get_transfer_auth_info(&mut self, domain: &DomainRecord) -> Result<String> {
        let name = require_name(domain)?;
        info!("Fetching auth-info of {}", name);
        self.domain_info(name)
            .await?
            .auth_info
            .ok_or_else(|| Error::data(format!("Domain info for {} lacks auth-info", name)))
    }

    async fn fetch_domain_details(&mut self, domain: &mut DomainRecord) -> Result<DomainInfo> {
        let name = require_name(domain)?.to_string();
        info!("Fetching details of {}", name);

        let info = self.domain_info(&name).await?;
        domain.created_at = info.created_at;
        domain.expires_at = info.expires_at;
        domain.status = info.statuses.iter().cloned().collect();
        domain.nameservers = Nameservers::truncated(info.delegated_nameservers());
        domain.auth_info = info.auth_info.clone();
        domain.contacts = info.contact_roles();
        Ok(info)
    }

    async fn delete_domain(&mut self, domain: &DomainRecord) -> Result<()> {
        let name = require_name(domain)?;
        info!("Deleting {}", name);
        self.execute(|f| f.domain_delete(name)).await?;
        Ok(())
    }

    async fn restore_domain(&mut self, domain: &DomainRecord) -> Result<()> {
        let name = require_name(domain)?;
        info!("Requesting restore of {}", name);
        let response = self.execute(|f| f.domain_restore(name)).await?;
        debug!("Restore of {} answered with {}", name, response.code());
        Ok(())
    }
}
