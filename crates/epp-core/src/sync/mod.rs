//! Registry reconciliation job
//!
//! The ReconciliationJob walks every locally known service domain and
//! copies the registry's view of it into the [`DomainStore`]:
//! - Nameserver slots, expiry, lock flag and auth code
//! - The registrant's contact fields (optional)
//! - Registry object id, contact ids per role and status rows
//!
//! Domains the registry no longer knows are removed locally and their
//! billing order is cancelled.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐   list_domains   ┌───────────────────┐  domain info   ┌───────────┐
//! │ DomainStore │ ───────────────▶ │ ReconciliationJob │ ─────────────▶ │ Registrar │
//! │             │ ◀─────────────── │                   │ ◀───────────── │ (session) │
//! └─────────────┘   sync fields    └───────────────────┘  contact info  └───────────┘
//!                                            │
//!                                            ▼
//!                                     SyncEvent channel
//! ```
//!
//! ## Failure Policy
//!
//! - Registry or store errors on one domain: logged, reported as
//!   `DomainFailed`, the batch continues
//! - Transport errors: the session is gone, so the batch aborts
//!
//! The store is flushed once, when the batch ends (also on abort).

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::model::DomainRecord;
use crate::response::{ContactInfo, DomainInfo};
use crate::traits::{
    ContactOps, DomainKey, DomainMeta, DomainOps, DomainStore, DomainSyncUpdate, LocalContact,
    SessionOps,
};

/// Reason recorded on orders of domains that vanished from the registry
pub const DELETED_ORDER_REASON: &str = "domain deleted";

/// Client-side lock triple
pub const CLIENT_LOCK_STATUSES: [&str; 3] = [
    "clientDeleteProhibited",
    "clientTransferProhibited",
    "clientUpdateProhibited",
];

/// Server-side lock triple
pub const SERVER_LOCK_STATUSES: [&str; 3] = [
    "serverDeleteProhibited",
    "serverTransferProhibited",
    "serverUpdateProhibited",
];

/// Events emitted by the ReconciliationJob
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Batch started
    Started {
        domains: usize,
    },

    /// Registry state copied into the store
    DomainSynced {
        domain: String,
    },

    /// Domain no longer exists at the registry; removed locally
    DomainRemoved {
        domain: String,
    },

    /// Domain skipped after an error
    DomainFailed {
        domain: String,
        error: String,
    },

    /// Batch completed
    Finished {
        report: SyncReport,
    },
}

/// Counters of one reconciliation batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub synced: usize,
    pub removed: usize,
    pub failed: usize,
}

impl SyncReport {
    /// Number of domains visited
    pub fn total(&self) -> usize {
        self.synced + self.removed + self.failed
    }
}

enum DomainOutcome {
    Synced,
    Removed,
}

/// Bulk reconciliation of the local store against the registry
///
/// ## Lifecycle
///
/// 1. Log the registrar in
/// 2. Create with [`ReconciliationJob::new()`]
/// 3. Call [`ReconciliationJob::run()`] once per batch
/// 4. Take the registrar back with [`ReconciliationJob::into_registrar()`]
///    and log out
///
/// Domains are processed one at a time over the single session.
pub struct ReconciliationJob<R, S> {
    registrar: R,
    store: S,
    sync_contacts: bool,
    event_tx: mpsc::Sender<SyncEvent>,
}

impl<R, S> ReconciliationJob<R, S>
where
    R: SessionOps + DomainOps + ContactOps,
    S: DomainStore,
{
    /// Create a new job
    ///
    /// # Returns
    ///
    /// A tuple of (job, event_receiver) where event_receiver yields sync events
    pub fn new(registrar: R, store: S, config: SyncConfig) -> (Self, mpsc::Receiver<SyncEvent>) {
        let (tx, rx) = mpsc::channel(config.event_channel_capacity.max(1));

        let job = Self {
            registrar,
            store,
            sync_contacts: config.sync_contacts,
            event_tx: tx,
        };

        (job, rx)
    }

    /// Store being reconciled
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give back the registrar session
    pub fn into_registrar(self) -> R {
        self.registrar
    }

    /// Reconcile every domain the store lists
    ///
    /// # Returns
    ///
    /// - `Ok(SyncReport)`: Batch completed (individual domains may have failed)
    /// - `Err(Error)`: Not logged in, the store could not be listed, or the
    ///   session died
    pub async fn run(&mut self) -> Result<SyncReport> {
        if !self.registrar.is_authenticated() {
            return Err(Error::validation("Reconciliation requires a logged-in session"));
        }

        let keys = self.store.list_domains().await?;
        info!("Reconciling {} domain(s)", keys.len());
        self.emit_event(SyncEvent::Started {
            domains: keys.len(),
        });

        let mut report = SyncReport::default();
        for key in &keys {
            match self.sync_domain(key).await {
                Ok(DomainOutcome::Synced) => {
                    report.synced += 1;
                    self.emit_event(SyncEvent::DomainSynced {
                        domain: key.fqdn(),
                    });
                }
                Ok(DomainOutcome::Removed) => {
                    report.removed += 1;
                    self.emit_event(SyncEvent::DomainRemoved {
                        domain: key.fqdn(),
                    });
                }
                Err(e) if e.is_transport() => {
                    error!("Aborting reconciliation at {}: {}", key, e);
                    if let Err(flush_err) = self.store.flush().await {
                        error!("Failed to flush domain store: {}", flush_err);
                    }
                    return Err(e);
                }
                Err(e) => {
                    warn!("Failed to reconcile {}: {}", key, e);
                    report.failed += 1;
                    self.emit_event(SyncEvent::DomainFailed {
                        domain: key.fqdn(),
                        error: e.to_string(),
                    });
                }
            }
        }

        self.store.flush().await?;
        info!(
            "Reconciliation finished: {} synced, {} removed, {} failed",
            report.synced, report.removed, report.failed
        );
        self.emit_event(SyncEvent::Finished { report });

        Ok(report)
    }

    async fn sync_domain(&mut self, key: &DomainKey) -> Result<DomainOutcome> {
        let mut record = DomainRecord::new(key.fqdn());
        let info = match self.registrar.fetch_domain_details(&mut record).await {
            Ok(info) => info,
            Err(e) if e.is_not_found() => {
                info!("{} no longer exists at the registry, removing", key);
                self.store.delete_domain(key).await?;
                self.store
                    .cancel_order(key, DELETED_ORDER_REASON, Utc::now())
                    .await?;
                return Ok(DomainOutcome::Removed);
            }
            Err(e) => return Err(e),
        };

        let update = DomainSyncUpdate {
            nameservers: record.nameservers.slots(),
            expires_at: record.expires_at,
            locked: derive_locked(&info.statuses),
            transfer_code: record.auth_info.clone(),
            synced_at: Utc::now(),
        };
        debug!(
            "{}: {} nameserver(s), locked: {}, expires: {:?}",
            key,
            record.nameservers.len(),
            update.locked,
            update.expires_at
        );
        self.store.update_sync_fields(key, &update).await?;
        self.store.set_order_expiry(key, record.expires_at).await?;

        if self.sync_contacts {
            self.sync_registrant(key, &info).await?;
        }

        self.store.upsert_metadata(key, &metadata_from(&info)).await?;
        for status in &info.statuses {
            self.store.record_status(key, status).await?;
        }

        Ok(DomainOutcome::Synced)
    }

    /// Copy the registrant contact into the local profile
    ///
    /// Registry errors are logged and swallowed; transport and store errors
    /// are returned.
    async fn sync_registrant(&mut self, key: &DomainKey, info: &DomainInfo) -> Result<()> {
        let registrant = match self.store.registrant_contact_id(key).await? {
            Some(id) => Some(id),
            None => info.registrant.clone(),
        };
        let Some(registrant) = registrant else {
            debug!("{} has no registrant contact, skipping contact sync", key);
            return Ok(());
        };

        match self.registrar.contact_info(&registrant).await {
            Ok(contact) => {
                self.store
                    .update_contact_fields(key, &local_contact_from(&contact))
                    .await
            }
            Err(e) if e.is_transport() => Err(e),
            Err(e) => {
                warn!("Contact {} of {} could not be fetched: {}", registrant, key, e);
                Ok(())
            }
        }
    }

    fn emit_event(&self, event: SyncEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Sync event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

/// Whether a status set amounts to a full lock
///
/// True when all three client prohibitions are present, or all three
/// server prohibitions.
pub fn derive_locked<S: AsRef<str>>(statuses: &[S]) -> bool {
    let has = |wanted: &str| statuses.iter().any(|s| s.as_ref() == wanted);
    CLIENT_LOCK_STATUSES.iter().all(|s| has(*s)) || SERVER_LOCK_STATUSES.iter().all(|s| has(*s))
}

/// Map registry contact info onto local profile fields
pub fn local_contact_from(info: &ContactInfo) -> LocalContact {
    let postal = info.postal.clone().unwrap_or_default();

    let name = postal.name.as_deref().unwrap_or_default().trim();
    let (first_name, last_name) = name.split_once(' ').unwrap_or((name, ""));

    let voice = info
        .voice
        .as_deref()
        .unwrap_or_default()
        .trim()
        .trim_start_matches('+');
    let (phone_cc, phone) = voice.split_once('.').unwrap_or(("", voice));

    LocalContact {
        first_name: first_name.to_string(),
        last_name: last_name.trim().to_string(),
        company: postal.organization.clone().unwrap_or_default(),
        email: info.email.clone().unwrap_or_default(),
        address1: postal.street_line(0).to_string(),
        address2: postal.street_line(1).to_string(),
        city: postal.city.clone().unwrap_or_default(),
        state: postal.state.clone().unwrap_or_default(),
        postcode: postal.postcode.clone().unwrap_or_default(),
        country: postal.country.clone().unwrap_or_default(),
        phone_cc: phone_cc.to_string(),
        phone: phone.to_string(),
    }
}

fn metadata_from(info: &DomainInfo) -> DomainMeta {
    let roles = info.contact_roles();
    DomainMeta {
        roid: info.roid.clone(),
        registrant: roles.registrant,
        admin: roles.admin,
        tech: roles.tech,
        billing: roles.billing,
    }
}
