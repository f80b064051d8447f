// # File Domain Store
//
// File-based implementation of DomainStore with crash recovery.
//
// ## Purpose
//
// Keeps the local domain table in a JSON document so `eppsyncd` can run
// as a one-shot job against a durable store.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## Write Policy
//
// Mutations only touch memory and mark the table dirty; `flush()` writes
// the whole document. The sync job flushes once per batch.
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "domains": {
//     "example.tld": {
//       "key": { "sld": "example", "tld": "tld" },
//       "nameservers": ["ns1.host.tld", "ns2.host.tld", null, null],
//       "expires_at": "2027-03-09T12:00:00Z",
//       "locked": true,
//       ...
//     }
//   },
//   "orders": {
//     "example.tld": { "status": "active", "expires_at": "2027-03-09T12:00:00Z", ... }
//   }
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use super::{BillingOrder, DomainTable, Mutation, StoredDomain};
use crate::Error;
use crate::traits::{DomainKey, DomainMeta, DomainStore, DomainSyncUpdate, LocalContact};

/// Store file format version
const STORE_FILE_VERSION: &str = "1.0";

/// File-based domain store with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use epp_core::state::FileDomainStore;
/// use epp_core::traits::DomainStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileDomainStore::new("/var/lib/eppsync/domains.json").await?;
///     for key in store.list_domains().await? {
///         println!("{}", key);
///     }
///     store.flush().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileDomainStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

#[derive(Debug)]
struct FileState {
    table: DomainTable,
    dirty: bool,
}

/// Serializable store file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StoreFileFormat {
    version: String,
    #[serde(default)]
    domains: BTreeMap<String, StoredDomain>,
    #[serde(default)]
    orders: BTreeMap<String, BillingOrder>,
}

impl FileDomainStore {
    /// Create or load a file domain store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Try to load the existing store file
    /// 3. If it is corrupted, try to load the backup
    /// 4. If both fail, start with an empty table
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create store directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let table = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState {
                table,
                dirty: false,
            })),
        })
    }

    /// Load the table with automatic recovery
    ///
    /// Only parse failures count as corruption; read errors are returned.
    async fn load_with_recovery(path: &Path) -> Result<DomainTable, Error> {
        match Self::load(path).await {
            Ok(table) => {
                tracing::debug!("Loaded domain store: {} domains", table.len());
                Ok(table)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Domain store {} appears corrupted: {}. Attempting recovery from backup.",
                    path.display(),
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty store.");
                    return Ok(DomainTable::default());
                }

                match Self::load(&backup_path).await {
                    Ok(table) => {
                        tracing::info!(
                            "Recovered domain store from backup: {} domains",
                            table.len()
                        );
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore store file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(table)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also corrupted: {}. Starting with empty store.",
                            backup_err
                        );
                        Ok(DomainTable::default())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load(path: &Path) -> Result<DomainTable, Error> {
        if !path.exists() {
            tracing::debug!("Domain store does not exist yet: {}", path.display());
            return Ok(DomainTable::default());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::store(format!("Failed to read store file {}: {}", path.display(), e))
        })?;

        let file: StoreFileFormat = serde_json::from_str(&content)?;
        if file.version != STORE_FILE_VERSION {
            tracing::warn!(
                "Store file version mismatch: expected {}, got {}. Attempting to load anyway.",
                STORE_FILE_VERSION,
                file.version
            );
        }

        Ok(DomainTable {
            domains: file.domains,
            orders: file.orders,
        })
    }

    /// Write the table atomically (temp file, backup, rename)
    async fn write(&self) -> Result<(), Error> {
        let mut guard = self.state.write().await;

        let file = StoreFileFormat {
            version: STORE_FILE_VERSION.to_string(),
            domains: guard.table.domains.clone(),
            orders: guard.table.orders.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.temp_path();
        {
            let mut out = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            out.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            out.flush().await.map_err(|e| {
                Error::store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            if let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        guard.dirty = false;
        tracing::trace!("Domain store written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }

    /// Add or replace a domain
    pub async fn insert(&self, domain: StoredDomain) {
        let mut guard = self.state.write().await;
        guard.table.insert(domain);
        guard.dirty = true;
    }

    /// Snapshot of one domain
    pub async fn get(&self, key: &DomainKey) -> Option<StoredDomain> {
        self.state.read().await.table.get(key).cloned()
    }

    /// Snapshot of the billing order of a domain (kept after deletion)
    pub async fn order(&self, key: &DomainKey) -> Option<BillingOrder> {
        self.state.read().await.table.order(key).cloned()
    }

    /// Force immediate write to disk
    pub async fn sync(&self) -> Result<(), Error> {
        self.write().await
    }

    async fn apply(&self, key: &DomainKey, mutation: Mutation<'_>) -> Result<(), Error> {
        let mut guard = self.state.write().await;
        if guard.table.apply(key, mutation) {
            guard.dirty = true;
        }
        Ok(())
    }
}

#[async_trait]
impl DomainStore for FileDomainStore {
    async fn list_domains(&self) -> Result<Vec<DomainKey>, Error> {
        Ok(self.state.read().await.table.keys())
    }

    async fn delete_domain(&self, key: &DomainKey) -> Result<(), Error> {
        let mut guard = self.state.write().await;
        if guard.table.remove(key) {
            guard.dirty = true;
        }
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
        Ok(self.state.read().await.table.registrant(key))
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
        if self.state.read().await.dirty {
            self.write().await
        } else {
            Ok(())
        }
    }
}
