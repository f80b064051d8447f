//! Configuration types for the EPP client
//!
//! Configuration is immutable once a client is built. It is validated once,
//! up front, instead of being checked ad hoc by each operation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main EPP client configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct EppConfig {
    /// Registry EPP host name
    pub host: String,

    /// Registry EPP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Registrar client id (`clID`)
    pub client_id: String,

    /// Registrar password
    /// ⚠️ NEVER log this value
    pub password: String,

    /// Prefix for client transaction ids
    pub transaction_prefix: String,

    /// TLS settings
    pub tls: TlsSettings,

    /// Whether contact objects are used at all
    #[serde(default)]
    pub data_set: DataSet,

    /// Connect/read/write timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// Custom Debug implementation that hides the registrar password
impl std::fmt::Debug for EppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("password", &"<REDACTED>")
            .field("transaction_prefix", &self.transaction_prefix)
            .field("tls", &self.tls)
            .field("data_set", &self.data_set)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl EppConfig {
    /// Create a configuration with defaults for everything but the
    /// registry endpoint and the registrar credentials
    pub fn new(
        host: impl Into<String>,
        client_id: impl Into<String>,
        password: impl Into<String>,
        tls: TlsSettings,
    ) -> Self {
        let client_id = client_id.into();
        Self {
            host: host.into(),
            port: default_port(),
            transaction_prefix: client_id.clone(),
            client_id,
            password: password.into(),
            tls,
            data_set: DataSet::default(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the transaction id prefix
    pub fn with_transaction_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.transaction_prefix = prefix.into();
        self
    }

    /// Set the data set mode
    pub fn with_data_set(mut self, data_set: DataSet) -> Self {
        self.data_set = data_set;
        self
    }

    /// Set the I/O timeout
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// I/O timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the session-level fields (everything except file paths)
    pub fn validate_session(&self) -> Result<(), crate::Error> {
        if self.host.is_empty() {
            return Err(crate::Error::config("EPP host cannot be empty"));
        }
        if self.port == 0 {
            return Err(crate::Error::config("EPP port must be > 0"));
        }
        if self.client_id.is_empty() {
            return Err(crate::Error::config("EPP client id cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(crate::Error::config("EPP password cannot be empty"));
        }
        if self.transaction_prefix.is_empty() {
            return Err(crate::Error::config(
                "Transaction id prefix cannot be empty",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("EPP timeout must be > 0"));
        }
        Ok(())
    }

    /// Validate the whole configuration, including that TLS material exists
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.validate_session()?;
        self.tls.validate()
    }
}

/// TLS protocol version to pin the session to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlsVersion {
    /// TLS 1.2
    #[serde(rename = "1.2")]
    Tls12,
    /// TLS 1.3
    #[default]
    #[serde(rename = "1.3")]
    Tls13,
}

impl std::str::FromStr for TlsVersion {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.2" => Ok(TlsVersion::Tls12),
            "1.3" => Ok(TlsVersion::Tls13),
            other => Err(crate::Error::config(format!(
                "Unsupported TLS version '{}'. Supported: 1.2, 1.3",
                other
            ))),
        }
    }
}

/// TLS client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsSettings {
    /// PEM client certificate chain
    pub cert_path: PathBuf,

    /// PEM client private key
    pub key_path: PathBuf,

    /// Optional PEM CA bundle used to verify the registry
    #[serde(default)]
    pub ca_path: Option<PathBuf>,

    /// Protocol version
    #[serde(default)]
    pub version: TlsVersion,

    /// Verify the registry certificate against `ca_path`
    ///
    /// Many registries run self-signed certificates on their OT&E
    /// endpoints, so verification is off unless asked for.
    #[serde(default)]
    pub verify_peer: bool,
}

impl TlsSettings {
    /// Create TLS settings from a client certificate and key
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
            ca_path: None,
            version: TlsVersion::default(),
            verify_peer: false,
        }
    }

    /// Set the CA bundle
    pub fn with_ca(mut self, ca_path: impl Into<PathBuf>) -> Self {
        self.ca_path = Some(ca_path.into());
        self
    }

    /// Set the TLS version
    pub fn with_version(mut self, version: TlsVersion) -> Self {
        self.version = version;
        self
    }

    /// Enable or disable peer verification
    pub fn with_verify_peer(mut self, verify_peer: bool) -> Self {
        self.verify_peer = verify_peer;
        self
    }

    /// Validate that all referenced files exist
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !self.cert_path.is_file() {
            return Err(crate::Error::config(format!(
                "TLS certificate not found: {}",
                self.cert_path.display()
            )));
        }
        if !self.key_path.is_file() {
            return Err(crate::Error::config(format!(
                "TLS key not found: {}",
                self.key_path.display()
            )));
        }
        match &self.ca_path {
            Some(ca) if !ca.is_file() => Err(crate::Error::config(format!(
                "TLS CA bundle not found: {}",
                ca.display()
            ))),
            None if self.verify_peer => Err(crate::Error::config(
                "Peer verification requires a CA bundle",
            )),
            _ => Ok(()),
        }
    }
}

/// Registry data set mode
///
/// In the minimal data set no contact objects exist: domain create omits
/// every contact reference, and contact flows are unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSet {
    /// Registrant/admin/tech/billing contacts are created and referenced
    #[default]
    Full,
    /// No contact objects
    Minimal,
}

impl DataSet {
    /// Whether contact objects take part in domain flows
    pub fn includes_contacts(self) -> bool {
        matches!(self, DataSet::Full)
    }
}

/// Reconciliation job settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Fetch the registrant contact and persist its fields locally
    #[serde(default)]
    pub sync_contacts: bool,

    /// Capacity of the job's event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_contacts: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_port() -> u16 {
    700
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1000
}
