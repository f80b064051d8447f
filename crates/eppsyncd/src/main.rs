// # eppsyncd - EPP Reconciliation Daemon
//
// Thin integration layer: all EPP and reconciliation logic lives in
// epp-core. Configuration is via environment variables only.
//
// The eppsyncd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Opening the registry session and the domain store
// 4. Running one reconciliation batch, then logging out
//
// ## Configuration
//
// ### Registry
// - `EPP_HOST`: Registry EPP host (required)
// - `EPP_PORT`: Registry EPP port (default: 700)
// - `EPP_CLIENT_ID`: Registrar client id (required)
// - `EPP_PASSWORD`: Registrar password (required)
// - `EPP_PREFIX`: Transaction id prefix (default: client id)
// - `EPP_MIN_DATA_SET`: `true` when the registry uses no contact objects
// - `EPP_TIMEOUT_SECS`: Connect/read/write timeout (default: 30)
//
// ### TLS
// - `EPP_TLS_CERT`: PEM client certificate (required)
// - `EPP_TLS_KEY`: PEM client key (required)
// - `EPP_TLS_CA`: PEM CA bundle (required with `EPP_VERIFY_PEER`)
// - `EPP_TLS_VERSION`: `1.2` or `1.3` (default: 1.3)
// - `EPP_VERIFY_PEER`: Verify the registry certificate (default: false)
//
// ### Reconciliation
// - `EPP_STATE_PATH`: Domain store JSON file (required)
// - `EPP_SYNC_CONTACTS`: Copy registrant contact fields (default: false)
// - `EPP_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export EPP_HOST=epp.registry.example
// export EPP_CLIENT_ID=registrar1
// export EPP_PASSWORD=...
// export EPP_TLS_CERT=/etc/eppsync/client.pem
// export EPP_TLS_KEY=/etc/eppsync/client.key
// export EPP_STATE_PATH=/var/lib/eppsync/domains.json
//
// eppsyncd
// ```

use anyhow::{Context, Result};
use epp_core::config::{DataSet, EppConfig, SyncConfig, TlsSettings, TlsVersion};
use epp_core::{EppClient, FileDomainStore, ReconciliationJob, SessionOps, SyncEvent};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Batch completed
/// - 1: Configuration or startup error
/// - 2: Runtime error (session or store failure)
#[derive(Debug, Clone, Copy)]
enum SyncExitCode {
    /// Batch completed (individual domains may have failed)
    Clean = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    epp: EppConfig,
    sync: SyncConfig,
    state_path: PathBuf,
    log_level: String,
}

/// Read a required variable
fn required(name: &str) -> Result<String> {
    let value = env::var(name).with_context(|| format!("{} is required", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    Ok(value)
}

/// Read and parse an optional variable
fn optional<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        _ => Ok(None),
    }
}

/// Boolean flag: `1`, `true`, `yes` or `on` (case-insensitive)
fn flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let mut tls = TlsSettings::new(required("EPP_TLS_CERT")?, required("EPP_TLS_KEY")?)
            .with_verify_peer(flag("EPP_VERIFY_PEER"));
        if let Some(ca) = optional::<PathBuf>("EPP_TLS_CA")? {
            tls = tls.with_ca(ca);
        }
        if let Some(version) = optional::<TlsVersion>("EPP_TLS_VERSION")? {
            tls = tls.with_version(version);
        }

        let mut epp = EppConfig::new(
            required("EPP_HOST")?,
            required("EPP_CLIENT_ID")?,
            required("EPP_PASSWORD")?,
            tls,
        );
        if let Some(port) = optional::<u16>("EPP_PORT")? {
            epp = epp.with_port(port);
        }
        if let Some(prefix) = optional::<String>("EPP_PREFIX")? {
            epp = epp.with_transaction_prefix(prefix);
        }
        if let Some(timeout) = optional::<u64>("EPP_TIMEOUT_SECS")? {
            epp = epp.with_timeout_secs(timeout);
        }
        if flag("EPP_MIN_DATA_SET") {
            epp = epp.with_data_set(DataSet::Minimal);
        }

        Ok(Self {
            epp,
            sync: SyncConfig {
                sync_contacts: flag("EPP_SYNC_CONTACTS"),
                ..SyncConfig::default()
            },
            state_path: PathBuf::from(required("EPP_STATE_PATH")?),
            log_level: env::var("EPP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.epp.validate()?;

        if self.sync.sync_contacts && !self.epp.data_set.includes_contacts() {
            anyhow::bail!(
                "EPP_SYNC_CONTACTS cannot be enabled together with EPP_MIN_DATA_SET: \
                the minimal data set has no contact objects"
            );
        }

        if let Some(parent) = self.state_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "EPP_STATE_PATH parent directory does not exist: {}. \
                    Create it first: sudo mkdir -p {}",
                parent.display(),
                parent.display()
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "EPP_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    info!("Starting eppsyncd");
    info!(
        "Registry: {}:{} as {} ({:?} data set)",
        config.epp.host, config.epp.port, config.epp.client_id, config.epp.data_set
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_batch(config).await {
            error!("Reconciliation failed: {:#}", e);
            SyncExitCode::RuntimeError
        } else {
            SyncExitCode::Clean
        }
    });

    result.into()
}

/// Run one reconciliation batch
async fn run_batch(config: Config) -> Result<()> {
    let store = FileDomainStore::new(&config.state_path)
        .await
        .with_context(|| format!("Failed to open domain store {}", config.state_path.display()))?;

    let mut client = EppClient::connect(config.epp)
        .await
        .context("Failed to connect to the registry")?;
    client.login().await.context("Registry login failed")?;

    let (mut job, mut events) = ReconciliationJob::new(client, store, config.sync);
    let logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SyncEvent::DomainFailed { domain, error } => {
                    warn!("{} not reconciled: {}", domain, error)
                }
                other => debug!("Sync event: {:?}", other),
            }
        }
    });

    let outcome = job.run().await;
    let mut client = job.into_registrar();

    // Logout only after a completed batch; a failed batch has no session left
    let report = outcome.context("Reconciliation batch aborted")?;
    if let Err(e) = client.logout().await {
        warn!("Logout failed: {}", e);
    }

    if let Err(e) = logger.await {
        debug!("Event logger ended abnormally: {}", e);
    }

    info!(
        "Batch complete: {} synced, {} removed, {} failed",
        report.synced, report.removed, report.failed
    );
    Ok(())
}
