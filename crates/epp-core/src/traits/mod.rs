//! Core traits for the EPP client
//!
//! This module defines the abstract interfaces at the client's seams.
//!
//! - [`Transport`]: Framed byte transport to the registry
//! - [`SessionOps`], [`DomainOps`], [`ContactOps`], [`HostOps`]: Registrar operations
//! - [`DomainStore`]: Local registrar database reconciled by the sync job

pub mod domain_store;
pub mod registrar;
pub mod transport;

pub use domain_store::{DomainKey, DomainMeta, DomainStore, DomainSyncUpdate, LocalContact};
pub use registrar::{ContactOps, DomainOps, HostOps, SessionOps};
pub use transport::Transport;
