// # epp-core
//
// Core library for EPP (RFC 5730-5734) registrar sessions and registry
// reconciliation.
//
// ## Architecture Overview
//
// - **Transport**: RFC 5734 framing over TLS (or any async byte stream)
// - **CommandFactory**: Builds EPP command documents as element trees
// - **Response**: Decodes result codes and typed resData payloads
// - **EppClient**: Session state machine and registrar operations
// - **DomainStore**: Local registrar database (memory or JSON file)
// - **ReconciliationJob**: Copies registry state into the local store
//
// ## Design Principles
//
// 1. **One command in flight**: Every operation takes `&mut self`
// 2. **Fail loudly**: Each operation returns a value or one error kind
// 3. **Capability traits**: Consumers depend on the operations they use
// 4. **Library-First**: The daemon is a thin wrapper around this crate

pub mod client;
pub mod command;
pub mod config;
pub mod credentials;
pub mod error;
pub mod model;
pub mod response;
pub mod state;
pub mod sync;
pub mod traits;
pub mod transport;

// Re-export core types for convenience
pub use client::{DomainCreated, EppClient, NameserverDiff, SessionState};
pub use config::{DataSet, EppConfig, SyncConfig, TlsSettings, TlsVersion};
pub use error::{Error, Result};
pub use model::{
    ContactRecord, ContactRoles, DomainRecord, HostRecord, Nameservers, PostalAddress,
};
pub use response::{
    CheckResult, ContactInfo, DomainInfo, Greeting, HostInfo, Response, TransferInfo,
};
pub use state::{FileDomainStore, MemoryDomainStore, StoredDomain};
pub use sync::{ReconciliationJob, SyncEvent, SyncReport};
pub use traits::{ContactOps, DomainKey, DomainOps, DomainStore, HostOps, SessionOps, Transport};
pub use transport::FramedStream;
