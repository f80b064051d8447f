//! Error types for the EPP client
//!
//! Every public operation either returns a value or exactly one of these
//! error kinds. Transport errors are fatal to the session; protocol errors
//! carry the registry result code and message untouched.

use thiserror::Error;

/// Result type alias for EPP operations
pub type Result<T> = std::result::Result<T, Error>;

/// EPP result code for "object does not exist"
pub const OBJECT_DOES_NOT_EXIST: u16 = 2303;

/// Core error type for the EPP client
#[derive(Error, Debug)]
pub enum Error {
    /// Connect failure, socket failure, short frame, write failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Raw I/O errors surfaced by the socket layer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS configuration or handshake errors
    #[error("TLS error: {0}")]
    Tls(String),

    /// Registry answered with a result code >= 2000
    #[error("EPP error {code}: {message}")]
    Protocol {
        /// EPP result code
        code: u16,
        /// Registry-supplied message
        message: String,
    },

    /// A success response is missing an expected element, or the document
    /// could not be parsed
    #[error("Malformed response: {0}")]
    Data(String),

    /// Caller-side precondition violated
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Check-then-create found the domain taken
    #[error("{name} {reason}")]
    DomainUnavailable {
        /// Domain name that was checked
        name: String,
        /// Registry-supplied reason
        reason: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local domain store errors
    #[error("Domain store error: {0}")]
    Store(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a TLS error
    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls(msg.into())
    }

    /// Create a protocol error from a result code and registry message
    pub fn protocol(code: u16, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }

    /// Create a data error
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a "domain unavailable" error
    pub fn unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DomainUnavailable {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// The EPP result code, if this is a protocol error
    pub fn protocol_code(&self) -> Option<u16> {
        match self {
            Self::Protocol { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the registry reported that the object does not exist
    ///
    /// Some registries answer with a generic failure code and put the
    /// meaning in the message, so the message is checked as well.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Protocol { code, message } => {
                *code == OBJECT_DOES_NOT_EXIST
                    || message.to_lowercase().contains("does not exist")
            }
            _ => false,
        }
    }

    /// Whether this error killed the underlying session
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io(_) | Self::Tls(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
