//! Error types for the example integration
//!
//! This module defines all error types used throughout the crate.
//!
//! - [`Error`]: errors raised by API clients and core components
//! - [`FailureKind`]: the three-way classification the coordinator acts on
//! - [`RefreshError`]: outcome of a failed coordinator refresh
//! - [`SetupError`]: failure to set up an integration instance
//! - [`FlowError`]: setup-step errors shown to the user

use thiserror::Error;

/// Result type alias for integration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the example integration
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing credentials, not retryable without new ones
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Transient unreachability, retried by the next scheduled poll
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config entry store errors
    #[error("Entry store error: {0}")]
    EntryStore(String),

    /// Entity registry errors
    #[error("Entity registry error: {0}")]
    Registry(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an entry store error
    pub fn entry_store(msg: impl Into<String>) -> Self {
        Self::EntryStore(msg.into())
    }

    /// Create an entity registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Classify this error for polling and setup decisions
    ///
    /// Everything that is not an authentication or connection failure is
    /// unclassified and handled like a transient failure while polling.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Authentication(_) => FailureKind::Authentication,
            Error::Connection(_) => FailureKind::Connection,
            _ => FailureKind::Unclassified,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// Failure taxonomy shared by setup and steady-state polling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Credentials rejected
    Authentication,
    /// Device unreachable
    Connection,
    /// Anything else
    Unclassified,
}

/// Failure of a single coordinator refresh
///
/// `AuthFailed` is a separate variant: callers must start a
/// re-authentication flow instead of waiting for the next poll.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// Credentials are no longer accepted by the device
    #[error("Invalid credentials: {0}")]
    AuthFailed(String),

    /// Device unreachable or returned something unexpected
    #[error("Error communicating with device: {0}")]
    UpdateFailed(String),

    /// Coordinator has been torn down
    #[error("Coordinator is closed")]
    Closed,
}

impl RefreshError {
    /// Returns true if this failure requires new credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, RefreshError::AuthFailed(_))
    }
}

impl From<Error> for RefreshError {
    fn from(err: Error) -> Self {
        match err.kind() {
            FailureKind::Authentication => RefreshError::AuthFailed(err.to_string()),
            FailureKind::Connection => RefreshError::UpdateFailed(err.to_string()),
            FailureKind::Unclassified => {
                RefreshError::UpdateFailed(format!("Unexpected error: {}", err))
            }
        }
    }
}

/// Failure to set up an integration instance from a config entry
#[derive(Error, Debug)]
pub enum SetupError {
    /// The stored credentials were rejected; re-authentication is required
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The device could not be reached; setup may be retried later
    #[error("Device not ready: {0}")]
    NotReady(String),

    /// Any other failure
    #[error(transparent)]
    Other(#[from] Error),
}

impl From<RefreshError> for SetupError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::AuthFailed(msg) => SetupError::AuthFailed(msg),
            other => SetupError::NotReady(other.to_string()),
        }
    }
}

/// Errors produced while validating user input in a config flow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// The device could not be reached
    #[error("Cannot connect to device")]
    CannotConnect,

    /// The device rejected the API key
    #[error("Invalid authentication")]
    InvalidAuth,

    /// Any other failure
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl FlowError {
    /// Error code shown by the setup form
    pub fn code(&self) -> &'static str {
        match self {
            FlowError::CannotConnect => "cannot_connect",
            FlowError::InvalidAuth => "invalid_auth",
            FlowError::Unknown(_) => "unknown",
        }
    }
}
