//! Error types for the storage array client
//!
//! Provides structured error types for all client components including
//! schema loading, output parsing, the resource model, and dispatch.

use thiserror::Error;

/// Unified error type for the client
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Schema / Load-Time Errors
    // =========================================================================
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Unknown converter '{converter}' for {resource_type}.{key}")]
    UnknownConverter {
        converter: String,
        resource_type: String,
        key: String,
    },

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Pattern compile error: {0}")]
    Pattern(#[from] regex::Error),

    // =========================================================================
    // Resource Model Errors
    // =========================================================================
    #[error("Attribute not found: {resource_type}.{name}")]
    AttributeNotFound {
        resource_type: String,
        name: String,
    },

    #[error("Unexpected payload shape for {resource_type}: {reason}")]
    PayloadShape {
        resource_type: String,
        reason: String,
    },

    // =========================================================================
    // Endpoint / Dispatch Errors
    // =========================================================================
    #[error("Endpoint unreachable: {address}")]
    EndpointUnreachable { address: String },

    #[error("No live storage processor endpoint")]
    NoLiveEndpoint,

    #[error("Connection dropped mid-call on {address}")]
    ConnectionDropped { address: String },

    #[error("Credentials rejected by the array")]
    CredentialInvalid,

    #[error("Command timed out after {timeout_secs}s")]
    CommandTimeout { timeout_secs: u64 },

    #[error("Transport failure: {0}")]
    Transport(String),

    // =========================================================================
    // Decode Errors
    // =========================================================================
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    #[error("YAML decode error: {0}")]
    YamlDecode(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How the dispatcher should react to a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Mark the endpoint down and retry on a freshly selected endpoint
    ReselectEndpoint,
    /// Retry the same endpoint (the link died mid-call, the peer may be fine)
    SameEndpoint,
    /// Fatal until credentials are reset
    CredentialFailure,
    /// Not retryable
    NoRetry,
}

impl Error {
    /// Classify this error for the dispatcher's retry policy
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Error::EndpointUnreachable { .. } => RetryClass::ReselectEndpoint,
            Error::ConnectionDropped { .. } => RetryClass::SameEndpoint,
            Error::CredentialInvalid => RetryClass::CredentialFailure,
            _ => RetryClass::NoRetry,
        }
    }

    /// Check if this error reflects a transient condition
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::EndpointUnreachable { .. }
                | Error::ConnectionDropped { .. }
                | Error::NoLiveEndpoint
                | Error::CommandTimeout { .. }
        )
    }

    /// Check if this error is fatal to further dispatch until reconfigured
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::CredentialInvalid
                | Error::Schema(_)
                | Error::UnknownConverter { .. }
                | Error::Pattern(_)
        )
    }
}

/// Result type alias for the client
pub type Result<T> = std::result::Result<T, Error>;
