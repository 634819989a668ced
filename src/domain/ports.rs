//! Domain Ports - Collaborator trait definitions for the client
//!
//! These traits define the boundaries between the client core and the
//! management channels of the array. Transports implement these traits to
//! provide concrete process-invocation or HTTP/XML functionality.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Command
// =============================================================================

/// One administrative command for the array's line-oriented management tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Command tokens, passed to the transport verbatim
    pub args: Vec<String>,
}

impl Command {
    /// Create a command from tokens
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}

// =============================================================================
// Raw Payload
// =============================================================================

/// Raw data returned by a management channel, before parsing
///
/// The CLI channel produces `Text`; the XML/REST channel delivers
/// already-decoded objects, one per resource instance.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// Semi-structured CLI output
    Text(String),
    /// One decoded object
    Object(serde_json::Value),
    /// A decoded list, one entry per resource instance
    ObjectList(Vec<serde_json::Value>),
}

impl RawPayload {
    pub fn is_text(&self) -> bool {
        matches!(self, RawPayload::Text(_))
    }
}

impl From<String> for RawPayload {
    fn from(text: String) -> Self {
        RawPayload::Text(text)
    }
}

impl From<&str> for RawPayload {
    fn from(text: &str) -> Self {
        RawPayload::Text(text.to_string())
    }
}

// =============================================================================
// Resource Identity
// =============================================================================

/// Identity used to re-fetch raw data for one resource or collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentity {
    /// Resource type name, matching a schema entry
    pub resource_type: String,
    /// Selector values identifying one instance (empty for collections
    /// and identity-less singletons)
    pub selectors: BTreeMap<String, String>,
}

impl ResourceIdentity {
    /// Identity for a whole collection or a singleton resource
    pub fn of_type(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            selectors: BTreeMap::new(),
        }
    }

    /// Add a selector value
    pub fn with_selector(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.selectors.insert(key.into(), value.into());
        self
    }
}

impl std::fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.resource_type)?;
        for (k, v) in &self.selectors {
            write!(f, " {}={}", k, v)?;
        }
        Ok(())
    }
}

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Executes one command against one endpoint of the array
///
/// Implementations are backed by process invocation or HTTP and live outside
/// this crate. Errors must be mapped onto the crate taxonomy so the
/// dispatcher can classify them: [`crate::Error::EndpointUnreachable`],
/// [`crate::Error::ConnectionDropped`], [`crate::Error::CredentialInvalid`],
/// or [`crate::Error::Transport`] for anything else.
///
/// The returned future must abort the underlying process or connection when
/// dropped; the dispatcher drops it on timeout and nothing may keep running
/// behind the caller's back.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn run(&self, endpoint: &str, command: &Command) -> Result<String>;
}

/// Cheap, side-effect-free reachability check against one endpoint
///
/// Independent of resource availability; the tracker measures the elapsed
/// time itself.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn ping(&self, endpoint: &str) -> Result<()>;
}

/// Retrieves fresh raw data for a resource or collection
#[async_trait]
pub trait RawFetch: Send + Sync {
    async fn fetch(&self, identity: &ResourceIdentity) -> Result<RawPayload>;
}
