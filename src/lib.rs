//! Storage Array Client
//!
//! A typed client library for managing an enterprise storage array through
//! two heterogeneous management channels: a line-oriented administrative
//! command tool reachable via a network-attached management processor, and
//! an XML/REST management protocol delivering decoded object payloads.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Consumer Code                              │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────────┐      ┌────────────────────────────────┐  │
//! │  │   Resource Model      │      │      Command Dispatch          │  │
//! │  │  Resource             │      │  CommandDispatcher             │  │
//! │  │  ResourceCollection   │      │  LivenessTracker (heartbeat)   │  │
//! │  │  ComputeCache         │      │  EndpointState / latency avg   │  │
//! │  └──────────┬────────────┘      └──────────────┬─────────────────┘  │
//! │             │                                  │                    │
//! │  ┌──────────┴────────────┐      ┌──────────────┴─────────────────┐  │
//! │  │   Parsing Engine      │      │    Collaborator Traits         │  │
//! │  │  SchemaCatalog        │      │  CommandTransport / Probe /    │  │
//! │  │  ParserRegistry       │      │  RawFetch (impl'd by caller)   │  │
//! │  │  OutputParser         │      └────────────────────────────────┘  │
//! │  └───────────────────────┘                                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`parser`]: declarative, regex-driven engine turning CLI text or
//!   decoded object payloads into typed property maps
//! - [`resource`]: lazy, cached resource object model on top of the engine
//! - [`dispatch`]: endpoint liveness tracking and resilient command dispatch
//! - [`domain`]: collaborator traits and shared domain types
//! - [`error`]: error types and retry classification

pub mod dispatch;
pub mod domain;
pub mod error;
pub mod parser;
pub mod resource;

// Re-export commonly used types
pub use dispatch::{
    CommandDispatcher, DispatchConfig, EndpointRole, EndpointSnapshot, HeartbeatConfig,
    LivenessTracker, TrackerSnapshot,
};

pub use domain::ports::{
    Command, CommandTransport, Probe, RawFetch, RawPayload, ResourceIdentity,
};

pub use parser::{
    Converter, ConverterRegistry, EnumSpec, OutputParser, ParsedRecord, ParserRegistry,
    PropertyDescriptor, PropertySpec, PropertyValue, ResourceSchema, SchemaCatalog,
};

pub use resource::{ComputeCache, Resource, ResourceCollection, ResourceFilter};

pub use error::{Error, Result, RetryClass};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
