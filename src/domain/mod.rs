//! Core domain types and collaborator traits

pub mod ports;

pub use ports::{
    Command, CommandTransport, Probe, RawFetch, RawPayload, ResourceIdentity,
};
