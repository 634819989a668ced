//! Lazy Cached Resource Model
//!
//! Typed facades over parsed records:
//!
//! - [`Resource`]: one array resource with lazy fetch-and-parse, typed
//!   attribute access, and an instance memoization cache
//! - [`ResourceCollection`]: an ordered sequence of child resources built
//!   from one list payload, with an overridable per-item filter and column
//!   projection
//! - [`ComputeCache`]: the per-key double-checked memoization layer, both
//!   process-wide and per-instance

pub mod base;
pub mod cache;
pub mod collection;

pub use base::Resource;
pub use cache::ComputeCache;
pub use collection::{ResourceCollection, ResourceFilter};
