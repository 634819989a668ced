//! Lazy Resource Facade
//!
//! A typed view over one parsed record plus the identity needed to re-fetch
//! it. Attribute reads are lazy: the first read triggers at most one fetch
//! and parse, subsequent reads reuse the same record until `update()`
//! replaces it wholesale.

use crate::domain::ports::{RawFetch, RawPayload, ResourceIdentity};
use crate::error::{Error, Result};
use crate::parser::output_parser::OutputParser;
use crate::parser::record::ParsedRecord;
use crate::parser::value::PropertyValue;
use crate::resource::cache::ComputeCache;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

// =============================================================================
// Resource
// =============================================================================

/// One array resource (a LUN, a pool, a snapshot, ...)
pub struct Resource {
    parser: Arc<OutputParser>,
    fetch: Arc<dyn RawFetch>,
    identity: ResourceIdentity,
    record: RwLock<Option<ParsedRecord>>,
    instance_cache: ComputeCache,
    update_lock: tokio::sync::Mutex<()>,
}

impl Resource {
    /// A resource that has not been fetched yet
    pub fn new(
        parser: Arc<OutputParser>,
        fetch: Arc<dyn RawFetch>,
        identity: ResourceIdentity,
    ) -> Self {
        Self {
            parser,
            fetch,
            identity,
            record: RwLock::new(None),
            instance_cache: ComputeCache::new(),
            update_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// A resource born from an already-parsed record (collection children)
    pub fn from_record(
        parser: Arc<OutputParser>,
        fetch: Arc<dyn RawFetch>,
        identity: ResourceIdentity,
        record: ParsedRecord,
    ) -> Self {
        Self {
            parser,
            fetch,
            identity,
            record: RwLock::new(Some(record)),
            instance_cache: ComputeCache::new(),
            update_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn resource_type(&self) -> &str {
        self.parser.resource_type()
    }

    pub fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    pub fn parser(&self) -> &Arc<OutputParser> {
        &self.parser
    }

    /// Whether a record is currently held
    pub fn is_updated(&self) -> bool {
        self.record.read().is_some()
    }

    /// Clone of the current record, if any
    pub fn current_record(&self) -> Option<ParsedRecord> {
        self.record.read().clone()
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Replace the record from fresh data
    ///
    /// With `raw` given the injected fetcher is bypassed; otherwise it is
    /// invoked with this resource's identity. The record is swapped
    /// atomically and the instance cache cleared; a reader never observes a
    /// mix of old and new fields.
    pub async fn update(&self, raw: Option<RawPayload>) -> Result<&Self> {
        let _guard = self.update_lock.lock().await;
        self.refresh(raw).await?;
        Ok(self)
    }

    async fn refresh(&self, raw: Option<RawPayload>) -> Result<()> {
        let payload = match raw {
            Some(payload) => payload,
            None => self.fetch.fetch(&self.identity).await?,
        };
        let record = self.parser.parse_payload_single(&payload)?;
        debug!(
            resource_type = %self.parser.resource_type(),
            identity = %self.identity,
            "record replaced"
        );
        *self.record.write() = Some(record);
        self.instance_cache.clear();
        Ok(())
    }

    /// Fetch once if no record is held yet
    async fn ensure_updated(&self) -> Result<()> {
        if self.record.read().is_some() {
            return Ok(());
        }
        let _guard = self.update_lock.lock().await;
        // a racing caller may have completed the first fetch
        if self.record.read().is_some() {
            return Ok(());
        }
        self.refresh(None).await
    }

    // =========================================================================
    // Attribute Access
    // =========================================================================

    /// Read one attribute, fetching lazily on first access
    ///
    /// An unknown name always fails with `AttributeNotFound` so typos stay
    /// distinguishable from a currently-empty field, which reads as `Null`.
    pub async fn get(&self, key: &str) -> Result<PropertyValue> {
        if let Some(cached) = self.instance_cache.get::<PropertyValue>(key) {
            return Ok((*cached).clone());
        }
        self.ensure_updated().await?;
        if !self.parser.has_key(key) {
            return Err(Error::AttributeNotFound {
                resource_type: self.parser.resource_type().to_string(),
                name: key.to_string(),
            });
        }
        let record = self.record.read();
        Ok(record
            .as_ref()
            .and_then(|r| r.get(key))
            .cloned()
            .unwrap_or(PropertyValue::Null))
    }

    /// Text value of an attribute, `None` when null or not textual
    pub async fn get_text(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key).await?.as_text().map(str::to_string))
    }

    pub async fn get_int(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.get(key).await?.as_int())
    }

    pub async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.get(key).await?.as_bool())
    }

    /// Capacity attribute in bytes
    pub async fn get_size(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.get(key).await?.as_size())
    }

    /// Whether the resource existed on the array at last fetch
    ///
    /// True iff every index property is non-null; for identity-less
    /// singleton types, true iff any declared property is non-null.
    pub async fn existed(&self) -> Result<bool> {
        self.ensure_updated().await?;
        let record = self.record.read();
        let record = match record.as_ref() {
            Some(r) => r,
            None => return Ok(false),
        };
        let index_keys = self.parser.index_keys();
        if index_keys.is_empty() {
            Ok(record.any_non_null())
        } else {
            Ok(record.signature(index_keys).is_some())
        }
    }

    // =========================================================================
    // Instance Memoization
    // =========================================================================

    /// Memoize a derived computation on this instance
    ///
    /// Cleared whenever `update()` replaces the record.
    pub fn memoize<T, F>(&self, name: &str, compute: F) -> Arc<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        self.instance_cache.get_or_compute(name, compute)
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("resource_type", &self.parser.resource_type())
            .field("identity", &self.identity)
            .field("updated", &self.is_updated())
            .finish()
    }
}
