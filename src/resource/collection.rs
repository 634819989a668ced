//! Resource Collections
//!
//! An ordered sequence of child resources built by parsing one list payload.
//! Children are born already-updated from their records, share the parent's
//! fetch collaborator, and carry identities derived from their index values.
//! An overridable per-item filter (default: keep all) prunes the sequence
//! before it is swapped in atomically.

use crate::domain::ports::{RawFetch, RawPayload, ResourceIdentity};
use crate::error::{Error, Result};
use crate::parser::output_parser::OutputParser;
use crate::parser::value::PropertyValue;
use crate::resource::base::Resource;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Per-item filter applied on every `update()`
pub type ResourceFilter = Arc<dyn Fn(&Resource) -> bool + Send + Sync>;

// =============================================================================
// Resource Collection
// =============================================================================

/// Ordered collection of resources of one type
pub struct ResourceCollection {
    parser: Arc<OutputParser>,
    fetch: Arc<dyn RawFetch>,
    identity: ResourceIdentity,
    filter: Option<ResourceFilter>,
    items: RwLock<Option<Vec<Arc<Resource>>>>,
    update_lock: tokio::sync::Mutex<()>,
}

impl ResourceCollection {
    pub fn new(
        parser: Arc<OutputParser>,
        fetch: Arc<dyn RawFetch>,
        identity: ResourceIdentity,
    ) -> Self {
        Self {
            parser,
            fetch,
            identity,
            filter: None,
            items: RwLock::new(None),
            update_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Override the per-item filter
    pub fn with_filter(mut self, filter: ResourceFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn resource_type(&self) -> &str {
        self.parser.resource_type()
    }

    pub fn is_updated(&self) -> bool {
        self.items.read().is_some()
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Fetch and parse the list payload, rebuilding the child sequence
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
        let records = self.parser.parse_payload(&payload)?;

        let mut children = Vec::with_capacity(records.len());
        for record in records {
            let mut identity = ResourceIdentity::of_type(self.parser.resource_type());
            for key in self.parser.index_keys() {
                if let Some(value) = record.get(key) {
                    if !value.is_null() {
                        identity = identity.with_selector(key.clone(), value.to_string());
                    }
                }
            }
            let child = Resource::from_record(
                self.parser.clone(),
                self.fetch.clone(),
                identity,
                record,
            );
            let keep = self.filter.as_ref().map_or(true, |f| f(&child));
            if keep {
                children.push(Arc::new(child));
            }
        }

        debug!(
            resource_type = %self.parser.resource_type(),
            count = children.len(),
            "collection replaced"
        );
        *self.items.write() = Some(children);
        Ok(())
    }

    async fn ensure_updated(&self) -> Result<()> {
        if self.items.read().is_some() {
            return Ok(());
        }
        let _guard = self.update_lock.lock().await;
        if self.items.read().is_some() {
            return Ok(());
        }
        self.refresh(None).await
    }

    // =========================================================================
    // Access
    // =========================================================================

    /// The current child sequence, fetching lazily on first access
    pub async fn items(&self) -> Result<Vec<Arc<Resource>>> {
        self.ensure_updated().await?;
        Ok(self.items.read().as_ref().cloned().unwrap_or_default())
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.items().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.items().await?.is_empty())
    }

    /// Column projection: the ordered values of one element property
    ///
    /// The name is validated against the element schema, so a typo fails
    /// with `AttributeNotFound` instead of projecting nothing.
    pub async fn values_of(&self, key: &str) -> Result<Vec<PropertyValue>> {
        if !self.parser.has_key(key) {
            return Err(Error::AttributeNotFound {
                resource_type: self.parser.resource_type().to_string(),
                name: key.to_string(),
            });
        }
        let items = self.items().await?;
        Ok(items
            .iter()
            .map(|child| {
                child
                    .current_record()
                    .and_then(|record| record.get(key).cloned())
                    .unwrap_or(PropertyValue::Null)
            })
            .collect())
    }
}

impl std::fmt::Debug for ResourceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCollection")
            .field("resource_type", &self.parser.resource_type())
            .field("updated", &self.is_updated())
            .finish()
    }
}
