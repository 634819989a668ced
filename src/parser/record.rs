//! Parsed Records
//!
//! The flat key -> value result of parsing one resource instance. Records are
//! replaced wholesale on every parse, never partially mutated in place; the
//! only mutation is the merge step that reunifies one logical resource whose
//! description was split across two output sections.

use crate::parser::value::PropertyValue;
use indexmap::IndexMap;
use serde::Serialize;

// =============================================================================
// Parsed Record
// =============================================================================

/// Converted property map for one resource instance
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParsedRecord {
    values: IndexMap<String, PropertyValue>,
}

impl ParsedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property value, replacing any previous value for the key
    pub fn set(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.values.insert(key.into(), value);
    }

    /// Look up a property value by key
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate keys and values in parse order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.values.iter()
    }

    /// True when every stored value is null
    ///
    /// An all-null record is a parsing artifact (the split pattern matched a
    /// descriptive header, or the device reported "not found") and is
    /// discarded by the caller.
    pub fn is_all_null(&self) -> bool {
        self.values.values().all(|v| v.is_null())
    }

    /// True when any stored value is non-null
    pub fn any_non_null(&self) -> bool {
        !self.is_all_null()
    }

    /// Values of the given keys, or None if any of them is null or missing
    ///
    /// Used as the merge identity: two records merge only when they agree on
    /// every index field.
    pub fn signature(&self, keys: &[String]) -> Option<Vec<PropertyValue>> {
        let mut sig = Vec::with_capacity(keys.len());
        for key in keys {
            match self.get(key) {
                Some(v) if !v.is_null() => sig.push(v.clone()),
                _ => return None,
            }
        }
        Some(sig)
    }

    /// Fill null fields from another record
    ///
    /// A later non-null value only lands where this record holds null; the
    /// first-seen non-null value wins on conflict.
    pub fn fill_from(&mut self, other: ParsedRecord) {
        for (key, value) in other.values {
            match self.values.get(&key) {
                Some(existing) if !existing.is_null() => {}
                _ => {
                    if !value.is_null() || !self.values.contains_key(&key) {
                        self.values.insert(key, value);
                    }
                }
            }
        }
    }

    /// Keep only the named keys, dropping everything else
    ///
    /// Applies the "selected nested properties" restriction when a record is
    /// converted as a nested resource.
    pub fn retain_keys(&mut self, keys: &[String]) {
        self.values.retain(|k, _| keys.iter().any(|s| s == k));
    }
}

impl FromIterator<(String, PropertyValue)> for ParsedRecord {
    fn from_iter<T: IntoIterator<Item = (String, PropertyValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
