//! Output Parser
//!
//! Turns one raw blob of CLI output (or an already-decoded object payload)
//! into typed property maps. A parser is an ordered set of descriptors for
//! one resource type: it splits the blob into per-instance chunks on the
//! index descriptor's label, parses each chunk, discards chunks that fail to
//! produce an identity, and merges duplicate partial records that describe
//! the same instance across two output sections.

use crate::error::{Error, Result};
use crate::domain::ports::RawPayload;
use crate::parser::descriptor::PropertyDescriptor;
use crate::parser::record::ParsedRecord;
use regex::Regex;
use tracing::{debug, warn};

// =============================================================================
// Output Parser
// =============================================================================

/// Per-resource-type parser over an ordered descriptor set
#[derive(Debug, Clone)]
pub struct OutputParser {
    resource_type: String,
    descriptors: Vec<PropertyDescriptor>,
    index_keys: Vec<String>,
    split_regex: Option<Regex>,
}

impl OutputParser {
    /// Build a parser from descriptors, validating key uniqueness and
    /// compiling the split pattern
    pub fn new(
        resource_type: impl Into<String>,
        mut descriptors: Vec<PropertyDescriptor>,
    ) -> Result<Self> {
        let resource_type = resource_type.into();
        descriptors.sort_by_key(|d| d.sequence());

        for (i, d) in descriptors.iter().enumerate() {
            if descriptors[..i].iter().any(|prev| prev.key() == d.key()) {
                return Err(Error::Schema(format!(
                    "{}: duplicate property key '{}'",
                    resource_type,
                    d.key()
                )));
            }
        }

        let index_descriptors: Vec<&PropertyDescriptor> =
            descriptors.iter().filter(|d| d.is_index()).collect();
        if index_descriptors.len() > 1 {
            warn!(
                resource_type = %resource_type,
                splitter = index_descriptors[0].key(),
                "multiple index descriptors, splitting on the earliest"
            );
        }
        let split_regex = match index_descriptors.first() {
            Some(d) => Some(Regex::new(&d.split_pattern())?),
            None => None,
        };
        let index_keys = index_descriptors
            .iter()
            .map(|d| d.key().to_string())
            .collect();

        Ok(Self {
            resource_type,
            descriptors,
            index_keys,
            split_regex,
        })
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn descriptors(&self) -> &[PropertyDescriptor] {
        &self.descriptors
    }

    /// Keys of the index descriptors, in sequence order
    pub fn index_keys(&self) -> &[String] {
        &self.index_keys
    }

    /// Whether `key` names a declared property of this resource type
    pub fn has_key(&self, key: &str) -> bool {
        self.descriptors.iter().any(|d| d.key() == key)
    }

    /// All declared property keys in sequence order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.key())
    }

    // =========================================================================
    // Text Source
    // =========================================================================

    /// Parse one blob as a single record
    ///
    /// Fields that do not match stay null; the caller decides what a fully
    /// null record means (for a resource, "did not exist").
    pub fn parse_single(&self, text: &str) -> ParsedRecord {
        self.parse_chunk(text)
    }

    /// Parse a blob that may describe any number of instances
    ///
    /// Every index-label match starts a new chunk; without an index the
    /// whole blob is one chunk. Chunks whose index fields did not all match
    /// are dropped, since a resource without its identity cannot be
    /// represented; this is how "not found" responses collapse to zero
    /// records. All-null records from the split pattern matching descriptive
    /// headers are dropped too.
    pub fn parse_all(&self, text: &str) -> Vec<ParsedRecord> {
        let records: Vec<ParsedRecord> = self
            .chunks(text)
            .into_iter()
            .map(|chunk| self.parse_chunk(chunk))
            .filter(|record| self.keep(record))
            .collect();
        self.merge(records)
    }

    fn chunks<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let split_regex = match &self.split_regex {
            Some(re) => re,
            None => return vec![text],
        };
        let starts: Vec<usize> = split_regex.find_iter(text).map(|m| m.start()).collect();
        debug!(
            resource_type = %self.resource_type,
            chunks = starts.len(),
            "split output blob"
        );
        starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(text.len());
                &text[start..end]
            })
            .collect()
    }

    fn parse_chunk(&self, chunk: &str) -> ParsedRecord {
        let mut record = ParsedRecord::new();
        for descriptor in &self.descriptors {
            record.set(descriptor.key(), descriptor.extract(chunk));
        }
        record
    }

    fn keep(&self, record: &ParsedRecord) -> bool {
        for key in &self.index_keys {
            if record.get(key).map_or(true, |v| v.is_null()) {
                return false;
            }
        }
        record.any_non_null()
    }

    /// Merge records that share identical values on every index field
    ///
    /// Later non-null values fill earlier nulls; the first-seen non-null
    /// value wins on conflict.
    fn merge(&self, records: Vec<ParsedRecord>) -> Vec<ParsedRecord> {
        if self.index_keys.is_empty() {
            return records;
        }
        let mut merged: Vec<ParsedRecord> = Vec::with_capacity(records.len());
        for record in records {
            let signature = record.signature(&self.index_keys);
            let existing = merged.iter_mut().find(|candidate| {
                signature.is_some() && candidate.signature(&self.index_keys) == signature
            });
            match existing {
                Some(target) => target.fill_from(record),
                None => merged.push(record),
            }
        }
        merged
    }

    // =========================================================================
    // Object Source
    // =========================================================================

    /// Parse one decoded object: exact key lookup per label, no regex
    pub fn parse_object(&self, map: &serde_json::Map<String, serde_json::Value>) -> ParsedRecord {
        let mut record = ParsedRecord::new();
        for descriptor in &self.descriptors {
            record.set(descriptor.key(), descriptor.extract_object(map));
        }
        record
    }

    /// Parse a decoded list: one record per entry, no splitting
    pub fn parse_object_all(&self, items: &[serde_json::Value]) -> Vec<ParsedRecord> {
        items
            .iter()
            .filter_map(|item| match item.as_object() {
                Some(map) => Some(self.parse_object(map)),
                None => {
                    warn!(
                        resource_type = %self.resource_type,
                        "skipping non-object entry in list payload"
                    );
                    None
                }
            })
            .filter(|record| self.keep(record))
            .collect()
    }

    // =========================================================================
    // Payload Dispatch
    // =========================================================================

    /// Parse any payload into a sequence of records
    pub fn parse_payload(&self, payload: &RawPayload) -> Result<Vec<ParsedRecord>> {
        match payload {
            RawPayload::Text(text) => Ok(self.parse_all(text)),
            RawPayload::Object(value) => match value.as_object() {
                Some(map) => Ok(vec![self.parse_object(map)]),
                None => Err(Error::PayloadShape {
                    resource_type: self.resource_type.clone(),
                    reason: "expected an object".into(),
                }),
            },
            RawPayload::ObjectList(items) => Ok(self.parse_object_all(items)),
        }
    }

    /// Parse any payload into exactly one record
    pub fn parse_payload_single(&self, payload: &RawPayload) -> Result<ParsedRecord> {
        match payload {
            RawPayload::Text(text) => Ok(self.parse_single(text)),
            RawPayload::Object(value) => match value.as_object() {
                Some(map) => Ok(self.parse_object(map)),
                None => Err(Error::PayloadShape {
                    resource_type: self.resource_type.clone(),
                    reason: "expected an object".into(),
                }),
            },
            RawPayload::ObjectList(items) => Err(Error::PayloadShape {
                resource_type: self.resource_type.clone(),
                reason: format!("expected one object, got a list of {}", items.len()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::converter::{Converter, PrimitiveKind};
    use crate::parser::value::PropertyValue;

    fn pool_parser() -> OutputParser {
        OutputParser::new(
            "pool",
            vec![
                PropertyDescriptor::builder("Pool Name:", "name")
                    .sequence(1)
                    .build()
                    .unwrap(),
                PropertyDescriptor::builder("Pool ID:", "id")
                    .index()
                    .converter(Converter::Primitive(PrimitiveKind::Int))
                    .sequence(0)
                    .build()
                    .unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_single_index_match_yields_one_record() {
        let parser = pool_parser();
        let records = parser.parse_all("Pool ID:  0\nPool Name:  Pool4File\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("id"), Some(&PropertyValue::Int(0)));
        assert_eq!(
            records[0].get("name"),
            Some(&PropertyValue::Text("Pool4File".into()))
        );
    }

    #[test]
    fn test_two_pools_end_to_end() {
        let parser = pool_parser();
        let blob = "Pool ID:  0\nPool Name:  Pool4File\nPool ID:  1\nPool Name:  Pool2\n";
        let records = parser.parse_all(blob);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("id"), Some(&PropertyValue::Int(0)));
        assert_eq!(
            records[0].get("name"),
            Some(&PropertyValue::Text("Pool4File".into()))
        );
        assert_eq!(records[1].get("id"), Some(&PropertyValue::Int(1)));
        assert_eq!(
            records[1].get("name"),
            Some(&PropertyValue::Text("Pool2".into()))
        );
    }

    #[test]
    fn test_not_found_collapses_to_zero_records() {
        let parser = pool_parser();
        let records = parser.parse_all("The specified pool does not exist.\n");
        assert!(records.is_empty());
    }

    #[test]
    fn test_merge_across_sections() {
        let parser = OutputParser::new(
            "lun",
            vec![
                PropertyDescriptor::builder("LUN ID:", "id")
                    .index()
                    .converter(Converter::Primitive(PrimitiveKind::Int))
                    .sequence(0)
                    .build()
                    .unwrap(),
                PropertyDescriptor::builder("Name:", "name")
                    .sequence(1)
                    .build()
                    .unwrap(),
                PropertyDescriptor::builder("State:", "state")
                    .sequence(2)
                    .build()
                    .unwrap(),
            ],
        )
        .unwrap();

        // first section lists names, second section lists states
        let blob = "LUN ID: 7\nName: vol7\nLUN ID: 8\nName: vol8\n\
                    LUN ID: 7\nState: Bound\nLUN ID: 8\nState: Ready\n";
        let records = parser.parse_all(blob);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].get("name"),
            Some(&PropertyValue::Text("vol7".into()))
        );
        assert_eq!(
            records[0].get("state"),
            Some(&PropertyValue::Text("Bound".into()))
        );
        assert_eq!(
            records[1].get("state"),
            Some(&PropertyValue::Text("Ready".into()))
        );
    }

    #[test]
    fn test_merge_never_overwrites_non_null() {
        let parser = pool_parser();
        let blob = "Pool ID: 0\nPool Name: First\nPool ID: 0\nPool Name: Second\n";
        let records = parser.parse_all(blob);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].get("name"),
            Some(&PropertyValue::Text("First".into()))
        );
    }

    #[test]
    fn test_no_index_whole_blob_is_one_chunk() {
        let parser = OutputParser::new(
            "agent",
            vec![
                PropertyDescriptor::builder("Revision:", "revision")
                    .sequence(0)
                    .build()
                    .unwrap(),
                PropertyDescriptor::builder("Model:", "model")
                    .sequence(1)
                    .build()
                    .unwrap(),
            ],
        )
        .unwrap();
        let records = parser.parse_all("Revision: 7.33\nModel: VNX5300\n");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].get("model"),
            Some(&PropertyValue::Text("VNX5300".into()))
        );
    }

    #[test]
    fn test_parse_single_allows_null_index() {
        let parser = pool_parser();
        let record = parser.parse_single("Pool Name: Orphan\n");
        assert_eq!(record.get("id"), Some(&PropertyValue::Null));
        assert_eq!(
            record.get("name"),
            Some(&PropertyValue::Text("Orphan".into()))
        );
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let result = OutputParser::new(
            "pool",
            vec![
                PropertyDescriptor::builder("Pool ID:", "id").build().unwrap(),
                PropertyDescriptor::builder("Pool Id:", "id").build().unwrap(),
            ],
        );
        assert!(matches!(result, Err(Error::Schema(_))));
    }

    #[test]
    fn test_earliest_index_splits() {
        let parser = OutputParser::new(
            "disk",
            vec![
                PropertyDescriptor::builder("Disk ID:", "disk_id")
                    .index()
                    .sequence(0)
                    .build()
                    .unwrap(),
                PropertyDescriptor::builder("Slot:", "slot")
                    .index()
                    .sequence(1)
                    .build()
                    .unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(parser.index_keys(), &["disk_id".to_string(), "slot".to_string()]);
        let blob = "Disk ID: d0\nSlot: 1\nDisk ID: d1\nSlot: 2\n";
        assert_eq!(parser.parse_all(blob).len(), 2);
    }

    #[test]
    fn test_object_list_parsing() {
        let parser = pool_parser();
        let items = vec![
            serde_json::json!({"Pool ID:": 0, "Pool Name:": "Pool4File"}),
            serde_json::json!({"Pool ID:": 1, "Pool Name:": "Pool2"}),
        ];
        let records = parser.parse_object_all(&items);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("id"), Some(&PropertyValue::Int(1)));
    }

    #[test]
    fn test_object_list_drops_identity_less_entries() {
        let parser = pool_parser();
        let items = vec![serde_json::json!({"Pool Name:": "NoId"})];
        assert!(parser.parse_object_all(&items).is_empty());
    }
}
