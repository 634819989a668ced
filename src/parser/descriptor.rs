//! Property Descriptors
//!
//! One field spec: a label (literal or regex), a unique key, an index flag,
//! an optional multi-line terminator, and a converter. The matcher is
//! compiled once at schema-load time; an invalid pattern never survives to
//! parse time.

use crate::error::{Error, Result};
use crate::parser::converter::Converter;
use crate::parser::value::PropertyValue;
use regex::Regex;

// =============================================================================
// Property Descriptor
// =============================================================================

/// One field of a resource schema
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    label: String,
    key: String,
    sequence: usize,
    is_index: bool,
    is_regex_label: bool,
    end_pattern: Option<String>,
    converter: Converter,
    matcher: Regex,
}

impl PropertyDescriptor {
    /// Start building a descriptor
    pub fn builder(label: impl Into<String>, key: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder {
            label: label.into(),
            key: key.into(),
            sequence: 0,
            is_index: false,
            is_regex_label: false,
            end_pattern: None,
            converter: Converter::Identity,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn sequence(&self) -> usize {
        self.sequence
    }

    pub fn is_index(&self) -> bool {
        self.is_index
    }

    pub fn is_regex_label(&self) -> bool {
        self.is_regex_label
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Pattern that marks where an instance of this field begins, used by
    /// the splitter when this descriptor is the index
    pub fn split_pattern(&self) -> String {
        if self.is_regex_label {
            format!("(?im){}", self.label)
        } else {
            format!("(?im)^[ \t]*{}", regex::escape(&self.label))
        }
    }

    /// Match this field inside one chunk and convert the raw value
    ///
    /// An unmatched field yields `Null`; zero capture groups yield `Null`
    /// (presence-only match); one group is the raw value; more than one is a
    /// compound tuple of the participating groups.
    pub fn extract(&self, chunk: &str) -> PropertyValue {
        let caps = match self.matcher.captures(chunk) {
            Some(caps) => caps,
            None => return PropertyValue::Null,
        };
        match self.matcher.captures_len() - 1 {
            0 => PropertyValue::Null,
            1 => match caps.get(1) {
                Some(m) => self.converter.convert_text(&self.key, m.as_str().trim()),
                None => PropertyValue::Null,
            },
            _ => PropertyValue::Groups(
                caps.iter()
                    .skip(1)
                    .flatten()
                    .map(|m| m.as_str().trim().to_string())
                    .collect(),
            ),
        }
    }

    /// Exact-key conversion for object-source payloads
    pub fn extract_object(&self, map: &serde_json::Map<String, serde_json::Value>) -> PropertyValue {
        match map.get(&self.label) {
            Some(value) => self.converter.convert_json(&self.key, value),
            None => PropertyValue::Null,
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`PropertyDescriptor`]
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    label: String,
    key: String,
    sequence: usize,
    is_index: bool,
    is_regex_label: bool,
    end_pattern: Option<String>,
    converter: Converter,
}

impl DescriptorBuilder {
    /// Mark this field as the instance delimiter
    pub fn index(mut self) -> Self {
        self.is_index = true;
        self
    }

    /// Treat the label verbatim as a match pattern
    pub fn regex_label(mut self) -> Self {
        self.is_regex_label = true;
        self
    }

    /// Terminating pattern for a multi-line field
    pub fn end_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.end_pattern = Some(pattern.into());
        self
    }

    pub fn converter(mut self, converter: Converter) -> Self {
        self.converter = converter;
        self
    }

    pub fn sequence(mut self, sequence: usize) -> Self {
        self.sequence = sequence;
        self
    }

    /// Compile the matcher and validate the configuration
    pub fn build(self) -> Result<PropertyDescriptor> {
        if self.is_regex_label && self.end_pattern.is_some() {
            return Err(Error::Schema(format!(
                "descriptor '{}': end pattern and regex label are mutually exclusive",
                self.key
            )));
        }

        let pattern = if self.is_regex_label {
            format!("(?im){}", self.label)
        } else if let Some(end) = &self.end_pattern {
            format!("(?is){}\\s*(.*?){}", regex::escape(&self.label), end)
        } else {
            format!("(?im)^[ \t]*{}[ \t]*(.*)$", regex::escape(&self.label))
        };
        let matcher = Regex::new(&pattern)?;

        Ok(PropertyDescriptor {
            label: self.label,
            key: self.key,
            sequence: self.sequence,
            is_index: self.is_index,
            is_regex_label: self.is_regex_label,
            end_pattern: self.end_pattern,
            converter: self.converter,
            matcher,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::converter::PrimitiveKind;
    use assert_matches::assert_matches;

    #[test]
    fn test_literal_label_line_match() {
        let d = PropertyDescriptor::builder("Pool Name:", "name")
            .build()
            .unwrap();
        let chunk = "Pool ID:  0\nPool Name:  Pool4File\nState: Ready\n";
        assert_eq!(
            d.extract(chunk),
            PropertyValue::Text("Pool4File".into())
        );
    }

    #[test]
    fn test_literal_label_case_insensitive() {
        let d = PropertyDescriptor::builder("POOL NAME:", "name")
            .build()
            .unwrap();
        assert_eq!(
            d.extract("  pool name:   p1  \n"),
            PropertyValue::Text("p1".into())
        );
    }

    #[test]
    fn test_unmatched_yields_null() {
        let d = PropertyDescriptor::builder("Pool Name:", "name")
            .build()
            .unwrap();
        assert_eq!(d.extract("LUN ID: 3\n"), PropertyValue::Null);
    }

    #[test]
    fn test_end_pattern_spans_lines() {
        let d = PropertyDescriptor::builder("Disks:", "disks")
            .end_pattern(r"(?:\r?\n){2}")
            .build()
            .unwrap();
        let chunk = "Disks:\nBus 0 Enclosure 0 Disk 0\nBus 0 Enclosure 0 Disk 1\n\nState: Ready\n";
        assert_eq!(
            d.extract(chunk),
            PropertyValue::Text("Bus 0 Enclosure 0 Disk 0\nBus 0 Enclosure 0 Disk 1".into())
        );
    }

    #[test]
    fn test_regex_label_two_groups() {
        let d = PropertyDescriptor::builder(r"SP (\w+) is on bus (\d+)", "sp_bus")
            .regex_label()
            .build()
            .unwrap();
        assert_eq!(
            d.extract("note: SP A is on bus 0 today\n"),
            PropertyValue::Groups(vec!["A".into(), "0".into()])
        );
    }

    #[test]
    fn test_regex_label_zero_groups_is_presence_only() {
        let d = PropertyDescriptor::builder(r"cannot find", "missing")
            .regex_label()
            .build()
            .unwrap();
        assert_eq!(d.extract("Cannot find the pool\n"), PropertyValue::Null);
    }

    #[test]
    fn test_end_pattern_and_regex_label_rejected() {
        let result = PropertyDescriptor::builder("x", "x")
            .regex_label()
            .end_pattern("$")
            .build();
        assert_matches!(result, Err(Error::Schema(_)));
    }

    #[test]
    fn test_converter_applied_to_capture() {
        let d = PropertyDescriptor::builder("Pool ID:", "id")
            .converter(Converter::Primitive(PrimitiveKind::Int))
            .build()
            .unwrap();
        assert_eq!(d.extract("Pool ID:  42\n"), PropertyValue::Int(42));
    }

    #[test]
    fn test_conversion_failure_yields_null() {
        let d = PropertyDescriptor::builder("Pool ID:", "id")
            .converter(Converter::Primitive(PrimitiveKind::Int))
            .build()
            .unwrap();
        assert_eq!(d.extract("Pool ID:  N/A\n"), PropertyValue::Null);
    }

    #[test]
    fn test_object_extract() {
        let d = PropertyDescriptor::builder("poolId", "id")
            .converter(Converter::Primitive(PrimitiveKind::Int))
            .build()
            .unwrap();
        let map = serde_json::json!({"poolId": 3});
        assert_eq!(
            d.extract_object(map.as_object().unwrap()),
            PropertyValue::Int(3)
        );
    }
}
