//! Value Converters
//!
//! A closed converter registry resolved once per descriptor at schema-load
//! time. Names are tried against a fixed chain: primitive, enum type,
//! enum-list type (`<enum>_list`), nested resource type. Unresolvable names
//! fail the schema load, never a parse.
//!
//! Conversion itself is lenient: a matched raw value that does not convert
//! yields `Null`, the same as an unmatched optional field, because the
//! device emits fields opportunistically.

use crate::parser::output_parser::OutputParser;
use crate::parser::record::ParsedRecord;
use crate::parser::value::PropertyValue;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::warn;

// =============================================================================
// Primitive Converters
// =============================================================================

/// Built-in scalar transforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// Trimmed text (the default when no converter is named)
    Text,
    Int,
    Float,
    /// yes/no, true/false, on/off, enabled/disabled
    Bool,
    /// Capacity with unit suffix, normalized to bytes
    Size,
}

impl PrimitiveKind {
    fn by_name(name: &str) -> Option<Self> {
        match name {
            "text" => Some(PrimitiveKind::Text),
            "int" => Some(PrimitiveKind::Int),
            "float" => Some(PrimitiveKind::Float),
            "bool" => Some(PrimitiveKind::Bool),
            "size" => Some(PrimitiveKind::Size),
            _ => None,
        }
    }

    fn convert(&self, raw: &str) -> Option<PropertyValue> {
        let raw = raw.trim();
        match self {
            PrimitiveKind::Text => Some(PropertyValue::Text(raw.to_string())),
            PrimitiveKind::Int => raw.parse::<i64>().ok().map(PropertyValue::Int),
            PrimitiveKind::Float => raw.parse::<f64>().ok().map(PropertyValue::Float),
            PrimitiveKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "yes" | "true" | "on" | "enabled" => Some(PropertyValue::Bool(true)),
                "no" | "false" | "off" | "disabled" => Some(PropertyValue::Bool(false)),
                _ => None,
            },
            PrimitiveKind::Size => parse_size(raw).map(PropertyValue::Size),
        }
    }
}

/// Parse a capacity string like `"512 MB"` or `"2.5GB"` into bytes
///
/// A bare number is taken as bytes. Units are binary multiples.
fn parse_size(raw: &str) -> Option<u64> {
    let split = raw
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(raw.len());
    let (num, unit) = raw.split_at(split);
    let value: f64 = num.trim().parse().ok()?;
    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" | "KIB" => 1 << 10,
        "MB" | "MIB" => 1 << 20,
        "GB" | "GIB" => 1 << 30,
        "TB" | "TIB" => 1 << 40,
        "PB" | "PIB" => 1 << 50,
        _ => return None,
    };
    if value < 0.0 {
        return None;
    }
    Some((value * multiplier as f64) as u64)
}

// =============================================================================
// Enum Specs
// =============================================================================

/// One variant of a device enum
#[derive(Debug, Clone)]
pub struct EnumEntry {
    /// Canonical variant name produced by conversion
    pub name: String,
    /// Numeric code some channels emit instead of the token
    pub value: i64,
    /// Alternate tokens the device emits for this variant
    pub aliases: Vec<String>,
}

/// A named device enum, matched case-insensitively against token, alias,
/// or numeric code
#[derive(Debug, Clone)]
pub struct EnumSpec {
    pub name: String,
    pub entries: Vec<EnumEntry>,
}

impl EnumSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn entry(
        mut self,
        name: impl Into<String>,
        value: i64,
        aliases: &[&str],
    ) -> Self {
        self.entries.push(EnumEntry {
            name: name.into(),
            value,
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Match one raw token to a canonical variant name
    pub fn match_token(&self, token: &str) -> Option<&str> {
        let token = token.trim();
        for entry in &self.entries {
            if entry.name.eq_ignore_ascii_case(token)
                || entry.aliases.iter().any(|a| a.eq_ignore_ascii_case(token))
                || entry.value.to_string() == token
            {
                return Some(&entry.name);
            }
        }
        None
    }
}

// =============================================================================
// Converter
// =============================================================================

/// A resolved converter attached to one descriptor
#[derive(Debug, Clone)]
pub enum Converter {
    /// No conversion: raw capture semantics (text, or capture-group tuple)
    Identity,
    Primitive(PrimitiveKind),
    Enum(Arc<EnumSpec>),
    /// Comma-separated list of enum tokens
    EnumList(Arc<EnumSpec>),
    /// Nested resource type; the parser slot is filled by the registry once
    /// every parser in the catalog has been built
    Nested {
        type_name: String,
        selected: Option<Vec<String>>,
        parser: Arc<OnceLock<Arc<OutputParser>>>,
    },
}

impl Converter {
    /// Convert a raw text value
    pub fn convert_text(&self, key: &str, raw: &str) -> PropertyValue {
        match self {
            Converter::Identity => PropertyValue::Text(raw.trim().to_string()),
            Converter::Primitive(kind) => kind.convert(raw).unwrap_or_else(|| {
                warn!(key, raw, "value failed {:?} conversion, treating as absent", kind);
                PropertyValue::Null
            }),
            Converter::Enum(spec) => match spec.match_token(raw) {
                Some(name) => PropertyValue::Text(name.to_string()),
                None => {
                    warn!(key, raw, enum_name = %spec.name, "unknown enum token, treating as absent");
                    PropertyValue::Null
                }
            },
            Converter::EnumList(spec) => {
                let items = raw
                    .split(',')
                    .map(|t| t.trim())
                    .filter(|t| !t.is_empty())
                    .map(|t| match spec.match_token(t) {
                        Some(name) => PropertyValue::Text(name.to_string()),
                        None => {
                            warn!(key, token = t, enum_name = %spec.name, "unknown enum token in list");
                            PropertyValue::Null
                        }
                    })
                    .collect();
                PropertyValue::List(items)
            }
            Converter::Nested { selected, .. } => {
                let mut record = self.nested_parser().parse_single(raw);
                if let Some(keys) = selected {
                    record.retain_keys(keys);
                }
                PropertyValue::Record(record)
            }
        }
    }

    /// Convert an already-decoded value from an object-source payload
    pub fn convert_json(&self, key: &str, value: &serde_json::Value) -> PropertyValue {
        use serde_json::Value;
        match value {
            Value::Null => PropertyValue::Null,
            Value::String(s) => self.convert_text(key, s),
            Value::Bool(b) => PropertyValue::Bool(*b),
            Value::Number(n) => match self {
                Converter::Primitive(PrimitiveKind::Size) => n
                    .as_u64()
                    .map(PropertyValue::Size)
                    .unwrap_or(PropertyValue::Null),
                Converter::Primitive(PrimitiveKind::Float) => n
                    .as_f64()
                    .map(PropertyValue::Float)
                    .unwrap_or(PropertyValue::Null),
                Converter::Enum(spec) => match spec.match_token(&n.to_string()) {
                    Some(name) => PropertyValue::Text(name.to_string()),
                    None => PropertyValue::Null,
                },
                _ => {
                    if let Some(i) = n.as_i64() {
                        PropertyValue::Int(i)
                    } else {
                        n.as_f64().map(PropertyValue::Float).unwrap_or(PropertyValue::Null)
                    }
                }
            },
            Value::Object(map) => match self {
                Converter::Nested { selected, .. } => {
                    let mut record = self.nested_parser().parse_object(map);
                    if let Some(keys) = selected {
                        record.retain_keys(keys);
                    }
                    PropertyValue::Record(record)
                }
                _ => {
                    warn!(key, "object payload without a nested converter, treating as absent");
                    PropertyValue::Null
                }
            },
            Value::Array(items) => match self {
                Converter::Nested { selected, .. } => {
                    let parser = self.nested_parser();
                    let records = items
                        .iter()
                        .filter_map(|item| item.as_object())
                        .map(|map| {
                            let mut record = parser.parse_object(map);
                            if let Some(keys) = selected {
                                record.retain_keys(keys);
                            }
                            record
                        })
                        .collect();
                    PropertyValue::Records(records)
                }
                _ => PropertyValue::List(
                    items.iter().map(|item| self.convert_json(key, item)).collect(),
                ),
            },
        }
    }

    /// The nested parser; the registry guarantees the slot is filled before
    /// any parse runs
    fn nested_parser(&self) -> &Arc<OutputParser> {
        match self {
            Converter::Nested { parser, type_name, .. } => parser
                .get()
                .unwrap_or_else(|| panic!("nested parser '{}' not resolved at load", type_name)),
            _ => unreachable!("nested_parser on non-nested converter"),
        }
    }
}

// =============================================================================
// Converter Registry
// =============================================================================

/// Closed registry of named converters
///
/// Built before the parser registry and immutable afterwards. Ships with the
/// storage-domain enums every resource schema refers to; callers register
/// additional enums before building parsers.
#[derive(Debug, Clone, Default)]
pub struct ConverterRegistry {
    enums: HashMap<String, Arc<EnumSpec>>,
}

impl ConverterRegistry {
    /// Empty registry (primitives are always available)
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in storage-domain enums
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_enum(
            EnumSpec::new("raid_type")
                .entry("RAID0", 0, &["r0"])
                .entry("RAID1", 1, &["r1"])
                .entry("RAID3", 3, &["r3"])
                .entry("RAID5", 5, &["r5"])
                .entry("RAID6", 6, &["r6"])
                .entry("RAID10", 10, &["r1_0", "r10"])
                .entry("Mixed", 99, &[]),
        );
        registry.register_enum(
            EnumSpec::new("health_state")
                .entry("OK", 5, &["ok_but", "ready"])
                .entry("Degraded", 10, &["minor_failure"])
                .entry("Faulted", 20, &["major_failure", "critical_failure"])
                .entry("Offline", 30, &["non_recoverable"])
                .entry("Unknown", 0, &[]),
        );
        registry.register_enum(
            EnumSpec::new("sp_id")
                .entry("SPA", 0, &["a", "sp_a", "sp a"])
                .entry("SPB", 1, &["b", "sp_b", "sp b"]),
        );
        registry
    }

    /// Register a named enum spec
    pub fn register_enum(&mut self, spec: EnumSpec) {
        self.enums.insert(spec.name.clone(), Arc::new(spec));
    }

    /// Resolve a converter name against the fixed chain
    ///
    /// `is_resource_type` tells the registry which names denote resource
    /// types in the catalog under construction. Returns `None` when the name
    /// resolves to nothing; callers turn that into a load-time error.
    pub fn resolve(
        &self,
        name: &str,
        selected: Option<&[String]>,
        is_resource_type: impl Fn(&str) -> bool,
    ) -> Option<Converter> {
        if let Some(kind) = PrimitiveKind::by_name(name) {
            return Some(Converter::Primitive(kind));
        }
        if let Some(spec) = self.enums.get(name) {
            return Some(Converter::Enum(spec.clone()));
        }
        if let Some(base) = name.strip_suffix("_list") {
            if let Some(spec) = self.enums.get(base) {
                return Some(Converter::EnumList(spec.clone()));
            }
        }
        if is_resource_type(name) {
            return Some(Converter::Nested {
                type_name: name.to_string(),
                selected: selected.map(|s| s.to_vec()),
                parser: Arc::new(OnceLock::new()),
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_primitive_int() {
        let c = Converter::Primitive(PrimitiveKind::Int);
        assert_eq!(c.convert_text("id", "  42 "), PropertyValue::Int(42));
        assert_eq!(c.convert_text("id", "forty-two"), PropertyValue::Null);
    }

    #[test]
    fn test_primitive_bool() {
        let c = Converter::Primitive(PrimitiveKind::Bool);
        assert_eq!(c.convert_text("w", "Enabled"), PropertyValue::Bool(true));
        assert_eq!(c.convert_text("w", "NO"), PropertyValue::Bool(false));
        assert_eq!(c.convert_text("w", "maybe"), PropertyValue::Null);
    }

    #[test]
    fn test_size_units() {
        assert_eq!(parse_size("1024"), Some(1024));
        assert_eq!(parse_size("512 MB"), Some(512 << 20));
        assert_eq!(parse_size("2.5GB"), Some((2.5 * (1u64 << 30) as f64) as u64));
        assert_eq!(parse_size("10 parsecs"), None);
    }

    #[test]
    fn test_enum_matching() {
        let registry = ConverterRegistry::with_defaults();
        let c = registry.resolve("raid_type", None, |_| false).unwrap();
        assert_eq!(
            c.convert_text("raid", "r5"),
            PropertyValue::Text("RAID5".into())
        );
        assert_eq!(
            c.convert_text("raid", "RAID5"),
            PropertyValue::Text("RAID5".into())
        );
        assert_eq!(c.convert_text("raid", "RAID9"), PropertyValue::Null);
    }

    #[test]
    fn test_enum_list() {
        let registry = ConverterRegistry::with_defaults();
        let c = registry.resolve("sp_id_list", None, |_| false).unwrap();
        assert_eq!(
            c.convert_text("owners", "a, b"),
            PropertyValue::List(vec![
                PropertyValue::Text("SPA".into()),
                PropertyValue::Text("SPB".into()),
            ])
        );
    }

    #[test]
    fn test_resolution_chain_order() {
        let mut registry = ConverterRegistry::with_defaults();
        // a name that is both an enum and a resource type resolves as enum
        registry.register_enum(EnumSpec::new("disk").entry("SAS", 1, &[]));
        let c = registry.resolve("disk", None, |_| true).unwrap();
        assert_matches!(c, Converter::Enum(_));
    }

    #[test]
    fn test_unresolvable() {
        let registry = ConverterRegistry::with_defaults();
        assert!(registry.resolve("no_such", None, |_| false).is_none());
    }

    #[test]
    fn test_json_scalars() {
        let c = Converter::Identity;
        assert_eq!(
            c.convert_json("k", &serde_json::json!(7)),
            PropertyValue::Int(7)
        );
        assert_eq!(
            c.convert_json("k", &serde_json::json!(null)),
            PropertyValue::Null
        );
        assert_eq!(
            c.convert_json("k", &serde_json::json!("x")),
            PropertyValue::Text("x".into())
        );
    }
}
