//! Typed Property Values
//!
//! The converted value forms a parsed field can take. `Null` is a first-class
//! value: CLI output omits fields opportunistically and an absent field is
//! not an error.

use crate::parser::record::ParsedRecord;
use serde::Serialize;

// =============================================================================
// Property Value
// =============================================================================

/// One converted field value inside a [`ParsedRecord`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Field absent or unconvertible
    Null,
    /// Trimmed raw text
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Capacity in bytes
    Size(u64),
    /// Compound field: one string per participating capture group
    Groups(Vec<String>),
    /// Converted enum-list field
    List(Vec<PropertyValue>),
    /// Nested resource converted in place
    Record(ParsedRecord),
    /// Nested list of resources converted in place
    Records(Vec<ParsedRecord>),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Capacity in bytes, if this is a size value
    pub fn as_size(&self) -> Option<u64> {
        match self {
            PropertyValue::Size(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&ParsedRecord> {
        match self {
            PropertyValue::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl Default for PropertyValue {
    fn default() -> Self {
        PropertyValue::Null
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Text(s) => write!(f, "{}", s),
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Float(v) => write!(f, "{}", v),
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::Size(v) => write!(f, "{}B", v),
            PropertyValue::Groups(gs) => write!(f, "({})", gs.join(", ")),
            PropertyValue::List(vs) => {
                let parts: Vec<String> = vs.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            PropertyValue::Record(_) => write!(f, "<record>"),
            PropertyValue::Records(rs) => write!(f, "<{} records>", rs.len()),
        }
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Text(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}
