//! Declarative Schema Catalog
//!
//! The authoring surface for resource types: a static table per type mapping
//! labels to keys, index flags, patterns, and converter names. Catalogs are
//! loaded once (from YAML, JSON, or the builder API) and compiled into a
//! read-only [`crate::parser::ParserRegistry`].

use crate::error::Result;
use serde::{Deserialize, Serialize};

// =============================================================================
// Property Spec
// =============================================================================

/// Declarative spec for one property of a resource type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySpec {
    /// Label to match (literal, or a verbatim pattern when `is_regex_label`)
    pub label: String,
    /// Unique key within the resource type
    pub key: String,
    /// Marks the field whose label delimits instances
    #[serde(default)]
    pub is_index: bool,
    /// Treat the label verbatim as a match pattern
    #[serde(default)]
    pub is_regex_label: bool,
    /// Terminating pattern for a multi-line field
    #[serde(default)]
    pub end_pattern: Option<String>,
    /// Converter name, resolved at load against the converter registry
    #[serde(default)]
    pub converter: Option<String>,
    /// Restriction applied when the converter resolves to a nested resource
    #[serde(default)]
    pub selected_properties: Option<Vec<String>>,
}

impl PropertySpec {
    pub fn new(label: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
            is_index: false,
            is_regex_label: false,
            end_pattern: None,
            converter: None,
            selected_properties: None,
        }
    }

    pub fn index(mut self) -> Self {
        self.is_index = true;
        self
    }

    pub fn regex_label(mut self) -> Self {
        self.is_regex_label = true;
        self
    }

    pub fn end_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.end_pattern = Some(pattern.into());
        self
    }

    pub fn converter(mut self, name: impl Into<String>) -> Self {
        self.converter = Some(name.into());
        self
    }

    pub fn selected_properties<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_properties = Some(keys.into_iter().map(Into::into).collect());
        self
    }
}

// =============================================================================
// Resource Schema
// =============================================================================

/// All property specs for one resource type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub properties: Vec<PropertySpec>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties: Vec::new(),
        }
    }

    pub fn property(mut self, spec: PropertySpec) -> Self {
        self.properties.push(spec);
        self
    }
}

// =============================================================================
// Schema Catalog
// =============================================================================

/// The full set of resource schemas for one device family
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaCatalog {
    pub resources: Vec<ResourceSchema>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(mut self, schema: ResourceSchema) -> Self {
        self.resources.push(schema);
        self
    }

    /// Load a catalog from YAML
    pub fn from_yaml(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Load a catalog from JSON
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn get(&self, resource_type: &str) -> Option<&ResourceSchema> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type)
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.get(resource_type).is_some()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|r| r.resource_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let catalog = SchemaCatalog::new().resource(
            ResourceSchema::new("pool")
                .property(PropertySpec::new("Pool ID:", "id").index().converter("int"))
                .property(PropertySpec::new("Pool Name:", "name")),
        );
        let schema = catalog.get("pool").unwrap();
        assert_eq!(schema.properties.len(), 2);
        assert!(schema.properties[0].is_index);
        assert_eq!(schema.properties[0].converter.as_deref(), Some("int"));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
resources:
  - resource_type: pool
    properties:
      - label: "Pool ID:"
        key: id
        is_index: true
        converter: int
      - label: "Pool Name:"
        key: name
      - label: "Disks:"
        key: disks
        end_pattern: "\\n\\n"
"#;
        let catalog = SchemaCatalog::from_yaml(yaml).unwrap();
        assert!(catalog.contains("pool"));
        let schema = catalog.get("pool").unwrap();
        assert_eq!(schema.properties[2].end_pattern.as_deref(), Some("\\n\\n"));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "resources": [
                {
                    "resource_type": "lun",
                    "properties": [
                        {"label": "LUN ID:", "key": "id", "is_index": true}
                    ]
                }
            ]
        }"#;
        let catalog = SchemaCatalog::from_json(json).unwrap();
        assert_eq!(catalog.type_names().collect::<Vec<_>>(), vec!["lun"]);
    }
}
