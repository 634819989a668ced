//! Parser Registry
//!
//! Compiles a [`SchemaCatalog`] into the process-lifetime table of
//! [`OutputParser`]s, keyed by resource-type name. The build is two-phase:
//! every parser is constructed first, then nested-converter slots are
//! resolved against the finished table, so forward and mutual references
//! between resource types work and a dangling name fails the load rather
//! than the first parse. The registry is read-only after build.

use crate::error::{Error, Result};
use crate::parser::converter::{Converter, ConverterRegistry};
use crate::parser::descriptor::PropertyDescriptor;
use crate::parser::output_parser::OutputParser;
use crate::parser::schema::SchemaCatalog;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::info;

// =============================================================================
// Parser Registry
// =============================================================================

/// Read-only table of compiled parsers, one per resource type
#[derive(Debug, Clone, Default)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<OutputParser>>,
}

impl ParserRegistry {
    /// Compile a catalog against a converter registry
    pub fn build(catalog: &SchemaCatalog, converters: &ConverterRegistry) -> Result<Self> {
        let mut parsers: HashMap<String, Arc<OutputParser>> = HashMap::new();
        let mut pending: Vec<(String, Arc<OnceLock<Arc<OutputParser>>>)> = Vec::new();

        for schema in &catalog.resources {
            let mut descriptors = Vec::with_capacity(schema.properties.len());
            for (sequence, spec) in schema.properties.iter().enumerate() {
                let converter = match &spec.converter {
                    None => Converter::Identity,
                    Some(name) => {
                        match converters.resolve(
                            name,
                            spec.selected_properties.as_deref(),
                            |t| catalog.contains(t),
                        ) {
                            Some(converter) => {
                                if let Converter::Nested {
                                    type_name, parser, ..
                                } = &converter
                                {
                                    pending.push((type_name.clone(), parser.clone()));
                                }
                                converter
                            }
                            None => {
                                return Err(Error::UnknownConverter {
                                    converter: name.clone(),
                                    resource_type: schema.resource_type.clone(),
                                    key: spec.key.clone(),
                                })
                            }
                        }
                    }
                };

                let mut builder = PropertyDescriptor::builder(&spec.label, &spec.key)
                    .sequence(sequence)
                    .converter(converter);
                if spec.is_index {
                    builder = builder.index();
                }
                if spec.is_regex_label {
                    builder = builder.regex_label();
                }
                if let Some(end) = &spec.end_pattern {
                    builder = builder.end_pattern(end);
                }
                descriptors.push(builder.build()?);
            }

            let parser = Arc::new(OutputParser::new(&schema.resource_type, descriptors)?);
            if parsers
                .insert(schema.resource_type.clone(), parser)
                .is_some()
            {
                return Err(Error::Schema(format!(
                    "duplicate resource type '{}'",
                    schema.resource_type
                )));
            }
        }

        // resolve nested slots now the full table exists
        for (type_name, slot) in pending {
            let parser = parsers
                .get(&type_name)
                .ok_or_else(|| Error::UnknownResourceType(type_name.clone()))?;
            let _ = slot.set(parser.clone());
        }

        info!(parsers = parsers.len(), "built parser registry");
        Ok(Self { parsers })
    }

    /// Look up the parser for a resource type
    pub fn get(&self, resource_type: &str) -> Result<Arc<OutputParser>> {
        self.parsers
            .get(resource_type)
            .cloned()
            .ok_or_else(|| Error::UnknownResourceType(resource_type.to_string()))
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}
