//! Declarative Output Parsing Engine
//!
//! Turns semi-structured CLI text (or already-decoded object payloads) into
//! typed property maps, driven entirely by per-resource-type descriptor
//! tables:
//!
//! - [`PropertyDescriptor`]: one field spec (label/regex, key, index flag,
//!   converter, optional multi-line terminator)
//! - [`OutputParser`]: splits one blob into per-instance chunks, parses each
//!   chunk, and merges duplicate partial records
//! - [`SchemaCatalog`]: the declarative authoring surface (YAML/JSON or
//!   builder)
//! - [`ParserRegistry`]: the compiled, read-only table of parsers
//!
//! Adding a resource type means adding a schema entry, never touching the
//! engine.

pub mod converter;
pub mod descriptor;
pub mod output_parser;
pub mod record;
pub mod registry;
pub mod schema;
pub mod value;

pub use converter::{Converter, ConverterRegistry, EnumEntry, EnumSpec, PrimitiveKind};
pub use descriptor::{DescriptorBuilder, PropertyDescriptor};
pub use output_parser::OutputParser;
pub use record::ParsedRecord;
pub use registry::ParserRegistry;
pub use schema::{PropertySpec, ResourceSchema, SchemaCatalog};
pub use value::PropertyValue;
