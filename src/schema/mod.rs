pub mod parser;
pub mod types;

pub use parser::parse_schema_str;
pub use types::{GroupSchema, LeafKind, MultiSchema, SchemaNode, SchemaRef};

use std::rc::Rc;

use crate::error::{GroveMapError, Result};
use crate::record::{Record, RecordRegistry};
use crate::value::Value;

/// A validated schema: the immutable node tree plus the record type
/// registry generated from it.
///
/// Both are built once here and never change afterwards; views hold shared
/// handles into them.
#[derive(Debug, Clone)]
pub struct Schema {
    root: SchemaRef,
    records: Rc<RecordRegistry>,
}

impl Schema {
    /// Validate a root node and generate its record types. The top-level
    /// group must be named `root`.
    pub fn new(root_name: &str, root: SchemaRef) -> Result<Schema> {
        if root_name != "root" {
            return Err(GroveMapError::Configuration(format!(
                "top-level group must be named 'root', found '{root_name}'"
            )));
        }
        if root.as_group().is_none() {
            return Err(GroveMapError::Configuration(
                "schema root must be a group".to_string(),
            ));
        }
        let records = RecordRegistry::generate(root_name, &root)?;
        Ok(Schema {
            root,
            records: Rc::new(records),
        })
    }

    /// Parse the YAML declaration surface.
    pub fn from_yaml(text: &str) -> Result<Schema> {
        parser::parse_schema_str(text)
    }

    pub fn root(&self) -> &SchemaRef {
        &self.root
    }

    pub fn records(&self) -> &RecordRegistry {
        &self.records
    }

    pub(crate) fn records_rc(&self) -> Rc<RecordRegistry> {
        Rc::clone(&self.records)
    }

    /// Convenience for building a record of one of this schema's types.
    pub fn record<S>(&self, type_name: &str, values: Vec<(S, Value)>) -> Result<Record>
    where
        S: Into<String>,
    {
        self.records.record(type_name, values)
    }
}
