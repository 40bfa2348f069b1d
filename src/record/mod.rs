use indexmap::IndexMap;

use crate::error::{GroveMapError, Result};
use crate::schema::{GroupSchema, MultiSchema, SchemaNode, SchemaRef};
use crate::value::Value;

/// Structural record type generated for one group shape.
///
/// One type exists per distinct group name in a schema; a multi-group's
/// element shape carries the multi-group's own field name and is shared by
/// all of its instances.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    name: String,
    fields: Vec<String>,
}

impl RecordType {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field names in schema declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Build a record of this type. Every declared field must be supplied
    /// exactly once; the result is normalized to declaration order.
    pub fn instantiate<S>(&self, values: Vec<(S, Value)>) -> Result<Record>
    where
        S: Into<String>,
    {
        let mut supplied: IndexMap<String, Value> = IndexMap::new();
        for (name, value) in values {
            let name = name.into();
            if supplied.insert(name.clone(), value).is_some() {
                return Err(GroveMapError::TypeMismatch(format!(
                    "field '{name}' supplied twice for record '{}'",
                    self.name
                )));
            }
        }

        let mut ordered = IndexMap::new();
        for field in &self.fields {
            let value = supplied.shift_remove(field).ok_or_else(|| {
                GroveMapError::TypeMismatch(format!(
                    "record '{}' is missing field '{field}'",
                    self.name
                ))
            })?;
            ordered.insert(field.clone(), value);
        }
        if let Some(extra) = supplied.keys().next() {
            return Err(GroveMapError::TypeMismatch(format!(
                "record '{}' has no field '{extra}'",
                self.name
            )));
        }

        Ok(Record {
            type_name: self.name.clone(),
            values: ordered,
        })
    }
}

/// A value of a [`RecordType`]; the unit of bulk group read/write.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    values: IndexMap<String, Value>,
}

impl Record {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn from_parts(type_name: String, values: IndexMap<String, Value>) -> Record {
        Record { type_name, values }
    }
}

/// Namespace of the record types generated for one schema.
///
/// Built once per schema instantiation by a post-order walk of the tree and
/// immutable afterwards. Registering the same name twice is tolerated when
/// the field sets are identical and rejected otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordRegistry {
    types: IndexMap<String, RecordType>,
}

impl RecordRegistry {
    pub(crate) fn generate(root_name: &str, root: &SchemaRef) -> Result<RecordRegistry> {
        let mut registry = RecordRegistry::default();
        let group = root.as_group().ok_or_else(|| {
            GroveMapError::Configuration("schema root must be a group".to_string())
        })?;
        registry.walk_group(root_name, group)?;
        Ok(registry)
    }

    fn walk_group(&mut self, name: &str, group: &GroupSchema) -> Result<()> {
        for (child_name, child) in group.children() {
            match &**child {
                SchemaNode::Group(g) => self.walk_group(child_name, g)?,
                SchemaNode::Multi(m) => self.walk_multi(child_name, m)?,
                SchemaNode::Link | SchemaNode::Leaf(_) => {}
            }
        }
        self.register(name, group.field_names())
    }

    /// The element shape is visited once under the multi-group's own name,
    /// regardless of how many instances a store ends up holding. Nested
    /// multi-groups pass the name down unchanged.
    fn walk_multi(&mut self, name: &str, multi: &MultiSchema) -> Result<()> {
        match &**multi.element() {
            SchemaNode::Group(g) => self.walk_group(name, g),
            SchemaNode::Multi(m) => self.walk_multi(name, m),
            SchemaNode::Link | SchemaNode::Leaf(_) => Err(GroveMapError::Configuration(
                "multi-group element must be a group or multi-group".to_string(),
            )),
        }
    }

    fn register(&mut self, name: &str, fields: Vec<String>) -> Result<()> {
        if let Some(existing) = self.types.get(name) {
            if existing.fields == fields {
                return Ok(());
            }
            return Err(GroveMapError::Configuration(format!(
                "group name '{name}' declared twice with different field sets \
                 ({:?} vs {:?})",
                existing.fields, fields
            )));
        }
        self.types.insert(
            name.to_string(),
            RecordType {
                name: name.to_string(),
                fields,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RecordType> {
        self.types.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Look up a type and build a record of it in one step.
    pub fn record<S>(&self, type_name: &str, values: Vec<(S, Value)>) -> Result<Record>
    where
        S: Into<String>,
    {
        let record_type = self
            .get(type_name)
            .ok_or_else(|| GroveMapError::UnknownRecordType(type_name.to_string()))?;
        record_type.instantiate(values)
    }
}
