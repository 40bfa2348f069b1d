use indexmap::IndexMap;
use serde::Deserialize;

use super::types::{SchemaNode, SchemaRef};
use super::Schema;
use crate::error::{GroveMapError, Result};

/// Raw declaration surface as it appears in YAML: a nested ordered mapping
/// declares a group, a sequence wraps a multi-group's element shape, and a
/// string tag names a leaf kind or the link marker.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNode {
    Tag(String),
    Multi(Vec<RawNode>),
    Group(IndexMap<String, RawNode>),
}

/// Parse a schema YAML string into a validated [`Schema`].
///
/// The document must hold exactly one top-level entry: the root group,
/// named `root`.
pub fn parse_schema_str(text: &str) -> Result<Schema> {
    let doc: IndexMap<String, RawNode> = serde_yaml::from_str(text)?;
    if doc.len() != 1 {
        return Err(GroveMapError::Configuration(format!(
            "schema document must declare exactly one root group, found {}",
            doc.len()
        )));
    }
    let mut entries = doc.into_iter();
    match entries.next() {
        Some((root_name, raw)) => {
            let node = convert(&root_name, raw)?;
            Schema::new(&root_name, node)
        }
        None => Err(GroveMapError::Configuration(
            "schema document is empty".to_string(),
        )),
    }
}

fn convert(name: &str, raw: RawNode) -> Result<SchemaRef> {
    match raw {
        RawNode::Tag(tag) => match tag.as_str() {
            "int" => Ok(SchemaNode::int()),
            "string" | "str" => Ok(SchemaNode::string()),
            "float" => Ok(SchemaNode::float()),
            "array" => Ok(SchemaNode::array()),
            "link" => Ok(SchemaNode::link()),
            other => Err(GroveMapError::Configuration(format!(
                "unknown type tag '{other}' for field '{name}'"
            ))),
        },
        RawNode::Multi(items) => {
            let count = items.len();
            let mut items = items.into_iter();
            match (items.next(), items.next()) {
                (Some(only), None) => SchemaNode::multi(convert(name, only)?),
                _ => Err(GroveMapError::Configuration(format!(
                    "multi-group '{name}' must declare exactly one element shape, found {count}"
                ))),
            }
        }
        RawNode::Group(children) => {
            let mut pairs = Vec::with_capacity(children.len());
            for (child_name, child_raw) in children {
                let child = convert(&child_name, child_raw)?;
                pairs.push((child_name, child));
            }
            SchemaNode::group(pairs)
        }
    }
}
