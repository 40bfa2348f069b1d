use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{GroveMapError, Result};
use crate::value::ScalarKind;

/// Shared handle to an immutable schema node.
pub type SchemaRef = Rc<SchemaNode>;

/// One node of the schema tree.
///
/// The tree is acyclic; links are named pointers resolved at access time,
/// not structural edges. Every get/set dispatch in the view layer is a
/// single exhaustive match over this variant.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// Ordered mapping of declared field names to sub-schemas.
    Group(GroupSchema),
    /// Dynamically sized homogeneous collection of one element shape.
    Multi(MultiSchema),
    /// Alias to another node elsewhere in the tree.
    Link,
    /// Scalar attribute or array dataset.
    Leaf(LeafKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSchema {
    children: IndexMap<String, SchemaRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiSchema {
    element: SchemaRef,
}

/// Value kinds a leaf field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Int,
    Str,
    Float,
    Array,
}

impl LeafKind {
    /// The scalar kind of an attribute leaf; `None` for array datasets.
    pub fn scalar_kind(self) -> Option<ScalarKind> {
        match self {
            LeafKind::Int => Some(ScalarKind::Int),
            LeafKind::Str => Some(ScalarKind::Str),
            LeafKind::Float => Some(ScalarKind::Float),
            LeafKind::Array => None,
        }
    }
}

impl SchemaNode {
    /// Build a group node from `(name, child)` pairs in declaration order.
    /// Duplicate field names are a configuration error.
    pub fn group<I, S>(children: I) -> Result<SchemaRef>
    where
        I: IntoIterator<Item = (S, SchemaRef)>,
        S: Into<String>,
    {
        let mut map = IndexMap::new();
        for (name, child) in children {
            let name = name.into();
            if map.insert(name.clone(), child).is_some() {
                return Err(GroveMapError::Configuration(format!(
                    "duplicate field name '{name}' in group declaration"
                )));
            }
        }
        Ok(Rc::new(SchemaNode::Group(GroupSchema { children: map })))
    }

    /// Build a multi-group node around its single element shape. The
    /// element must itself be group-shaped.
    pub fn multi(element: SchemaRef) -> Result<SchemaRef> {
        if !element.is_group_shaped() {
            return Err(GroveMapError::Configuration(
                "multi-group element must be a group or multi-group".to_string(),
            ));
        }
        Ok(Rc::new(SchemaNode::Multi(MultiSchema { element })))
    }

    pub fn link() -> SchemaRef {
        Rc::new(SchemaNode::Link)
    }

    pub fn leaf(kind: LeafKind) -> SchemaRef {
        Rc::new(SchemaNode::Leaf(kind))
    }

    pub fn int() -> SchemaRef {
        SchemaNode::leaf(LeafKind::Int)
    }

    pub fn string() -> SchemaRef {
        SchemaNode::leaf(LeafKind::Str)
    }

    pub fn float() -> SchemaRef {
        SchemaNode::leaf(LeafKind::Float)
    }

    pub fn array() -> SchemaRef {
        SchemaNode::leaf(LeafKind::Array)
    }

    /// Groups and multi-groups occupy store groups of their own; leaves and
    /// links live inside their parent's group.
    pub fn is_group_shaped(&self) -> bool {
        matches!(self, SchemaNode::Group(_) | SchemaNode::Multi(_))
    }

    pub fn as_group(&self) -> Option<&GroupSchema> {
        match self {
            SchemaNode::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_multi(&self) -> Option<&MultiSchema> {
        match self {
            SchemaNode::Multi(m) => Some(m),
            _ => None,
        }
    }
}

impl GroupSchema {
    pub fn get(&self, name: &str) -> Option<&SchemaRef> {
        self.children.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// Declared fields in declaration order.
    pub fn children(&self) -> impl Iterator<Item = (&String, &SchemaRef)> {
        self.children.iter()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.children.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn children_map(&self) -> &IndexMap<String, SchemaRef> {
        &self.children
    }
}

impl MultiSchema {
    pub fn element(&self) -> &SchemaRef {
        &self.element
    }
}
