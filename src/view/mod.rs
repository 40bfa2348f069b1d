use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::error::{GroveMapError, Result};
use crate::path::StorePath;
use crate::record::{Record, RecordRegistry, RecordType};
use crate::schema::{Schema, SchemaNode, SchemaRef};
use crate::store::StoreHandle;
use crate::value::{Scalar, ScalarKind, Value};

/// State shared by every view of one bound file: the store handle and the
/// schema's record registry.
struct ViewCtx {
    store: StoreHandle,
    records: Rc<RecordRegistry>,
}

type Ctx = Rc<ViewCtx>;

/// Non-owning back-reference to a parent view, used only for ancestor
/// walks during link resolution.
#[derive(Clone)]
enum ParentLink {
    Group(Weak<GroupInner>),
    Multi(Weak<MultiInner>),
}

impl ParentLink {
    fn upgrade(&self) -> Option<View> {
        match self {
            ParentLink::Group(weak) => weak.upgrade().map(|inner| View::Group(GroupView { inner })),
            ParentLink::Multi(weak) => {
                weak.upgrade().map(|inner| View::Multi(MultiGroupView { inner }))
            }
        }
    }
}

struct GroupInner {
    name: String,
    path: StorePath,
    /// Declared fields, in declaration order.
    fields: IndexMap<String, SchemaRef>,
    record_name: String,
    parent: Option<ParentLink>,
    ctx: Ctx,
    /// One cached child view per group-shaped field, bound eagerly at
    /// construction and owned for the lifetime of this view.
    children: RefCell<IndexMap<String, View>>,
}

struct MultiInner {
    name: String,
    path: StorePath,
    element: SchemaRef,
    record_name: String,
    parent: Option<ParentLink>,
    ctx: Ctx,
    /// Materialized elements in index order. Discovered elements keep
    /// their stored names; created slots are named by position.
    elements: RefCell<Vec<View>>,
}

/// View over a group location: field-level get/set dispatched by the
/// declared schema kind of each field.
#[derive(Clone)]
pub struct GroupView {
    inner: Rc<GroupInner>,
}

/// Sequence-shaped view over a dynamically sized run of homogeneous
/// elements under one location.
#[derive(Clone)]
pub struct MultiGroupView {
    inner: Rc<MultiInner>,
}

/// Either flavor of view; what navigation and link resolution return.
#[derive(Clone)]
pub enum View {
    Group(GroupView),
    Multi(MultiGroupView),
}

/// What [`GroupView::get`] and [`MultiGroupView::get`] produce, depending
/// on the declared kind of the accessed field.
#[derive(Debug, Clone)]
pub enum Item {
    Group(GroupView),
    Multi(MultiGroupView),
    Scalar(Scalar),
    Array(Vec<f64>),
}

impl Item {
    fn from_view(view: View) -> Item {
        match view {
            View::Group(group) => Item::Group(group),
            View::Multi(multi) => Item::Multi(multi),
        }
    }

    pub fn as_group(&self) -> Option<&GroupView> {
        match self {
            Item::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_multi(&self) -> Option<&MultiGroupView> {
        match self {
            Item::Multi(multi) => Some(multi),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Item::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[f64]> {
        match self {
            Item::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_scalar().and_then(Scalar::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_scalar().and_then(Scalar::as_f64)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }
}

impl GroupView {
    /// Bind a schema's root group to the root of a store. The caller (the
    /// file wrapper) owns the store handle; every view shares it.
    pub(crate) fn new_root(schema: &Schema, store: StoreHandle) -> Result<GroupView> {
        let ctx = Rc::new(ViewCtx {
            store,
            records: schema.records_rc(),
        });
        let group = schema.root().as_group().ok_or_else(|| {
            GroveMapError::Configuration("schema root must be a group".to_string())
        })?;
        GroupView::create(
            "root".to_string(),
            "root".to_string(),
            StorePath::root(),
            group.children_map().clone(),
            None,
            ctx,
        )
    }

    fn create(
        name: String,
        record_name: String,
        path: StorePath,
        fields: IndexMap<String, SchemaRef>,
        parent: Option<ParentLink>,
        ctx: Ctx,
    ) -> Result<GroupView> {
        let inner = Rc::new(GroupInner {
            name,
            path,
            fields,
            record_name,
            parent,
            ctx,
            children: RefCell::new(IndexMap::new()),
        });

        // bind one child view per group-shaped field, eagerly
        for (field, node) in inner.fields.iter() {
            let child = match &**node {
                SchemaNode::Group(group) => Some(View::Group(GroupView::create(
                    field.clone(),
                    field.clone(),
                    inner.path.join(field),
                    group.children_map().clone(),
                    Some(ParentLink::Group(Rc::downgrade(&inner))),
                    inner.ctx.clone(),
                )?)),
                SchemaNode::Multi(multi) => Some(View::Multi(MultiGroupView::create(
                    field.clone(),
                    field.clone(),
                    inner.path.join(field),
                    multi.element().clone(),
                    Some(ParentLink::Group(Rc::downgrade(&inner))),
                    inner.ctx.clone(),
                )?)),
                SchemaNode::Link | SchemaNode::Leaf(_) => None,
            };
            if let Some(child) = child {
                inner.children.borrow_mut().insert(field.clone(), child);
            }
        }

        Ok(GroupView { inner })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn path(&self) -> &StorePath {
        &self.inner.path
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.inner.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.fields.is_empty()
    }

    /// Declared field names in declaration order, independent of whether a
    /// field has been written yet.
    pub fn fields(&self) -> Vec<String> {
        self.inner.fields.keys().cloned().collect()
    }

    /// Read one field, dispatched by its declared schema kind.
    pub fn get(&self, field: &str) -> Result<Item> {
        let node = self.schema_of(field)?;
        match &*node {
            SchemaNode::Group(_) | SchemaNode::Multi(_) => self
                .child_view(field)
                .map(Item::from_view)
                .ok_or_else(|| self.unknown_field(field)),
            SchemaNode::Link => Ok(Item::from_view(self.resolve_link(field)?)),
            SchemaNode::Leaf(kind) => match kind.scalar_kind() {
                Some(scalar_kind) => Ok(Item::Scalar(self.read_scalar_attr(field, scalar_kind)?)),
                None => Ok(Item::Array(self.read_array_dataset(field)?)),
            },
        }
    }

    /// Write one field, dispatched by its declared schema kind.
    ///
    /// Bulk writes (records, sequences, mappings) apply field by field in
    /// declaration order and are not atomic: a failure partway through
    /// leaves the already-written fields in the store.
    pub fn set(&self, field: &str, value: Value) -> Result<()> {
        let node = self.schema_of(field)?;
        match &*node {
            SchemaNode::Group(_) => {
                let child = self.group_child(field)?;
                match value {
                    Value::Record(record) => child.write_record(&record),
                    other => Err(GroveMapError::TypeMismatch(format!(
                        "field '{field}' at {} expects a record, got {}",
                        self.inner.path,
                        other.kind_name()
                    ))),
                }
            }
            SchemaNode::Multi(_) => {
                let child = self.multi_child(field)?;
                match value {
                    Value::Seq(items) => child.write_sequence(items),
                    Value::Map(pairs) => child.write_mapping(pairs),
                    other => Err(GroveMapError::TypeMismatch(format!(
                        "field '{field}' at {} expects a sequence or mapping, got {}",
                        self.inner.path,
                        other.kind_name()
                    ))),
                }
            }
            SchemaNode::Link => match value {
                Value::View(target) => {
                    let mut store = self.inner.ctx.store.borrow_mut();
                    store.require_group(&self.inner.path)?;
                    store.write_link(&self.inner.path, field, target.path())
                }
                other => Err(GroveMapError::TypeMismatch(format!(
                    "field '{field}' at {} expects a view, got {}",
                    self.inner.path,
                    other.kind_name()
                ))),
            },
            SchemaNode::Leaf(kind) => match kind.scalar_kind() {
                Some(scalar_kind) => {
                    let kind_name = value.kind_name();
                    let scalar = value.into_scalar().ok_or_else(|| {
                        GroveMapError::TypeMismatch(format!(
                            "field '{field}' at {} expects a scalar, got {kind_name}",
                            self.inner.path
                        ))
                    })?;
                    let scalar = scalar.coerce(scalar_kind)?;
                    let mut store = self.inner.ctx.store.borrow_mut();
                    store.require_group(&self.inner.path)?;
                    store.write_attr(&self.inner.path, field, scalar)
                }
                None => match value {
                    Value::Array(values) => {
                        let mut store = self.inner.ctx.store.borrow_mut();
                        store.require_group(&self.inner.path)?;
                        store.write_dataset(&self.inner.path, field, values)
                    }
                    other => Err(GroveMapError::TypeMismatch(format!(
                        "field '{field}' at {} expects an array, got {}",
                        self.inner.path,
                        other.kind_name()
                    ))),
                },
            },
        }
    }

    /// Field deletion is not part of this design.
    pub fn delete(&self, field: &str) -> Result<()> {
        Err(GroveMapError::Unsupported(format!(
            "cannot delete '{field}' from group at {}",
            self.inner.path
        )))
    }

    /// Materialize this group as a record, reading every declared field.
    pub fn read_record(&self) -> Result<Record> {
        let mut values = IndexMap::new();
        for field in self.inner.fields.keys() {
            values.insert(field.clone(), self.read_field_value(field)?);
        }
        Ok(Record::from_parts(self.inner.record_name.clone(), values))
    }

    /// The record type this group instantiates.
    pub fn record_type(&self) -> Result<&RecordType> {
        self.inner
            .ctx
            .records
            .get(&self.inner.record_name)
            .ok_or_else(|| GroveMapError::UnknownRecordType(self.inner.record_name.clone()))
    }

    /// Build a record of this group's type.
    pub fn new_record<S>(&self, values: Vec<(S, Value)>) -> Result<Record>
    where
        S: Into<String>,
    {
        self.inner.ctx.records.record(&self.inner.record_name, values)
    }

    pub(crate) fn write_record(&self, record: &Record) -> Result<()> {
        if record.type_name() != self.inner.record_name {
            return Err(GroveMapError::TypeMismatch(format!(
                "group at {} expects a '{}' record, got '{}'",
                self.inner.path,
                self.inner.record_name,
                record.type_name()
            )));
        }
        for (field, value) in record.fields() {
            self.set(field, value.clone())?;
        }
        Ok(())
    }

    fn read_field_value(&self, field: &str) -> Result<Value> {
        let node = self.schema_of(field)?;
        match &*node {
            SchemaNode::Group(_) => self.group_child(field)?.read_record().map(Value::Record),
            SchemaNode::Multi(_) => self.multi_child(field)?.read_value(),
            SchemaNode::Link => self.resolve_link(field).map(Value::View),
            SchemaNode::Leaf(kind) => match kind.scalar_kind() {
                Some(scalar_kind) => {
                    Ok(Value::from(self.read_scalar_attr(field, scalar_kind)?))
                }
                None => Ok(Value::Array(self.read_array_dataset(field)?)),
            },
        }
    }

    fn read_scalar_attr(&self, field: &str, kind: ScalarKind) -> Result<Scalar> {
        let raw = self
            .inner
            .ctx
            .store
            .borrow()
            .read_attr(&self.inner.path, field)?;
        let raw = raw.ok_or_else(|| {
            GroveMapError::Store(format!(
                "no attribute '{field}' at {}",
                self.inner.path
            ))
        })?;
        raw.coerce(kind)
    }

    fn read_array_dataset(&self, field: &str) -> Result<Vec<f64>> {
        let data = self
            .inner
            .ctx
            .store
            .borrow()
            .read_dataset(&self.inner.path, field)?;
        data.ok_or_else(|| {
            GroveMapError::Store(format!("no dataset '{field}' at {}", self.inner.path))
        })
    }

    fn schema_of(&self, field: &str) -> Result<SchemaRef> {
        self.inner
            .fields
            .get(field)
            .cloned()
            .ok_or_else(|| self.unknown_field(field))
    }

    fn unknown_field(&self, field: &str) -> GroveMapError {
        GroveMapError::UnknownField {
            path: self.inner.path.to_string(),
            field: field.to_string(),
        }
    }

    fn group_child(&self, field: &str) -> Result<GroupView> {
        match self.child_view(field) {
            Some(View::Group(group)) => Ok(group),
            _ => Err(self.unknown_field(field)),
        }
    }

    fn multi_child(&self, field: &str) -> Result<MultiGroupView> {
        match self.child_view(field) {
            Some(View::Multi(multi)) => Ok(multi),
            _ => Err(self.unknown_field(field)),
        }
    }

    fn child_view(&self, segment: &str) -> Option<View> {
        self.inner.children.borrow().get(segment).cloned()
    }

    fn parent_view(&self) -> Option<View> {
        self.inner.parent.as_ref().and_then(ParentLink::upgrade)
    }

    /// Resolve a link field to the live view it aliases: read the stored
    /// target, climb the parent chain to the shared ancestor, then walk
    /// back down through cached child views.
    fn resolve_link(&self, field: &str) -> Result<View> {
        let target = self
            .inner
            .ctx
            .store
            .borrow()
            .read_link(&self.inner.path, field)?;
        let target = target.ok_or_else(|| {
            GroveMapError::Resolution(format!(
                "no link stored for '{field}' at {}",
                self.inner.path
            ))
        })?;
        let common = self.inner.path.shared_path(&target);
        let ancestor = self.ancestor_at(&common)?;
        descend_to(ancestor, &target)
    }

    fn ancestor_at(&self, path: &StorePath) -> Result<View> {
        let mut current = View::Group(self.clone());
        loop {
            if current.path() == path {
                return Ok(current);
            }
            current = match current.parent_view() {
                Some(parent) => parent,
                None => {
                    return Err(GroveMapError::Resolution(format!(
                        "no ancestor at {path} above {}",
                        self.inner.path
                    )))
                }
            };
        }
    }
}

/// Walk downward from `from` by indexing into cached child views with each
/// remaining segment of `target`.
fn descend_to(from: View, target: &StorePath) -> Result<View> {
    let mut current = from;
    while current.path() != target {
        let depth = current.path().len();
        let segment = match target.segments().get(depth) {
            Some(segment) => segment.clone(),
            None => {
                return Err(GroveMapError::Resolution(format!(
                    "link target {target} is above {}",
                    current.path()
                )))
            }
        };
        current = match current.child_view(&segment) {
            Some(child) => child,
            None => {
                return Err(GroveMapError::Resolution(format!(
                    "no element '{segment}' under {}",
                    current.path()
                )))
            }
        };
    }
    Ok(current)
}

impl MultiGroupView {
    fn create(
        name: String,
        record_name: String,
        path: StorePath,
        element: SchemaRef,
        parent: Option<ParentLink>,
        ctx: Ctx,
    ) -> Result<MultiGroupView> {
        let inner = Rc::new(MultiInner {
            name,
            path,
            element,
            record_name,
            parent,
            ctx,
            elements: RefCell::new(Vec::new()),
        });
        let view = MultiGroupView { inner };

        // eagerly materialize one child view per already-persisted element
        let mut names = view
            .inner
            .ctx
            .store
            .borrow()
            .child_names(&view.inner.path)?;
        names.sort();
        if !names.is_empty() {
            log::debug!(
                "discovered {} element(s) under {}",
                names.len(),
                view.inner.path
            );
        }
        for name in names {
            let element = view.make_element(name)?;
            view.inner.elements.borrow_mut().push(element);
        }

        Ok(view)
    }

    fn make_element(&self, name: String) -> Result<View> {
        let inner = &self.inner;
        let path = inner.path.join(&name);
        let parent = Some(ParentLink::Multi(Rc::downgrade(inner)));
        match &*inner.element {
            SchemaNode::Group(group) => Ok(View::Group(GroupView::create(
                name,
                inner.record_name.clone(),
                path,
                group.children_map().clone(),
                parent,
                inner.ctx.clone(),
            )?)),
            SchemaNode::Multi(multi) => Ok(View::Multi(MultiGroupView::create(
                name,
                inner.record_name.clone(),
                path,
                multi.element().clone(),
                parent,
                inner.ctx.clone(),
            )?)),
            SchemaNode::Link | SchemaNode::Leaf(_) => Err(GroveMapError::Configuration(
                "multi-group element must be a group or multi-group".to_string(),
            )),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn path(&self) -> &StorePath {
        &self.inner.path
    }

    /// Number of currently materialized elements.
    pub fn len(&self) -> usize {
        self.inner.elements.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.elements.borrow().is_empty()
    }

    /// The element view at `index`. Negative indices count from the end;
    /// the valid range is `[-len, len-1]`.
    pub fn get(&self, index: i64) -> Result<Item> {
        let idx = self.checked_index(index)?;
        let element = self.inner.elements.borrow()[idx].clone();
        Ok(Item::from_view(element))
    }

    /// Bulk-update the element at `index` (a record for group elements, a
    /// sequence or mapping for nested multi-groups). Writing one position
    /// past the end creates the slot, which is how bulk assignment grows
    /// an empty collection.
    pub fn set(&self, index: i64, value: Value) -> Result<()> {
        let length = self.len();
        let resolved = if index < 0 {
            index + length as i64
        } else {
            index
        };
        if resolved < 0 || resolved > length as i64 {
            return Err(GroveMapError::IndexOutOfRange { index, length });
        }
        let idx = resolved as usize;
        if idx == length {
            self.create_slot()?;
        }
        self.set_at(idx, value)
    }

    /// Insert an element at `index`, shifting later elements up by one.
    ///
    /// Positions `[index, len-1]` are processed from the highest down, each
    /// copied into the slot above before the one below overwrites it, so
    /// relative order is preserved and the new element lands exactly at
    /// `index`. An index at or past the end appends.
    pub fn insert(&self, index: i64, value: Value) -> Result<()> {
        let length = self.len();
        let idx = if index < 0 {
            (index + length as i64).max(0) as usize
        } else {
            index as usize
        };
        if idx >= length {
            self.create_slot()?;
            return self.set_at(length, value);
        }
        log::debug!(
            "shifting elements {idx}..{length} of {} up by one",
            self.inner.path
        );
        for position in (idx..length).rev() {
            if position + 1 == self.len() {
                self.create_slot()?;
            }
            let source = self.inner.elements.borrow()[position].clone();
            self.set_at(position + 1, source.read_value()?)?;
        }
        self.set_at(idx, value)
    }

    /// Append an element.
    pub fn push(&self, value: Value) -> Result<()> {
        self.insert(self.len() as i64, value)
    }

    /// Element deletion is not part of this design.
    pub fn delete(&self, index: i64) -> Result<()> {
        Err(GroveMapError::Unsupported(format!(
            "cannot delete element {index} from {}",
            self.inner.path
        )))
    }

    fn checked_index(&self, index: i64) -> Result<usize> {
        let length = self.len();
        let resolved = if index < 0 {
            index + length as i64
        } else {
            index
        };
        if resolved < 0 || resolved >= length as i64 {
            return Err(GroveMapError::IndexOutOfRange { index, length });
        }
        Ok(resolved as usize)
    }

    fn set_at(&self, idx: usize, value: Value) -> Result<()> {
        let element = self.inner.elements.borrow()[idx].clone();
        match element {
            View::Group(group) => match value {
                Value::Record(record) => group.write_record(&record),
                other => Err(GroveMapError::TypeMismatch(format!(
                    "element {idx} of {} expects a record, got {}",
                    self.inner.path,
                    other.kind_name()
                ))),
            },
            View::Multi(multi) => match value {
                Value::Seq(items) => multi.write_sequence(items),
                Value::Map(pairs) => multi.write_mapping(pairs),
                other => Err(GroveMapError::TypeMismatch(format!(
                    "element {idx} of {} expects a sequence or mapping, got {}",
                    self.inner.path,
                    other.kind_name()
                ))),
            },
        }
    }

    fn create_slot(&self) -> Result<()> {
        let position = self.len();
        let element = self.make_element(position.to_string())?;
        self.inner
            .ctx
            .store
            .borrow_mut()
            .require_group(element.path())?;
        self.inner.elements.borrow_mut().push(element);
        Ok(())
    }

    pub(crate) fn write_sequence(&self, items: Vec<Value>) -> Result<()> {
        for (position, item) in items.into_iter().enumerate() {
            self.set(position as i64, item)?;
        }
        Ok(())
    }

    pub(crate) fn write_mapping(&self, pairs: Vec<(i64, Value)>) -> Result<()> {
        for (key, item) in pairs {
            self.set(key, item)?;
        }
        Ok(())
    }

    pub(crate) fn read_value(&self) -> Result<Value> {
        let elements: Vec<View> = self.inner.elements.borrow().clone();
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            items.push(element.read_value()?);
        }
        Ok(Value::Seq(items))
    }

    fn child_view(&self, segment: &str) -> Option<View> {
        self.inner
            .elements
            .borrow()
            .iter()
            .find(|element| element.name() == segment)
            .cloned()
    }

    fn parent_view(&self) -> Option<View> {
        self.inner.parent.as_ref().and_then(ParentLink::upgrade)
    }
}

impl View {
    pub fn name(&self) -> &str {
        match self {
            View::Group(group) => group.name(),
            View::Multi(multi) => multi.name(),
        }
    }

    pub fn path(&self) -> &StorePath {
        match self {
            View::Group(group) => group.path(),
            View::Multi(multi) => multi.path(),
        }
    }

    pub fn as_group(&self) -> Option<&GroupView> {
        match self {
            View::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_multi(&self) -> Option<&MultiGroupView> {
        match self {
            View::Multi(multi) => Some(multi),
            _ => None,
        }
    }

    fn parent_view(&self) -> Option<View> {
        match self {
            View::Group(group) => group.parent_view(),
            View::Multi(multi) => multi.parent_view(),
        }
    }

    fn child_view(&self, segment: &str) -> Option<View> {
        match self {
            View::Group(group) => group.child_view(segment),
            View::Multi(multi) => multi.child_view(segment),
        }
    }

    pub(crate) fn read_value(&self) -> Result<Value> {
        match self {
            View::Group(group) => group.read_record().map(Value::Record),
            View::Multi(multi) => multi.read_value(),
        }
    }
}

impl From<GroupView> for View {
    fn from(view: GroupView) -> View {
        View::Group(view)
    }
}

impl From<MultiGroupView> for View {
    fn from(view: MultiGroupView) -> View {
        View::Multi(view)
    }
}

impl fmt::Debug for GroupView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupView({})", self.inner.path)
    }
}

impl fmt::Debug for MultiGroupView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MultiGroupView({})", self.inner.path)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Group(group) => group.fmt(f),
            View::Multi(multi) => multi.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{handle, MemoryStore};
    use pretty_assertions::assert_eq;

    fn bind(schema_yaml: &str) -> (Schema, StoreHandle, GroupView) {
        let schema = Schema::from_yaml(schema_yaml).unwrap();
        let store = handle(MemoryStore::new());
        let root = GroupView::new_root(&schema, store.clone()).unwrap();
        (schema, store, root)
    }

    fn frames_schema() -> &'static str {
        "root:\n  frames:\n    - n: int\n      tag: string\n"
    }

    fn frame(schema: &Schema, n: i64, tag: &str) -> Value {
        Value::Record(
            schema
                .record(
                    "frames",
                    vec![("n", Value::from(n)), ("tag", Value::from(tag))],
                )
                .unwrap(),
        )
    }

    #[test]
    fn test_group_record_round_trip() {
        let (_schema, _store, root) =
            bind("root:\n  a:\n    b: int\n    c: string\n  s: array\n");
        let a = root.get("a").unwrap().as_group().cloned().unwrap();
        let record = a
            .new_record(vec![("b", Value::from(5i64)), ("c", Value::from("x"))])
            .unwrap();

        root.set("a", Value::Record(record.clone())).unwrap();
        assert_eq!(a.read_record().unwrap(), record);
        assert_eq!(a.get("b").unwrap().as_i64(), Some(5));
        assert_eq!(a.get("c").unwrap().as_str(), Some("x"));
    }

    #[test]
    fn test_array_round_trip() {
        let (_schema, _store, root) =
            bind("root:\n  a:\n    b: int\n    c: string\n  s: array\n");
        root.set("s", Value::from(vec![1.0, 2.0, 3.0])).unwrap();
        assert_eq!(
            root.get("s").unwrap().as_array().unwrap(),
            &[1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn test_scalar_written_at_declared_kind() {
        let (_schema, _store, root) = bind("root:\n  temp: float\n");
        root.set("temp", Value::from(21i64)).unwrap();
        assert_eq!(root.get("temp").unwrap().as_f64(), Some(21.0));
    }

    #[test]
    fn test_undeclared_field_is_lookup_error() {
        let (_schema, _store, root) = bind("root:\n  a: int\n");
        assert!(matches!(
            root.get("zzz"),
            Err(GroveMapError::UnknownField { .. })
        ));
        assert!(matches!(
            root.set("zzz", Value::from(1i64)),
            Err(GroveMapError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_iteration_over_declared_names_not_written_data() {
        let (_schema, _store, root) =
            bind("root:\n  a:\n    b: int\n  s: array\n  t: int\n");
        // nothing written yet; declared names still enumerate, in order
        assert_eq!(root.fields(), vec!["a", "s", "t"]);
        assert_eq!(root.len(), 3);
    }

    #[test]
    fn test_delete_is_unsupported_everywhere() {
        let (schema, _store, root) =
            bind("root:\n  a:\n    b: int\n  frames:\n    - n: int\n");
        assert!(matches!(
            root.delete("a"),
            Err(GroveMapError::Unsupported(_))
        ));
        let a = root.get("a").unwrap().as_group().cloned().unwrap();
        assert!(matches!(a.delete("b"), Err(GroveMapError::Unsupported(_))));

        let frames = root.get("frames").unwrap().as_multi().cloned().unwrap();
        frames
            .push(Value::Record(
                schema.record("frames", vec![("n", Value::from(1i64))]).unwrap(),
            ))
            .unwrap();
        assert!(matches!(
            frames.delete(0),
            Err(GroveMapError::Unsupported(_))
        ));
    }

    #[test]
    fn test_group_set_rejects_foreign_record_type() {
        let (schema, _store, root) =
            bind("root:\n  a:\n    b: int\n  d:\n    b: int\n");
        let d_record = schema.record("d", vec![("b", Value::from(1i64))]).unwrap();
        assert!(matches!(
            root.set("a", Value::Record(d_record)),
            Err(GroveMapError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_group_set_rejects_non_record() {
        let (_schema, _store, root) = bind("root:\n  a:\n    b: int\n");
        assert!(matches!(
            root.set("a", Value::from(1i64)),
            Err(GroveMapError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_leaf_set_rejects_wrong_shape() {
        let (_schema, _store, root) = bind("root:\n  s: array\n  n: int\n");
        assert!(matches!(
            root.set("s", Value::from(1i64)),
            Err(GroveMapError::TypeMismatch(_))
        ));
        assert!(matches!(
            root.set("n", Value::Seq(vec![])),
            Err(GroveMapError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_bulk_write_is_not_atomic() {
        let (_schema, _store, root) = bind("root:\n  p:\n    x: int\n    s: array\n");
        let p = root.get("p").unwrap().as_group().cloned().unwrap();
        // the record's field names check out, but 's' carries a scalar;
        // the write fails after 'x' has already been applied
        let record = p
            .record_type()
            .unwrap()
            .instantiate(vec![("x", Value::from(1i64)), ("s", Value::from(2i64))])
            .unwrap();
        assert!(root.set("p", Value::Record(record)).is_err());
        assert_eq!(p.get("x").unwrap().as_i64(), Some(1));
    }

    #[test]
    fn test_multi_insert_at_front_reverses() {
        let (schema, _store, root) = bind(frames_schema());
        let frames = root.get("frames").unwrap().as_multi().cloned().unwrap();

        frames.insert(0, frame(&schema, 1, "a")).unwrap();
        frames.insert(0, frame(&schema, 2, "b")).unwrap();
        frames.insert(0, frame(&schema, 3, "c")).unwrap();

        let read = |i: i64| {
            let item = frames.get(i).unwrap();
            let group = item.as_group().unwrap();
            (
                group.get("n").unwrap().as_i64().unwrap(),
                group.get("tag").unwrap().as_str().unwrap().to_string(),
            )
        };
        assert_eq!(read(0), (3, "c".to_string()));
        assert_eq!(read(1), (2, "b".to_string()));
        assert_eq!(read(2), (1, "a".to_string()));
    }

    #[test]
    fn test_multi_insert_in_middle_preserves_order() {
        let (schema, _store, root) = bind(frames_schema());
        let frames = root.get("frames").unwrap().as_multi().cloned().unwrap();

        frames.push(frame(&schema, 10, "first")).unwrap();
        frames.push(frame(&schema, 30, "last")).unwrap();
        frames.insert(1, frame(&schema, 20, "middle")).unwrap();

        let ns: Vec<i64> = (0..3)
            .map(|i| {
                frames
                    .get(i)
                    .unwrap()
                    .as_group()
                    .unwrap()
                    .get("n")
                    .unwrap()
                    .as_i64()
                    .unwrap()
            })
            .collect();
        assert_eq!(ns, vec![10, 20, 30]);
        assert_eq!(frames.len(), 3);
    }

    #[test]
    fn test_multi_out_of_range_get() {
        let (schema, _store, root) = bind(frames_schema());
        let frames = root.get("frames").unwrap().as_multi().cloned().unwrap();
        assert!(matches!(
            frames.get(0),
            Err(GroveMapError::IndexOutOfRange { .. })
        ));

        frames.push(frame(&schema, 1, "a")).unwrap();
        frames.push(frame(&schema, 2, "b")).unwrap();
        let length = frames.len() as i64;
        assert!(frames.get(length - 1).is_ok());
        assert!(matches!(
            frames.get(length),
            Err(GroveMapError::IndexOutOfRange { .. })
        ));
        assert!(frames.get(-length).is_ok());
        assert!(matches!(
            frames.get(-length - 1),
            Err(GroveMapError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_multi_negative_get_counts_from_end() {
        let (schema, _store, root) = bind(frames_schema());
        let frames = root.get("frames").unwrap().as_multi().cloned().unwrap();
        frames.push(frame(&schema, 1, "a")).unwrap();
        frames.push(frame(&schema, 2, "b")).unwrap();
        let last = frames.get(-1).unwrap();
        assert_eq!(last.as_group().unwrap().get("n").unwrap().as_i64(), Some(2));
    }

    #[test]
    fn test_bulk_sequence_assignment_grows_empty_multi() {
        let (schema, _store, root) = bind(frames_schema());
        root.set(
            "frames",
            Value::Seq(vec![frame(&schema, 1, "a"), frame(&schema, 2, "b")]),
        )
        .unwrap();
        let frames = root.get("frames").unwrap().as_multi().cloned().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames.get(1).unwrap().as_group().unwrap().get("tag").unwrap().as_str(),
            Some("b")
        );
    }

    #[test]
    fn test_bulk_mapping_assignment_applies_per_key() {
        let (schema, _store, root) = bind(frames_schema());
        root.set(
            "frames",
            Value::Seq(vec![frame(&schema, 1, "a"), frame(&schema, 2, "b")]),
        )
        .unwrap();
        root.set("frames", Value::Map(vec![(1, frame(&schema, 9, "z"))]))
            .unwrap();
        let frames = root.get("frames").unwrap().as_multi().cloned().unwrap();
        assert_eq!(
            frames.get(0).unwrap().as_group().unwrap().get("n").unwrap().as_i64(),
            Some(1)
        );
        assert_eq!(
            frames.get(1).unwrap().as_group().unwrap().get("n").unwrap().as_i64(),
            Some(9)
        );
    }

    #[test]
    fn test_multi_field_rejects_other_value_shapes() {
        let (_schema, _store, root) = bind(frames_schema());
        assert!(matches!(
            root.set("frames", Value::from(1i64)),
            Err(GroveMapError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_multi_set_beyond_append_position_is_out_of_range() {
        let (schema, _store, root) = bind(frames_schema());
        let frames = root.get("frames").unwrap().as_multi().cloned().unwrap();
        assert!(matches!(
            frames.set(2, frame(&schema, 1, "a")),
            Err(GroveMapError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_nested_multi_groups() {
        let text = "root:\n  grid:\n    - - cell: int\n";
        let (schema, _store, root) = bind(text);
        let row = |cells: Vec<i64>| {
            Value::Seq(
                cells
                    .into_iter()
                    .map(|c| {
                        Value::Record(
                            schema
                                .record("grid", vec![("cell", Value::from(c))])
                                .unwrap(),
                        )
                    })
                    .collect(),
            )
        };
        root.set("grid", Value::Seq(vec![row(vec![1, 2]), row(vec![3])]))
            .unwrap();

        let grid = root.get("grid").unwrap().as_multi().cloned().unwrap();
        assert_eq!(grid.len(), 2);
        let first_row = grid.get(0).unwrap().as_multi().cloned().unwrap();
        assert_eq!(first_row.len(), 2);
        assert_eq!(
            first_row.get(1).unwrap().as_group().unwrap().get("cell").unwrap().as_i64(),
            Some(2)
        );
    }

    #[test]
    fn test_link_aliases_sibling_group() {
        let text = "root:\n  g1:\n    n: int\n    tag: string\n  g2:\n    favorite: link\n";
        let (_schema, _store, root) = bind(text);
        let g1 = root.get("g1").unwrap().as_group().cloned().unwrap();
        g1.set("n", Value::from(7i64)).unwrap();
        g1.set("tag", Value::from("aliased")).unwrap();

        let g2 = root.get("g2").unwrap().as_group().cloned().unwrap();
        g2.set("favorite", Value::View(g1.clone().into())).unwrap();

        let resolved = g2.get("favorite").unwrap().as_group().cloned().unwrap();
        assert_eq!(resolved.path().to_string(), "/g1");
        assert_eq!(resolved.get("n").unwrap().as_i64(), Some(7));
        assert_eq!(resolved.get("tag").unwrap().as_str(), Some("aliased"));
        // resolution hands back the live cached view, not a copy
        assert!(Rc::ptr_eq(&resolved.inner, &g1.inner));
    }

    #[test]
    fn test_link_resolution_through_deeper_ancestor() {
        let text =
            "root:\n  g1:\n    n: int\n  outer:\n    g2:\n      favorite: link\n";
        let (_schema, _store, root) = bind(text);
        let g1 = root.get("g1").unwrap().as_group().cloned().unwrap();
        g1.set("n", Value::from(3i64)).unwrap();

        let g2 = root
            .get("outer")
            .unwrap()
            .as_group()
            .unwrap()
            .get("g2")
            .unwrap()
            .as_group()
            .cloned()
            .unwrap();
        g2.set("favorite", Value::View(g1.into())).unwrap();

        let resolved = g2.get("favorite").unwrap().as_group().cloned().unwrap();
        assert_eq!(resolved.get("n").unwrap().as_i64(), Some(3));
    }

    #[test]
    fn test_link_into_multi_element() {
        let text = "root:\n  frames:\n    - n: int\n      tag: string\n  pick: link\n";
        let (schema, _store, root) = bind(text);
        let frames = root.get("frames").unwrap().as_multi().cloned().unwrap();
        frames.push(frame(&schema, 1, "a")).unwrap();
        frames.push(frame(&schema, 2, "b")).unwrap();

        let second = frames.get(1).unwrap().as_group().cloned().unwrap();
        root.set("pick", Value::View(second.into())).unwrap();

        let resolved = root.get("pick").unwrap().as_group().cloned().unwrap();
        assert_eq!(resolved.path().to_string(), "/frames/1");
        assert_eq!(resolved.get("tag").unwrap().as_str(), Some("b"));
    }

    #[test]
    fn test_unwritten_link_is_resolution_error() {
        let (_schema, _store, root) = bind("root:\n  favorite: link\n");
        assert!(matches!(
            root.get("favorite"),
            Err(GroveMapError::Resolution(_))
        ));
    }

    #[test]
    fn test_link_set_rejects_non_view() {
        let (_schema, _store, root) = bind("root:\n  favorite: link\n");
        assert!(matches!(
            root.set("favorite", Value::from(1i64)),
            Err(GroveMapError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_read_record_materializes_nested_shapes() {
        let text = "root:\n  a:\n    b: int\n  frames:\n    - n: int\n      tag: string\n";
        let (schema, _store, root) = bind(text);
        root.set(
            "a",
            Value::Record(schema.record("a", vec![("b", Value::from(4i64))]).unwrap()),
        )
        .unwrap();
        root.set("frames", Value::Seq(vec![frame(&schema, 1, "x")]))
            .unwrap();

        let record = root.read_record().unwrap();
        assert_eq!(record.type_name(), "root");
        let nested = record.get("a").unwrap().as_record().unwrap();
        assert_eq!(nested.get("b"), Some(&Value::Int(4)));
        assert_eq!(record.get("frames").unwrap().as_seq().unwrap().len(), 1);
    }

    #[test]
    fn test_rebinding_rediscovers_persisted_elements() {
        let (schema, store, root) = bind(frames_schema());
        let frames = root.get("frames").unwrap().as_multi().cloned().unwrap();
        frames.push(frame(&schema, 1, "a")).unwrap();
        frames.push(frame(&schema, 2, "b")).unwrap();
        drop(frames);
        drop(root);

        // a fresh binding against the same store scans the elements back in
        let reopened = GroupView::new_root(&schema, store).unwrap();
        let frames = reopened.get("frames").unwrap().as_multi().cloned().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames.get(0).unwrap().as_group().unwrap().get("n").unwrap().as_i64(),
            Some(1)
        );
    }

    #[test]
    fn test_child_views_are_cached() {
        let (_schema, _store, root) = bind("root:\n  a:\n    b: int\n");
        let first = root.get("a").unwrap().as_group().cloned().unwrap();
        let second = root.get("a").unwrap().as_group().cloned().unwrap();
        assert!(Rc::ptr_eq(&first.inner, &second.inner));
    }

    #[test]
    fn test_root_record_type_name() {
        let (_schema, _store, root) = bind("root:\n  a: int\n");
        assert_eq!(root.record_type().unwrap().name(), "root");
        assert_eq!(root.record_type().unwrap().fields(), ["a"]);
    }
}
