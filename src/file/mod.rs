use indexmap::IndexMap;

use crate::error::{GroveMapError, Result};
use crate::path::StorePath;
use crate::record::RecordRegistry;
use crate::schema::Schema;
use crate::store::StoreHandle;
use crate::value::Scalar;
use crate::view::GroupView;

const FILETYPE_ATTR: &str = "filetype";
const VERSION_ATTR: &str = "version";

/// One schema bound to one backing store.
///
/// Owns the shared store handle every view clones, and the root view all
/// navigation starts from.
pub struct SchemaFile {
    schema: Schema,
    store: StoreHandle,
    root: GroupView,
}

impl SchemaFile {
    /// Bind `schema` to a store, stamping `filetype` and `version`
    /// provenance attributes at the root.
    pub fn create(
        store: StoreHandle,
        schema: &Schema,
        filetype: &str,
        version: &str,
    ) -> Result<SchemaFile> {
        {
            let mut inner = store.borrow_mut();
            let root = StorePath::root();
            inner.require_group(&root)?;
            inner.write_attr(&root, FILETYPE_ATTR, Scalar::Str(filetype.to_string()))?;
            inner.write_attr(&root, VERSION_ATTR, Scalar::Str(version.to_string()))?;
        }
        log::debug!("stamped store as {filetype} v{version}");
        SchemaFile::open(store, schema)
    }

    /// Bind `schema` to an existing store without touching provenance.
    /// Multi-group views scan their persisted elements during this call.
    pub fn open(store: StoreHandle, schema: &Schema) -> Result<SchemaFile> {
        let root = GroupView::new_root(schema, store.clone())?;
        Ok(SchemaFile {
            schema: schema.clone(),
            store,
            root,
        })
    }

    /// The root group view.
    pub fn root(&self) -> &GroupView {
        &self.root
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The record types generated for this file's schema.
    pub fn records(&self) -> &RecordRegistry {
        self.schema.records()
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn version(&self) -> Result<Option<String>> {
        self.read_meta(VERSION_ATTR)
    }

    pub fn filetype(&self) -> Result<Option<String>> {
        self.read_meta(FILETYPE_ATTR)
    }

    fn read_meta(&self, name: &str) -> Result<Option<String>> {
        let raw = self.store.borrow().read_attr(&StorePath::root(), name)?;
        Ok(raw.and_then(|scalar| scalar.as_str().map(str::to_string)))
    }
}

/// Caller-owned version table for one filetype.
///
/// Maps schema versions onto [`Schema`]s; `open` dispatches on the
/// provenance stamped in the store. There is no migration between
/// versions.
pub struct FormatRegistry {
    filetype: String,
    versions: IndexMap<String, Schema>,
}

impl FormatRegistry {
    pub fn new(filetype: &str) -> FormatRegistry {
        FormatRegistry {
            filetype: filetype.to_string(),
            versions: IndexMap::new(),
        }
    }

    pub fn filetype(&self) -> &str {
        &self.filetype
    }

    /// Register a schema for a version. Duplicate versions are a
    /// configuration error.
    pub fn register(&mut self, version: &str, schema: Schema) -> Result<()> {
        if self.versions.contains_key(version) {
            return Err(GroveMapError::Configuration(format!(
                "version '{version}' registered twice for filetype '{}'",
                self.filetype
            )));
        }
        self.versions.insert(version.to_string(), schema);
        Ok(())
    }

    pub fn get(&self, version: &str) -> Option<&Schema> {
        self.versions.get(version)
    }

    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    /// Stamp a store with this filetype and `version`, and bind the
    /// registered schema to it.
    pub fn create(&self, store: StoreHandle, version: &str) -> Result<SchemaFile> {
        let schema = self.versions.get(version).ok_or_else(|| {
            GroveMapError::Configuration(format!(
                "no schema registered for version '{version}' of filetype '{}'",
                self.filetype
            ))
        })?;
        SchemaFile::create(store, schema, &self.filetype, version)
    }

    /// Open a store by reading its provenance and dispatching to the
    /// registered schema for its version.
    pub fn open(&self, store: StoreHandle) -> Result<SchemaFile> {
        let (filetype, version) = {
            let inner = store.borrow();
            let root = StorePath::root();
            (
                inner.read_attr(&root, FILETYPE_ATTR)?,
                inner.read_attr(&root, VERSION_ATTR)?,
            )
        };

        let filetype = filetype
            .and_then(|scalar| scalar.as_str().map(str::to_string))
            .ok_or_else(|| {
                GroveMapError::Configuration("store carries no filetype metadata".to_string())
            })?;
        if filetype != self.filetype {
            return Err(GroveMapError::Configuration(format!(
                "store has filetype '{filetype}', this table handles '{}'",
                self.filetype
            )));
        }

        let version = version
            .and_then(|scalar| scalar.as_str().map(str::to_string))
            .ok_or_else(|| {
                GroveMapError::Configuration("store carries no version metadata".to_string())
            })?;
        let schema = self.versions.get(&version).ok_or_else(|| {
            GroveMapError::Configuration(format!(
                "no schema registered for version '{version}' of filetype '{}'",
                self.filetype
            ))
        })?;

        log::debug!("opening {filetype} store at schema version {version}");
        SchemaFile::open(store, schema)
    }
}
