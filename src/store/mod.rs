use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::error::{GroveMapError, Result};
use crate::path::StorePath;
use crate::value::Scalar;

/// Interface to the hierarchical backing store.
///
/// The store is a tree of named groups addressed by [`StorePath`]; each
/// group holds scalar attributes, array datasets, and link entries, all
/// keyed by name. Reads return `None` for absent data; callers decide
/// whether absence is an error.
pub trait BackingStore {
    /// Ensure a group exists at `path`, creating it and any missing
    /// ancestors. Idempotent.
    fn require_group(&mut self, path: &StorePath) -> Result<()>;

    fn exists(&self, path: &StorePath) -> bool;

    /// Names of the direct child groups under `path`. Order is the store's
    /// business; callers sort when they need determinism. A missing group
    /// has no children.
    fn child_names(&self, path: &StorePath) -> Result<Vec<String>>;

    fn read_attr(&self, path: &StorePath, name: &str) -> Result<Option<Scalar>>;

    fn write_attr(&mut self, path: &StorePath, name: &str, value: Scalar) -> Result<()>;

    fn read_dataset(&self, path: &StorePath, name: &str) -> Result<Option<Vec<f64>>>;

    fn write_dataset(&mut self, path: &StorePath, name: &str, values: Vec<f64>) -> Result<()>;

    fn read_link(&self, path: &StorePath, name: &str) -> Result<Option<StorePath>>;

    fn write_link(&mut self, path: &StorePath, name: &str, target: &StorePath) -> Result<()>;
}

/// Shared handle to one backing store. Every view of a bound file clones
/// this; no view holds a store of its own.
pub type StoreHandle = Rc<RefCell<dyn BackingStore>>;

/// Wrap a store into the shared handle views consume.
pub fn handle(store: impl BackingStore + 'static) -> StoreHandle {
    Rc::new(RefCell::new(store))
}

/// In-memory backing store.
///
/// The reference implementation for the trait and the store used by this
/// crate's tests. Contents are keyed by path, so child enumeration comes
/// out lexicographic for free.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    groups: BTreeSet<StorePath>,
    attrs: BTreeMap<(StorePath, String), Scalar>,
    datasets: BTreeMap<(StorePath, String), Vec<f64>>,
    links: BTreeMap<(StorePath, String), StorePath>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn check_group(&self, path: &StorePath) -> Result<()> {
        if self.exists(path) {
            return Ok(());
        }
        Err(GroveMapError::Store(format!("no group at {path}")))
    }
}

impl BackingStore for MemoryStore {
    fn require_group(&mut self, path: &StorePath) -> Result<()> {
        let mut current = StorePath::root();
        for segment in path.segments() {
            current = current.join(segment);
            self.groups.insert(current.clone());
        }
        Ok(())
    }

    fn exists(&self, path: &StorePath) -> bool {
        path.is_root() || self.groups.contains(path)
    }

    fn child_names(&self, path: &StorePath) -> Result<Vec<String>> {
        let names = self
            .groups
            .iter()
            .filter(|candidate| candidate.parent().as_ref() == Some(path))
            .filter_map(|candidate| candidate.name().map(str::to_string))
            .collect();
        Ok(names)
    }

    fn read_attr(&self, path: &StorePath, name: &str) -> Result<Option<Scalar>> {
        Ok(self.attrs.get(&(path.clone(), name.to_string())).cloned())
    }

    fn write_attr(&mut self, path: &StorePath, name: &str, value: Scalar) -> Result<()> {
        self.check_group(path)?;
        self.attrs.insert((path.clone(), name.to_string()), value);
        Ok(())
    }

    fn read_dataset(&self, path: &StorePath, name: &str) -> Result<Option<Vec<f64>>> {
        Ok(self
            .datasets
            .get(&(path.clone(), name.to_string()))
            .cloned())
    }

    fn write_dataset(&mut self, path: &StorePath, name: &str, values: Vec<f64>) -> Result<()> {
        self.check_group(path)?;
        self.datasets.insert((path.clone(), name.to_string()), values);
        Ok(())
    }

    fn read_link(&self, path: &StorePath, name: &str) -> Result<Option<StorePath>> {
        Ok(self.links.get(&(path.clone(), name.to_string())).cloned())
    }

    fn write_link(&mut self, path: &StorePath, name: &str, target: &StorePath) -> Result<()> {
        self.check_group(path)?;
        self.links
            .insert((path.clone(), name.to_string()), target.clone());
        Ok(())
    }
}
