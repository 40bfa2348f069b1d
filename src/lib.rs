//! grovemap - schema-driven typed views over hierarchical stores.
//!
//! A declarative, versioned schema is mapped onto a backing store shaped as
//! a tree of named groups holding scalar attributes, array datasets, and
//! links. Building a [`Schema`] generates one structural [`record::RecordType`]
//! per group shape; binding it to a store (via [`SchemaFile`] or a
//! [`FormatRegistry`]) yields lazy, cached views that dispatch field access
//! by the declared schema kind.

pub mod error;
pub mod file;
pub mod path;
pub mod record;
pub mod schema;
pub mod store;
pub mod value;
pub mod view;

pub use error::{GroveMapError, Result};
pub use file::{FormatRegistry, SchemaFile};
pub use path::StorePath;
pub use record::{Record, RecordRegistry, RecordType};
pub use schema::{LeafKind, Schema, SchemaNode};
pub use store::{handle, BackingStore, MemoryStore, StoreHandle};
pub use value::{Scalar, ScalarKind, Value};
pub use view::{GroupView, Item, MultiGroupView, View};
