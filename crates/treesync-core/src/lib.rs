//! Core primitives for `treesync`, a structural diff/patch engine.
//!
//! `treesync-core` computes one-level change lists between two structured
//! values and applies them to two kinds of targets: live shared containers
//! that are mutated in place, and immutable store snapshots that are rebuilt
//! bottom-up and replaced wholesale. Nested divergence is deferred through
//! `pending` records and resolved at apply time against the current target.
//!
//! ```
//! use treesync_core::{patch_shared_tree, patch_store, MemoryContainer, MemoryStore, Value};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let old = Value::from_json_str("{\"todos\":[\"a\",\"b\"],\"filter\":\"all\"}")?;
//!     let new = Value::from_json_str("{\"todos\":[\"a\",\"c\"],\"filter\":\"all\"}")?;
//!
//!     let changes = old.diff(&new)?;
//!     assert_eq!(
//!         changes.render(),
//!         "[[\"none\",\"filter\",\"all\"],[\"pending\",\"todos\",null]]"
//!     );
//!
//!     let tree = MemoryContainer::from_value(&old)?;
//!     patch_shared_tree(&tree, &new)?;
//!     assert_eq!(tree.to_value(), new);
//!
//!     let store = MemoryStore::new(old);
//!     patch_store(&store, &new)?;
//!     assert_eq!(*store.state(), new);
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod container;
pub mod convert;
pub mod diff;
mod error;
mod memory;
mod number;
mod options;
pub mod patch;
pub mod store;
mod value;

pub use container::{ContainerKind, SharedContainer, Slot};
pub use diff::{diff, Change, ChangeKey, ChangeKind, ChangeList};
pub use error::{CanonicalizeError, ConvertError, DiffError, OptionsError};
pub use memory::{MemoryContainer, MemoryStore};
pub use number::Number;
pub use options::{CallablePolicy, PatchOptions};
pub use patch::{
    patch_shared_tree, patch_shared_tree_with, patch_store, patch_store_with, PatchError,
    PatchStats,
};
pub use store::Store;
pub use value::{Callable, Shape, Value};

/// Returns the semantic version of the `treesync-core` crate.
///
/// ```
/// assert!(!treesync_core::version().is_empty());
/// ```
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
