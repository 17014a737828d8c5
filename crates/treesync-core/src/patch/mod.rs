//! Change-list application against shared trees and state stores.
//!
//! Both patchers diff one level at a time and descend on `pending` records
//! against whatever the target holds at that moment. The shared-tree patcher
//! mutates live containers in place; the store patcher rebuilds the snapshot
//! off to the side and commits it with a single [`Store::replace`].

mod shared_tree;
mod store;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    diff::ChangeKey, ConvertError, DiffError, PatchOptions, Shape, SharedContainer, Store, Value,
};

/// Errors that can occur while applying changes.
///
/// ```
/// # use treesync_core::{patch_shared_tree, MemoryContainer, Value};
/// let tree = MemoryContainer::from_value(&Value::from_json_str("{}")?)?;
/// let err = patch_shared_tree(&tree, &Value::from_json_str("[1]")?).unwrap_err();
/// assert_eq!(err.to_string(), "cannot apply sequence changes to mapping target at /");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatchError {
    /// The changes do not fit the shape of the target they are applied to.
    #[error("cannot apply {changes} changes to {target} target at {path}")]
    TargetMismatch {
        /// Shape of the target.
        target: Shape,
        /// Shape of the value the changes were computed for.
        changes: Shape,
        /// Location of the target, JSON-pointer style.
        path: String,
    },
    /// Descent went past [`PatchOptions::max_depth`].
    #[error("nesting deeper than {limit} levels at {path}")]
    DepthExceeded {
        /// The configured limit.
        limit: usize,
        /// Location of the level that crossed the limit.
        path: String,
    },
    /// The diff engine rejected the inputs.
    #[error(transparent)]
    Diff(#[from] DiffError),
    /// A new value could not be materialized as containers.
    #[error(transparent)]
    Convert(#[from] ConvertError),
}

/// Counts of what a patch call did, summed over every level it descended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PatchStats {
    /// Keys or elements inserted.
    pub added: usize,
    /// Keys or elements replaced.
    pub updated: usize,
    /// Keys or elements removed.
    pub deleted: usize,
    /// Nested levels patched through `pending` records.
    pub descended: usize,
    /// Callable values left out of a shared tree.
    pub skipped: usize,
}

impl PatchStats {
    /// Number of writes performed against the target.
    ///
    /// A patch that converged on an already-equal target reports zero.
    #[must_use]
    pub fn mutations(&self) -> usize {
        self.added + self.updated + self.deleted
    }
}

/// Location inside the tree being patched, for diagnostics and depth limits.
#[derive(Clone, Debug, Default)]
pub(crate) struct Trail {
    segments: Vec<ChangeKey>,
}

impl Trail {
    fn child(&self, key: &ChangeKey) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.clone());
        Self { segments }
    }

    fn enter(&self, options: &PatchOptions) -> Result<(), PatchError> {
        if self.segments.len() >= options.max_depth() {
            return Err(PatchError::DepthExceeded {
                limit: options.max_depth(),
                path: self.to_string(),
            });
        }
        Ok(())
    }

    fn mismatch(&self, target: Shape, changes: Shape) -> PatchError {
        PatchError::TargetMismatch { target, changes, path: self.to_string() }
    }
}

impl fmt::Display for Trail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// Patches a live shared container so that it holds `new_value`.
///
/// ```
/// # use treesync_core::{patch_shared_tree, MemoryContainer, Value};
/// let tree = MemoryContainer::from_value(&Value::from_json_str("{\"foo\":{}}")?)?;
/// let stats = patch_shared_tree(&tree, &Value::from_json_str("{\"foo\":{\"bar\":2}}")?)?;
/// assert_eq!(tree.to_value(), Value::from_json_str("{\"foo\":{\"bar\":2}}")?);
/// assert_eq!((stats.added, stats.descended), (1, 1));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn patch_shared_tree<C: SharedContainer>(
    target: &C,
    new_value: &Value,
) -> Result<PatchStats, PatchError> {
    patch_shared_tree_with(target, new_value, &PatchOptions::default())
}

/// [`patch_shared_tree`] with explicit options.
///
/// Each level's new values are converted before that level is touched, but
/// levels already patched stay patched if a deeper level fails.
pub fn patch_shared_tree_with<C: SharedContainer>(
    target: &C,
    new_value: &Value,
    options: &PatchOptions,
) -> Result<PatchStats, PatchError> {
    let mut stats = PatchStats::default();
    shared_tree::patch_container(target, new_value, options, &Trail::default(), &mut stats)?;
    debug!(
        added = stats.added,
        updated = stats.updated,
        deleted = stats.deleted,
        skipped = stats.skipped,
        "shared tree patched"
    );
    Ok(stats)
}

/// Replaces the store's snapshot with one that holds `new_value`.
///
/// ```
/// # use treesync_core::{patch_store, MemoryStore, Value};
/// let store = MemoryStore::new(Value::from_json_str("{\"foo\":[1,3,3]}")?);
/// patch_store(&store, &Value::from_json_str("{\"foo\":[1,2,3]}")?)?;
/// assert_eq!(*store.state(), Value::from_json_str("{\"foo\":[1,2,3]}")?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn patch_store<S: Store + ?Sized>(
    store: &S,
    new_value: &Value,
) -> Result<PatchStats, PatchError> {
    patch_store_with(store, new_value, &PatchOptions::default())
}

/// [`patch_store`] with explicit options.
///
/// The store is written exactly once, and only after the whole snapshot has
/// been built. When nothing changed, the current snapshot `Arc` itself is
/// written back.
pub fn patch_store_with<S: Store + ?Sized>(
    store: &S,
    new_value: &Value,
    options: &PatchOptions,
) -> Result<PatchStats, PatchError> {
    let current = store.snapshot();
    let root = Trail::default();
    if current.shape() != Shape::Void && current.shape() != new_value.shape() {
        return Err(root.mismatch(current.shape(), new_value.shape()));
    }

    let mut stats = PatchStats::default();
    let next = match store::patch_node(&current, new_value, options, &root, &mut stats)? {
        Some(patched) => Arc::new(patched),
        None => Arc::clone(&current),
    };
    debug!(
        changed = !Arc::ptr_eq(&current, &next),
        added = stats.added,
        updated = stats.updated,
        deleted = stats.deleted,
        "committing store snapshot"
    );
    store.replace(next);
    Ok(stats)
}
