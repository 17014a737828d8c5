//! The state-store abstraction the snapshot patcher commits to.

use std::sync::Arc;

use crate::Value;

/// A holder of one immutable state snapshot.
///
/// The patcher reads the snapshot once, builds its replacement off to the
/// side, and calls [`Store::replace`] exactly once per top-level patch. A
/// replacement is a full swap, never a merge, so keys missing from the new
/// snapshot disappear.
pub trait Store {
    /// Returns the current snapshot.
    fn snapshot(&self) -> Arc<Value>;

    /// Swaps in `next` as the whole new snapshot.
    fn replace(&self, next: Arc<Value>);
}
