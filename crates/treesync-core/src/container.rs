//! The shared-container abstraction the tree patcher mutates.
//!
//! A [`SharedContainer`] is a handle to a live, CRDT-style node: cloning the
//! handle never copies the node, and every mutation goes through `&self`.
//! Containers are either mapping-shaped or sequence-shaped for their whole
//! life; implementations ignore mapping operations on a sequence and vice
//! versa, and the patchers check [`SharedContainer::kind`] before calling
//! either family.

use std::fmt;

use crate::{convert, Shape, Value};

/// The two shapes a shared container can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Key to value container.
    Mapping,
    /// Index-ordered container.
    Sequence,
}

impl From<ContainerKind> for Shape {
    fn from(kind: ContainerKind) -> Self {
        match kind {
            ContainerKind::Mapping => Shape::Mapping,
            ContainerKind::Sequence => Shape::Sequence,
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Shape::from(*self).fmt(f)
    }
}

/// One entry of a shared container.
#[derive(Clone, Debug, PartialEq)]
pub enum Slot<C> {
    /// A nested live container.
    Container(C),
    /// A plain scalar.
    Scalar(Value),
}

impl<C: SharedContainer> Slot<C> {
    /// Converts the entry back into a plain value.
    #[must_use]
    pub fn to_plain(&self) -> Value {
        match self {
            Self::Container(container) => container.to_plain(),
            Self::Scalar(value) => value.clone(),
        }
    }

    /// Returns the nested container, if the entry holds one.
    #[must_use]
    pub fn as_container(&self) -> Option<&C> {
        match self {
            Self::Container(container) => Some(container),
            Self::Scalar(_) => None,
        }
    }
}

/// A live mapping- or sequence-shaped container.
pub trait SharedContainer: Clone + Sized {
    /// Creates a new, empty container that is not yet attached to any tree.
    fn detached(kind: ContainerKind) -> Self;

    /// Returns the container's shape.
    fn kind(&self) -> ContainerKind;

    /// Number of entries.
    fn len(&self) -> usize;

    /// Whether the container has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mapping keys in iteration order; empty for sequences.
    fn keys(&self) -> Vec<String>;

    /// Reads the entry stored under `key`.
    fn get(&self, key: &str) -> Option<Slot<Self>>;

    /// Stores `slot` under `key`, replacing any previous entry.
    fn set(&self, key: &str, slot: Slot<Self>);

    /// Removes the entry stored under `key`.
    fn remove(&self, key: &str);

    /// Reads the entry at `index`.
    fn get_index(&self, index: usize) -> Option<Slot<Self>>;

    /// Copies out the entries in `start..end`, clamped to the current length.
    fn slice(&self, start: usize, end: usize) -> Vec<Slot<Self>>;

    /// Removes `len` entries starting at `index`, clamped to the current length.
    fn delete_range(&self, index: usize, len: usize);

    /// Inserts `slots` before `index`.
    fn insert(&self, index: usize, slots: Vec<Slot<Self>>);

    /// Deep snapshot of the container as a plain value.
    fn to_plain(&self) -> Value {
        convert::to_plain_value(self)
    }
}
