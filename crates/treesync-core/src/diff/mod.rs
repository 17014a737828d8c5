//! Change-list data structures and the one-level diff engine.
//!
//! A [`ChangeList`] describes how to turn one container level of an old value
//! into the matching level of a new value. Nested divergence is never
//! expanded: when both sides hold a composite of the same shape at a key, the
//! engine emits a single `pending` record and leaves the descent to whoever
//! applies the list, so the recursion can run against the target as it is at
//! apply time.

mod mapping;
mod sequence;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{DiffError, Shape, Value};

/// What a [`Change`] does to its key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// The key is new; for sequences the value is inserted at the index.
    #[serde(rename = "add")]
    Add,
    /// The value at the key is replaced.
    #[serde(rename = "update")]
    Update,
    /// The key is removed.
    #[serde(rename = "delete")]
    Delete,
    /// Both sides are composite; diff the child when applying.
    #[serde(rename = "pending")]
    Pending,
    /// The value at the key is unchanged.
    #[serde(rename = "none")]
    Unchanged,
}

impl ChangeKind {
    /// Returns the wire name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Pending => "pending",
            Self::Unchanged => "none",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a change inside one container level.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeKey {
    /// Mapping key.
    Key(String),
    /// Sequence position.
    Index(usize),
}

impl ChangeKey {
    /// Convenience constructor for mapping keys.
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    /// Renders the key as JSON: strings for mapping keys, numbers for indices.
    #[must_use]
    pub fn to_json_value(&self) -> JsonValue {
        match self {
            Self::Key(key) => JsonValue::String(key.clone()),
            Self::Index(index) => JsonValue::from(*index),
        }
    }
}

impl fmt::Display for ChangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for ChangeKey {
    fn from(value: &str) -> Self {
        Self::Key(value.to_string())
    }
}

impl From<usize> for ChangeKey {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

/// A single `(kind, key, value)` record.
///
/// `value` is present for `add`, `update` and `none`, absent for `delete`
/// and `pending`.
#[derive(Clone, Debug, PartialEq)]
pub struct Change {
    /// What happens at the key.
    pub kind: ChangeKind,
    /// Where it happens.
    pub key: ChangeKey,
    /// The new value, when the kind carries one.
    pub value: Option<Value>,
}

impl Change {
    /// Builds an `add` record.
    #[must_use]
    pub fn add(key: impl Into<ChangeKey>, value: Value) -> Self {
        Self { kind: ChangeKind::Add, key: key.into(), value: Some(value) }
    }

    /// Builds an `update` record.
    #[must_use]
    pub fn update(key: impl Into<ChangeKey>, value: Value) -> Self {
        Self { kind: ChangeKind::Update, key: key.into(), value: Some(value) }
    }

    /// Builds a `delete` record.
    #[must_use]
    pub fn delete(key: impl Into<ChangeKey>) -> Self {
        Self { kind: ChangeKind::Delete, key: key.into(), value: None }
    }

    /// Builds a `pending` record.
    #[must_use]
    pub fn pending(key: impl Into<ChangeKey>) -> Self {
        Self { kind: ChangeKind::Pending, key: key.into(), value: None }
    }

    /// Builds a `none` record.
    #[must_use]
    pub fn unchanged(key: impl Into<ChangeKey>, value: Value) -> Self {
        Self { kind: ChangeKind::Unchanged, key: key.into(), value: Some(value) }
    }

    /// Renders the record as a `[kind, key, value]` JSON tuple.
    ///
    /// Missing values and values without a JSON form render as `null`.
    #[must_use]
    pub fn to_json_value(&self) -> JsonValue {
        let value = self.value.as_ref().and_then(Value::to_json_value).unwrap_or(JsonValue::Null);
        JsonValue::Array(vec![
            JsonValue::String(self.kind.as_str().to_string()),
            self.key.to_json_value(),
            value,
        ])
    }
}

/// Ordered change records for one container level.
///
/// ```
/// # use treesync_core::{diff, Change, Shape, Value};
/// let changes = diff(&Value::from_json_str("{}")?, &Value::from_json_str("{\"foo\":1}")?)?;
/// assert_eq!(changes.shape(), Shape::Mapping);
/// assert_eq!(changes.iter().collect::<Vec<_>>(), vec![&Change::add("foo", Value::from(1))]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeList {
    shape: Shape,
    changes: Vec<Change>,
}

impl ChangeList {
    /// Constructs an empty list for two absent values.
    #[must_use]
    pub fn empty() -> Self {
        Self { shape: Shape::Void, changes: Vec::new() }
    }

    /// Builds a list for a container of the given shape.
    #[must_use]
    pub fn from_changes(shape: Shape, changes: Vec<Change>) -> Self {
        Self { shape, changes }
    }

    /// Shape of the container level the list was computed for.
    ///
    /// [`Shape::Void`] only for the empty list between two absent values.
    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns `true` when the list holds no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns `true` when every record is `none`.
    ///
    /// Lists containing `pending` records are not no-ops even though the
    /// nested values may turn out equal.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.changes.iter().all(|change| change.kind == ChangeKind::Unchanged)
    }

    /// Iterates over the records in apply order.
    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    /// Consumes the list, returning the raw records.
    #[must_use]
    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }

    /// Renders the list as a JSON array of `[kind, key, value]` tuples.
    #[must_use]
    pub fn to_json_value(&self) -> JsonValue {
        JsonValue::Array(self.changes.iter().map(Change::to_json_value).collect())
    }

    /// Renders the list as compact JSON text.
    ///
    /// ```
    /// # use treesync_core::Value;
    /// let changes = Value::from_json_str("[1]")?.diff(&Value::from_json_str("[2]")?)?;
    /// assert_eq!(changes.render(), "[[\"delete\",0,null],[\"add\",0,2]]");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        self.to_json_value().to_string()
    }
}

impl<'a> IntoIterator for &'a ChangeList {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

impl IntoIterator for ChangeList {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

/// Computes the change list for one container level between `old` and `new`.
///
/// Either side may be [`Value::Void`], in which case the other side decides
/// whether the mapping or the sequence algorithm runs. Scalars at the root,
/// and a mapping against a sequence, are rejected.
///
/// ```
/// # use treesync_core::{diff, DiffError, Shape, Value};
/// let changes = diff(&Value::Void, &Value::from_json_str("[1]")?)?;
/// assert_eq!(changes.render(), "[[\"add\",0,1]]");
///
/// let err = diff(&Value::from_json_str("{}")?, &Value::from_json_str("[]")?).unwrap_err();
/// assert_eq!(err, DiffError::MalformedInput { old: Shape::Mapping, new: Shape::Sequence });
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn diff(old: &Value, new: &Value) -> Result<ChangeList, DiffError> {
    match (old, new) {
        (Value::Void, Value::Void) => Ok(ChangeList::empty()),
        (Value::Mapping(lhs), Value::Mapping(rhs)) => {
            Ok(ChangeList::from_changes(Shape::Mapping, mapping::diff_mappings(lhs, rhs)))
        }
        (Value::Mapping(lhs), Value::Void) => {
            let changes = mapping::diff_mappings(lhs, &BTreeMap::new());
            Ok(ChangeList::from_changes(Shape::Mapping, changes))
        }
        (Value::Void, Value::Mapping(rhs)) => {
            let changes = mapping::diff_mappings(&BTreeMap::new(), rhs);
            Ok(ChangeList::from_changes(Shape::Mapping, changes))
        }
        (Value::Sequence(lhs), Value::Sequence(rhs)) => {
            Ok(ChangeList::from_changes(Shape::Sequence, sequence::diff_sequences(lhs, rhs)))
        }
        (Value::Sequence(lhs), Value::Void) => {
            Ok(ChangeList::from_changes(Shape::Sequence, sequence::diff_sequences(lhs, &[])))
        }
        (Value::Void, Value::Sequence(rhs)) => {
            Ok(ChangeList::from_changes(Shape::Sequence, sequence::diff_sequences(&[], rhs)))
        }
        _ => Err(DiffError::MalformedInput { old: old.shape(), new: new.shape() }),
    }
}

/// Classifies a key present on both sides of a diff.
///
/// Composites of the same shape defer to a nested diff; a change of shape is
/// a plain replacement carrying the whole new value.
fn classify(key: impl Into<ChangeKey>, old: &Value, new: &Value) -> Change {
    match (old, new) {
        (Value::Mapping(_), Value::Mapping(_)) | (Value::Sequence(_), Value::Sequence(_)) => {
            Change::pending(key)
        }
        _ if old == new => Change::unchanged(key, new.clone()),
        _ => Change::update(key, new.clone()),
    }
}

/// Whether `pending` is the right record for this pair.
fn same_composite(old: &Value, new: &Value) -> bool {
    matches!(
        (old, new),
        (Value::Mapping(_), Value::Mapping(_)) | (Value::Sequence(_), Value::Sequence(_))
    )
}
