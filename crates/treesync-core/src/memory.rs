use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::{convert, ContainerKind, ConvertError, SharedContainer, Slot, Store, Value};

/// In-process [`SharedContainer`] backed by `Arc<Mutex<_>>`.
///
/// Clones are handles to the same node. Equality is node identity, not
/// structural equality; compare [`MemoryContainer::to_value`] results for
/// the latter.
///
/// ```
/// # use treesync_core::{MemoryContainer, SharedContainer, Slot, Value};
/// let tree = MemoryContainer::from_value(&Value::from_json_str("{\"a\":1}")?)?;
/// let handle = tree.clone();
/// handle.set("b", Slot::Scalar(Value::from(2)));
/// assert_eq!(tree.to_value(), Value::from_json_str("{\"a\":1,\"b\":2}")?);
/// assert!(tree.ptr_eq(&handle));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct MemoryContainer {
    inner: Arc<Mutex<Body>>,
}

enum Body {
    Mapping(BTreeMap<String, Slot<MemoryContainer>>),
    Sequence(Vec<Slot<MemoryContainer>>),
}

impl MemoryContainer {
    /// Builds a container tree holding `value`.
    pub fn from_value(value: &Value) -> Result<Self, ConvertError> {
        convert::to_container(value)
    }

    /// Deep snapshot of the container as a plain value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.to_plain()
    }

    /// Whether both handles point at the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn body(&self) -> MutexGuard<'_, Body> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SharedContainer for MemoryContainer {
    fn detached(kind: ContainerKind) -> Self {
        let body = match kind {
            ContainerKind::Mapping => Body::Mapping(BTreeMap::new()),
            ContainerKind::Sequence => Body::Sequence(Vec::new()),
        };
        Self { inner: Arc::new(Mutex::new(body)) }
    }

    fn kind(&self) -> ContainerKind {
        match &*self.body() {
            Body::Mapping(_) => ContainerKind::Mapping,
            Body::Sequence(_) => ContainerKind::Sequence,
        }
    }

    fn len(&self) -> usize {
        match &*self.body() {
            Body::Mapping(map) => map.len(),
            Body::Sequence(items) => items.len(),
        }
    }

    fn keys(&self) -> Vec<String> {
        match &*self.body() {
            Body::Mapping(map) => map.keys().cloned().collect(),
            Body::Sequence(_) => Vec::new(),
        }
    }

    fn get(&self, key: &str) -> Option<Slot<Self>> {
        match &*self.body() {
            Body::Mapping(map) => map.get(key).cloned(),
            Body::Sequence(_) => None,
        }
    }

    fn set(&self, key: &str, slot: Slot<Self>) {
        if let Body::Mapping(map) = &mut *self.body() {
            map.insert(key.to_string(), slot);
        }
    }

    fn remove(&self, key: &str) {
        if let Body::Mapping(map) = &mut *self.body() {
            map.remove(key);
        }
    }

    fn get_index(&self, index: usize) -> Option<Slot<Self>> {
        match &*self.body() {
            Body::Sequence(items) => items.get(index).cloned(),
            Body::Mapping(_) => None,
        }
    }

    fn slice(&self, start: usize, end: usize) -> Vec<Slot<Self>> {
        match &*self.body() {
            Body::Sequence(items) => {
                let end = end.min(items.len());
                let start = start.min(end);
                items[start..end].to_vec()
            }
            Body::Mapping(_) => Vec::new(),
        }
    }

    fn delete_range(&self, index: usize, len: usize) {
        if let Body::Sequence(items) = &mut *self.body() {
            let start = index.min(items.len());
            let end = index.saturating_add(len).min(items.len());
            items.drain(start..end);
        }
    }

    fn insert(&self, index: usize, slots: Vec<Slot<Self>>) {
        if let Body::Sequence(items) = &mut *self.body() {
            let index = index.min(items.len());
            items.splice(index..index, slots);
        }
    }
}

impl PartialEq for MemoryContainer {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for MemoryContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MemoryContainer").field(&self.to_plain()).finish()
    }
}

/// In-process [`Store`] holding an `Arc<Value>` snapshot.
///
/// Every [`Store::replace`] bumps a revision counter, which makes commits
/// observable.
///
/// ```
/// # use std::sync::Arc;
/// # use treesync_core::{MemoryStore, Store, Value};
/// let store = MemoryStore::new(Value::from_json_str("{\"foo\":1}")?);
/// assert_eq!(store.revision(), 0);
/// store.replace(Arc::new(Value::from_json_str("{}")?));
/// assert_eq!(store.revision(), 1);
/// assert_eq!(*store.state(), Value::from_json_str("{}")?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<Arc<Value>>,
    revision: AtomicU64,
}

impl MemoryStore {
    /// Creates a store whose initial snapshot is `initial`.
    #[must_use]
    pub fn new(initial: Value) -> Self {
        Self { state: RwLock::new(Arc::new(initial)), revision: AtomicU64::new(0) }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn state(&self) -> Arc<Value> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of replacements committed so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Value::Mapping(BTreeMap::new()))
    }
}

impl Store for MemoryStore {
    fn snapshot(&self) -> Arc<Value> {
        self.state()
    }

    fn replace(&self, next: Arc<Value>) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
        self.revision.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(json: &str) -> Value {
        Value::from_json_str(json).unwrap()
    }

    #[test]
    fn sequence_operations_clamp_to_length() {
        let seq = MemoryContainer::from_value(&value("[1,2,3]")).unwrap();
        assert_eq!(seq.slice(1, 10).len(), 2);
        assert!(seq.slice(5, 10).is_empty());
        seq.delete_range(2, 10);
        seq.insert(10, vec![Slot::Scalar(Value::from(9))]);
        assert_eq!(seq.to_value(), value("[1,2,9]"));
    }

    #[test]
    fn mapping_operations_on_sequences_are_ignored() {
        let seq = MemoryContainer::from_value(&value("[1]")).unwrap();
        seq.set("a", Slot::Scalar(Value::Null));
        seq.remove("a");
        assert!(seq.get("a").is_none());
        assert!(seq.keys().is_empty());
        assert_eq!(seq.to_value(), value("[1]"));
    }

    #[test]
    fn sequence_operations_on_mappings_are_ignored() {
        let map = MemoryContainer::from_value(&value("{\"a\":1}")).unwrap();
        map.insert(0, vec![Slot::Scalar(Value::Null)]);
        map.delete_range(0, 1);
        assert!(map.get_index(0).is_none());
        assert_eq!(map.to_value(), value("{\"a\":1}"));
    }

    #[test]
    fn nested_handles_share_state() {
        let root = MemoryContainer::from_value(&value("{\"child\":{}}")).unwrap();
        let child = root.get("child").unwrap().as_container().cloned().unwrap();
        child.set("x", Slot::Scalar(Value::from(1)));
        assert_eq!(root.to_value(), value("{\"child\":{\"x\":1}}"));
    }

    #[test]
    fn default_store_holds_an_empty_mapping() {
        let store = MemoryStore::default();
        assert_eq!(*store.state(), value("{}"));
        assert_eq!(store.revision(), 0);
    }
}
