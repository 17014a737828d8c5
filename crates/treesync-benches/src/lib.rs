//! Synthetic corpora for the `treesync` benchmarks.
//!
//! Every corpus is generated deterministically from its parameters, so runs
//! are comparable without shipping fixture files.
//!
//! # Examples
//!
//! ```
//! let corpus = treesync_benches::available_corpora()
//!     .into_iter()
//!     .find(|corpus| corpus.name() == "todo-list")
//!     .expect("registered corpus");
//! assert!(!corpus.changes()?.is_noop());
//! # Ok::<(), treesync_core::DiffError>(())
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::collections::BTreeMap;

use treesync_core::{
    diff, ChangeList, ConvertError, DiffError, MemoryContainer, MemoryStore, Value,
};

/// A named `(before, after)` pair of documents.
#[derive(Clone, Debug)]
pub struct Corpus {
    name: &'static str,
    before: Value,
    after: Value,
}

impl Corpus {
    /// Short identifier used as the benchmark id.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The document patches start from.
    #[must_use]
    pub fn before(&self) -> &Value {
        &self.before
    }

    /// The document patches move towards.
    #[must_use]
    pub fn after(&self) -> &Value {
        &self.after
    }

    /// Root-level change list between the two documents.
    pub fn changes(&self) -> Result<ChangeList, DiffError> {
        diff(&self.before, &self.after)
    }

    /// Fresh shared tree holding [`Corpus::before`].
    pub fn shared_tree(&self) -> Result<MemoryContainer, ConvertError> {
        MemoryContainer::from_value(&self.before)
    }

    /// Fresh store holding [`Corpus::before`].
    #[must_use]
    pub fn store(&self) -> MemoryStore {
        MemoryStore::new(self.before.clone())
    }

    /// Number of values in [`Corpus::before`], containers included.
    #[must_use]
    pub fn node_count(&self) -> u64 {
        count_nodes(&self.before)
    }
}

/// Returns every registered corpus.
#[must_use]
pub fn available_corpora() -> Vec<Corpus> {
    vec![todo_list(200), wide_mapping(500), deep_nesting(32)]
}

/// A todo app state: a list of items where some are toggled, one is
/// inserted near the front and the last one is dropped.
fn todo_list(len: usize) -> Corpus {
    let item = |index: usize, done: bool| {
        let mut map = BTreeMap::new();
        map.insert("id".to_string(), Value::from(index_value(index)));
        map.insert("title".to_string(), Value::from(format!("task {index}")));
        map.insert("done".to_string(), Value::from(done));
        Value::from(map)
    };

    let before: Vec<Value> = (0..len).map(|index| item(index, false)).collect();
    let mut after: Vec<Value> =
        (0..len.saturating_sub(1)).map(|index| item(index, index % 7 == 0)).collect();
    after.insert(after.len().min(3), item(len, false));

    Corpus {
        name: "todo-list",
        before: app_state(Value::from(before), "all"),
        after: app_state(Value::from(after), "active"),
    }
}

/// A flat mapping where every tenth value changes and a few keys come and go.
fn wide_mapping(len: usize) -> Corpus {
    let before: BTreeMap<String, Value> =
        (0..len).map(|index| (format!("key{index:04}"), Value::from(index_value(index)))).collect();
    let mut after = before.clone();
    for index in (0..len).step_by(10) {
        after.insert(format!("key{index:04}"), Value::from(format!("changed {index}")));
    }
    for index in (0..len).step_by(50) {
        after.remove(&format!("key{:04}", index + 1));
        after.insert(format!("extra{index:04}"), Value::Null);
    }
    Corpus { name: "wide-mapping", before: Value::from(before), after: Value::from(after) }
}

/// A chain of nested mappings with a single leaf change at the bottom.
fn deep_nesting(depth: usize) -> Corpus {
    let chain = |leaf: Value| {
        (0..depth).fold(leaf, |inner, level| {
            let mut map = BTreeMap::new();
            map.insert(format!("level{level}"), inner);
            map.insert("siblings".to_string(), Value::from(vec![Value::from(1), Value::from(2)]));
            Value::from(map)
        })
    };
    Corpus { name: "deep-nesting", before: chain(Value::from(1)), after: chain(Value::from(2)) }
}

fn app_state(todos: Value, filter: &str) -> Value {
    let mut map = BTreeMap::new();
    map.insert("todos".to_string(), todos);
    map.insert("filter".to_string(), Value::from(filter));
    Value::from(map)
}

fn index_value(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

fn count_nodes(value: &Value) -> u64 {
    match value {
        Value::Sequence(items) => 1 + items.iter().map(|item| count_nodes(item)).sum::<u64>(),
        Value::Mapping(map) => 1 + map.values().map(|member| count_nodes(member)).sum::<u64>(),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treesync_core::{patch_shared_tree, patch_store};

    #[test]
    fn corpora_have_unique_names() {
        let corpora = available_corpora();
        let mut names: Vec<_> = corpora.iter().map(Corpus::name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), corpora.len());
    }

    #[test]
    fn every_corpus_patches_cleanly() {
        for corpus in available_corpora() {
            let tree = corpus.shared_tree().unwrap();
            patch_shared_tree(&tree, corpus.after()).unwrap();
            assert_eq!(&tree.to_value(), corpus.after(), "corpus {}", corpus.name());

            let store = corpus.store();
            patch_store(&store, corpus.after()).unwrap();
            assert_eq!(&*store.state(), corpus.after(), "corpus {}", corpus.name());
        }
    }

    #[test]
    fn deep_corpus_counts_every_level() {
        let corpus = deep_nesting(32);
        assert_eq!(corpus.node_count(), 32 * 4 + 1);
    }
}
