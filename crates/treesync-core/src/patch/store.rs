use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use super::{PatchError, PatchStats, Trail};
use crate::{diff, ChangeKey, ChangeList, ChangeKind, PatchOptions, Shape, Value};

/// Builds the patched version of `old`, or `None` when it already matches.
///
/// `old` is never modified. Children that end up unchanged are carried over
/// as the same `Arc`, and callables held by an old mapping survive even when
/// the new value lacks them.
pub(super) fn patch_node(
    old: &Value,
    new: &Value,
    options: &PatchOptions,
    trail: &Trail,
    stats: &mut PatchStats,
) -> Result<Option<Value>, PatchError> {
    trail.enter(options)?;
    let changes = diff(old, new)?;
    if changes.is_empty() {
        return Ok(None);
    }
    debug!(
        path = %trail,
        shape = %changes.shape(),
        records = changes.len(),
        "patching snapshot node"
    );

    match changes.shape() {
        Shape::Mapping => fold_mapping(old, new, changes, options, trail, stats),
        Shape::Sequence => fold_sequence(old, new, changes, options, trail, stats),
        other => Err(trail.mismatch(old.shape(), other)),
    }
}

/// Patches the child of `old` at `key`, returning the handle to store in the
/// draft: the old one when nothing changed, a fresh one otherwise.
fn patch_child(
    old: &Value,
    new: &Value,
    key: &ChangeKey,
    options: &PatchOptions,
    trail: &Trail,
    stats: &mut PatchStats,
) -> Result<(Arc<Value>, bool), PatchError> {
    let child_trail = trail.child(key);
    let next = new.get(key).unwrap_or(&Value::Void);
    let Some(previous) = old.child(key) else {
        return Err(child_trail.mismatch(Shape::Void, next.shape()));
    };
    stats.descended += 1;
    match patch_node(previous, next, options, &child_trail, stats)? {
        Some(patched) => Ok((Arc::new(patched), true)),
        None => Ok((Arc::clone(previous), false)),
    }
}

fn fold_mapping(
    old: &Value,
    new: &Value,
    changes: ChangeList,
    options: &PatchOptions,
    trail: &Trail,
    stats: &mut PatchStats,
) -> Result<Option<Value>, PatchError> {
    let mut draft = BTreeMap::new();
    let mut changed = false;

    for change in changes {
        let ChangeKey::Key(name) = &change.key else {
            return Err(trail.mismatch(Shape::Mapping, Shape::Sequence));
        };
        match change.kind {
            ChangeKind::Add | ChangeKind::Update => {
                trace!(path = %trail, key = %name, kind = %change.kind, "draft write");
                if change.kind == ChangeKind::Add {
                    stats.added += 1;
                } else {
                    stats.updated += 1;
                }
                draft.insert(name.clone(), Arc::new(change.value.unwrap_or(Value::Void)));
                changed = true;
            }
            ChangeKind::Unchanged => {
                let kept = match old.child(&change.key) {
                    Some(previous) => Arc::clone(previous),
                    None => Arc::new(change.value.unwrap_or(Value::Void)),
                };
                draft.insert(name.clone(), kept);
            }
            ChangeKind::Pending => {
                let (child, child_changed) =
                    patch_child(old, new, &change.key, options, trail, stats)?;
                draft.insert(name.clone(), child);
                changed |= child_changed;
            }
            ChangeKind::Delete => {
                if old.get(&change.key).is_some_and(Value::is_callable) {
                    trace!(path = %trail, key = %name, "keeping callable");
                } else {
                    stats.deleted += 1;
                    changed = true;
                }
            }
        }
    }

    if let Value::Mapping(previous) = old {
        for (name, member) in previous {
            if member.is_callable() && !draft.contains_key(name) {
                draft.insert(name.clone(), Arc::clone(member));
            }
        }
    }

    Ok(changed.then_some(Value::Mapping(draft)))
}

fn fold_sequence(
    old: &Value,
    new: &Value,
    changes: ChangeList,
    options: &PatchOptions,
    trail: &Trail,
    stats: &mut PatchStats,
) -> Result<Option<Value>, PatchError> {
    // Copies handles only; elements stay shared with `old` until replaced.
    let mut working = match old {
        Value::Sequence(items) => items.clone(),
        _ => Vec::new(),
    };
    let mut changed = false;

    for change in changes {
        let ChangeKey::Index(index) = change.key else {
            return Err(trail.mismatch(Shape::Sequence, Shape::Mapping));
        };
        match change.kind {
            ChangeKind::Add => {
                let at = index.min(working.len());
                working.insert(at, Arc::new(change.value.unwrap_or(Value::Void)));
                stats.added += 1;
                changed = true;
            }
            ChangeKind::Update => {
                let next = Arc::new(change.value.unwrap_or(Value::Void));
                match working.get_mut(index) {
                    Some(slot) => *slot = next,
                    None => working.push(next),
                }
                stats.updated += 1;
                changed = true;
            }
            ChangeKind::Delete => {
                if index < working.len() {
                    working.remove(index);
                }
                stats.deleted += 1;
                changed = true;
            }
            ChangeKind::Pending => {
                let key = ChangeKey::Index(index);
                let child_trail = trail.child(&key);
                let next = new.get(&key).unwrap_or(&Value::Void);
                let Some(slot) = working.get_mut(index) else {
                    return Err(child_trail.mismatch(Shape::Void, next.shape()));
                };
                stats.descended += 1;
                if let Some(patched) = patch_node(slot, next, options, &child_trail, stats)? {
                    *slot = Arc::new(patched);
                    changed = true;
                }
            }
            ChangeKind::Unchanged => {}
        }
    }

    Ok(changed.then_some(Value::Sequence(working)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        patch_store, patch_store_with, Callable, MemoryStore, PatchError, PatchOptions, Store,
    };

    use super::*;

    fn value(json: &str) -> Value {
        Value::from_json_str(json).unwrap()
    }

    fn assert_patched(old: &str, new: &str) {
        let store = MemoryStore::new(value(old));
        patch_store(&store, &value(new)).unwrap();
        assert_eq!(*store.state(), value(new), "patching {old} into {new}");
    }

    #[test]
    fn patches_mapping_keys() {
        assert_patched("{}", r#"{"foo":1}"#);
        assert_patched(r#"{"foo":1}"#, r#"{"foo":2}"#);
        assert_patched(r#"{"foo":1}"#, "{}");
    }

    #[test]
    fn patches_nested_mappings() {
        assert_patched(r#"{"foo":{}}"#, r#"{"foo":{"bar":2}}"#);
        assert_patched(r#"{"foo":{"bar":1}}"#, r#"{"foo":{"bar":2}}"#);
        assert_patched(r#"{"foo":{"bar":1}}"#, r#"{"foo":{}}"#);
    }

    #[test]
    fn patches_sequences() {
        assert_patched(r#"{"foo":[]}"#, r#"{"foo":[1]}"#);
        assert_patched(r#"{"foo":[1]}"#, r#"{"foo":[]}"#);
        assert_patched(r#"{"foo":[1]}"#, r#"{"foo":[2,3]}"#);
        assert_patched(r#"{"foo":[[1],{"a":1}]}"#, r#"{"foo":[[1,2],{"a":2}]}"#);
    }

    #[test]
    fn inserts_into_the_middle_of_a_sequence() {
        let store = MemoryStore::new(value(r#"{"foo":[1,3,3]}"#));
        patch_store(&store, &value(r#"{"foo":[1,2,3]}"#)).unwrap();
        let state = store.state();
        let foo = state.get(&ChangeKey::key("foo")).unwrap();
        let second = foo.get(&ChangeKey::Index(1));
        assert_eq!(second, Some(&Value::from(2)));
    }

    #[test]
    fn commits_exactly_once() {
        let store = MemoryStore::new(value(r#"{"a":{"b":{"c":1}},"d":[1,2]}"#));
        patch_store(&store, &value(r#"{"a":{"b":{"c":2}},"d":[2]}"#)).unwrap();
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn no_op_keeps_the_same_snapshot() {
        let store = MemoryStore::new(value(r#"{"foo":[1,{"bar":true}]}"#));
        let before = store.state();
        let stats = patch_store(&store, &value(r#"{"foo":[1,{"bar":true}]}"#)).unwrap();
        assert!(Arc::ptr_eq(&before, &store.state()));
        assert_eq!(stats.mutations(), 0);
        assert_eq!(store.revision(), 1);
    }

    fn shares_child(before: &Value, after: &Value, path: &[ChangeKey]) -> bool {
        let mut before = before;
        let mut after = after;
        let (last, parents) = path.split_last().unwrap();
        for key in parents {
            before = before.get(key).unwrap();
            after = after.get(key).unwrap();
        }
        Arc::ptr_eq(before.child(last).unwrap(), after.child(last).unwrap())
    }

    #[test]
    fn untouched_siblings_keep_their_identity() {
        let store = MemoryStore::new(value(r#"{"keep":{"x":[1,2]},"change":1}"#));
        let before = store.state();
        patch_store(&store, &value(r#"{"keep":{"x":[1,2]},"change":2}"#)).unwrap();
        let after = store.state();
        assert_eq!(*after, value(r#"{"keep":{"x":[1,2]},"change":2}"#));
        assert!(shares_child(&before, &after, &[ChangeKey::key("keep")]));
    }

    #[test]
    fn descended_but_unchanged_children_keep_their_identity() {
        let store = MemoryStore::new(value(r#"{"outer":{"same":{"a":[1]},"leaf":1}}"#));
        let before = store.state();
        let new = value(r#"{"outer":{"same":{"a":[1]},"leaf":2}}"#);
        let stats = patch_store(&store, &new).unwrap();
        let after = store.state();
        assert_eq!(stats.descended, 3);
        assert!(!shares_child(&before, &after, &[ChangeKey::key("outer")]));
        let same = [ChangeKey::key("outer"), ChangeKey::key("same")];
        assert!(shares_child(&before, &after, &same));
    }

    #[test]
    fn sequence_elements_keep_their_identity_around_edits() {
        let store = MemoryStore::new(value(r#"{"list":[{"a":1},0,{"b":2}]}"#));
        let before = store.state();
        patch_store(&store, &value(r#"{"list":[{"a":1},5,1,{"b":3}]}"#)).unwrap();
        let after = store.state();
        assert_eq!(*after, value(r#"{"list":[{"a":1},5,1,{"b":3}]}"#));
        let first = [ChangeKey::key("list"), ChangeKey::Index(0)];
        assert!(shares_child(&before, &after, &first));
    }

    #[test]
    fn old_callables_are_preserved() {
        let increment = Value::from(Callable::new("increment", |_| Value::Null));
        let mut old = BTreeMap::new();
        old.insert("count".to_string(), Value::from(1));
        old.insert("increment".to_string(), increment.clone());
        let store = MemoryStore::new(Value::from(old));

        let stats = patch_store(&store, &value(r#"{"count":2}"#)).unwrap();

        let mut expected = BTreeMap::new();
        expected.insert("count".to_string(), Value::from(2));
        expected.insert("increment".to_string(), increment);
        assert_eq!(*store.state(), Value::from(expected));
        assert_eq!(stats.deleted, 0);
    }

    #[test]
    fn dropping_only_a_callable_is_a_no_op() {
        let mut old = BTreeMap::new();
        old.insert("reset".to_string(), Value::from(Callable::new("reset", |_| Value::Null)));
        let store = MemoryStore::new(Value::from(old));
        let before = store.state();
        patch_store(&store, &value("{}")).unwrap();
        assert!(Arc::ptr_eq(&before, &store.state()));
    }

    #[test]
    fn failures_do_not_commit() {
        let store = MemoryStore::new(value(r#"{"a":{"b":{"c":1}}}"#));
        let options = PatchOptions::default().with_max_depth(2).unwrap();
        let err = patch_store_with(&store, &value(r#"{"a":{"b":{"c":2}}}"#), &options).unwrap_err();
        assert_eq!(err, PatchError::DepthExceeded { limit: 2, path: "/a/b".to_string() });
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn root_shape_mismatch_is_rejected() {
        let store = MemoryStore::new(value("{}"));
        let err = patch_store(&store, &value("[]")).unwrap_err();
        assert!(matches!(err, PatchError::TargetMismatch { .. }));
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn empty_store_accepts_a_first_snapshot() {
        let store = MemoryStore::new(Value::Void);
        patch_store(&store, &value(r#"{"foo":1}"#)).unwrap();
        assert_eq!(*store.snapshot(), value(r#"{"foo":1}"#));
    }
}
