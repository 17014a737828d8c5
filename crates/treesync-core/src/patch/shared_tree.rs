use tracing::{debug, trace};

use super::{PatchError, PatchStats, Trail};
use crate::convert::Materializer;
use crate::{
    diff, CallablePolicy, Change, ChangeKey, ChangeKind, ContainerKind, ConvertError,
    PatchOptions, Shape, SharedContainer, Slot, Value,
};

/// A write against one container, with every new value already converted.
enum Step<C> {
    Set { key: String, slot: Slot<C>, kind: ChangeKind },
    Remove(String),
    Splice { index: usize, slot: Slot<C>, replace: bool },
    RemoveAt(usize),
    Descend(ChangeKey),
}

pub(super) fn patch_container<C: SharedContainer>(
    target: &C,
    new_value: &Value,
    options: &PatchOptions,
    trail: &Trail,
    stats: &mut PatchStats,
) -> Result<(), PatchError> {
    trail.enter(options)?;
    let kind = target.kind();
    if new_value.shape() != Shape::from(kind) {
        return Err(trail.mismatch(kind.into(), new_value.shape()));
    }

    let changes = diff(&target.to_plain(), new_value)?;
    debug!(path = %trail, %kind, records = changes.len(), "patching shared container");

    let steps = plan(kind, changes.into_changes(), options, trail, stats)?;
    for step in steps {
        apply(target, step, new_value, options, trail, stats)?;
    }
    Ok(())
}

fn plan<C: SharedContainer>(
    kind: ContainerKind,
    changes: Vec<Change>,
    options: &PatchOptions,
    trail: &Trail,
    stats: &mut PatchStats,
) -> Result<Vec<Step<C>>, PatchError> {
    let mut materializer = Materializer::new(options.callables());
    let mut steps = Vec::with_capacity(changes.len());
    for change in changes {
        let value = change.value.unwrap_or(Value::Void);
        let step = match (kind, change.key, change.kind) {
            (_, _, ChangeKind::Unchanged) => continue,
            (_, key, ChangeKind::Pending) => Step::Descend(key),
            (ContainerKind::Mapping, ChangeKey::Key(key), ChangeKind::Delete) => Step::Remove(key),
            (ContainerKind::Sequence, ChangeKey::Index(index), ChangeKind::Delete) => {
                Step::RemoveAt(index)
            }
            (
                ContainerKind::Mapping,
                ChangeKey::Key(key),
                op @ (ChangeKind::Add | ChangeKind::Update),
            ) => {
                if let Value::Callable(callable) = &value {
                    if options.callables() == CallablePolicy::Reject {
                        let name = callable.name().to_string();
                        return Err(ConvertError::Callable { name }.into());
                    }
                    debug!(path = %trail, key = %key, name = callable.name(), "skipping callable");
                    stats.skipped += 1;
                    continue;
                }
                Step::Set { key, slot: materializer.slot(&value)?, kind: op }
            }
            (
                ContainerKind::Sequence,
                ChangeKey::Index(index),
                op @ (ChangeKind::Add | ChangeKind::Update),
            ) => Step::Splice {
                index,
                slot: materializer.slot(&value)?,
                replace: op == ChangeKind::Update,
            },
            (ContainerKind::Mapping, ChangeKey::Index(_), _) => {
                return Err(trail.mismatch(Shape::Mapping, Shape::Sequence));
            }
            (ContainerKind::Sequence, ChangeKey::Key(_), _) => {
                return Err(trail.mismatch(Shape::Sequence, Shape::Mapping));
            }
        };
        steps.push(step);
    }
    stats.skipped += materializer.skipped();
    Ok(steps)
}

fn apply<C: SharedContainer>(
    target: &C,
    step: Step<C>,
    new_value: &Value,
    options: &PatchOptions,
    trail: &Trail,
    stats: &mut PatchStats,
) -> Result<(), PatchError> {
    match step {
        Step::Set { key, slot, kind } => {
            trace!(path = %trail, key = %key, %kind, "set");
            target.set(&key, slot);
            if kind == ChangeKind::Add {
                stats.added += 1;
            } else {
                stats.updated += 1;
            }
        }
        Step::Remove(key) => {
            trace!(path = %trail, key = %key, "remove");
            target.remove(&key);
            stats.deleted += 1;
        }
        Step::Splice { index, slot, replace } => {
            trace!(path = %trail, index, replace, "splice");
            // Rebuild the sequence around the slot; existing handles are moved, never copied.
            let len = target.len();
            let resume = if replace { index + 1 } else { index };
            let mut items = target.slice(0, index);
            items.push(slot);
            items.extend(target.slice(resume, len));
            target.delete_range(0, len);
            target.insert(0, items);
            if replace {
                stats.updated += 1;
            } else {
                stats.added += 1;
            }
        }
        Step::RemoveAt(index) => {
            trace!(path = %trail, index, "remove at");
            target.delete_range(index, 1);
            stats.deleted += 1;
        }
        Step::Descend(key) => {
            let new_child = new_value.get(&key).unwrap_or(&Value::Void);
            let child_trail = trail.child(&key);
            let existing = match &key {
                ChangeKey::Key(name) => target.get(name),
                ChangeKey::Index(index) => target.get_index(*index),
            };
            let child = match existing {
                Some(Slot::Container(child)) => child,
                Some(Slot::Scalar(found)) => {
                    return Err(child_trail.mismatch(found.shape(), new_child.shape()));
                }
                None => return Err(child_trail.mismatch(Shape::Void, new_child.shape())),
            };
            stats.descended += 1;
            patch_container(&child, new_child, options, &child_trail, stats)?;
        }
    }
    Ok(())
}
