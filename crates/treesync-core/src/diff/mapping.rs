use std::collections::BTreeMap;
use std::sync::Arc;

use super::{classify, Change};
use crate::Value;

pub(super) fn diff_mappings(
    lhs: &BTreeMap<String, Arc<Value>>,
    rhs: &BTreeMap<String, Arc<Value>>,
) -> Vec<Change> {
    let mut changes = Vec::with_capacity(lhs.len().max(rhs.len()));

    for (key, value) in lhs {
        match rhs.get(key) {
            Some(other) => changes.push(classify(key.as_str(), value, other)),
            None => changes.push(Change::delete(key.as_str())),
        }
    }

    for (key, value) in rhs {
        if lhs.contains_key(key) {
            continue;
        }
        changes.push(Change::add(key.as_str(), Value::clone(value)));
    }

    changes
}
