//! Fuzzing harnesses for `treesync`.
//!
//! Each public function accepts raw bytes, so the same code backs the
//! `cargo fuzz` targets and the smoke tests below. Inputs that cannot be
//! decoded are ignored; broken invariants panic so the fuzzer records them.
//!
//! # Examples
//!
//! ```
//! treesync_fuzz::fuzz_canonicalization(b"{\"a\":1}");
//! treesync_fuzz::fuzz_diff(&[1, 2, 3, 4]);
//! treesync_fuzz::fuzz_shared_tree(b"example");
//! treesync_fuzz::fuzz_store(b"example");
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs)]

use arbitrary::Unstructured;
use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};
use treesync_core::{
    diff, patch_shared_tree, patch_store, ChangeKind, MemoryContainer, MemoryStore, Value,
};

const MAX_DEPTH: usize = 4;
const MAX_SEQUENCE_LEN: u8 = 6;
const MAX_MAPPING_LEN: u8 = 6;
const MAX_STRING_LEN: u8 = 12;

/// Feeds arbitrary bytes through the JSON and YAML ingestion routines.
///
/// ```
/// treesync_fuzz::fuzz_canonicalization(b"{\"key\":\"value\"}");
/// ```
pub fn fuzz_canonicalization(data: &[u8]) {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = Value::from_json_str(text);
        let _ = Value::from_yaml_str(text);
    }
}

/// Diffs random values against each other and against themselves.
///
/// A self-diff may only contain `none` and `pending` records.
///
/// ```
/// treesync_fuzz::fuzz_diff(b"seed");
/// ```
pub fn fuzz_diff(data: &[u8]) {
    let mut unstructured = Unstructured::new(data);
    let Some(old) = random_value(&mut unstructured) else {
        return;
    };
    let Some(new) = random_value(&mut unstructured) else {
        return;
    };
    let _ = diff(&old, &new);

    if let Ok(changes) = diff(&old, &old) {
        assert!(
            changes
                .iter()
                .all(|change| matches!(change.kind, ChangeKind::Unchanged | ChangeKind::Pending)),
            "self-diff produced writes: {}",
            changes.render()
        );
    }
}

/// Patches a shared tree between two random mappings and checks convergence.
///
/// ```
/// treesync_fuzz::fuzz_shared_tree(b"tree");
/// ```
pub fn fuzz_shared_tree(data: &[u8]) {
    let Some((old, new)) = random_pair(data) else {
        return;
    };
    let Ok(tree) = MemoryContainer::from_value(&old) else {
        return;
    };
    if patch_shared_tree(&tree, &new).is_err() {
        return;
    }
    assert_eq!(tree.to_value(), new, "shared tree diverged");

    let again = patch_shared_tree(&tree, &new).map(|stats| stats.mutations());
    assert_eq!(again, Ok(0), "second application mutated the tree");
}

/// Patches a store between two random mappings and checks convergence.
///
/// ```
/// treesync_fuzz::fuzz_store(b"store");
/// ```
pub fn fuzz_store(data: &[u8]) {
    let Some((old, new)) = random_pair(data) else {
        return;
    };
    let store = MemoryStore::new(old);
    if patch_store(&store, &new).is_err() {
        return;
    }
    assert_eq!(*store.state(), new, "store diverged");
    assert_eq!(store.revision(), 1, "store committed more than once");
}

fn random_pair(data: &[u8]) -> Option<(Value, Value)> {
    let mut unstructured = Unstructured::new(data);
    let old = random_mapping(&mut unstructured)?;
    let new = random_mapping(&mut unstructured)?;
    Some((old, new))
}

fn random_value(unstructured: &mut Unstructured<'_>) -> Option<Value> {
    let value = json_value_from_unstructured(unstructured, 0).ok()?;
    Value::from_json_value(value).ok()
}

fn random_mapping(unstructured: &mut Unstructured<'_>) -> Option<Value> {
    let value = json_mapping(unstructured, 0).ok()?;
    Value::from_json_value(value).ok()
}

fn json_value_from_unstructured(
    unstructured: &mut Unstructured<'_>,
    depth: usize,
) -> Result<JsonValue, arbitrary::Error> {
    if depth >= MAX_DEPTH {
        return json_leaf(unstructured);
    }

    let choice = unstructured.int_in_range::<u8>(0..=5)?;
    match choice {
        0 => Ok(JsonValue::Null),
        1 => Ok(JsonValue::Bool(unstructured.arbitrary()?)),
        2 => Ok(JsonValue::Number(random_number(unstructured)?)),
        3 => Ok(JsonValue::String(random_string(unstructured)?)),
        4 => {
            let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_SEQUENCE_LEN)?);
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(json_value_from_unstructured(unstructured, depth + 1)?);
            }
            Ok(JsonValue::Array(items))
        }
        _ => json_mapping(unstructured, depth),
    }
}

fn json_mapping(
    unstructured: &mut Unstructured<'_>,
    depth: usize,
) -> Result<JsonValue, arbitrary::Error> {
    let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_MAPPING_LEN)?);
    let mut map = JsonMap::new();
    for _ in 0..len {
        let key = random_string(unstructured)?;
        let value = json_value_from_unstructured(unstructured, depth + 1)?;
        map.insert(key, value);
    }
    Ok(JsonValue::Object(map))
}

fn json_leaf(unstructured: &mut Unstructured<'_>) -> Result<JsonValue, arbitrary::Error> {
    let choice = unstructured.int_in_range::<u8>(0..=3)?;
    match choice {
        0 => Ok(JsonValue::Null),
        1 => Ok(JsonValue::Bool(unstructured.arbitrary()?)),
        2 => Ok(JsonValue::Number(random_number(unstructured)?)),
        _ => Ok(JsonValue::String(random_string(unstructured)?)),
    }
}

fn random_number(unstructured: &mut Unstructured<'_>) -> Result<JsonNumber, arbitrary::Error> {
    if unstructured.arbitrary()? {
        let int = unstructured.arbitrary::<i64>()?;
        Ok(JsonNumber::from(int))
    } else {
        let numerator = f64::from(unstructured.arbitrary::<i32>()?);
        let denominator = f64::from(unstructured.int_in_range::<u16>(1..=1024)?);
        JsonNumber::from_f64(numerator / denominator).ok_or(arbitrary::Error::IncorrectFormat)
    }
}

fn random_string(unstructured: &mut Unstructured<'_>) -> Result<String, arbitrary::Error> {
    let len = usize::from(unstructured.int_in_range::<u8>(0..=MAX_STRING_LEN)?);
    let mut string = String::with_capacity(len);
    for _ in 0..len {
        let byte = unstructured.int_in_range::<u8>(0x20..=0x7e)?;
        string.push(char::from(byte));
    }
    Ok(string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalization_handles_utf8() {
        fuzz_canonicalization(br"{}");
        fuzz_canonicalization(b"foo: [1, 2]");
    }

    #[test]
    fn diff_harness_runs() {
        fuzz_diff(b"diff");
    }

    #[test]
    fn patch_harnesses_run_on_a_spread_of_seeds() {
        for seed in 0u8..64 {
            let data: Vec<u8> = (0..96u8).map(|i| i.wrapping_mul(31).wrapping_add(seed)).collect();
            fuzz_shared_tree(&data);
            fuzz_store(&data);
            fuzz_diff(&data);
        }
    }

    #[test]
    fn random_mappings_are_mappings() {
        let mut unstructured = Unstructured::new(b"some bytes for a mapping");
        if let Some(value) = random_mapping(&mut unstructured) {
            assert!(matches!(value, Value::Mapping(_)));
        }
    }
}
