use std::sync::Arc;

use super::{same_composite, Change};
use crate::Value;

/// Diffs two sequences into records meant to be replayed in order.
///
/// `position` tracks the index into the target as it evolves during replay:
/// deletes leave it in place, every other record that leaves an element
/// behind advances it. A delete followed by an add at the same position
/// therefore acts as an in-place replacement.
pub(super) fn diff_sequences(lhs: &[Arc<Value>], rhs: &[Arc<Value>]) -> Vec<Change> {
    let anchors = common_anchors(lhs, rhs);
    let mut changes = Vec::with_capacity(lhs.len().max(rhs.len()));
    let mut position = 0usize;
    let mut a_cursor = 0usize;
    let mut b_cursor = 0usize;

    for (a_anchor, b_anchor) in anchors {
        diff_gap(
            &lhs[a_cursor..a_anchor],
            &rhs[b_cursor..b_anchor],
            &mut position,
            &mut changes,
        );
        changes.push(Change::unchanged(position, Value::clone(&rhs[b_anchor])));
        position += 1;
        a_cursor = a_anchor + 1;
        b_cursor = b_anchor + 1;
    }
    diff_gap(&lhs[a_cursor..], &rhs[b_cursor..], &mut position, &mut changes);

    changes
}

fn diff_gap(
    removed: &[Arc<Value>],
    added: &[Arc<Value>],
    position: &mut usize,
    changes: &mut Vec<Change>,
) {
    let paired = removed.len().min(added.len());
    for (before, after) in removed.iter().zip(added) {
        if same_composite(before, after) {
            changes.push(Change::pending(*position));
        } else {
            changes.push(Change::delete(*position));
            changes.push(Change::add(*position, Value::clone(after)));
        }
        *position += 1;
    }
    for _ in &removed[paired..] {
        changes.push(Change::delete(*position));
    }
    for after in &added[paired..] {
        changes.push(Change::add(*position, Value::clone(after)));
        *position += 1;
    }
}

/// Only equal scalars anchor the alignment; composites always fall into gaps.
fn aligns(lhs: &Value, rhs: &Value) -> bool {
    !lhs.is_composite() && !rhs.is_composite() && lhs == rhs
}

/// Returns `(lhs_index, rhs_index)` pairs of a longest common subsequence.
fn common_anchors(lhs: &[Arc<Value>], rhs: &[Arc<Value>]) -> Vec<(usize, usize)> {
    let n = lhs.len();
    let m = rhs.len();
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for (i, lhs_value) in lhs.iter().enumerate() {
        for (j, rhs_value) in rhs.iter().enumerate() {
            if aligns(lhs_value, rhs_value) {
                table[i + 1][j + 1] = table[i][j] + 1;
            } else {
                table[i + 1][j + 1] = table[i][j + 1].max(table[i + 1][j]);
            }
        }
    }

    let mut result = Vec::with_capacity(table[n][m]);
    let mut i = n;
    let mut j = m;
    while i > 0 && j > 0 {
        if aligns(&lhs[i - 1], &rhs[j - 1]) {
            result.push((i - 1, j - 1));
            i -= 1;
            j -= 1;
        } else if table[i - 1][j] >= table[i][j - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChangeKey, ChangeKind};

    fn items(json: &str) -> Vec<Arc<Value>> {
        match Value::from_json_str(json).unwrap() {
            Value::Sequence(items) => items,
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    /// Replays records the way both patchers do.
    fn replay(lhs: &[Arc<Value>], rhs: &[Arc<Value>]) -> Vec<Arc<Value>> {
        let mut working = lhs.to_vec();
        for change in diff_sequences(lhs, rhs) {
            let ChangeKey::Index(index) = change.key else {
                panic!("sequence diff produced a mapping key");
            };
            match change.kind {
                ChangeKind::Add => working.insert(index, Arc::new(change.value.unwrap())),
                ChangeKind::Update => working[index] = Arc::new(change.value.unwrap()),
                ChangeKind::Delete => {
                    working.remove(index);
                }
                ChangeKind::Pending => working[index] = Arc::clone(&rhs[index]),
                ChangeKind::Unchanged => assert_eq!(working[index], rhs[index]),
            }
        }
        working
    }

    #[test]
    fn empty_sequences_produce_no_records() {
        assert!(diff_sequences(&[], &[]).is_empty());
    }

    #[test]
    fn single_replacement_collapses_onto_one_slot() {
        let changes = diff_sequences(&items("[1]"), &items("[2]"));
        assert_eq!(changes, vec![Change::delete(0usize), Change::add(0usize, Value::from(2))]);
    }

    #[test]
    fn replacement_between_anchors_keeps_neighbours() {
        let changes = diff_sequences(&items("[1,3,3]"), &items("[1,2,3]"));
        assert_eq!(
            changes,
            vec![
                Change::unchanged(0usize, Value::from(1)),
                Change::delete(1usize),
                Change::add(1usize, Value::from(2)),
                Change::unchanged(2usize, Value::from(3)),
            ]
        );
    }

    #[test]
    fn growth_after_replacement_advances_position() {
        let changes = diff_sequences(&items("[1]"), &items("[2,3]"));
        assert_eq!(
            changes,
            vec![
                Change::delete(0usize),
                Change::add(0usize, Value::from(2)),
                Change::add(1usize, Value::from(3)),
            ]
        );
    }

    #[test]
    fn paired_composites_become_pending_at_their_new_index() {
        let changes = diff_sequences(&items("[0,5,{\"a\":1}]"), &items("[5,{\"a\":2}]"));
        assert_eq!(
            changes,
            vec![
                Change::delete(0usize),
                Change::unchanged(0usize, Value::from(5)),
                Change::pending(1usize),
            ]
        );
    }

    #[test]
    fn composites_of_different_shape_are_replaced() {
        let changes = diff_sequences(&items("[[1]]"), &items("[{\"a\":1}]"));
        assert_eq!(
            changes,
            vec![
                Change::delete(0usize),
                Change::add(0usize, Value::from_json_str("{\"a\":1}").unwrap()),
            ]
        );
    }

    #[test]
    fn replay_reconstructs_the_new_sequence() {
        let cases = [
            ("[]", "[1,2,3]"),
            ("[1,2,3]", "[]"),
            ("[1,2,3,4]", "[4,3,2,1]"),
            ("[\"a\",[1],{\"k\":1},null]", "[{\"k\":2},\"a\",[1,2],true,null]"),
            ("[1,1,1]", "[1,2,1,2]"),
        ];
        for (lhs, rhs) in cases {
            let lhs = items(lhs);
            let rhs = items(rhs);
            assert_eq!(replay(&lhs, &rhs), rhs, "replaying {lhs:?} -> {rhs:?}");
        }
    }
}
