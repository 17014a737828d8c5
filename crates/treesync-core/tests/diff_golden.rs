use std::fs;
use std::path::Path;

use serde::Deserialize;
use treesync_core::Value;

#[derive(Debug, Deserialize)]
struct Fixture {
    old: Option<serde_json::Value>,
    new: Option<serde_json::Value>,
    changes: serde_json::Value,
}

fn load_fixture(path: &Path) -> Fixture {
    let data = fs::read_to_string(path).expect("fixture should be readable");
    serde_json::from_str(&data).expect("fixture should deserialize")
}

fn side(json: Option<serde_json::Value>) -> Value {
    json.map_or(Value::Void, |json| Value::from_json_value(json).expect("fixture value parses"))
}

#[test]
fn change_list_golden_parity() {
    let fixtures_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/diff");
    let mut entries: Vec<_> = fs::read_dir(&fixtures_root)
        .expect("fixtures directory must exist")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    entries.sort();

    assert!(!entries.is_empty(), "expected at least one diff fixture under tests/fixtures/diff");

    for path in entries {
        let fixture = load_fixture(&path);
        let old = side(fixture.old);
        let new = side(fixture.new);
        let changes = old.diff(&new).expect("fixture sides are diffable");
        assert_eq!(changes.to_json_value(), fixture.changes, "fixture {path:?}");
    }
}
