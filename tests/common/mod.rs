use std::fs;
use std::path::PathBuf;

const TESTS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests");
const REGENERATE_VAR: &str = "HEAPLEDGER_UPDATE_SNAPSHOTS";

/// Path of a trace fixture under `tests/data`
#[allow(dead_code)]
pub fn data_path(name: &str) -> PathBuf {
    PathBuf::from(TESTS_DIR).join("data").join(name)
}

/// Compare `actual` against `tests/snapshots/<name>`, line by line
///
/// With `HEAPLEDGER_UPDATE_SNAPSHOTS` set, the golden file is rewritten
/// instead.
#[allow(dead_code)]
pub fn assert_snapshot(name: &str, actual: &str) {
    let path = PathBuf::from(TESTS_DIR).join("snapshots").join(name);

    if std::env::var_os(REGENERATE_VAR).is_some() {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let golden = fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("cannot read golden {}: {}", path.display(), err));

    let mut expected_lines = golden.lines();
    let mut actual_lines = actual.lines();
    let mut line_no = 1;
    loop {
        match (expected_lines.next(), actual_lines.next()) {
            (None, None) => return,
            (expected, got) if expected == got => line_no += 1,
            (expected, got) => panic!(
                "{} differs at line {}: expected {:?}, got {:?} (set {}=1 to regenerate)",
                path.display(),
                line_no,
                expected,
                got,
                REGENERATE_VAR
            ),
        }
    }
}
