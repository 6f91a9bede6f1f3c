//! File backend behavior on a real directory

use canonize_contract::{NamingPolicy, OracleResult};
use canonize_store::{CanonBackend, CanonStore, FileBackend, StoreError};
use pretty_assertions::assert_eq;

const CANON: &str = "def f(n):\n    return n * 2\n";

fn store_in(dir: &tempfile::TempDir) -> CanonStore {
    CanonStore::new(FileBackend::open(dir.path()).unwrap())
}

#[test]
fn records_survive_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let created = store_in(&dir)
        .create_with_naming(
            "task-1",
            CANON,
            &OracleResult::pass("4/4"),
            true,
            Some(NamingPolicy::flexible(["n"])),
        )
        .unwrap();

    let reopened = store_in(&dir);
    assert_eq!(reopened.require("task-1").unwrap(), created);
    assert_eq!(reopened.task_ids().unwrap(), vec!["task-1".to_string()]);
}

#[test]
fn create_does_not_clobber() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let pass = OracleResult::pass("");
    store.create("t", CANON, &pass, true).unwrap();
    let err = store
        .create("t", "def f(n):\n    return 2 * n\n", &pass, true)
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)));
    assert!(store.require("t").unwrap().matches_source(CANON));
}

#[test]
fn overwrite_replaces_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let pass = OracleResult::pass("");
    store.create("t", CANON, &pass, true).unwrap();
    let replacement = "def f(n):\n    return 2 * n\n";
    store.overwrite("t", replacement, &pass, true, None).unwrap();
    assert!(store.require("t").unwrap().matches_source(replacement));
    assert_eq!(store.task_ids().unwrap().len(), 1);
}

#[test]
fn refused_canon_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let err = store
        .create("t", CANON, &OracleResult::fail(0.75, ""), true)
        .unwrap_err();
    assert!(err.is_refusal());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn corrupt_record_is_a_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("t.json"), "{ not json").unwrap();
    let backend = FileBackend::open(dir.path()).unwrap();
    assert!(matches!(backend.get("t"), Err(StoreError::Serialization(_))));
}

#[test]
fn stray_files_are_not_tasks() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
    let store = store_in(&dir);
    assert!(store.task_ids().unwrap().is_empty());
    assert!(!store.remove("notes").unwrap());
}
