use camino::Utf8PathBuf;
use stateboard_persistence::{InsertOutcome, RedbVersionStore, VersionStore};

#[test]
fn corrupt_redb_is_quarantined_and_recreated_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let db_path = root.join("stateboard.redb");

    std::fs::write(&db_path, b"definitely-not-a-redb-database").unwrap();

    let store = RedbVersionStore::open(&root).unwrap();
    assert!(db_path.exists(), "a fresh database should replace the corrupt one");

    let quarantines: Vec<_> = std::fs::read_dir(&root)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|n| n.starts_with("stateboard.redb.corrupt."))
        .collect();
    assert_eq!(quarantines.len(), 1, "expected exactly one quarantine");

    assert!(store.list_known_version_ids().unwrap().is_empty());
    assert_eq!(
        store.insert("a.tfstate", "v1", b"{}").unwrap(),
        InsertOutcome::Inserted
    );
}
