use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

// =============================================================
// Helpers
// =============================================================

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// Fresh directory under the system temp dir, unique per test.
fn scratch_dir() -> PathBuf {
    let n = NEXT_DIR.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("resource-hub-token-test-{}-{n}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

// =============================================================
// FileTokenStore
// =============================================================

#[test]
fn file_store_missing_file_loads_none() {
    let store = FileTokenStore::new(scratch_dir().join("token"));
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn file_store_save_then_load() {
    let store = FileTokenStore::new(scratch_dir().join("nested").join("token"));
    store.save("T1").unwrap();
    assert_eq!(store.load().unwrap().as_deref(), Some("T1"));
    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "T1");
}

#[test]
fn file_store_survives_new_instance() {
    let path = scratch_dir().join("token");
    FileTokenStore::new(&path).save("persisted").unwrap();
    let reopened = FileTokenStore::new(&path);
    assert_eq!(reopened.load().unwrap().as_deref(), Some("persisted"));
}

#[test]
fn file_store_save_overwrites() {
    let store = FileTokenStore::new(scratch_dir().join("token"));
    store.save("old").unwrap();
    store.save("new").unwrap();
    assert_eq!(store.load().unwrap().as_deref(), Some("new"));
}

#[test]
fn file_store_trims_whitespace() {
    let dir = scratch_dir();
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("token");
    std::fs::write(&path, "  T9\n").unwrap();
    assert_eq!(FileTokenStore::new(&path).load().unwrap().as_deref(), Some("T9"));
}

#[test]
fn file_store_blank_file_is_absent() {
    let dir = scratch_dir();
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("token");
    std::fs::write(&path, "\n").unwrap();
    assert_eq!(FileTokenStore::new(&path).load().unwrap(), None);
}

#[test]
fn file_store_clear_removes_file() {
    let store = FileTokenStore::new(scratch_dir().join("token"));
    store.save("T1").unwrap();
    store.clear().unwrap();
    assert!(!store.path().exists());
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn file_store_clear_is_idempotent() {
    let store = FileTokenStore::new(scratch_dir().join("token"));
    store.clear().unwrap();
    store.clear().unwrap();
}

#[test]
fn file_store_leaves_no_staging_file() {
    let store = FileTokenStore::new(scratch_dir().join("token"));
    store.save("T1").unwrap();
    assert!(!store.path().with_extension("tmp").exists());
}

#[cfg(unix)]
#[test]
fn file_store_restricts_permissions() {
    use std::os::unix::fs::PermissionsExt;
    let store = FileTokenStore::new(scratch_dir().join("token"));
    store.save("T1").unwrap();
    let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn file_store_unreadable_path_is_error() {
    // A directory where the file should be cannot be read as a token.
    let dir = scratch_dir();
    std::fs::create_dir_all(dir.join("token")).unwrap();
    let store = FileTokenStore::new(dir.join("token"));
    assert!(matches!(store.load(), Err(TokenStoreError::Io { .. })));
}

// =============================================================
// MemoryTokenStore
// =============================================================

#[test]
fn memory_store_round_trip() {
    let store = MemoryTokenStore::new();
    assert_eq!(store.load().unwrap(), None);
    store.save("T1").unwrap();
    assert_eq!(store.load().unwrap().as_deref(), Some("T1"));
    store.clear().unwrap();
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn memory_store_seeded() {
    let store = MemoryTokenStore::with_token("seed");
    assert_eq!(store.load().unwrap().as_deref(), Some("seed"));
}
