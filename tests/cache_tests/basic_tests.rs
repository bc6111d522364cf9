//! Tests for basic cache operations
//!
//! These tests verify:
//! - Put/get round trips for one and several slots
//! - Remove and size accounting
//! - Key validation and configuration errors
//! - Close, reopen and delete

use std::fs;

use disklru::{CacheConfig, CacheError, DiskLruCache};
use tempfile::TempDir;

use crate::{file_names, journal_text, open_cache, put, read, APP_VERSION};

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_open_creates_directory_and_journal() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("nested").join("cache");

    let cache = open_cache(&dir, 2, 1024);

    assert!(dir.join("journal").exists());
    assert_eq!(cache.entry_count(), 0);
    assert_eq!(cache.size(), 0);
    assert_eq!(journal_text(&dir), "libcore.io.DiskLruCache\n1\n100\n2\n\n");
}

#[test]
fn test_put_then_get() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 1, 1024);

    put(&cache, "k1", &["v1"]);

    assert_eq!(read(&cache, "k1"), Some(vec!["v1".to_string()]));
}

#[test]
fn test_multiple_values() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 3, 1024);

    put(&cache, "k1", &["a", "bb", "ccc"]);

    let mut snapshot = cache.get("k1").unwrap().unwrap();
    assert_eq!(snapshot.key(), "k1");
    assert_eq!(snapshot.lengths(), &[1, 2, 3]);
    assert_eq!(snapshot.length(2), Some(3));
    assert_eq!(snapshot.length(3), None);
    assert_eq!(snapshot.get_string(1).unwrap(), "bb");
    assert!(snapshot.reader(2).is_some());
    assert!(snapshot.reader(3).is_none());
    assert!(matches!(
        snapshot.get_string(3),
        Err(CacheError::InvalidIndex { index: 3, value_count: 3 })
    ));
}

#[test]
fn test_get_missing_key() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 1, 1024);

    assert!(cache.get("missing").unwrap().is_none());
}

#[test]
fn test_overwrite_replaces_value() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 1, 1024);

    put(&cache, "k1", &["first"]);
    put(&cache, "k1", &["second"]);

    assert_eq!(read(&cache, "k1"), Some(vec!["second".to_string()]));
    assert_eq!(cache.entry_count(), 1);
}

#[test]
fn test_files_on_disk() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 2, 1024);

    put(&cache, "k1", &["a", "b"]);

    assert_eq!(file_names(temp.path()), vec!["journal", "k1.0", "k1.1"]);
    assert_eq!(fs::read_to_string(temp.path().join("k1.1")).unwrap(), "b");
}

// =============================================================================
// Size Accounting Tests
// =============================================================================

#[test]
fn test_size_tracks_commits_and_removes() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 1, 1024);

    put(&cache, "k1", &["abc"]);
    put(&cache, "k2", &["de"]);
    assert_eq!(cache.size(), 5);

    put(&cache, "k1", &["a"]);
    assert_eq!(cache.size(), 3);

    assert!(cache.remove("k2").unwrap());
    assert_eq!(cache.size(), 1);
}

// =============================================================================
// Remove Tests
// =============================================================================

#[test]
fn test_remove() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 2, 1024);

    put(&cache, "k1", &["a", "b"]);

    assert!(cache.remove("k1").unwrap());
    assert!(cache.get("k1").unwrap().is_none());
    assert!(!temp.path().join("k1.0").exists());
    assert!(!temp.path().join("k1.1").exists());
    assert!(journal_text(temp.path()).ends_with("REMOVE k1\n"));
}

#[test]
fn test_remove_missing_key() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 1, 1024);

    assert!(!cache.remove("missing").unwrap());
}

#[test]
fn test_remove_while_editing() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 1, 1024);
    put(&cache, "k1", &["a"]);

    let editor = cache.edit("k1").unwrap().unwrap();

    assert!(!cache.remove("k1").unwrap());
    editor.abort().unwrap();
    assert_eq!(read(&cache, "k1"), Some(vec!["a".to_string()]));
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_invalid_keys() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 1, 1024);
    let too_long = "a".repeat(121);

    for key in ["", "has space", "UPPER", "new\nline", "../escape", too_long.as_str()] {
        assert!(matches!(cache.get(key), Err(CacheError::InvalidKey(_))), "{:?}", key);
        assert!(matches!(cache.edit(key), Err(CacheError::InvalidKey(_))), "{:?}", key);
        assert!(matches!(cache.remove(key), Err(CacheError::InvalidKey(_))), "{:?}", key);
    }

    let longest = "a".repeat(120);
    put(&cache, &longest, &["ok"]);
    assert!(read(&cache, &longest).is_some());
}

#[test]
fn test_invalid_config() {
    let temp = TempDir::new().unwrap();

    assert!(matches!(
        DiskLruCache::open_path(temp.path(), APP_VERSION, 1, 0),
        Err(CacheError::InvalidConfig(_))
    ));
    assert!(matches!(
        DiskLruCache::open_path(temp.path(), APP_VERSION, 0, 1024),
        Err(CacheError::InvalidConfig(_))
    ));

    let config = CacheConfig::builder()
        .directory(temp.path())
        .compact_threshold(0)
        .build();
    assert!(matches!(
        DiskLruCache::open(config),
        Err(CacheError::InvalidConfig(_))
    ));
}

#[test]
fn test_set_max_size_rejects_zero() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 1, 1024);

    assert!(matches!(cache.set_max_size(0), Err(CacheError::InvalidConfig(_))));
    assert_eq!(cache.max_size(), 1024);

    cache.set_max_size(2048).unwrap();
    assert_eq!(cache.max_size(), 2048);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_operations_after_close() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 1, 1024);
    put(&cache, "k1", &["a"]);

    cache.close().unwrap();

    assert!(cache.is_closed());
    assert!(matches!(cache.get("k1"), Err(CacheError::Closed)));
    assert!(matches!(cache.edit("k1"), Err(CacheError::Closed)));
    assert!(matches!(cache.remove("k1"), Err(CacheError::Closed)));
    assert!(matches!(cache.flush(), Err(CacheError::Closed)));

    // Closing twice is fine.
    cache.close().unwrap();
}

#[test]
fn test_values_survive_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let cache = open_cache(temp.path(), 2, 1024);
        put(&cache, "k1", &["a", "b"]);
        put(&cache, "k2", &["c", "d"]);
        assert!(cache.remove("k2").unwrap());
    }

    let cache = open_cache(temp.path(), 2, 1024);

    assert_eq!(read(&cache, "k1"), Some(vec!["a".to_string(), "b".to_string()]));
    assert!(read(&cache, "k2").is_none());
    assert_eq!(cache.size(), 2);
    assert_eq!(cache.entry_count(), 1);
}

#[test]
fn test_delete_wipes_directory() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 1, 1024);
    put(&cache, "k1", &["a"]);
    fs::write(temp.path().join("stray"), b"not ours").unwrap();
    fs::create_dir(temp.path().join("subdir")).unwrap();
    fs::write(temp.path().join("subdir").join("nested"), b"x").unwrap();

    cache.delete().unwrap();

    assert!(cache.is_closed());
    assert!(temp.path().exists());
    assert!(file_names(temp.path()).is_empty());
}

#[test]
fn test_accessors() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 2, 4096);

    assert_eq!(cache.directory(), temp.path());
    assert_eq!(cache.value_count(), 2);
    assert_eq!(cache.max_size(), 4096);
    assert!(!cache.is_closed());
}
