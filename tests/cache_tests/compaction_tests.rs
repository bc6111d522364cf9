//! Tests for journal rebuilds
//!
//! These tests verify:
//! - A rebuild runs once enough redundant records pile up
//! - The rebuilt journal describes the same cache state
//! - Entries under edit survive a rebuild as DIRTY records

use std::fs;

use disklru::{CacheConfig, DiskLruCache};
use tempfile::TempDir;

use crate::{journal_text, open_cache, put, read, wait_until, APP_VERSION};

// =============================================================================
// Helper Functions
// =============================================================================

fn journal_len(dir: &std::path::Path) -> u64 {
    fs::metadata(dir.join("journal")).unwrap().len()
}

fn open_with_threshold(dir: &std::path::Path, threshold: usize) -> DiskLruCache {
    let config = CacheConfig::builder()
        .directory(dir)
        .app_version(APP_VERSION)
        .value_count(1)
        .max_size(1024 * 1024)
        .compact_threshold(threshold)
        .build();
    DiskLruCache::open(config).unwrap()
}

// =============================================================================
// Default Threshold Tests
// =============================================================================

#[test]
fn test_rebuild_after_2000_redundant_ops() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 1, 1024 * 1024);

    put(&cache, "k1", &["one"]);
    put(&cache, "k2", &["two"]);
    put(&cache, "k3", &["three"]);
    assert_eq!(cache.redundant_op_count(), 3);

    // Stay one short of the threshold.
    for _ in 0..1996 {
        assert!(cache.get("k1").unwrap().is_some());
    }
    cache.flush().unwrap();
    assert_eq!(cache.redundant_op_count(), 1999);
    let before = journal_len(temp.path());

    // This read reaches 2000 and schedules the rebuild.
    assert!(cache.get("k2").unwrap().is_some());
    assert!(wait_until(|| cache.redundant_op_count() == 0));

    assert!(journal_len(temp.path()) < before);
    let text = journal_text(temp.path());
    assert!(!text.contains("READ"));
    assert!(!text.contains("DIRTY"));
    assert_eq!(text.lines().filter(|line| line.starts_with("CLEAN")).count(), 3);

    assert_eq!(read(&cache, "k1"), Some(vec!["one".to_string()]));
    assert_eq!(read(&cache, "k2"), Some(vec!["two".to_string()]));
    assert_eq!(read(&cache, "k3"), Some(vec!["three".to_string()]));
}

#[test]
fn test_no_rebuild_below_threshold() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path(), 1, 1024 * 1024);

    put(&cache, "k1", &["one"]);
    for _ in 0..100 {
        cache.get("k1").unwrap();
    }
    cache.flush().unwrap();

    assert_eq!(cache.redundant_op_count(), 101);
    assert!(journal_text(temp.path()).contains("READ k1"));
}

// =============================================================================
// Configured Threshold Tests
// =============================================================================

#[test]
fn test_rebuilt_journal_replays_to_same_state() {
    let temp = TempDir::new().unwrap();
    {
        let cache = open_with_threshold(temp.path(), 10);
        for round in 0..20 {
            put(&cache, "churn", &[&format!("v{}", round)]);
            assert!(cache.remove("churn").unwrap());
        }
        put(&cache, "keep", &["kept"]);
        put(&cache, "churn", &["last"]);

        assert!(wait_until(|| cache.redundant_op_count() < 10));
        // Full history would be 64 records.
        assert!(journal_text(temp.path()).lines().count() < 40);
    }

    let cache = open_with_threshold(temp.path(), 10);
    assert_eq!(cache.entry_count(), 2);
    assert_eq!(read(&cache, "keep"), Some(vec!["kept".to_string()]));
    assert_eq!(read(&cache, "churn"), Some(vec!["last".to_string()]));
}

#[test]
fn test_rebuild_keeps_entry_under_edit() {
    let temp = TempDir::new().unwrap();
    let cache = open_with_threshold(temp.path(), 5);
    put(&cache, "a", &["alpha"]);

    let mut editor = cache.edit("b").unwrap().unwrap();
    editor.set(0, "beta").unwrap();

    // One commit plus four reads reaches the threshold exactly once.
    for _ in 0..4 {
        cache.get("a").unwrap();
    }
    assert!(wait_until(|| cache.redundant_op_count() == 0));
    assert!(journal_text(temp.path()).contains("DIRTY b"));

    editor.commit().unwrap();
    drop(cache);

    let cache = open_with_threshold(temp.path(), 5);
    assert_eq!(read(&cache, "a"), Some(vec!["alpha".to_string()]));
    assert_eq!(read(&cache, "b"), Some(vec!["beta".to_string()]));
}

#[test]
fn test_rebuild_requires_redundancy_to_outnumber_entries() {
    let temp = TempDir::new().unwrap();
    let cache = open_with_threshold(temp.path(), 5);

    for i in 0..5 {
        put(&cache, &format!("k{}", i), &["v"]);
    }
    assert!(wait_until(|| cache.redundant_op_count() == 0));

    // Five more commits reach the threshold but not the ten live entries.
    for i in 5..10 {
        put(&cache, &format!("k{}", i), &["v"]);
    }
    cache.flush().unwrap();

    assert_eq!(cache.redundant_op_count(), 5);
    assert!(journal_text(temp.path()).contains("DIRTY k5"));
}
