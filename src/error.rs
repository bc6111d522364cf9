//! Error types for disklru
//!
//! Expected outcomes (busy key, stale snapshot, missing entry) are reported
//! through `Option`/`bool` return values. Everything here is a fault.

use thiserror::Error;

/// Result type alias using CacheError
pub type Result<T> = std::result::Result<T, CacheError>;

/// Unified error type for cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Journal Errors
    // -------------------------------------------------------------------------
    #[error("Journal corruption detected: {0}")]
    JournalCorruption(String),

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    #[error("Invalid key: keys must match regex {pattern}: \"{0}\"", pattern = crate::util::KEY_PATTERN)]
    InvalidKey(String),

    #[error("Invalid index {index}: expected a value slot in 0..{value_count}")]
    InvalidIndex { index: usize, value_count: usize },

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Cache is closed")]
    Closed,

    #[error("Editor no longer owns its entry")]
    EditorDetached,

    #[error("Newly created entry didn't create value for index {index}")]
    IncompleteEdit { index: usize },
}

impl CacheError {
    /// True for errors that mean the journal cannot be trusted.
    ///
    /// `DiskLruCache::open` answers these by wiping the directory.
    pub fn is_corruption(&self) -> bool {
        match self {
            CacheError::JournalCorruption(_) => true,
            CacheError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::InvalidData
            ),
            _ => false,
        }
    }
}
