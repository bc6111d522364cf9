//! Entry Module
//!
//! In-memory metadata for every cache key.
//!
//! ## Responsibilities
//! - Track per-slot committed lengths and readability
//! - Hold the exclusive edit marker for a key
//! - Keep keys in access order (the LRU order)
//!
//! ## Data Structure Choice
//! HashMap for lookups plus a BTreeMap keyed by a logical access clock.
//! The first entry of the BTreeMap is the least recently used key.

mod table;

use std::path::{Path, PathBuf};

pub(crate) use table::EntryTable;

/// Identifies one live `Editor`
pub(crate) type EditorId = u64;

/// Who holds the edit marker of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PendingEdit {
    /// A `DIRTY` record seen during replay with no matching completion
    Replayed,

    /// An editor handed out by this process
    Live(EditorId),
}

/// Metadata for one key
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub key: String,

    /// Byte length of each committed value file
    pub lengths: Vec<u64>,

    /// True once an edit has been published
    pub readable: bool,

    /// The ongoing edit, if any
    pub current_editor: Option<PendingEdit>,

    /// Sequence number of the most recently committed edit
    pub sequence_number: u64,

    /// Logical access time, owned by the table
    pub(super) last_access: u64,
}

impl Entry {
    pub fn new(key: &str, value_count: usize) -> Self {
        Self {
            key: key.to_string(),
            lengths: vec![0; value_count],
            readable: false,
            current_editor: None,
            sequence_number: 0,
            last_access: 0,
        }
    }

    /// Take the edit marker
    pub fn begin_edit(&mut self, pending: PendingEdit) {
        self.current_editor = Some(pending);
    }

    /// Release the edit marker and make the entry visible to readers
    pub fn publish(&mut self) {
        self.readable = true;
        self.current_editor = None;
    }

    pub fn is_edited_by(&self, id: EditorId) -> bool {
        self.current_editor == Some(PendingEdit::Live(id))
    }

    /// Sum of all committed lengths
    pub fn total_length(&self) -> u64 {
        self.lengths.iter().sum()
    }
}

/// Committed value file for `slot` of `key`
pub(crate) fn clean_path(dir: &Path, key: &str, slot: usize) -> PathBuf {
    dir.join(format!("{}.{}", key, slot))
}

/// Staged value file for `slot` of `key`
pub(crate) fn dirty_path(dir: &Path, key: &str, slot: usize) -> PathBuf {
    dir.join(format!("{}.{}.tmp", key, slot))
}
