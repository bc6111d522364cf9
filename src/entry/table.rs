//! Entry table implementation
//!
//! Access-ordered map used by both journal replay and live operations.

use std::collections::{BTreeMap, HashMap};

use crate::journal::JournalRecord;

use super::{Entry, PendingEdit};

/// Key → Entry map that remembers access order
#[derive(Debug, Default)]
pub(crate) struct EntryTable {
    entries: HashMap<String, Entry>,
    /// last_access → key, oldest first
    recency: BTreeMap<u64, String>,
    clock: u64,
}

impl EntryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Look up without counting as an access
    pub fn peek(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Mutable lookup without counting as an access
    pub fn peek_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.entries.get_mut(key)
    }

    /// Look up and mark as most recently used
    pub fn touch(&mut self, key: &str) -> Option<&mut Entry> {
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.last_access);
        self.clock += 1;
        entry.last_access = self.clock;
        self.recency.insert(self.clock, key.to_string());
        Some(entry)
    }

    /// Look up or create, marking as most recently used
    pub fn get_or_insert(&mut self, key: &str, value_count: usize) -> &mut Entry {
        self.clock += 1;
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(key, value_count));
        self.recency.remove(&entry.last_access);
        entry.last_access = self.clock;
        self.recency.insert(self.clock, key.to_string());
        entry
    }

    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.last_access);
        Some(entry)
    }

    /// Entries from least to most recently used
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.recency.values().filter_map(move |key| self.entries.get(key))
    }

    /// Least recently used key that is not being edited
    pub fn eviction_candidate(&self) -> Option<String> {
        self.iter()
            .find(|entry| entry.current_editor.is_none())
            .map(|entry| entry.key.clone())
    }

    /// Keys and ids of editors handed out by this process
    pub fn live_editors(&self) -> Vec<(String, u64)> {
        self.iter()
            .filter_map(|entry| match entry.current_editor {
                Some(PendingEdit::Live(id)) => Some((entry.key.clone(), id)),
                _ => None,
            })
            .collect()
    }

    /// Remove and return every entry that still has a pending edit
    pub fn drain_pending(&mut self) -> Vec<Entry> {
        let keys: Vec<String> = self
            .iter()
            .filter(|entry| entry.current_editor.is_some())
            .map(|entry| entry.key.clone())
            .collect();
        keys.iter().filter_map(|key| self.remove(key)).collect()
    }

    /// Apply one journal record.
    ///
    /// Replay goes through here; live operations call the same
    /// `get_or_insert`/`touch`/`remove` and `Entry` transitions directly.
    pub fn apply(&mut self, record: &JournalRecord, value_count: usize) {
        match record {
            JournalRecord::Dirty { key } => {
                self.get_or_insert(key, value_count)
                    .begin_edit(PendingEdit::Replayed);
            }
            JournalRecord::Clean { key, lengths } => {
                let entry = self.get_or_insert(key, value_count);
                entry.publish();
                entry.lengths = lengths.clone();
            }
            JournalRecord::Remove { key } => {
                self.remove(key);
            }
            JournalRecord::Read { key } => {
                self.touch(key);
            }
        }
    }
}
