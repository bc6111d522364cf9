//! Snapshot
//!
//! Read handle over the committed values of one entry.

use std::fs::File;
use std::sync::Arc;

use crate::cache::Shared;
use crate::editor::Editor;
use crate::error::{CacheError, Result};
use crate::util;

/// The values of an entry as of one commit.
///
/// All value files are opened together when the snapshot is taken, so a
/// later commit never shows through. Files are closed on drop.
pub struct Snapshot {
    shared: Arc<Shared>,
    key: String,
    sequence_number: u64,
    readers: Vec<File>,
    lengths: Vec<u64>,
}

impl Snapshot {
    pub(crate) fn new(
        shared: Arc<Shared>,
        key: &str,
        sequence_number: u64,
        readers: Vec<File>,
        lengths: Vec<u64>,
    ) -> Self {
        Self {
            shared,
            key: key.to_string(),
            sequence_number,
            readers,
            lengths,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Sequence number of the commit this snapshot reflects
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// Editor for this snapshot's entry, or `None` if the entry changed since
    /// the snapshot was taken or another edit is in progress.
    pub fn edit(&self) -> Result<Option<Editor>> {
        self.shared.edit(&self.key, Some(self.sequence_number))
    }

    /// Unbuffered reader for the value at `index`
    pub fn reader(&mut self, index: usize) -> Option<&mut File> {
        self.readers.get_mut(index)
    }

    /// Read the rest of the value at `index` as a string
    pub fn get_string(&mut self, index: usize) -> Result<String> {
        let value_count = self.readers.len();
        let reader = self
            .readers
            .get_mut(index)
            .ok_or(CacheError::InvalidIndex { index, value_count })?;
        Ok(util::read_to_string(reader)?)
    }

    /// Byte length of the value at `index`
    pub fn length(&self, index: usize) -> Option<u64> {
        self.lengths.get(index).copied()
    }

    pub fn lengths(&self) -> &[u64] {
        &self.lengths
    }
}
