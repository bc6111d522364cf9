//! Cache Module
//!
//! The disk LRU cache that coordinates all components.
//!
//! ## Responsibilities
//! - Replay the journal on open and discard torn writes
//! - Hand out exclusive editors and consistent snapshots
//! - Keep size accounting and the journal in step with the entry table
//! - Schedule trim and journal rebuilds on the cleanup worker

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::editor::Editor;
use crate::entry::{clean_path, dirty_path, EditorId, EntryTable, PendingEdit};
use crate::error::{CacheError, Result};
use crate::journal::{
    JournalHeader, JournalRecord, JournalRecovery, JournalWriter, JOURNAL_FILE,
    JOURNAL_FILE_BACKUP, JOURNAL_FILE_TEMP,
};
use crate::snapshot::Snapshot;
use crate::util;
use crate::worker::{Cleanup, CleanupWorker};

/// A bounded, crash-safe cache of multi-value entries stored on disk.
///
/// ## Concurrency Model
///
/// - **Metadata** (entry table, size, journal): guarded by one mutex.
///   `get`, `edit`, commits, `remove`, trim, `flush` and `close` never run
///   concurrently with each other.
/// - **Value bytes**: read and written through handles that were opened under
///   the lock and are used outside it. A snapshot opens all of its files in one
///   critical section, so it never mixes values from two commits.
/// - **Trim / rebuild**: run on a single background thread that takes the same
///   lock.
///
/// Dropping the cache closes it.
pub struct DiskLruCache {
    shared: Arc<Shared>,
}

impl DiskLruCache {
    /// Open the cache described by `config`, creating it if needed.
    ///
    /// A journal that cannot be parsed is treated as disposable: the directory
    /// is wiped and an empty cache is started.
    pub fn open(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let directory = config.directory.clone();
        let journal_path = directory.join(JOURNAL_FILE);
        let backup_path = directory.join(JOURNAL_FILE_BACKUP);

        // A backup without a journal means a rebuild was interrupted mid-swap.
        if backup_path.exists() {
            if journal_path.exists() {
                util::delete_if_exists(&backup_path)?;
            } else {
                util::rename(&backup_path, &journal_path, false)?;
            }
        }

        let state = if journal_path.exists() {
            match State::recover(&config) {
                Ok(state) => Some(state),
                Err(e) if e.is_corruption() => {
                    warn!(
                        directory = %directory.display(),
                        error = %e,
                        "disk cache is corrupt, removing"
                    );
                    util::delete_contents(&directory)?;
                    None
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        let state = match state {
            Some(state) => state,
            None => {
                fs::create_dir_all(&directory)?;
                State::create(&config)?
            }
        };

        info!(
            directory = %directory.display(),
            entries = state.table.len(),
            size = state.size,
            max_size = state.max_size,
            "disk cache opened"
        );

        let (worker, rx) = CleanupWorker::channel();
        let shared = Arc::new(Shared {
            directory,
            value_count: config.value_count,
            state: Mutex::new(state),
            worker,
        });
        CleanupWorker::spawn(rx, Arc::downgrade(&shared))?;

        Ok(Self { shared })
    }

    /// Open with explicit parameters (convenience method)
    pub fn open_path(
        directory: impl Into<PathBuf>,
        app_version: u32,
        value_count: usize,
        max_size: u64,
    ) -> Result<Self> {
        let config = CacheConfig::builder()
            .directory(directory)
            .app_version(app_version)
            .value_count(value_count)
            .max_size(max_size)
            .build();
        Self::open(config)
    }

    /// Snapshot of the entry named `key`.
    ///
    /// Returns `None` if the entry doesn't exist, isn't readable yet, or one
    /// of its files went missing. A hit moves the entry to the most recently
    /// used position.
    pub fn get(&self, key: &str) -> Result<Option<Snapshot>> {
        self.shared.get(key)
    }

    /// Editor for the entry named `key`, or `None` if another edit is in
    /// progress.
    pub fn edit(&self, key: &str) -> Result<Option<Editor>> {
        self.shared.edit(key, None)
    }

    /// Drop the entry for `key` if it exists and isn't being edited.
    ///
    /// Returns true if an entry was removed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        self.shared.remove(key)
    }

    /// Bytes used by committed values. May exceed `max_size` while a
    /// background trim is pending.
    pub fn size(&self) -> u64 {
        self.shared.state.lock().size
    }

    pub fn max_size(&self) -> u64 {
        self.shared.state.lock().max_size
    }

    /// Change the byte budget and queue a trim
    pub fn set_max_size(&self, max_size: u64) -> Result<()> {
        if max_size == 0 {
            return Err(CacheError::InvalidConfig("max_size <= 0".to_string()));
        }
        self.shared.state.lock().max_size = max_size;
        self.shared.worker.schedule();
        Ok(())
    }

    /// Trim to size and push buffered journal records to the filesystem
    pub fn flush(&self) -> Result<()> {
        self.shared.state.lock().flush()
    }

    /// Close the cache. Stored values remain on disk.
    ///
    /// In-flight edits are aborted. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        self.shared.state.lock().close()
    }

    /// Close the cache and delete every file in its directory, including
    /// files the cache did not create.
    pub fn delete(&self) -> Result<()> {
        self.close()?;
        util::delete_contents(&self.shared.directory)?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().journal.is_none()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the cache directory
    pub fn directory(&self) -> &Path {
        &self.shared.directory
    }

    /// Get the number of values per entry
    pub fn value_count(&self) -> usize {
        self.shared.value_count
    }

    /// Get the number of entries, including ones being created
    pub fn entry_count(&self) -> usize {
        self.shared.state.lock().table.len()
    }

    /// Get the number of journal records a rebuild would drop
    pub fn redundant_op_count(&self) -> usize {
        self.shared.state.lock().redundant_op_count
    }
}

impl Drop for DiskLruCache {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close disk cache on drop");
        }
    }
}

// =============================================================================
// Shared State
// =============================================================================

/// State shared by the cache handle, editors, snapshots and the worker
pub(crate) struct Shared {
    directory: PathBuf,
    value_count: usize,
    state: Mutex<State>,
    worker: CleanupWorker,
}

impl Shared {
    pub(crate) fn value_count(&self) -> usize {
        self.value_count
    }

    pub(crate) fn get(self: &Arc<Self>, key: &str) -> Result<Option<Snapshot>> {
        util::validate_key(key)?;
        let mut state = self.state.lock();
        let found = state.get(key)?;
        self.schedule_if_needed(&state);

        Ok(found.map(|(sequence_number, readers, lengths)| {
            Snapshot::new(Arc::clone(self), key, sequence_number, readers, lengths)
        }))
    }

    /// `expected_sequence` refuses the edit if the entry has been committed
    /// since a snapshot was taken.
    pub(crate) fn edit(
        self: &Arc<Self>,
        key: &str,
        expected_sequence: Option<u64>,
    ) -> Result<Option<Editor>> {
        util::validate_key(key)?;
        let started = self.state.lock().edit(key, expected_sequence)?;

        Ok(started.map(|(id, readable)| Editor::new(Arc::clone(self), key, id, readable)))
    }

    pub(crate) fn remove(&self, key: &str) -> Result<bool> {
        util::validate_key(key)?;
        let mut state = self.state.lock();
        let removed = state.remove(key)?;
        self.schedule_if_needed(&state);
        Ok(removed)
    }

    /// Commit (`success`) or abort the edit `id` of `key`
    pub(crate) fn complete_edit(
        &self,
        key: &str,
        id: EditorId,
        written: Option<&[bool]>,
        success: bool,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let result = state.complete_edit(key, id, written, success);
        self.schedule_if_needed(&state);
        result
    }

    /// Create the staging file for one slot of an edit
    pub(crate) fn create_staging_file(&self, key: &str, id: EditorId, index: usize) -> Result<Option<File>> {
        let state = self.state.lock();
        state.check_editor(key, id)?;

        let path = dirty_path(&self.directory, key, index);
        match File::create(&path) {
            Ok(file) => Ok(Some(file)),
            Err(first) => {
                // The directory may have been deleted underneath us.
                let _ = fs::create_dir_all(&self.directory);
                match File::create(&path) {
                    Ok(file) => Ok(Some(file)),
                    Err(e) => {
                        warn!(
                            key = %key,
                            index,
                            error = %e,
                            first_error = %first,
                            "cannot create staging file, discarding writes"
                        );
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Open the committed value of one slot for an editor
    pub(crate) fn open_committed(&self, key: &str, id: EditorId, index: usize) -> Result<Option<File>> {
        let state = self.state.lock();
        if !state.check_editor(key, id)? {
            return Ok(None);
        }
        match File::open(clean_path(&self.directory, key, index)) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn schedule_if_needed(&self, state: &State) {
        if state.cleanup_needed() {
            debug!(
                size = state.size,
                max_size = state.max_size,
                redundant_ops = state.redundant_op_count,
                "scheduling cache cleanup"
            );
            self.worker.schedule();
        }
    }
}

impl Cleanup for Shared {
    fn cleanup(&self) -> Result<()> {
        self.state.lock().cleanup()
    }
}

// =============================================================================
// Guarded State
// =============================================================================

/// Everything protected by the cache lock
struct State {
    directory: PathBuf,
    header: JournalHeader,
    compact_threshold: usize,

    /// `None` once the cache is closed
    journal: Option<JournalWriter>,
    table: EntryTable,
    size: u64,
    max_size: u64,
    redundant_op_count: usize,
    next_sequence_number: u64,
    next_editor_id: EditorId,
}

/// Sequence number, open readers and lengths of a snapshot
type SnapshotParts = (u64, Vec<File>, Vec<u64>);

impl State {
    fn empty(config: &CacheConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            header: JournalHeader::new(config.app_version, config.value_count),
            compact_threshold: config.compact_threshold,
            journal: None,
            table: EntryTable::new(),
            size: 0,
            max_size: config.max_size,
            redundant_op_count: 0,
            // Replayed and never-committed entries carry 0.
            next_sequence_number: 1,
            next_editor_id: 0,
        }
    }

    /// Start a brand-new cache with an empty journal
    fn create(config: &CacheConfig) -> Result<Self> {
        let mut state = Self::empty(config);
        state.rebuild_journal()?;
        Ok(state)
    }

    /// Rebuild state from an existing journal.
    ///
    /// Entries left dirty by a crash lose both their staged and committed
    /// files.
    fn recover(config: &CacheConfig) -> Result<Self> {
        let mut state = Self::empty(config);
        let journal_path = state.directory.join(JOURNAL_FILE);

        let (table, result) = JournalRecovery::replay(&journal_path, &state.header)?;
        state.table = table;
        state.redundant_op_count = result.redundant_ops;

        util::delete_if_exists(&state.directory.join(JOURNAL_FILE_TEMP))?;

        for entry in state.table.drain_pending() {
            debug!(key = %entry.key, "discarding torn entry");
            for index in 0..state.header.value_count {
                util::delete_if_exists(&clean_path(&state.directory, &entry.key, index))?;
                util::delete_if_exists(&dirty_path(&state.directory, &entry.key, index))?;
            }
        }
        state.size = state.table.iter().map(|entry| entry.total_length()).sum();

        if result.was_truncated {
            debug!("journal ends with a partial line, rebuilding");
            state.rebuild_journal()?;
        } else {
            state.journal = Some(JournalWriter::open_append(&journal_path)?);
        }

        info!(
            records = result.records_replayed,
            recovered = result.entries_recovered,
            torn = result.torn_entries,
            "journal replayed"
        );
        Ok(state)
    }

    fn journal(&mut self) -> Result<&mut JournalWriter> {
        self.journal.as_mut().ok_or(CacheError::Closed)
    }

    fn ensure_open(&self) -> Result<()> {
        match self.journal {
            Some(_) => Ok(()),
            None => Err(CacheError::Closed),
        }
    }

    /// Fails unless editor `id` still owns `key`. Returns its readability.
    fn check_editor(&self, key: &str, id: EditorId) -> Result<bool> {
        match self.table.peek(key) {
            Some(entry) if entry.is_edited_by(id) => Ok(entry.readable),
            _ => Err(CacheError::EditorDetached),
        }
    }

    fn get(&mut self, key: &str) -> Result<Option<SnapshotParts>> {
        self.ensure_open()?;
        let value_count = self.header.value_count;
        let entry = match self.table.peek(key) {
            Some(entry) if entry.readable => entry,
            _ => return Ok(None),
        };

        // Open every stream now so the snapshot sees a single published edit.
        let mut readers = Vec::with_capacity(value_count);
        for index in 0..value_count {
            match File::open(clean_path(&self.directory, key, index)) {
                Ok(file) => readers.push(file),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!(key = %key, index, "value file missing");
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
        let parts = (entry.sequence_number, readers, entry.lengths.clone());
        self.table.touch(key);

        self.redundant_op_count += 1;
        self.journal()?.append(&JournalRecord::Read {
            key: key.to_string(),
        })?;
        Ok(Some(parts))
    }

    /// Returns the new editor id and whether the entry was already readable
    fn edit(&mut self, key: &str, expected_sequence: Option<u64>) -> Result<Option<(EditorId, bool)>> {
        self.ensure_open()?;
        if let Some(expected) = expected_sequence {
            match self.table.peek(key) {
                Some(entry) if entry.sequence_number == expected => {}
                _ => return Ok(None), // Snapshot is stale.
            }
        }

        let id = self.next_editor_id;
        let entry = self.table.get_or_insert(key, self.header.value_count);
        if entry.current_editor.is_some() {
            return Ok(None); // Another edit is in progress.
        }
        entry.begin_edit(PendingEdit::Live(id));
        let readable = entry.readable;
        self.next_editor_id += 1;

        // Flush before any staging file exists so a crash can't leak files.
        let journaled = self.journal().and_then(|journal| {
            journal.append(&JournalRecord::Dirty {
                key: key.to_string(),
            })?;
            journal.flush()
        });
        if let Err(e) = journaled {
            if readable {
                if let Some(entry) = self.table.peek_mut(key) {
                    entry.current_editor = None;
                }
            } else {
                self.table.remove(key);
            }
            return Err(e);
        }
        Ok(Some((id, readable)))
    }

    fn complete_edit(
        &mut self,
        key: &str,
        id: EditorId,
        written: Option<&[bool]>,
        success: bool,
    ) -> Result<()> {
        self.ensure_open()?;
        let readable = self.check_editor(key, id)?;
        let value_count = self.header.value_count;

        // A first-time edit must provide every value.
        if success && !readable {
            for index in 0..value_count {
                if !written.is_some_and(|w| w[index]) {
                    self.complete_edit(key, id, None, false)?;
                    return Err(CacheError::IncompleteEdit { index });
                }
                if !dirty_path(&self.directory, key, index).exists() {
                    self.complete_edit(key, id, None, false)?;
                    return Ok(());
                }
            }
        }

        if success {
            if let Err(e) = self.promote_staged(key) {
                warn!(key = %key, error = %e, "commit failed, discarding entry");
                self.discard(key)?;
                return Err(e);
            }
        } else {
            for index in 0..value_count {
                util::delete_if_exists(&dirty_path(&self.directory, key, index))?;
            }
        }

        let Some(entry) = self.table.peek_mut(key) else {
            return Err(CacheError::EditorDetached);
        };
        self.redundant_op_count += 1;
        entry.current_editor = None;
        let record = if entry.readable || success {
            entry.publish();
            if success {
                entry.sequence_number = self.next_sequence_number;
                self.next_sequence_number += 1;
            }
            JournalRecord::Clean {
                key: key.to_string(),
                lengths: entry.lengths.clone(),
            }
        } else {
            self.table.remove(key);
            JournalRecord::Remove {
                key: key.to_string(),
            }
        };

        let journal = self.journal()?;
        journal.append(&record)?;
        journal.flush()
    }

    /// Rename every staged value over its committed file.
    ///
    /// A slot whose staged file is gone keeps its previous value.
    fn promote_staged(&mut self, key: &str) -> Result<()> {
        for index in 0..self.header.value_count {
            let clean = clean_path(&self.directory, key, index);
            match fs::rename(dirty_path(&self.directory, key, index), &clean) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
            let new_length = fs::metadata(&clean)?.len();

            let entry = self.table.peek_mut(key).ok_or(CacheError::EditorDetached)?;
            let old_length = std::mem::replace(&mut entry.lengths[index], new_length);
            self.size = self.size.saturating_sub(old_length) + new_length;
        }
        Ok(())
    }

    /// Drop a half-published entry along with all of its files
    fn discard(&mut self, key: &str) -> Result<()> {
        for index in 0..self.header.value_count {
            for path in [
                clean_path(&self.directory, key, index),
                dirty_path(&self.directory, key, index),
            ] {
                if let Err(e) = util::delete_if_exists(&path) {
                    warn!(path = %path.display(), error = %e, "failed to delete value file");
                }
            }
        }
        if let Some(entry) = self.table.remove(key) {
            self.size = self.size.saturating_sub(entry.total_length());
        }

        self.redundant_op_count += 1;
        let journal = self.journal()?;
        journal.append(&JournalRecord::Remove {
            key: key.to_string(),
        })?;
        journal.flush()
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        match self.table.peek(key) {
            Some(entry) if entry.current_editor.is_none() => {}
            _ => return Ok(false),
        }
        self.evict(key)?;
        Ok(true)
    }

    /// Delete the committed files of an idle entry and forget it
    fn evict(&mut self, key: &str) -> Result<()> {
        let Some(entry) = self.table.peek_mut(key) else {
            return Ok(());
        };
        for index in 0..self.header.value_count {
            let path = clean_path(&self.directory, key, index);
            util::delete_if_exists(&path).map_err(|e| {
                io::Error::new(e.kind(), format!("failed to delete {}: {}", path.display(), e))
            })?;
            self.size = self.size.saturating_sub(entry.lengths[index]);
            entry.lengths[index] = 0;
        }

        self.redundant_op_count += 1;
        self.journal()?.append(&JournalRecord::Remove {
            key: key.to_string(),
        })?;
        self.table.remove(key);
        Ok(())
    }

    /// Evict least recently used entries until within budget
    fn trim_to_size(&mut self) -> Result<()> {
        while self.size > self.max_size {
            // Entries under edit can't be evicted; stop if nothing else is left.
            let Some(key) = self.table.eviction_candidate() else {
                break;
            };
            debug!(key = %key, size = self.size, max_size = self.max_size, "evicting entry");
            self.evict(&key)?;
        }
        Ok(())
    }

    /// Rebuild only when it halves the journal and drops enough records
    fn rebuild_required(&self) -> bool {
        self.redundant_op_count >= self.compact_threshold
            && self.redundant_op_count >= self.table.len()
    }

    fn cleanup_needed(&self) -> bool {
        self.size > self.max_size || self.rebuild_required()
    }

    /// Write a journal holding only the current state and swap it in
    fn rebuild_journal(&mut self) -> Result<()> {
        if let Some(journal) = self.journal.as_mut() {
            journal.flush()?;
        }

        let journal_path = self.directory.join(JOURNAL_FILE);
        let temp_path = self.directory.join(JOURNAL_FILE_TEMP);
        let backup_path = self.directory.join(JOURNAL_FILE_BACKUP);

        let mut writer = JournalWriter::create(&temp_path, &self.header)?;
        for entry in self.table.iter() {
            let record = if entry.current_editor.is_some() {
                JournalRecord::Dirty {
                    key: entry.key.clone(),
                }
            } else {
                JournalRecord::Clean {
                    key: entry.key.clone(),
                    lengths: entry.lengths.clone(),
                }
            };
            writer.append(&record)?;
        }
        writer.finish()?;

        self.journal = None;
        if journal_path.exists() {
            util::rename(&journal_path, &backup_path, true)?;
        }
        util::rename(&temp_path, &journal_path, false)?;
        util::delete_if_exists(&backup_path)?;

        self.journal = Some(JournalWriter::open_append(&journal_path)?);
        let dropped = self.redundant_op_count;
        self.redundant_op_count = 0;

        info!(entries = self.table.len(), dropped, "journal rebuilt");
        Ok(())
    }

    /// Background job: trim, then compact if worthwhile. No-op once closed.
    fn cleanup(&mut self) -> Result<()> {
        if self.journal.is_none() {
            return Ok(());
        }
        self.trim_to_size()?;
        if self.rebuild_required() {
            self.rebuild_journal()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.trim_to_size()?;
        self.journal()?.flush()
    }

    fn close(&mut self) -> Result<()> {
        if self.journal.is_none() {
            return Ok(());
        }
        for (key, id) in self.table.live_editors() {
            debug!(key = %key, "aborting edit on close");
            self.complete_edit(&key, id, None, false)?;
        }
        self.trim_to_size()?;
        if let Some(journal) = self.journal.take() {
            journal.finish()?;
        }
        Ok(())
    }
}
