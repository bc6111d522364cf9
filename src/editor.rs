//! Editor
//!
//! Exclusive write handle for the values of one entry.

use std::fs::File;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::cache::Shared;
use crate::entry::EditorId;
use crate::error::{CacheError, Result};
use crate::util;

/// Edits the values of one entry.
///
/// Values are written to staging files and become visible to readers only
/// on `commit`. Dropping an editor that was neither committed nor aborted
/// aborts it.
pub struct Editor {
    shared: Arc<Shared>,
    key: String,
    id: EditorId,
    /// Slots written so far; only tracked when creating a new entry
    written: Option<Vec<bool>>,
    has_errors: Arc<AtomicBool>,
    done: bool,
}

impl Editor {
    pub(crate) fn new(shared: Arc<Shared>, key: &str, id: EditorId, readable: bool) -> Self {
        let written = (!readable).then(|| vec![false; shared.value_count()]);
        Self {
            shared,
            key: key.to_string(),
            id,
            written,
            has_errors: Arc::new(AtomicBool::new(false)),
            done: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Open the last committed value for `index`, or `None` if nothing has
    /// been committed yet.
    pub fn new_input_stream(&self, index: usize) -> Result<Option<File>> {
        self.check_index(index)?;
        self.shared.open_committed(&self.key, self.id, index)
    }

    /// Last committed value for `index` as a string
    pub fn get_string(&self, index: usize) -> Result<Option<String>> {
        match self.new_input_stream(index)? {
            Some(file) => Ok(Some(util::read_to_string(file)?)),
            None => Ok(None),
        }
    }

    /// Writer for the value at `index`.
    ///
    /// The writer never returns I/O errors; a failure is remembered and turns
    /// the next `commit` into an abort.
    pub fn new_output_stream(&mut self, index: usize) -> Result<ValueWriter> {
        self.check_index(index)?;
        let file = self.shared.create_staging_file(&self.key, self.id, index)?;
        if let Some(written) = self.written.as_mut() {
            written[index] = true;
        }

        Ok(ValueWriter {
            file,
            has_errors: Arc::clone(&self.has_errors),
        })
    }

    /// Set the value at `index` to `value`
    pub fn set(&mut self, index: usize, value: &str) -> Result<()> {
        let mut writer = self.new_output_stream(index)?;
        writer.write_all(value.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Publish the staged values and release the entry.
    ///
    /// If a value write failed the edit is aborted instead: a new entry is
    /// removed, an existing one keeps its previous values.
    pub fn commit(mut self) -> Result<()> {
        if self.has_errors.load(Ordering::Acquire) {
            warn!(key = %self.key, "value write failed, aborting edit");
            self.shared.complete_edit(&self.key, self.id, None, false)?;
        } else {
            self.shared
                .complete_edit(&self.key, self.id, self.written.as_deref(), true)?;
        }
        self.done = true;
        Ok(())
    }

    /// Discard the staged values and release the entry
    pub fn abort(mut self) -> Result<()> {
        self.shared.complete_edit(&self.key, self.id, None, false)?;
        self.done = true;
        Ok(())
    }

    /// Abort unless already committed or aborted. Errors are logged, not
    /// returned; calling this more than once is harmless.
    pub fn abort_unless_committed(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        if let Err(e) = self.shared.complete_edit(&self.key, self.id, None, false) {
            match e {
                CacheError::Closed | CacheError::EditorDetached => {}
                e => warn!(key = %self.key, error = %e, "failed to abort edit"),
            }
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let value_count = self.shared.value_count();
        if index >= value_count {
            return Err(CacheError::InvalidIndex { index, value_count });
        }
        Ok(())
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        self.abort_unless_committed();
    }
}

/// Output stream for one staged value.
///
/// Write errors are swallowed and recorded on the owning editor.
pub struct ValueWriter {
    /// `None` when the staging file could not be created
    file: Option<File>,
    has_errors: Arc<AtomicBool>,
}

impl ValueWriter {
    fn fault(&mut self, error: io::Error) {
        warn!(error = %error, "value write failed");
        self.has_errors.store(true, Ordering::Release);
    }
}

impl Write for ValueWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = file.write_all(buf) {
                self.fault(e);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = file.flush() {
                self.fault(e);
            }
        }
        Ok(())
    }
}
