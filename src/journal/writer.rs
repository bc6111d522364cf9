//! Journal Writer
//!
//! Appends records to the journal file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

use super::{JournalHeader, JournalRecord};

/// Buffered, append-only journal writer.
///
/// Records are buffered; call `flush` where an operation must be on disk
/// before the next step (e.g. before staging files are created).
pub struct JournalWriter {
    writer: BufWriter<File>,
}

impl JournalWriter {
    /// Open an existing journal for appending
    pub fn open_append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Create (or truncate) a journal and write its header
    pub fn create(path: &Path, header: &JournalHeader) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::new(file);
        header.write_to(&mut writer)?;

        Ok(Self { writer })
    }

    /// Append a record (buffered)
    pub fn append(&mut self, record: &JournalRecord) -> Result<()> {
        writeln!(self.writer, "{}", record)?;
        Ok(())
    }

    /// Push buffered records to the OS
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and fsync, then close the file
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }
}
