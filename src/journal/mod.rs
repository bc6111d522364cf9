//! Journal Module
//!
//! Append-only text log of cache operations. Replayed on open to rebuild the
//! entry table, rewritten from the table when it grows too redundant.
//!
//! ## File Format
//! ```text
//! libcore.io.DiskLruCache      <- magic
//! 1                            <- journal format version
//! 100                          <- application version
//! 2                            <- values per entry
//!                              <- blank line
//! CLEAN 3400330d1dfc7f3f 832 21054
//! DIRTY 335c4c6028171cfd
//! CLEAN 335c4c6028171cfd 3934 2342
//! REMOVE 335c4c6028171cfd
//! DIRTY 1ab96a171faeeee3
//! CLEAN 1ab96a171faeeee3 1600 234
//! READ 335c4c6028171cfd
//! ```
//!
//! ## Record Semantics
//! - `DIRTY`: an edit started. Must be followed by `CLEAN` or `REMOVE`;
//!   a trailing `DIRTY` marks a torn write whose files are discarded.
//! - `CLEAN`: an edit was published; carries one byte length per value.
//! - `REMOVE`: the entry was deleted or evicted.
//! - `READ`: the entry was accessed (recency only).

mod line_reader;
mod record;
mod recovery;
mod writer;

use std::io::{Read, Write};

use crate::error::{CacheError, Result};

pub use line_reader::StrictLineReader;
pub use record::JournalRecord;
pub use recovery::{JournalRecovery, RecoveryResult};
pub use writer::JournalWriter;

// =============================================================================
// File Names and Constants
// =============================================================================

pub const JOURNAL_FILE: &str = "journal";
pub const JOURNAL_FILE_TEMP: &str = "journal.tmp";
pub const JOURNAL_FILE_BACKUP: &str = "journal.bkp";

/// First header line of every journal
pub const MAGIC: &str = "libcore.io.DiskLruCache";

/// Journal format version
pub const VERSION: &str = "1";

// =============================================================================
// Header
// =============================================================================

/// The parameters a journal was written with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalHeader {
    pub app_version: u32,
    pub value_count: usize,
}

impl JournalHeader {
    pub fn new(app_version: u32, value_count: usize) -> Self {
        Self {
            app_version,
            value_count,
        }
    }

    /// Write the five header lines
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "{}", MAGIC)?;
        writeln!(out, "{}", VERSION)?;
        writeln!(out, "{}", self.app_version)?;
        writeln!(out, "{}", self.value_count)?;
        writeln!(out)
    }

    /// Consume the five header lines and check them against `self`
    pub fn read_from<R: Read>(&self, reader: &mut StrictLineReader<R>) -> Result<()> {
        let mut lines = Vec::with_capacity(5);
        for _ in 0..5 {
            match reader.read_line()? {
                Some(line) => lines.push(line),
                None => {
                    return Err(CacheError::JournalCorruption(format!(
                        "truncated journal header: {:?}",
                        lines
                    )))
                }
            }
        }

        if lines[0] != MAGIC
            || lines[1] != VERSION
            || lines[2] != self.app_version.to_string()
            || lines[3] != self.value_count.to_string()
            || !lines[4].is_empty()
        {
            return Err(CacheError::JournalCorruption(format!(
                "unexpected journal header: {:?}",
                lines
            )));
        }
        Ok(())
    }
}
