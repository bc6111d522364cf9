//! Journal record definitions
//!
//! One record per journal line after the header.

use std::fmt;

use crate::error::{CacheError, Result};
use crate::util;

const CLEAN: &str = "CLEAN";
const DIRTY: &str = "DIRTY";
const REMOVE: &str = "REMOVE";
const READ: &str = "READ";

/// A single journal line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalRecord {
    /// An edit of `key` has started
    Dirty { key: String },

    /// An edit of `key` was published with these value lengths
    Clean { key: String, lengths: Vec<u64> },

    /// `key` was removed
    Remove { key: String },

    /// `key` was read
    Read { key: String },
}

impl JournalRecord {
    /// Parse one line written for a cache with `value_count` values per entry
    pub fn parse(line: &str, value_count: usize) -> Result<Self> {
        let unexpected = || CacheError::JournalCorruption(format!("unexpected journal line: {}", line));

        let (state, rest) = line.split_once(' ').ok_or_else(unexpected)?;
        let (key, tail) = match rest.split_once(' ') {
            Some((key, tail)) => (key, Some(tail)),
            None => (rest, None),
        };
        if util::validate_key(key).is_err() {
            return Err(unexpected());
        }
        let key = key.to_string();

        match (state, tail) {
            (CLEAN, Some(tail)) => {
                let parts: Vec<&str> = tail.trim_end_matches(' ').split(' ').collect();
                if parts.len() != value_count {
                    return Err(invalid_lengths(&parts));
                }
                let lengths = parts
                    .iter()
                    .map(|part| part.parse::<u64>())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|_| invalid_lengths(&parts))?;
                Ok(JournalRecord::Clean { key, lengths })
            }
            (DIRTY, None) => Ok(JournalRecord::Dirty { key }),
            (REMOVE, None) => Ok(JournalRecord::Remove { key }),
            (READ, None) => Ok(JournalRecord::Read { key }),
            _ => Err(unexpected()),
        }
    }
}

impl fmt::Display for JournalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JournalRecord::Dirty { key } => write!(f, "{} {}", DIRTY, key),
            JournalRecord::Clean { key, lengths } => {
                write!(f, "{} {}", CLEAN, key)?;
                for length in lengths {
                    write!(f, " {}", length)?;
                }
                Ok(())
            }
            JournalRecord::Remove { key } => write!(f, "{} {}", REMOVE, key),
            JournalRecord::Read { key } => write!(f, "{} {}", READ, key),
        }
    }
}

fn invalid_lengths(parts: &[&str]) -> CacheError {
    CacheError::JournalCorruption(format!("unexpected journal line: {:?}", parts))
}
