//! Filesystem and validation helpers shared by the cache modules.

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CacheError, Result};

/// Pattern every cache key must match
pub const KEY_PATTERN: &str = "[a-z0-9_-]{1,120}";

static LEGAL_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{}$", KEY_PATTERN)).unwrap());

/// Reject keys that are not safe to use as file names
pub fn validate_key(key: &str) -> Result<()> {
    if LEGAL_KEY.is_match(key) {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(key.to_string()))
    }
}

/// Read a whole stream as UTF-8
pub fn read_to_string<R: Read>(mut reader: R) -> io::Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Delete everything inside `dir`, recursing into subdirectories.
///
/// The directory itself is kept. Fails if `dir` is not a readable directory
/// or if any file cannot be deleted.
pub fn delete_contents(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            delete_contents(&path)?;
            fs::remove_dir(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Delete a file, treating "already gone" as success
pub fn delete_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Rename `from` to `to`, optionally clearing the destination first
pub fn rename(from: &Path, to: &Path, delete_destination: bool) -> io::Result<()> {
    if delete_destination {
        delete_if_exists(to)?;
    }
    fs::rename(from, to)
}
