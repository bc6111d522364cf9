//! Configuration for disklru
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{CacheError, Result};

/// Main configuration for a cache instance
#[derive(Debug, Clone)]
pub struct CacheConfig {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory owned by the cache
    /// Internal structure:
    ///   {directory}/
    ///     ├── journal          (append-only operation log)
    ///     ├── journal.tmp      (scratch file during rebuild)
    ///     ├── journal.bkp      (previous journal during the swap)
    ///     ├── {key}.{slot}     (committed values)
    ///     └── {key}.{slot}.tmp (staged values)
    pub directory: PathBuf,

    /// Application version written into the journal header.
    /// Bump it when the meaning of stored keys or values changes;
    /// a mismatch on open discards the whole cache.
    pub app_version: u32,

    /// Number of values stored per entry
    pub value_count: usize,

    /// Byte budget enforced by LRU eviction
    pub max_size: u64,

    // -------------------------------------------------------------------------
    // Journal Configuration
    // -------------------------------------------------------------------------
    /// Minimum number of redundant journal lines before a rebuild.
    /// A rebuild also requires redundant lines to outnumber live entries.
    pub compact_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./disklru_data"),
            app_version: 1,
            value_count: 1,
            max_size: 10 * 1024 * 1024, // 10 MB
            compact_threshold: 2000,
        }
    }
}

impl CacheConfig {
    /// Create a new config builder
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Reject values the cache cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(CacheError::InvalidConfig("max_size <= 0".to_string()));
        }
        if self.value_count == 0 {
            return Err(CacheError::InvalidConfig("value_count <= 0".to_string()));
        }
        if self.compact_threshold == 0 {
            return Err(CacheError::InvalidConfig(
                "compact_threshold <= 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for CacheConfig
#[derive(Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Set the cache directory
    pub fn directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.directory = path.into();
        self
    }

    /// Set the application version
    pub fn app_version(mut self, version: u32) -> Self {
        self.config.app_version = version;
        self
    }

    /// Set the number of values per entry
    pub fn value_count(mut self, count: usize) -> Self {
        self.config.value_count = count;
        self
    }

    /// Set the byte budget (in bytes)
    pub fn max_size(mut self, bytes: u64) -> Self {
        self.config.max_size = bytes;
        self
    }

    /// Set the redundant-op threshold for journal rebuilds
    pub fn compact_threshold(mut self, ops: usize) -> Self {
        self.config.compact_threshold = ops;
        self
    }

    pub fn build(self) -> CacheConfig {
        self.config
    }
}
