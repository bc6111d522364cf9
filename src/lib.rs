//! # disklru
//!
//! A journaled, disk-backed LRU cache with:
//! - A fixed number of opaque values per key, one file per value
//! - Crash recovery by journal replay, discarding torn writes
//! - Atomic publication: readers never see a partially written value
//! - Least-recently-used eviction against a byte budget
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       DiskLruCache                           │
//! │        get / edit / remove / flush / close / delete          │
//! └──────────┬──────────────────────┬───────────────────────────┘
//!            │ (one metadata lock)  │
//!            ▼                      ▼
//!   ┌─────────────────┐    ┌─────────────────┐    ┌─────────────┐
//!   │   EntryTable    │    │     Journal     │    │   Cleanup   │
//!   │ (LRU ordered)   │    │ (append / replay│◀───│   Worker    │
//!   └────────┬────────┘    │   / rebuild)    │    │ (1 thread)  │
//!            │             └─────────────────┘    └─────────────┘
//!            ▼
//!   ┌─────────────────┐    ┌─────────────────┐
//!   │     Editor      │    │    Snapshot     │
//!   │ key.N.tmp ──▶   │    │  key.0 .. key.N │
//!   │   key.N         │    │  (opened at once)│
//!   └─────────────────┘    └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod util;

pub mod journal;
mod entry;
mod worker;
pub mod editor;
pub mod snapshot;
pub mod cache;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CacheError, Result};
pub use config::CacheConfig;
pub use cache::DiskLruCache;
pub use editor::{Editor, ValueWriter};
pub use snapshot::Snapshot;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of disklru
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
