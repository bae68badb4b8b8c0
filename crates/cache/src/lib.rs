//! Disk-backed memoization for diskmemo
//!
//! This crate persists the results of computations as files so that repeated
//! calls with the same arguments, in this process or a later one, are served
//! from disk:
//! - Deterministic keys derived from the call's arguments, or a fixed key
//! - Namespaced directory layout below a cache root
//! - Four execution shapes: plain, suspending, sequence and async sequence
//! - Per-binding hit and miss counters
//!
//! # Overview
//!
//! A binding is created with [`memoize`], configured on the returned
//! [`MemoBuilder`] and finished with one of its shape terminals. Each call
//! then resolves its entry path as
//! `<root>/<namespace segments>/<key>.<extension>`:
//! - An existing entry is decoded and returned (a hit)
//! - Otherwise the computation runs and its result is written (a miss)
//!
//! Sequence shapes buffer their elements and only write once the sequence is
//! exhausted, so partial consumption never leaves a truncated entry.
//!
//! # Keys
//!
//! Argument keys are the SHA-256 hex digest of
//! `name:positional...:key=value...`, built from each argument's
//! [`KeyArg::key_text`]. Explicit keys are digested the same way.

// TODO(cache-docs): Add # Errors documentation to all fallible public functions
#![expect(
    clippy::missing_errors_doc,
    reason = "Error documentation to be added incrementally"
)]

mod error;
pub mod events;
pub mod key;
pub mod memo;
pub mod settings;
pub mod store;

// Re-export error types at crate root
pub use error::{Error, Result};

// Re-export main types
pub use key::{CallArgs, KeyArg, KeyParts, KeyStrategy, derive_key, digest};
pub use memo::{
    CacheHandle, CacheStats, CachedIter, CorruptPolicy, MemoBuilder, MemoConfig, Memoized,
    MemoizedAsync, MemoizedIter, MemoizedStream, Shape, memoize,
};
pub use settings::{default_cache_dir, set_default_cache_dir};
pub use store::{CacheStore, EntryInfo};
