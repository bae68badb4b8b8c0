//! Per-binding cache state shared by every shape

use super::{CorruptPolicy, Shape};
use crate::key::{CallArgs, KeyStrategy};
use crate::store::CacheStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Snapshot of a binding's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Calls served from a persisted entry
    pub hits: u64,
    /// Calls whose result was computed and newly persisted
    pub misses: u64,
}

/// State bound to one memoized computation
///
/// Counters are process-local and only ever increase.
#[derive(Debug)]
pub struct CacheHandle {
    name: String,
    store: CacheStore,
    strategy: KeyStrategy,
    on_corrupt: CorruptPolicy,
    shape: Shape,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheHandle {
    pub(crate) fn new(
        name: String,
        store: CacheStore,
        strategy: KeyStrategy,
        on_corrupt: CorruptPolicy,
        shape: Shape,
    ) -> Self {
        Self {
            name,
            store,
            strategy,
            on_corrupt,
            shape,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Declared name of the computation
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store holding this binding's entries
    #[must_use]
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Key strategy chosen at binding time
    #[must_use]
    pub fn strategy(&self) -> &KeyStrategy {
        &self.strategy
    }

    /// Corrupt entry policy chosen at binding time
    #[must_use]
    pub fn corrupt_policy(&self) -> CorruptPolicy {
        self.on_corrupt
    }

    /// Execution shape chosen at binding time
    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of calls served from storage
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of calls computed and persisted
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Both counters at once
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits(),
            misses: self.misses(),
        }
    }

    /// Entry key for a call with `args`
    #[must_use]
    pub fn key_for<A: CallArgs + ?Sized>(&self, args: &A) -> String {
        self.strategy.key_for(&self.name, args)
    }

    /// Entry path for a call with `args`
    #[must_use]
    pub fn entry_path<A: CallArgs + ?Sized>(&self, args: &A) -> PathBuf {
        self.store.resolve(&self.key_for(args))
    }

    /// Load the entry for `key`.
    ///
    /// `Ok(None)` means the computation has to run: the entry is absent, or it
    /// is unreadable and the binding recomputes corrupt entries.
    pub(crate) fn lookup<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.store.resolve(key);
        if !path.is_file() {
            debug!(computation = %self.name, cache_key = key, "no cache entry");
            return Ok(None);
        }
        match self.store.read(&path) {
            Ok(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                crate::emit_cache_hit!(self.name, self.store.namespace(), key);
                Ok(Some(value))
            }
            Err(err) if err.is_corrupt_entry() && self.on_corrupt == CorruptPolicy::Recompute => {
                warn!(
                    computation = %self.name,
                    path = %path.display(),
                    error = %err,
                    "recomputing corrupt cache entry"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Persist a freshly computed value.
    ///
    /// Failures are logged and swallowed; the caller already holds the value.
    pub(crate) fn persist<T: Serialize + DeserializeOwned>(&self, key: &str, value: &T) {
        self.persist_as::<T, T>(key, value);
    }

    /// Persist `value` so that it reads back as `D`.
    pub(crate) fn persist_as<D, T>(&self, key: &str, value: &T)
    where
        D: DeserializeOwned,
        T: Serialize + ?Sized,
    {
        let path = self.store.resolve(key);
        match self.store.write_as::<D, T>(&path, value) {
            Ok(()) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                crate::emit_cache_miss!(self.name, self.store.namespace(), key);
            }
            Err(err) => self.report_write_failure(key, &err),
        }
    }

    pub(crate) fn report_write_failure(&self, key: &str, err: &Error) {
        let path = self.store.resolve(key);
        crate::emit_cache_write_failed!(self.name, path, err);
    }
}

/// Buffer for the elements of a sequence-shaped computation
///
/// Elements are serialized as they are produced so the caller keeps ownership
/// of the originals. The buffer is persisted only once the sequence is
/// exhausted.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    items: Vec<serde_json::Value>,
    failed: Option<String>,
}

impl Recorder {
    pub(crate) fn record<T: Serialize>(&mut self, item: &T) {
        if self.failed.is_some() {
            return;
        }
        match serde_json::to_value(item) {
            Ok(value) => self.items.push(value),
            Err(e) => {
                self.items.clear();
                self.failed = Some(format!("Failed to serialize sequence element: {e}"));
            }
        }
    }

    /// Persist the recorded elements as an entry replayable into `Vec<T>`
    pub(crate) fn finish<T: DeserializeOwned>(self, handle: &CacheHandle, key: &str) {
        debug!(
            computation = %handle.name,
            cache_key = key,
            elements = self.items.len(),
            "sequence exhausted"
        );
        match self.failed {
            Some(message) => handle.report_write_failure(key, &Error::serialization(message)),
            None => handle.persist_as::<Vec<T>, _>(key, &self.items),
        }
    }
}
