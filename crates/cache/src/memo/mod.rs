//! Memoized computation bindings
//!
//! A binding is created once per computation through [`MemoBuilder`]. The
//! builder terminal that is called decides the execution [`Shape`]:
//!
//! | Terminal | Computation | Wrapper |
//! |---|---|---|
//! | [`MemoBuilder::plain`] | `Fn(A) -> Result<R, E>` | [`Memoized`] |
//! | [`MemoBuilder::suspending`] | `Fn(A) -> impl Future<Output = Result<R, E>>` | [`MemoizedAsync`] |
//! | [`MemoBuilder::sequence`] | `Fn(A) -> impl IntoIterator<Item = Result<T, E>>` | [`MemoizedIter`] |
//! | [`MemoBuilder::async_sequence`] | `Fn(A) -> impl Stream<Item = Result<T, E>>` | [`MemoizedStream`] |
//!
//! Configuration problems surface from the terminal, never from a call.
//!
//! ```no_run
//! use diskmemo_cache::{Error, memoize};
//!
//! # fn main() -> diskmemo_cache::Result<()> {
//! let add = memoize("add")
//!     .cache_dir("/var/cache/app")
//!     .namespace("math")
//!     .plain(|(a, b): (i64, i64)| Ok::<_, Error>(a + b))?;
//!
//! assert_eq!(add.call((2, 3))?, 5);
//! assert_eq!(add.call((2, 3))?, 5);
//! assert_eq!((add.misses(), add.hits()), (1, 1));
//! # Ok(())
//! # }
//! ```

mod async_sequence;
mod handle;
mod plain;
mod sequence;
mod suspending;

pub use async_sequence::MemoizedStream;
pub use handle::{CacheHandle, CacheStats};
pub use plain::Memoized;
pub use sequence::{CachedIter, MemoizedIter};
pub use suspending::MemoizedAsync;

use crate::key::KeyStrategy;
use crate::settings::default_cache_dir;
use crate::store::{CacheStore, DEFAULT_EXTENSION};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Execution shape of a memoized computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Synchronous value-returning function
    Plain,
    /// Asynchronous value-returning function
    Suspending,
    /// Synchronous finite sequence
    Sequence,
    /// Asynchronous finite sequence
    AsyncSequence,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "plain",
            Self::Suspending => "suspending",
            Self::Sequence => "sequence",
            Self::AsyncSequence => "async_sequence",
        })
    }
}

/// What a call does when its entry exists but cannot be decoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptPolicy {
    /// Return [`Error::CorruptEntry`] to the caller
    #[default]
    Fail,
    /// Log a warning, run the computation and overwrite the entry
    Recompute,
}

/// Binding configuration
///
/// Deserializable so applications can keep cache settings next to the rest
/// of their configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoConfig {
    /// Cache root; the process-wide default is used when unset
    pub cache_dir: Option<PathBuf>,
    /// Dot-separated namespace below the root
    pub namespace: Option<String>,
    /// Fixed key shared by every call of the binding
    pub explicit_key: Option<String>,
    /// Leave the first positional argument (the receiver) out of derived keys
    pub is_method: bool,
    /// Entry file extension, `txt` when unset
    pub extension: Option<String>,
    /// Corrupt entry handling
    pub on_corrupt: CorruptPolicy,
}

/// Start a binding for the computation called `name`
#[must_use]
pub fn memoize(name: impl Into<String>) -> MemoBuilder {
    MemoBuilder::new(name)
}

/// Builder for a memoized computation
#[derive(Debug, Clone)]
#[must_use = "a builder does nothing until a shape terminal is called"]
pub struct MemoBuilder {
    name: String,
    config: MemoConfig,
}

impl MemoBuilder {
    /// Builder for the computation called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: MemoConfig::default(),
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: MemoConfig) -> Self {
        self.config = config;
        self
    }

    /// Cache root directory; must exist when the binding is created
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = Some(dir.into());
        self
    }

    /// Dot-separated namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = Some(namespace.into());
        self
    }

    /// Use one fixed key for every call
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.config.explicit_key = Some(key.into());
        self
    }

    /// Treat the first positional argument as a receiver
    pub fn method(mut self, is_method: bool) -> Self {
        self.config.is_method = is_method;
        self
    }

    /// Entry file extension
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.config.extension = Some(extension.into());
        self
    }

    /// Corrupt entry handling
    pub fn on_corrupt(mut self, policy: CorruptPolicy) -> Self {
        self.config.on_corrupt = policy;
        self
    }

    /// Bind a synchronous value-returning computation
    pub fn plain<F>(self, func: F) -> Result<Memoized<F>> {
        Ok(Memoized::new(self.bind(Shape::Plain)?, func))
    }

    /// Bind an asynchronous value-returning computation
    pub fn suspending<F>(self, func: F) -> Result<MemoizedAsync<F>> {
        Ok(MemoizedAsync::new(self.bind(Shape::Suspending)?, func))
    }

    /// Bind a computation producing a finite iterator
    pub fn sequence<F>(self, func: F) -> Result<MemoizedIter<F>> {
        Ok(MemoizedIter::new(self.bind(Shape::Sequence)?, func))
    }

    /// Bind a computation producing a finite stream
    pub fn async_sequence<F>(self, func: F) -> Result<MemoizedStream<F>> {
        Ok(MemoizedStream::new(self.bind(Shape::AsyncSequence)?, func))
    }

    fn bind(self, shape: Shape) -> Result<CacheHandle> {
        let MemoConfig {
            cache_dir,
            namespace,
            explicit_key,
            is_method,
            extension,
            on_corrupt,
        } = self.config;

        if self.name.trim().is_empty() {
            return Err(Error::configuration("computation name must not be empty"));
        }
        let root = match cache_dir {
            Some(dir) => dir,
            None => default_cache_dir()?,
        };
        let store = CacheStore::open(
            root,
            namespace.as_deref(),
            extension.as_deref().unwrap_or(DEFAULT_EXTENSION),
        )?;
        let strategy = match explicit_key {
            Some(key) => KeyStrategy::Explicit(key),
            None => KeyStrategy::Arguments { is_method },
        };

        debug!(
            computation = %self.name,
            %shape,
            dir = %store.dir().display(),
            "bound memoized computation"
        );
        Ok(CacheHandle::new(self.name, store, strategy, on_corrupt, shape))
    }
}

macro_rules! handle_accessors {
    ($($wrapper:ident),+ $(,)?) => {
        $(
            impl<F> $wrapper<F> {
                /// Cache state of this binding
                #[must_use]
                pub fn handle(&self) -> &CacheHandle {
                    &self.handle
                }

                /// Number of calls served from storage
                #[must_use]
                pub fn hits(&self) -> u64 {
                    self.handle.hits()
                }

                /// Number of calls computed and persisted
                #[must_use]
                pub fn misses(&self) -> u64 {
                    self.handle.misses()
                }

                /// Both counters at once
                #[must_use]
                pub fn stats(&self) -> CacheStats {
                    self.handle.stats()
                }

                /// Execution shape of this binding
                #[must_use]
                pub fn shape(&self) -> Shape {
                    self.handle.shape()
                }
            }
        )+
    };
}

handle_accessors!(Memoized, MemoizedAsync, MemoizedIter, MemoizedStream);
