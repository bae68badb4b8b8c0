//! Synchronous finite sequences

use super::CacheHandle;
use super::handle::Recorder;
use crate::Error;
use crate::key::CallArgs;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use std::iter::FusedIterator;
use std::mem;

/// A memoized computation producing a finite iterator
#[derive(Debug)]
pub struct MemoizedIter<F> {
    pub(super) handle: CacheHandle,
    func: F,
}

impl<F> MemoizedIter<F> {
    pub(super) fn new(handle: CacheHandle, func: F) -> Self {
        Self { handle, func }
    }

    /// Call the computation and iterate its elements.
    ///
    /// Nothing happens until the first element is requested. The entry is
    /// looked up then; on a miss the computation is invoked and its elements
    /// are recorded as they are consumed. The entry is written only once the
    /// iterator is exhausted. Dropping the iterator early, or hitting an `Err`
    /// element, leaves no entry behind.
    pub fn call<A, I, T, E>(&self, args: A) -> CachedIter<'_, F, A, I::IntoIter, T>
    where
        F: Fn(A) -> I,
        A: CallArgs,
        I: IntoIterator<Item = Result<T, E>>,
        T: Serialize + DeserializeOwned,
        E: From<Error>,
    {
        CachedIter {
            handle: &self.handle,
            func: &self.func,
            key: self.handle.key_for(&args),
            state: State::Pending(args),
        }
    }
}

enum State<A, I, T> {
    Pending(A),
    Replay(std::vec::IntoIter<T>),
    Live { inner: I, recorder: Recorder },
    Done,
}

impl<A, I, T> State<A, I, T> {
    const fn label(&self) -> &'static str {
        match self {
            Self::Pending(_) => "pending",
            Self::Replay(_) => "replay",
            Self::Live { .. } => "live",
            Self::Done => "done",
        }
    }
}

/// Iterator returned by [`MemoizedIter::call`]
///
/// Yields `Result<T, E>`. A failed lookup surfaces as a single `Err` element.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct CachedIter<'a, F, A, I, T> {
    handle: &'a CacheHandle,
    func: &'a F,
    key: String,
    state: State<A, I, T>,
}

impl<F, A, I, T> fmt::Debug for CachedIter<'_, F, A, I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedIter")
            .field("computation", &self.handle.name())
            .field("key", &self.key)
            .field("state", &self.state.label())
            .finish_non_exhaustive()
    }
}

impl<F, A, R, I, T, E> Iterator for CachedIter<'_, F, A, I, T>
where
    F: Fn(A) -> R,
    R: IntoIterator<IntoIter = I, Item = Result<T, E>>,
    I: Iterator<Item = Result<T, E>>,
    T: Serialize + DeserializeOwned,
    E: From<Error>,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, State::Pending(_)) {
            let State::Pending(args) = mem::replace(&mut self.state, State::Done) else {
                return None;
            };
            self.state = match self.handle.lookup::<Vec<T>>(&self.key) {
                Ok(Some(items)) => State::Replay(items.into_iter()),
                Ok(None) => State::Live {
                    inner: (self.func)(args).into_iter(),
                    recorder: Recorder::default(),
                },
                Err(err) => return Some(Err(E::from(err))),
            };
        }

        let next = match &mut self.state {
            State::Replay(items) => return items.next().map(Ok),
            State::Pending(_) | State::Done => return None,
            State::Live { inner, .. } => inner.next(),
        };

        match next {
            Some(Ok(item)) => {
                if let State::Live { recorder, .. } = &mut self.state {
                    recorder.record(&item);
                }
                Some(Ok(item))
            }
            Some(Err(e)) => {
                self.state = State::Done;
                Some(Err(e))
            }
            None => {
                if let State::Live { recorder, .. } = mem::replace(&mut self.state, State::Done) {
                    recorder.finish::<T>(self.handle, &self.key);
                }
                None
            }
        }
    }
}

impl<F, A, R, I, T, E> FusedIterator for CachedIter<'_, F, A, I, T>
where
    F: Fn(A) -> R,
    R: IntoIterator<IntoIter = I, Item = Result<T, E>>,
    I: Iterator<Item = Result<T, E>>,
    T: Serialize + DeserializeOwned,
    E: From<Error>,
{
}
