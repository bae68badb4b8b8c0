//! Asynchronous finite sequences

use super::CacheHandle;
use super::handle::Recorder;
use crate::Error;
use crate::key::CallArgs;
use futures::{Stream, StreamExt};
use serde::{Serialize, de::DeserializeOwned};

/// A memoized computation producing a finite stream
#[derive(Debug)]
pub struct MemoizedStream<F> {
    pub(super) handle: CacheHandle,
    func: F,
}

impl<F> MemoizedStream<F> {
    pub(super) fn new(handle: CacheHandle, func: F) -> Self {
        Self { handle, func }
    }

    /// Call the computation and stream its elements.
    ///
    /// Nothing happens until the stream is first polled. Replayed elements
    /// come from the stored entry without invoking the computation. Live
    /// elements are recorded as they pass through and persisted once the
    /// inner stream ends; an `Err` element ends the stream without an entry.
    pub fn call<A, S, T, E>(&self, args: A) -> impl Stream<Item = Result<T, E>>
    where
        F: Fn(A) -> S,
        A: CallArgs,
        S: Stream<Item = Result<T, E>>,
        T: Serialize + DeserializeOwned,
        E: From<Error>,
    {
        async_stream::stream! {
            let key = self.handle.key_for(&args);
            let replay = match self.handle.lookup::<Vec<T>>(&key) {
                Ok(replay) => replay,
                Err(e) => {
                    yield Err(E::from(e));
                    return;
                }
            };

            if let Some(items) = replay {
                for item in items {
                    yield Ok(item);
                }
                return;
            }

            let mut inner = std::pin::pin!((self.func)(args));
            let mut recorder = Recorder::default();
            while let Some(item) = inner.next().await {
                match item {
                    Ok(value) => {
                        recorder.record(&value);
                        yield Ok(value);
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
            recorder.finish::<T>(&self.handle, &key);
        }
    }
}
