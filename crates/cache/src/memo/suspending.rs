//! Asynchronous value-returning computations

use super::CacheHandle;
use crate::Error;
use crate::key::CallArgs;
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;

/// A memoized asynchronous computation
#[derive(Debug)]
pub struct MemoizedAsync<F> {
    pub(super) handle: CacheHandle,
    func: F,
}

impl<F> MemoizedAsync<F> {
    pub(super) fn new(handle: CacheHandle, func: F) -> Self {
        Self { handle, func }
    }

    /// Call the computation, serving the result from storage when possible.
    ///
    /// A hit completes without polling the computation. Entry I/O is
    /// blocking. Dropping the returned future before it completes leaves the
    /// cache untouched.
    pub async fn call<A, Fut, R, E>(&self, args: A) -> Result<R, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        A: CallArgs,
        R: Serialize + DeserializeOwned,
        E: From<Error>,
    {
        let key = self.handle.key_for(&args);
        if let Some(value) = self.handle.lookup(&key)? {
            return Ok(value);
        }
        let value = (self.func)(args).await?;
        self.handle.persist(&key, &value);
        Ok(value)
    }
}
