//! Synchronous value-returning computations

use super::CacheHandle;
use crate::Error;
use crate::key::CallArgs;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;

/// A memoized synchronous computation
pub struct Memoized<F> {
    pub(super) handle: CacheHandle,
    func: F,
}

impl<F> fmt::Debug for Memoized<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl<F> Memoized<F> {
    pub(super) fn new(handle: CacheHandle, func: F) -> Self {
        Self { handle, func }
    }

    /// Call the computation, serving the result from storage when possible.
    ///
    /// Errors returned by the computation are passed through untouched and
    /// leave no entry behind.
    pub fn call<A, R, E>(&self, args: A) -> Result<R, E>
    where
        F: Fn(A) -> Result<R, E>,
        A: CallArgs,
        R: Serialize + DeserializeOwned,
        E: From<Error>,
    {
        let key = self.handle.key_for(&args);
        if let Some(value) = self.handle.lookup(&key)? {
            return Ok(value);
        }
        let value = (self.func)(args)?;
        self.handle.persist(&key, &value);
        Ok(value)
    }
}
