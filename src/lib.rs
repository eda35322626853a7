//! Settle-once promises.
//!
//! A [`Promise`] starts pending, settles exactly once to fulfilled or
//! rejected, and tells every observer about it, whether the observer
//! registered before or after settlement. Observers run synchronously on the
//! stack of whoever settles the promise; there is no task queue.
//!
//! ```
//! use thenable::{Promise, Resolvable};
//!
//! let p: Promise<i32> = Promise::new();
//! let doubled = p.then(|v| Ok(Resolvable::Value(v * 2)));
//! p.resolve(21);
//! assert_eq!(doubled.result(), Some(Ok(42)));
//! ```
//!
//! Values returned from handlers go through the resolution procedure, so a
//! handler may hand back another [`Promise`] or any foreign [`Thenable`] and
//! the chain waits for it.
pub mod aggregate;
pub mod chain;
pub mod promise;
pub mod resolution;
pub mod wait;

pub use chain::Outcome;
pub use promise::{Promise, State};
pub use resolution::{resolve_promise_with, RejectFn, ResolveFn, Resolvable, ThenFn, Thenable};
pub use wait::Settled;

use thiserror::Error;

/// Reasons the library itself rejects a promise with.
///
/// Promises whose reason type is not `Error` receive these through
/// `From<Error>`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("a promise cannot be resolved with itself")]
    SelfResolution,
    #[error("input {index} was rejected: {reason}")]
    Rejected { index: usize, reason: String },
    #[error("all {count} inputs were rejected")]
    AllRejected { count: usize },
    #[error("{0}")]
    Reason(String),
}

impl From<&str> for Error {
    fn from(reason: &str) -> Self {
        Error::Reason(reason.to_owned())
    }
}

impl From<String> for Error {
    fn from(reason: String) -> Self {
        Error::Reason(reason)
    }
}
