//! `then`, `catch` and friends.
//!
//! Every call builds one new promise and registers on the source through
//! [`Promise::done`]. A handler's `Ok` result goes through the resolution
//! procedure; an `Err` rejects the new promise. Where a side has no handler
//! the value or reason passes straight through.
use crate::resolution::resolve_promise_with;
use crate::{Error, Promise, Resolvable};
use tracing::trace;

/// What a chained handler hands back. `Err` plays the part of a thrown error.
pub type Outcome<U, E> = Result<Resolvable<U, E>, E>;

fn run_handler<X, U, E, F>(handler: F, input: X, next: &Promise<U, E>)
where
    U: Clone + 'static,
    E: Clone + From<Error> + 'static,
    F: FnOnce(X) -> Outcome<U, E>,
{
    match handler(input) {
        Ok(value) => resolve_promise_with(next, value),
        Err(reason) => {
            trace!("handler failed, rejecting chained promise");
            next.reject(reason)
        }
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    fn chain<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T, &Promise<U, E>) + 'static,
        R: FnOnce(E, &Promise<U, E>) + 'static,
    {
        let next = Promise::new();
        let fulfilled = next.clone();
        let rejected = next.clone();
        self.done(
            move |value| on_fulfilled(value, &fulfilled),
            move |reason| on_rejected(reason, &rejected),
        );
        next
    }

    /// Chains a fulfillment handler. Rejections pass through untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use thenable::{Promise, Resolvable};
    ///
    /// let p = Promise::<i32>::new();
    /// let q = p
    ///     .then(|_| Ok(Resolvable::Value(5)))
    ///     .then(|v| Ok(Resolvable::Value(v + 1)));
    /// p.resolve(123);
    /// assert_eq!(q.result(), Some(Ok(6)));
    /// ```
    pub fn then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Outcome<U, E> + 'static,
    {
        self.chain(
            move |value, next| run_handler(on_fulfilled, value, next),
            |reason, next| next.reject(reason),
        )
    }

    /// Chains a handler for each outcome.
    pub fn then_or_else<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Outcome<U, E> + 'static,
        R: FnOnce(E) -> Outcome<U, E> + 'static,
    {
        self.chain(
            move |value, next| run_handler(on_fulfilled, value, next),
            move |reason, next| run_handler(on_rejected, reason, next),
        )
    }

    /// Chains a rejection handler. Fulfillments pass through untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use thenable::{Promise, Resolvable};
    ///
    /// let p = Promise::<String>::new();
    /// let recovered = p.catch(|e| Ok(Resolvable::Value(format!("{e}, recovered"))));
    /// p.reject("123-".into());
    /// assert_eq!(recovered.result(), Some(Ok("123-, recovered".to_string())));
    /// ```
    pub fn catch<R>(&self, on_rejected: R) -> Promise<T, E>
    where
        R: FnOnce(E) -> Outcome<T, E> + 'static,
    {
        self.chain(
            |value, next| next.resolve(value),
            move |reason, next| run_handler(on_rejected, reason, next),
        )
    }

    /// A new promise that settles the same way as this one.
    pub fn follow(&self) -> Promise<T, E> {
        self.chain(
            |value, next| next.resolve(value),
            |reason, next| next.reject(reason),
        )
    }
}
