//! The resolution procedure: settling a promise from a value that may itself
//! be a promise or a foreign promise-like object.
use crate::{Error, Promise};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Callback handed to a thenable for fulfillment. Only its first call, or
/// the first call of its [`RejectFn`] sibling, has any effect.
pub type ResolveFn<T, E> = Box<dyn Fn(Resolvable<T, E>)>;

/// Callback handed to a thenable for rejection.
pub type RejectFn<E> = Box<dyn Fn(E)>;

/// A thenable's callable `then` member.
///
/// An `Err` return is treated like an exception thrown while invoking it.
pub type ThenFn<T, E> = Box<dyn FnOnce(ResolveFn<T, E>, RejectFn<E>) -> Result<(), E>>;

/// A foreign promise-like object.
///
/// # Examples
///
/// ```
/// use thenable::{Error, Promise, RejectFn, Resolvable, ResolveFn, ThenFn, Thenable};
/// use std::rc::Rc;
///
/// struct Ready(i32);
///
/// impl Thenable<i32, Error> for Ready {
///     fn then_member(&self) -> Result<Option<ThenFn<i32, Error>>, Error> {
///         let value = self.0;
///         Ok(Some(Box::new(move |resolve: ResolveFn<i32, Error>, _reject: RejectFn<Error>| {
///             resolve(Resolvable::Value(value));
///             Ok(())
///         })))
///     }
///
///     fn to_value(&self) -> i32 {
///         self.0
///     }
/// }
///
/// let p = Promise::<i32>::new();
/// p.resolve_with(Resolvable::Thenable(Rc::new(Ready(8))));
/// assert_eq!(p.result(), Some(Ok(8)));
/// ```
pub trait Thenable<T, E> {
    /// Reads the `then` member.
    ///
    /// `Ok(None)` means the object has no callable `then` and is an ordinary
    /// value. `Err` is a failing read.
    fn then_member(&self) -> Result<Option<ThenFn<T, E>>, E>;

    /// The object itself as a fulfillment value, used when it turns out not
    /// to be a thenable.
    fn to_value(&self) -> T;
}

/// What a promise can be resolved with.
pub enum Resolvable<T, E> {
    Value(T),
    Promise(Promise<T, E>),
    Thenable(Rc<dyn Thenable<T, E>>),
}

impl<T, E> From<Promise<T, E>> for Resolvable<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Resolvable::Promise(promise)
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Resolvable<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolvable::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolvable::Promise(promise) => f.debug_tuple("Promise").field(promise).finish(),
            Resolvable::Thenable(_) => f.write_str("Thenable"),
        }
    }
}

/// Drives `promise` toward settlement from `value`.
///
/// A plain value fulfills it. A promise is followed until it settles, and a
/// promise resolved with itself is rejected with [`Error::SelfResolution`].
/// A thenable's `then` is called with a resolve and a reject callback; the
/// first callback wins and later calls, including a failure reported after a
/// callback already ran, are ignored.
pub fn resolve_promise_with<T, E>(promise: &Promise<T, E>, value: Resolvable<T, E>)
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    match value {
        Resolvable::Promise(other) if other.ptr_eq(promise) => {
            debug!("promise resolved with itself, rejecting");
            promise.reject(Error::SelfResolution.into())
        }
        Resolvable::Promise(other) => {
            let fulfilled = promise.clone();
            let rejected = promise.clone();
            other.done(
                move |value| fulfilled.resolve(value),
                move |reason| rejected.reject(reason),
            )
        }
        Resolvable::Thenable(thenable) => adopt_thenable(promise, thenable),
        Resolvable::Value(value) => promise.resolve(value),
    }
}

fn adopt_thenable<T, E>(promise: &Promise<T, E>, thenable: Rc<dyn Thenable<T, E>>)
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    let called = Rc::new(Cell::new(false));
    let outcome = thenable.then_member().and_then(|member| match member {
        Some(then) => {
            let resolve: ResolveFn<T, E> = {
                let promise = promise.clone();
                let called = called.clone();
                Box::new(move |value| {
                    if !called.replace(true) {
                        resolve_promise_with(&promise, value)
                    }
                })
            };
            let reject: RejectFn<E> = {
                let promise = promise.clone();
                let called = called.clone();
                Box::new(move |reason| {
                    if !called.replace(true) {
                        promise.reject(reason)
                    }
                })
            };
            then(resolve, reject)
        }
        None => {
            promise.resolve(thenable.to_value());
            Ok(())
        }
    });
    if let Err(reason) = outcome {
        if called.replace(true) {
            debug!("thenable failed after calling back, ignoring");
        } else {
            promise.reject(reason)
        }
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    /// Resolves the promise through [`resolve_promise_with`].
    pub fn resolve_with(&self, value: Resolvable<T, E>) {
        resolve_promise_with(self, value)
    }
}

#[cfg(test)]
mod tests {
    use super::{RejectFn, Resolvable, ResolveFn, ThenFn, Thenable};
    use crate::{Error, Promise, State};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone)]
    enum Step {
        Resolve(i32),
        Reject(&'static str),
        Fail(&'static str),
    }

    /// Runs its steps synchronously from inside `then`.
    struct Scripted {
        read_error: Option<&'static str>,
        steps: Vec<Step>,
    }

    impl Scripted {
        fn new(steps: Vec<Step>) -> Rc<Self> {
            Rc::new(Self { read_error: None, steps })
        }
    }

    impl Thenable<i32, Error> for Scripted {
        fn then_member(&self) -> Result<Option<ThenFn<i32, Error>>, Error> {
            if let Some(reason) = self.read_error {
                return Err(reason.into());
            }
            let steps = self.steps.clone();
            Ok(Some(Box::new(move |resolve: ResolveFn<i32, Error>, reject: RejectFn<Error>| {
                for step in steps {
                    match step {
                        Step::Resolve(value) => resolve(Resolvable::Value(value)),
                        Step::Reject(reason) => reject(reason.into()),
                        Step::Fail(reason) => return Err(reason.into()),
                    }
                }
                Ok(())
            })))
        }

        fn to_value(&self) -> i32 {
            -1
        }
    }

    type Callbacks = Rc<RefCell<Option<(ResolveFn<i32, Error>, RejectFn<Error>)>>>;

    /// Keeps the callbacks so the test can call back later.
    #[derive(Default)]
    struct Later {
        callbacks: Callbacks,
    }

    impl Thenable<i32, Error> for Later {
        fn then_member(&self) -> Result<Option<ThenFn<i32, Error>>, Error> {
            let slot = self.callbacks.clone();
            Ok(Some(Box::new(move |resolve: ResolveFn<i32, Error>, reject: RejectFn<Error>| {
                *slot.borrow_mut() = Some((resolve, reject));
                Ok(())
            })))
        }

        fn to_value(&self) -> i32 {
            -1
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Record {
        then: i32,
    }

    impl Thenable<Record, Error> for Record {
        fn then_member(&self) -> Result<Option<ThenFn<Record, Error>>, Error> {
            Ok(None)
        }

        fn to_value(&self) -> Record {
            self.clone()
        }
    }

    #[test]
    fn test_resolve_with_plain_value() {
        let p = Promise::<i32>::new();
        p.resolve_with(Resolvable::Value(3));
        assert_eq!(p.result(), Some(Ok(3)));
    }

    #[test]
    fn test_resolve_with_itself_rejects() {
        let p = Promise::<i32>::new();
        p.resolve_with(Resolvable::Promise(p.clone()));
        assert_eq!(p.result(), Some(Err(Error::SelfResolution)));
    }

    #[test]
    fn test_nested_promises_unwrap() {
        let outer = Promise::<i32>::new();
        let middle = Promise::<i32>::new();
        let inner = Promise::<i32>::new();
        outer.resolve_with(middle.clone().into());
        middle.resolve_with(inner.clone().into());
        assert_eq!(outer.state(), State::Pending);
        inner.resolve(5);
        assert_eq!(middle.result(), Some(Ok(5)));
        assert_eq!(outer.result(), Some(Ok(5)));

        let rejected = Promise::<i32>::new();
        rejected.resolve_with(Resolvable::Promise(Promise::rejected("inner failed".into())));
        assert_eq!(rejected.result(), Some(Err(Error::from("inner failed"))));
    }

    #[test]
    fn test_thenable_resolves() {
        let p = Promise::<i32>::new();
        p.resolve_with(Resolvable::Thenable(Scripted::new(vec![Step::Resolve(4)])));
        assert_eq!(p.result(), Some(Ok(4)));
    }

    #[test]
    fn test_thenable_first_callback_wins() {
        let p = Promise::<i32>::new();
        p.resolve_with(Resolvable::Thenable(Scripted::new(vec![
            Step::Reject("first"),
            Step::Resolve(2),
            Step::Reject("second"),
        ])));
        assert_eq!(p.result(), Some(Err(Error::from("first"))));

        let q = Promise::<i32>::new();
        q.resolve_with(Resolvable::Thenable(Scripted::new(vec![
            Step::Resolve(1),
            Step::Resolve(2),
        ])));
        assert_eq!(q.result(), Some(Ok(1)));
    }

    #[test]
    fn test_thenable_failure_after_callback_is_ignored() {
        let p = Promise::<i32>::new();
        p.resolve_with(Resolvable::Thenable(Scripted::new(vec![
            Step::Resolve(1),
            Step::Fail("late"),
        ])));
        assert_eq!(p.result(), Some(Ok(1)));
    }

    #[test]
    fn test_thenable_failure_rejects() {
        let p = Promise::<i32>::new();
        p.resolve_with(Resolvable::Thenable(Scripted::new(vec![
            Step::Fail("boom"),
            Step::Resolve(1),
        ])));
        assert_eq!(p.result(), Some(Err(Error::from("boom"))));

        let q = Promise::<i32>::new();
        q.resolve_with(Resolvable::Thenable(Rc::new(Scripted {
            read_error: Some("unreadable"),
            steps: vec![Step::Resolve(1)],
        })));
        assert_eq!(q.result(), Some(Err(Error::from("unreadable"))));
    }

    #[test]
    fn test_non_callable_then_is_a_plain_value() {
        let p = Promise::<Record>::new();
        p.resolve_with(Resolvable::Thenable(Rc::new(Record { then: 3 })));
        assert_eq!(p.result(), Some(Ok(Record { then: 3 })));
    }

    #[test]
    fn test_thenable_calls_back_later() {
        let later = Later::default();
        let callbacks = later.callbacks.clone();
        let p = Promise::<i32>::new();
        p.resolve_with(Resolvable::Thenable(Rc::new(later)));
        assert!(p.is_pending());

        let inner = Promise::<i32>::new();
        let (resolve, reject) = callbacks.borrow_mut().take().unwrap();
        resolve(Resolvable::Promise(inner.clone()));
        reject("ignored".into());
        assert!(p.is_pending());
        inner.resolve(12);
        assert_eq!(p.result(), Some(Ok(12)));
    }

    #[test]
    fn test_thenable_resolving_with_target_rejects() {
        let later = Later::default();
        let callbacks = later.callbacks.clone();
        let p = Promise::<i32>::new();
        p.resolve_with(Resolvable::Thenable(Rc::new(later)));

        let (resolve, _reject) = callbacks.borrow_mut().take().unwrap();
        resolve(Resolvable::Promise(p.clone()));
        assert_eq!(p.result(), Some(Err(Error::SelfResolution)));
    }
}
