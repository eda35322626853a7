use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::task::Waker;
use tracing::trace;

/// Where a promise is in its life. `Fulfilled` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Pending,
    Fulfilled,
    Rejected,
}

/// A settle-once promise.
///
/// `Promise` is a handle: clones share the same state, and the promise lives
/// as long as any handle or pending registration holds it. It is built on
/// `Rc` and meant for a single thread.
///
/// # Examples
///
/// ```
/// use thenable::{Promise, State};
///
/// let p = Promise::<&str>::new();
/// p.done(|v| println!("我等到了{:?}", v), |e| println!("失败了{:?}", e));
/// p.resolve("🍓");
/// p.reject("too late".into());
/// assert_eq!(p.state(), State::Fulfilled);
/// assert_eq!(p.result(), Some(Ok("🍓")));
/// ```
pub struct Promise<T, E = crate::Error> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

struct Inner<T, E> {
    value: Option<Result<T, E>>,
    observers: Vec<Observer<T, E>>,
    wakers: Vec<Waker>,
}

/// One `done` registration: a fulfill handler, a reject handler, or both.
struct Observer<T, E> {
    on_fulfilled: Option<Box<dyn FnOnce(T)>>,
    on_rejected: Option<Box<dyn FnOnce(E)>>,
}

impl<T, E> Observer<T, E> {
    fn notify(self, outcome: Result<T, E>) {
        match outcome {
            Ok(value) => {
                if let Some(on_fulfilled) = self.on_fulfilled {
                    on_fulfilled(value)
                }
            }
            Err(reason) => {
                if let Some(on_rejected) = self.on_rejected {
                    on_rejected(reason)
                }
            }
        }
    }
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T, E> Default for Promise<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").field("state", &self.state()).finish()
    }
}

impl<T, E> Promise<T, E> {
    /// A new pending promise.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value: None,
                observers: vec![],
                wakers: vec![],
            })),
        }
    }

    pub fn state(&self) -> State {
        match self.inner.borrow().value {
            None => State::Pending,
            Some(Ok(_)) => State::Fulfilled,
            Some(Err(_)) => State::Rejected,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == State::Pending
    }

    /// Whether both handles refer to the same promise.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Promise<T, E> {
    pub fn resolved(value: T) -> Self {
        let promise = Self::new();
        promise.resolve(value);
        promise
    }

    pub fn rejected(reason: E) -> Self {
        let promise = Self::new();
        promise.reject(reason);
        promise
    }

    /// The settled outcome, or `None` while pending.
    pub fn result(&self) -> Option<Result<T, E>> {
        self.inner.borrow().value.clone()
    }

    /// Fulfills the promise with `value`. Does nothing once settled.
    ///
    /// `value` is taken as is; use [`Promise::resolve_with`] to adopt the
    /// state of another promise or thenable.
    pub fn resolve(&self, value: T) {
        self.settle(Ok(value))
    }

    /// Rejects the promise with `reason`. Does nothing once settled.
    pub fn reject(&self, reason: E) {
        self.settle(Err(reason))
    }

    fn settle(&self, outcome: Result<T, E>) {
        let (observers, wakers) = {
            let mut inner = self.inner.borrow_mut();
            if inner.value.is_some() {
                trace!("promise already settled, ignoring");
                return;
            }
            inner.value = Some(outcome.clone());
            (
                std::mem::take(&mut inner.observers),
                std::mem::take(&mut inner.wakers),
            )
        };
        trace!(
            fulfilled = outcome.is_ok(),
            observers = observers.len(),
            wakers = wakers.len(),
            "promise settled"
        );
        for observer in observers {
            observer.notify(outcome.clone());
        }
        for waker in wakers {
            waker.wake()
        }
    }

    /// Observes the promise.
    ///
    /// While pending the handlers are queued and fire, in registration
    /// order, when the promise settles. Once settled the matching handler
    /// fires right away. A panicking handler unwinds into whoever triggered
    /// it.
    pub fn done<F, R>(&self, on_fulfilled: F, on_rejected: R)
    where
        F: FnOnce(T) + 'static,
        R: FnOnce(E) + 'static,
    {
        self.observe(Observer {
            on_fulfilled: Some(Box::new(on_fulfilled)),
            on_rejected: Some(Box::new(on_rejected)),
        })
    }

    /// [`Promise::done`] without a reject handler.
    pub fn done_fulfilled<F>(&self, on_fulfilled: F)
    where
        F: FnOnce(T) + 'static,
    {
        self.observe(Observer {
            on_fulfilled: Some(Box::new(on_fulfilled)),
            on_rejected: None,
        })
    }

    /// [`Promise::done`] without a fulfill handler.
    pub fn done_rejected<R>(&self, on_rejected: R)
    where
        R: FnOnce(E) + 'static,
    {
        self.observe(Observer {
            on_fulfilled: None,
            on_rejected: Some(Box::new(on_rejected)),
        })
    }

    fn observe(&self, observer: Observer<T, E>) {
        let settled = self.inner.borrow().value.clone();
        match settled {
            Some(outcome) => observer.notify(outcome),
            None => self.inner.borrow_mut().observers.push(observer),
        }
    }

    /// The settled outcome, or registers `waker` to be woken on settlement.
    pub(crate) fn poll_settled(&self, waker: &Waker) -> Option<Result<T, E>> {
        let mut inner = self.inner.borrow_mut();
        if inner.value.is_none() && !inner.wakers.iter().any(|w| w.will_wake(waker)) {
            inner.wakers.push(waker.clone());
        }
        inner.value.clone()
    }
}
