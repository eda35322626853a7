//! Combinators waiting on several promises at once.
use crate::{Error, Promise};
use std::cell::{Cell, RefCell};
use std::fmt::Display;
use std::rc::Rc;
use tracing::debug;

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    /// Fulfills with every input's value, in input order, once all of them
    /// have fulfilled.
    ///
    /// The first rejection rejects the result with [`Error::Rejected`],
    /// naming the input's position and carrying its reason. No inputs
    /// fulfill the result immediately with an empty `Vec`.
    ///
    /// # Examples
    ///
    /// ```
    /// use thenable::Promise;
    ///
    /// let (a, b) = (Promise::<i32>::new(), Promise::<i32>::new());
    /// let all = Promise::all([a.clone(), b.clone()]);
    /// b.resolve(20);
    /// a.resolve(10);
    /// assert_eq!(all.result(), Some(Ok(vec![10, 20])));
    /// ```
    pub fn all<I>(promises: I) -> Promise<Vec<T>, E>
    where
        I: IntoIterator<Item = Promise<T, E>>,
        E: Display,
    {
        let aggregate = Promise::new();
        let promises: Vec<_> = promises.into_iter().collect();
        let total = promises.len();
        if total == 0 {
            aggregate.resolve(vec![]);
            return aggregate;
        }

        let results: Rc<RefCell<Vec<Option<T>>>> = Rc::new(RefCell::new(vec![None; total]));
        let fulfilled = Rc::new(Cell::new(0usize));
        for (index, promise) in promises.iter().enumerate() {
            let results = results.clone();
            let fulfilled = fulfilled.clone();
            let on_fulfilled = aggregate.clone();
            let on_rejected = aggregate.clone();
            promise.done(
                move |value| {
                    results.borrow_mut()[index] = Some(value);
                    fulfilled.set(fulfilled.get() + 1);
                    if fulfilled.get() == total {
                        let values: Vec<T> = results.borrow_mut().drain(..).flatten().collect();
                        on_fulfilled.resolve(values);
                    }
                },
                move |reason: E| {
                    debug!(index, %reason, "aggregate input rejected");
                    on_rejected.reject(
                        Error::Rejected {
                            index,
                            reason: reason.to_string(),
                        }
                        .into(),
                    )
                },
            );
        }
        aggregate
    }

    /// Fulfills as soon as any input fulfills.
    ///
    /// The result holds the winner's value at its input position and `None`
    /// everywhere else; later fulfillments are ignored. Rejects with
    /// [`Error::AllRejected`] once every input has rejected, which for no
    /// inputs at all happens immediately.
    pub fn any<I>(promises: I) -> Promise<Vec<Option<T>>, E>
    where
        I: IntoIterator<Item = Promise<T, E>>,
    {
        let aggregate = Promise::new();
        let promises: Vec<_> = promises.into_iter().collect();
        let total = promises.len();
        if total == 0 {
            debug!("no inputs, rejecting");
            aggregate.reject(Error::AllRejected { count: 0 }.into());
            return aggregate;
        }

        let finished = Rc::new(Cell::new(false));
        let failures = Rc::new(Cell::new(0usize));
        for (index, promise) in promises.iter().enumerate() {
            let finished = finished.clone();
            let failures = failures.clone();
            let on_fulfilled = aggregate.clone();
            let on_rejected = aggregate.clone();
            promise.done(
                move |value| {
                    if !finished.replace(true) {
                        let mut results = vec![None; total];
                        results[index] = Some(value);
                        on_fulfilled.resolve(results);
                    }
                },
                move |_| {
                    failures.set(failures.get() + 1);
                    if failures.get() == total {
                        debug!(count = total, "every aggregate input rejected");
                        on_rejected.reject(Error::AllRejected { count: total }.into())
                    }
                },
            );
        }
        aggregate
    }
}
