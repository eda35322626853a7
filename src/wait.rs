use crate::Promise;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::task::{Context, Poll};

/// A future over a promise's settlement. Many may wait on the same promise.
///
/// # Examples
///
/// ```
/// use thenable::Promise;
/// use futures::executor::block_on;
///
/// let promise = Promise::<String>::new();
/// let waiter = promise.wait();
/// let (received, ()) = block_on(async {
///     futures::join!(waiter, async { promise.resolve("🍓".into()) })
/// });
/// println!("我等到了{:?}", received);
/// assert_eq!(received, Ok("🍓".to_string()));
/// ```
#[derive(Debug)]
pub struct Settled<T, E> {
    promise: Promise<T, E>,
}

impl<T: Clone + 'static, E: Clone + 'static> Promise<T, E> {
    pub fn wait(&self) -> Settled<T, E> {
        Settled {
            promise: self.clone(),
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Future for Settled<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.promise.poll_settled(cx.waker()) {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> IntoFuture for Promise<T, E> {
    type Output = Result<T, E>;
    type IntoFuture = Settled<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        Settled { promise: self }
    }
}
