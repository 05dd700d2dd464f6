//! Cancellation utilities
//!
//! First-class cancellation handles for response streams.

use futures::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;
use crate::streaming::StreamHandle;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. The wrapped stream ends at its next poll and
    /// drops its inner stream, which closes the HTTP connection.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves when cancellation is requested.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

// Built on async_stream to avoid pin projection.

/// Make a stream cancellable and return it with its cancel handle.
pub fn make_cancellable_stream<T, S>(stream: S) -> StreamHandle<T>
where
    T: Send + 'static,
    S: Stream<Item = Result<T, LlmError>> + Send + 'static,
{
    let cancel = CancelHandle::new();
    let token = cancel.token.clone();
    let s = async_stream::stream! {
        use futures::StreamExt;
        let mut inner: Pin<Box<S>> = Box::pin(stream);
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                item = inner.next() => {
                    let Some(item) = item else { break };
                    yield item;
                }
            }
        }
        // Release the response body before the wrapper itself is dropped.
        drop(inner);
        tracing::trace!(cancelled = token.is_cancelled(), "cancellable stream ended");
    };
    StreamHandle {
        stream: Box::pin(s),
        cancel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Stands in for a response body: flags when it is dropped.
    struct BodyGuard(Arc<AtomicBool>);

    impl Drop for BodyGuard {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn guarded_pending(closed: Arc<AtomicBool>) -> impl Stream<Item = Result<u8, LlmError>> + Send {
        let guard = BodyGuard(closed);
        async_stream::stream! {
            let _guard = guard;
            yield Ok(1);
            futures_util::future::pending::<()>().await;
        }
    }

    #[tokio::test]
    async fn cancel_wakes_pending_next_immediately() {
        // A stream that never yields and never ends.
        let pending = futures_util::stream::pending::<Result<String, LlmError>>();
        let StreamHandle { mut stream, cancel } = make_cancellable_stream(pending);

        let waiter = tokio::spawn(async move { stream.next().await });

        // Give the task a chance to poll and block on `next()`.
        tokio::task::yield_now().await;

        cancel.cancel();

        let out = tokio::time::timeout(std::time::Duration::from_millis(200), waiter)
            .await
            .expect("cancel should wake the waiting task")
            .expect("task ok");

        assert!(out.is_none());
    }

    #[tokio::test]
    async fn items_pass_through_until_cancelled() {
        let items = futures_util::stream::iter(vec![Ok::<_, LlmError>(1), Ok(2), Ok(3)]);
        let StreamHandle { mut stream, cancel } = make_cancellable_stream(items);

        assert_eq!(stream.next().await, Some(Ok(1)));
        cancel.cancel();
        assert!(stream.next().await.is_none());
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_releases_inner_stream() {
        let closed = Arc::new(AtomicBool::new(false));
        let StreamHandle { mut stream, cancel } =
            make_cancellable_stream(guarded_pending(closed.clone()));

        assert_eq!(stream.next().await, Some(Ok(1)));
        assert!(!closed.load(Ordering::SeqCst));

        cancel.cancel();
        assert!(stream.next().await.is_none());
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn dropping_the_stream_releases_inner_stream() {
        let closed = Arc::new(AtomicBool::new(false));
        let StreamHandle { mut stream, cancel } =
            make_cancellable_stream(guarded_pending(closed.clone()));

        assert_eq!(stream.next().await, Some(Ok(1)));
        drop(stream);
        assert!(closed.load(Ordering::SeqCst));
        assert!(!cancel.is_cancelled());
    }
}
