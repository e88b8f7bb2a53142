//! # Completion Handle
//!
//! Single-assignment container for an operation's eventual outcome.
//!
//! A handle transitions from pending to resolved exactly once. After that
//! every reader (`get`, `get_timeout`, `try_get`, `wait`) observes the same
//! response or the same error, and every listener registered on it, before or
//! after resolution, fires exactly once with that outcome.
//!
//! Resolution order is fixed: the state is published first, blocked readers
//! are woken next, listeners are scheduled last. A listener that calls `get()`
//! on its own handle therefore never blocks.

use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

use super::descriptor::OperationKind;
use super::dispatcher::CancelToken;
use super::listener::{ActionListener, ListenerExecutor};
use crate::error::{GatewayError, GatewayResult};

enum HandleState<T> {
    Pending {
        listeners: Vec<Box<dyn ActionListener<T>>>,
    },
    Resolved(GatewayResult<T>),
}

struct HandleInner<T> {
    operation_id: Uuid,
    kind: OperationKind,
    state: Mutex<HandleState<T>>,
    resolved: Condvar,
    notify: Notify,
    executor: ListenerExecutor,
    cancel: CancelToken,
}

/// Caller-side view of one submitted operation.
///
/// Cloning a handle yields another view of the same operation.
pub struct CompletionHandle<T> {
    inner: Arc<HandleInner<T>>,
}

impl<T> Clone for CompletionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for CompletionHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let done = matches!(&*self.inner.state.lock(), HandleState::Resolved(_));
        f.debug_struct("CompletionHandle")
            .field("operation_id", &self.inner.operation_id)
            .field("kind", &self.inner.kind)
            .field("done", &done)
            .finish()
    }
}

impl<T> CompletionHandle<T>
where
    T: Clone + Send + 'static,
{
    pub(crate) fn new(
        operation_id: Uuid,
        kind: OperationKind,
        executor: ListenerExecutor,
        cancel: CancelToken,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                operation_id,
                kind,
                state: Mutex::new(HandleState::Pending {
                    listeners: Vec::new(),
                }),
                resolved: Condvar::new(),
                notify: Notify::new(),
                executor,
                cancel,
            }),
        }
    }

    pub fn operation_id(&self) -> Uuid {
        self.inner.operation_id
    }

    pub fn kind(&self) -> OperationKind {
        self.inner.kind
    }

    /// Non-blocking: true once a response or failure has been recorded
    pub fn is_done(&self) -> bool {
        matches!(&*self.inner.state.lock(), HandleState::Resolved(_))
    }

    /// The outcome if already resolved
    pub fn try_get(&self) -> Option<GatewayResult<T>> {
        match &*self.inner.state.lock() {
            HandleState::Resolved(outcome) => Some(outcome.clone()),
            HandleState::Pending { .. } => None,
        }
    }

    /// Block the calling thread until the operation resolves.
    ///
    /// Must not be called from an async worker thread; use [`wait`](Self::wait)
    /// there instead.
    pub fn get(&self) -> GatewayResult<T> {
        let mut state = self.inner.state.lock();
        loop {
            if let HandleState::Resolved(outcome) = &*state {
                return outcome.clone();
            }
            self.inner.resolved.wait(&mut state);
        }
    }

    /// Block for at most `timeout`.
    ///
    /// Expiry yields [`GatewayError::Timeout`] and leaves the operation
    /// running; a later `get` can still observe its real outcome.
    pub fn get_timeout(&self, timeout: Duration) -> GatewayResult<T> {
        let mut state = self.inner.state.lock();
        if let HandleState::Resolved(outcome) = &*state {
            return outcome.clone();
        }

        // A deadline past the clock's range is no deadline at all
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            drop(state);
            return self.get();
        };

        loop {
            if self
                .inner
                .resolved
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                if let HandleState::Resolved(outcome) = &*state {
                    return outcome.clone();
                }
                return Err(GatewayError::Timeout {
                    operation_id: self.inner.operation_id,
                    waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            if let HandleState::Resolved(outcome) = &*state {
                return outcome.clone();
            }
        }
    }

    /// Await resolution without blocking a runtime thread
    pub async fn wait(&self) -> GatewayResult<T> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking, so a resolution in between
            // is not missed.
            notified.as_mut().enable();

            if let Some(outcome) = self.try_get() {
                return outcome;
            }
            notified.await;
        }
    }

    /// Register a listener.
    ///
    /// On a pending handle the listener fires when the operation resolves; on
    /// a resolved handle it is scheduled immediately. Either way it runs
    /// asynchronously, never on the registering thread.
    pub fn add_listener<L>(&self, listener: L)
    where
        L: ActionListener<T>,
    {
        let listener: Box<dyn ActionListener<T>> = Box::new(listener);
        let outcome = {
            let mut state = self.inner.state.lock();
            match &mut *state {
                HandleState::Pending { listeners } => {
                    listeners.push(listener);
                    return;
                }
                HandleState::Resolved(outcome) => outcome.clone(),
            }
        };

        self.inner
            .executor
            .schedule(self.inner.operation_id, self.inner.kind, listener, outcome);
    }

    /// Request cancellation; see [`CancelToken::cancel`]
    pub fn cancel(&self) -> bool {
        self.inner.cancel.cancel()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.inner.cancel.clone()
    }

    /// Record the outcome and fan it out.
    ///
    /// # Panics
    ///
    /// Resolving an already-resolved handle is a dispatcher bug and panics.
    pub(crate) fn resolve(&self, outcome: GatewayResult<T>) {
        let listeners = {
            let mut state = self.inner.state.lock();
            if matches!(&*state, HandleState::Resolved(_)) {
                drop(state);
                panic!(
                    "completion handle for operation {} resolved twice",
                    self.inner.operation_id
                );
            }
            match mem::replace(&mut *state, HandleState::Resolved(outcome.clone())) {
                HandleState::Pending { listeners } => listeners,
                HandleState::Resolved(_) => Vec::new(),
            }
        };

        self.inner.resolved.notify_all();
        self.inner.notify.notify_waiters();

        for listener in listeners {
            self.inner.executor.schedule(
                self.inner.operation_id,
                self.inner.kind,
                listener,
                outcome.clone(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::observer::TracingObserver;
    use crate::test_helpers::ListenerProbe;
    use tokio::runtime::Handle;

    fn pending_handle() -> CompletionHandle<u32> {
        let executor = ListenerExecutor::new(
            Handle::current(),
            Arc::new(TracingObserver),
            Duration::from_secs(1),
        );
        CompletionHandle::new(
            Uuid::new_v4(),
            OperationKind::Count,
            executor,
            CancelToken::detached(Uuid::new_v4()),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_get_observes_resolution_from_another_thread() {
        let handle = pending_handle();
        assert!(!handle.is_done());
        assert_eq!(handle.try_get(), None);

        let resolver = handle.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            resolver.resolve(Ok(5));
        });

        let reader = handle.clone();
        let value = tokio::task::spawn_blocking(move || reader.get())
            .await
            .unwrap();
        assert_eq!(value, Ok(5));
        assert!(handle.is_done());
        // Repeated reads observe the same outcome
        assert_eq!(handle.get(), Ok(5));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_get_timeout_does_not_cancel() {
        let handle = pending_handle();
        let reader = handle.clone();
        let err = tokio::task::spawn_blocking(move || reader.get_timeout(Duration::from_millis(10)))
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, GatewayError::Timeout { waited_ms: 10, .. }));
        assert!(!handle.is_done());

        handle.resolve(Ok(9));
        assert_eq!(handle.get_timeout(Duration::from_millis(10)), Ok(9));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_get_timeout_accepts_unbounded_duration() {
        let handle = pending_handle();
        handle.resolve(Err(GatewayError::Closed));
        assert_eq!(handle.get_timeout(Duration::MAX), Err(GatewayError::Closed));

        let pending = pending_handle();
        let resolver = pending.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            resolver.resolve(Ok(4));
        });
        let reader = pending.clone();
        let value = tokio::task::spawn_blocking(move || reader.get_timeout(Duration::MAX))
            .await
            .unwrap();
        assert_eq!(value, Ok(4));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_wait_returns_after_resolution() {
        let handle = pending_handle();
        let resolver = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            resolver.resolve(Err(GatewayError::Closed));
        });
        assert_eq!(handle.wait().await, Err(GatewayError::Closed));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_listener_before_and_after_resolution_fire_once() {
        let handle = pending_handle();
        let early = ListenerProbe::<u32>::new();
        let late = ListenerProbe::<u32>::new();

        handle.add_listener(early.listener());
        handle.resolve(Ok(3));
        handle.add_listener(late.listener());

        assert_eq!(early.recv_timeout(Duration::from_secs(5)), Some(Ok(3)));
        assert_eq!(late.recv_timeout(Duration::from_secs(5)), Some(Ok(3)));
        assert_eq!(early.recv_timeout(Duration::from_millis(50)), None);
        assert_eq!(late.recv_timeout(Duration::from_millis(50)), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_listener_sees_resolved_handle() {
        let handle = pending_handle();
        let (tx, rx) = crossbeam::channel::bounded(1);
        let inner = handle.clone();
        handle.add_listener(move |_: GatewayResult<u32>| {
            tx.send((inner.is_done(), inner.get())).unwrap();
        });
        handle.resolve(Ok(1));

        let (done, value) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(done);
        assert_eq!(value, Ok(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[should_panic(expected = "resolved twice")]
    async fn test_double_resolution_panics() {
        let handle = pending_handle();
        handle.resolve(Ok(1));
        handle.resolve(Ok(2));
    }
}
