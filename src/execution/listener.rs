//! # Listeners
//!
//! Push-style consumption of an operation's outcome. A listener is consumed
//! by its invocation, so it can fire at most once; the dispatcher guarantees
//! it fires exactly once for every resolved operation.
//!
//! Invocations never run on the thread that registered the listener or that
//! resolved the operation: they are handed to the runtime's blocking pool,
//! or to a dedicated thread once an owned runtime has been shut down.
//! A panicking listener is contained there and reported to the
//! [`FaultObserver`]; other listeners and handles are unaffected.
//!
//! ```rust,ignore
//! // Any `FnOnce(GatewayResult<T>)` is a listener
//! gateway.search_with(request, |outcome: GatewayResult<SearchResponse>| {
//!     match outcome {
//!         Ok(response) => println!("{} hits", response.total_hits()),
//!         Err(e) => eprintln!("search failed: {e}"),
//!     }
//! });
//! ```

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::runtime::Handle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::descriptor::OperationKind;
use super::observer::FaultObserver;
use crate::error::{GatewayError, GatewayResult};

/// Callback pair notified with the outcome of one operation
pub trait ActionListener<T>: Send + 'static {
    fn on_response(self: Box<Self>, response: T);

    fn on_failure(self: Box<Self>, error: GatewayError);
}

impl<T, F> ActionListener<T> for F
where
    F: FnOnce(GatewayResult<T>) + Send + 'static,
{
    fn on_response(self: Box<Self>, response: T) {
        (*self)(Ok(response))
    }

    fn on_failure(self: Box<Self>, error: GatewayError) {
        (*self)(Err(error))
    }
}

/// Listener assembled from separate success and failure closures
pub struct FnListener<R, E> {
    on_response: R,
    on_failure: E,
}

impl<T, R, E> ActionListener<T> for FnListener<R, E>
where
    R: FnOnce(T) + Send + 'static,
    E: FnOnce(GatewayError) + Send + 'static,
{
    fn on_response(self: Box<Self>, response: T) {
        (self.on_response)(response)
    }

    fn on_failure(self: Box<Self>, error: GatewayError) {
        (self.on_failure)(error)
    }
}

/// Build a listener from an `on_response` / `on_failure` pair
pub fn listener_fn<R, E>(on_response: R, on_failure: E) -> FnListener<R, E> {
    FnListener {
        on_response,
        on_failure,
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    outstanding: usize,
    runtime_released: bool,
}

/// Counts invocations in flight and wakes waiters when none remain
#[derive(Debug, Default)]
struct InvocationTracker {
    state: Mutex<TrackerState>,
    idle: Condvar,
}

impl InvocationTracker {
    /// Count a new invocation; returns whether the runtime is still usable
    fn begin(&self) -> bool {
        let mut state = self.state.lock();
        state.outstanding += 1;
        !state.runtime_released
    }

    fn finish(&self) {
        let mut state = self.state.lock();
        state.outstanding -= 1;
        if state.outstanding == 0 {
            self.idle.notify_all();
        }
    }
}

/// Schedules listener invocations off the caller's thread
#[derive(Clone)]
pub struct ListenerExecutor {
    runtime: Handle,
    observer: Arc<dyn FaultObserver>,
    slow_threshold: Duration,
    tracker: Arc<InvocationTracker>,
}

impl fmt::Debug for ListenerExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerExecutor")
            .field("observer", &self.observer)
            .field("slow_threshold", &self.slow_threshold)
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

impl ListenerExecutor {
    pub fn new(runtime: Handle, observer: Arc<dyn FaultObserver>, slow_threshold: Duration) -> Self {
        Self {
            runtime,
            observer,
            slow_threshold,
            tracker: Arc::new(InvocationTracker::default()),
        }
    }

    /// Listener invocations scheduled but not yet finished
    pub fn outstanding(&self) -> usize {
        self.tracker.state.lock().outstanding
    }

    /// Block until no invocation is outstanding, for at most `timeout`
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.tracker.state.lock();
        while state.outstanding > 0 {
            match deadline {
                Some(deadline) => {
                    if self.tracker.idle.wait_until(&mut state, deadline).timed_out() {
                        return state.outstanding == 0;
                    }
                }
                None => self.tracker.idle.wait(&mut state),
            }
        }
        true
    }

    /// Stop using the runtime's blocking pool.
    ///
    /// Called before a runtime is shut down; invocations scheduled afterwards,
    /// such as listeners added to a handle that outlived its gateway, run on
    /// a dedicated thread instead.
    pub(crate) fn release_runtime(&self) {
        self.tracker.state.lock().runtime_released = true;
    }

    /// Hand one listener invocation to the blocking pool
    pub(crate) fn schedule<T: Send + 'static>(
        &self,
        operation_id: Uuid,
        kind: OperationKind,
        listener: Box<dyn ActionListener<T>>,
        outcome: GatewayResult<T>,
    ) {
        let observer = self.observer.clone();
        let slow_threshold = self.slow_threshold;
        let tracker = self.tracker.clone();
        let runtime_available = self.tracker.begin();

        let invocation = move || {
            let started = Instant::now();
            let succeeded = outcome.is_ok();

            let result = panic::catch_unwind(AssertUnwindSafe(move || match outcome {
                Ok(response) => listener.on_response(response),
                Err(error) => listener.on_failure(error),
            }));

            let elapsed = started.elapsed();
            match result {
                Ok(()) => {
                    debug!(
                        operation_id = %operation_id,
                        kind = %kind,
                        success = succeeded,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Listener invoked"
                    );
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(
                        operation_id = %operation_id,
                        kind = %kind,
                        error = %message,
                        "Listener panicked - fault suppressed"
                    );
                    observer.listener_fault(operation_id, kind, &message);
                }
            }

            if elapsed > slow_threshold {
                warn!(
                    operation_id = %operation_id,
                    kind = %kind,
                    elapsed_ms = elapsed.as_millis() as u64,
                    threshold_ms = slow_threshold.as_millis() as u64,
                    "Slow listener detected"
                );
            }
            tracker.finish();
        };

        // Listeners may block (e.g. wait on another handle), so keep them off
        // the async workers.
        if runtime_available {
            self.runtime.spawn_blocking(invocation);
            return;
        }

        let spawned = std::thread::Builder::new()
            .name("gateway-listener".to_string())
            .spawn(invocation);
        if let Err(e) = spawned {
            error!(
                operation_id = %operation_id,
                kind = %kind,
                error = %e,
                "Failed to start listener thread - listener dropped"
            );
            self.tracker.finish();
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
