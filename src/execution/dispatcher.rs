//! # Dispatcher
//!
//! Routes every submission, future-style or listener-style, through one
//! path: register the operation as pending, hand it to the transport on the
//! runtime, and resolve its completion handle with the single outcome.
//!
//! ## Exactly-once
//!
//! The pending registry is the arbiter. Completion, cancellation and close
//! all race to remove the operation's entry; whoever removes it delivers the
//! outcome, everybody else is a no-op. A transport result that arrives after
//! a cancel is discarded.
//!
//! ```text
//! submit ──→ registry.insert ──→ runtime.spawn(transport.execute)
//!                 │                          │
//!   cancel ───────┤                          │
//!   close  ───────┤                          │
//!                 ▼                          ▼
//!          registry.remove  ◀──────── outcome
//!                 │
//!                 └─→ handle.resolve ──→ listeners (blocking pool)
//! ```

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::FutureExt;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::completion::CompletionHandle;
use super::descriptor::{GatewayAction, OperationDescriptor, OperationResponse};
use super::listener::{panic_message, ActionListener, ListenerExecutor};
use super::observer::{FaultObserver, TracingObserver};
use super::transport::Transport;
use crate::config::DispatcherConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::logging::log_operation;

/// Records the typed outcome, then resolves the typed handle
type Completer = Box<
    dyn FnOnce(GatewayResult<OperationResponse>, &dyn Fn(Result<(), &GatewayError>)) + Send + Sync,
>;

/// Registry entry for an operation awaiting its outcome
struct PendingOperation {
    descriptor: Arc<OperationDescriptor>,
    completer: Completer,
    started_at: Instant,
    task: Option<AbortHandle>,
}

/// Snapshot of dispatcher counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub rejected: u64,
    pub in_flight: usize,
}

#[derive(Debug, Default)]
struct DispatchCounters {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    rejected: AtomicU64,
}

/// Metrics about pending operations for monitoring
#[derive(Debug, Clone, Default, Serialize)]
pub struct PendingMetrics {
    /// Operations awaiting their outcome
    pub pending_count: usize,
    /// Age of oldest pending operation in milliseconds
    pub oldest_pending_age_ms: Option<u64>,
    /// Age of newest pending operation in milliseconds
    pub newest_pending_age_ms: Option<u64>,
    pub oldest_operation_id: Option<Uuid>,
    /// Whether any operation is older than the aging warning threshold
    pub aging_detected: bool,
    pub aging_count: usize,
}

pub(crate) struct DispatcherCore {
    transport: Arc<dyn Transport>,
    runtime: Handle,
    registry: DashMap<Uuid, PendingOperation>,
    executor: ListenerExecutor,
    observer: Arc<dyn FaultObserver>,
    config: DispatcherConfig,
    closed: AtomicBool,
    in_flight: AtomicUsize,
    counters: DispatchCounters,
}

impl DispatcherCore {
    fn take(&self, operation_id: Uuid) -> Option<PendingOperation> {
        let (_, pending) = self.registry.remove(&operation_id)?;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Some(pending)
    }

    /// Deliver `outcome` if the operation is still pending
    fn finish(&self, operation_id: Uuid, outcome: GatewayResult<OperationResponse>) -> bool {
        match self.take(operation_id) {
            Some(pending) => {
                self.settle(operation_id, pending, outcome);
                true
            }
            None => {
                debug!(
                    operation_id = %operation_id,
                    transport = %self.transport.name(),
                    "Outcome discarded - operation no longer pending"
                );
                false
            }
        }
    }

    fn settle(
        &self,
        operation_id: Uuid,
        pending: PendingOperation,
        outcome: GatewayResult<OperationResponse>,
    ) {
        let kind = pending.descriptor.kind();
        let elapsed = pending.started_at.elapsed();

        // Counters and faults are recorded before the handle resolves, so a
        // caller woken by the outcome already sees them.
        (pending.completer)(outcome, &|status| match status {
            Ok(()) => {
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
                log_operation(operation_id, kind, "succeeded", elapsed, None);
            }
            Err(error) if error.is_cancelled() => {
                self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                log_operation(operation_id, kind, "cancelled", elapsed, None);
            }
            Err(error) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                let details = error.to_string();
                log_operation(operation_id, kind, error.label(), elapsed, Some(&details));
                if matches!(error, GatewayError::Dispatch { .. }) {
                    self.observer.dispatch_fault(operation_id, kind, error);
                }
            }
        });
    }

    fn cancel(&self, operation_id: Uuid) -> bool {
        let Some(pending) = self.take(operation_id) else {
            debug!(
                operation_id = %operation_id,
                "Cancel ignored - operation already resolved"
            );
            return false;
        };

        if let Some(task) = &pending.task {
            task.abort();
        }
        self.settle(
            operation_id,
            pending,
            Err(GatewayError::Cancelled { operation_id }),
        );
        self.transport.on_cancel(operation_id);
        true
    }
}

/// Cancels one operation, from any thread.
///
/// Holds only a weak reference to the dispatcher; cancelling after the
/// dispatcher is gone is a no-op.
#[derive(Clone)]
pub struct CancelToken {
    operation_id: Uuid,
    core: Weak<DispatcherCore>,
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("operation_id", &self.operation_id)
            .finish()
    }
}

impl CancelToken {
    pub(crate) fn detached(operation_id: Uuid) -> Self {
        Self {
            operation_id,
            core: Weak::new(),
        }
    }

    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }

    /// Attempt to cancel.
    ///
    /// Returns `true` if this call moved the operation to its cancelled
    /// outcome, `false` if it had already resolved. Cancellation is
    /// best-effort towards the cluster: the transport is told, but a remote
    /// side effect may still happen.
    pub fn cancel(&self) -> bool {
        match self.core.upgrade() {
            Some(core) => core.cancel(self.operation_id),
            None => false,
        }
    }
}

/// Single submission path shared by every gateway method
#[derive(Clone)]
pub struct Dispatcher {
    core: Arc<DispatcherCore>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("transport", &self.core.transport.name())
            .field("pending", &self.core.registry.len())
            .field("closed", &self.core.closed.load(Ordering::Relaxed))
            .field("config", &self.core.config)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher that reports faults through structured logs
    pub fn new(transport: Arc<dyn Transport>, runtime: Handle, config: DispatcherConfig) -> Self {
        Self::with_observer(transport, runtime, config, Arc::new(TracingObserver))
    }

    pub fn with_observer(
        transport: Arc<dyn Transport>,
        runtime: Handle,
        config: DispatcherConfig,
        observer: Arc<dyn FaultObserver>,
    ) -> Self {
        let executor = ListenerExecutor::new(
            runtime.clone(),
            observer.clone(),
            config.slow_listener_threshold(),
        );

        info!(
            transport = %transport.name(),
            max_in_flight = config.max_in_flight,
            "Dispatcher created"
        );

        Self {
            core: Arc::new(DispatcherCore {
                transport,
                runtime,
                registry: DashMap::new(),
                executor,
                observer,
                config,
                closed: AtomicBool::new(false),
                in_flight: AtomicUsize::new(0),
                counters: DispatchCounters::default(),
            }),
        }
    }

    /// Submit a raw descriptor
    pub fn submit(
        &self,
        descriptor: OperationDescriptor,
    ) -> (CompletionHandle<OperationResponse>, CancelToken) {
        let handle = self.handle_for(&descriptor);
        self.launch(descriptor, &handle, OperationResponse::classify);
        let token = handle.cancel_token();
        (handle, token)
    }

    /// Submit a raw descriptor and notify `listener` with its outcome.
    ///
    /// The listener is registered before dispatch; the returned handle
    /// observes the same outcome.
    pub fn submit_with<L>(
        &self,
        descriptor: OperationDescriptor,
        listener: L,
    ) -> (CompletionHandle<OperationResponse>, CancelToken)
    where
        L: ActionListener<OperationResponse>,
    {
        let handle = self.handle_for(&descriptor);
        handle.add_listener(listener);
        self.launch(descriptor, &handle, OperationResponse::classify);
        let token = handle.cancel_token();
        (handle, token)
    }

    /// Submit a typed request
    pub fn execute<A: GatewayAction>(&self, request: A) -> CompletionHandle<A::Response> {
        let descriptor = OperationDescriptor::new(request.into_request());
        let handle = self.handle_for(&descriptor);
        self.launch(descriptor, &handle, A::from_response);
        handle
    }

    /// Submit a typed request and notify `listener` with its outcome
    pub fn execute_with<A, L>(&self, request: A, listener: L) -> CompletionHandle<A::Response>
    where
        A: GatewayAction,
        L: ActionListener<A::Response>,
    {
        let descriptor = OperationDescriptor::new(request.into_request());
        let handle = self.handle_for(&descriptor);
        handle.add_listener(listener);
        self.launch(descriptor, &handle, A::from_response);
        handle
    }

    /// Cancel a pending operation by id
    pub fn cancel(&self, operation_id: Uuid) -> bool {
        self.core.cancel(operation_id)
    }

    /// Stop accepting work and resolve every pending operation as closed.
    ///
    /// Idempotent. Submissions after close resolve immediately with
    /// [`GatewayError::Closed`].
    pub fn close(&self) {
        if self.core.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let pending: Vec<Uuid> = self.core.registry.iter().map(|entry| *entry.key()).collect();
        info!(
            transport = %self.core.transport.name(),
            pending = pending.len(),
            "Dispatcher closing"
        );

        for operation_id in pending {
            if let Some(operation) = self.core.take(operation_id) {
                if let Some(task) = &operation.task {
                    task.abort();
                }
                self.core
                    .settle(operation_id, operation, Err(GatewayError::Closed));
            }
        }
    }

    /// Wait until every scheduled listener invocation has finished.
    ///
    /// Returns `false` if some were still running after `timeout`.
    pub fn wait_for_listeners(&self, timeout: Duration) -> bool {
        self.core.executor.wait_idle(timeout)
    }

    /// Move listener invocations off the runtime before it shuts down
    pub(crate) fn release_runtime(&self) {
        self.core.executor.release_runtime();
    }

    pub fn is_closed(&self) -> bool {
        self.core.closed.load(Ordering::SeqCst)
    }

    pub fn transport_name(&self) -> &str {
        self.core.transport.name()
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.core.config
    }

    /// Number of operations awaiting their outcome
    pub fn pending_count(&self) -> usize {
        self.core.registry.len()
    }

    pub fn stats(&self) -> DispatcherStats {
        let counters = &self.core.counters;
        DispatcherStats {
            submitted: counters.submitted.load(Ordering::Relaxed),
            succeeded: counters.succeeded.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            cancelled: counters.cancelled.load(Ordering::Relaxed),
            rejected: counters.rejected.load(Ordering::Relaxed),
            in_flight: self.core.in_flight.load(Ordering::SeqCst),
        }
    }

    /// Get current metrics about pending operations
    pub fn pending_metrics(&self) -> PendingMetrics {
        if self.core.registry.is_empty() {
            return PendingMetrics::default();
        }

        let now = Instant::now();
        let threshold = self.core.config.aging_warning_threshold();

        let mut ages: Vec<(Uuid, u64)> = self
            .core
            .registry
            .iter()
            .map(|entry| {
                let age = now.duration_since(entry.value().started_at).as_millis() as u64;
                (*entry.key(), age)
            })
            .collect();

        // Newest first, oldest last
        ages.sort_by_key(|(_, age)| *age);

        let aging_count = ages
            .iter()
            .filter(|(_, age)| Duration::from_millis(*age) > threshold)
            .count();

        PendingMetrics {
            pending_count: ages.len(),
            oldest_pending_age_ms: ages.last().map(|(_, age)| *age),
            newest_pending_age_ms: ages.first().map(|(_, age)| *age),
            oldest_operation_id: ages.last().map(|(id, _)| *id),
            aging_detected: aging_count > 0,
            aging_count,
        }
    }

    /// Warn about operations pending longer than the aging threshold.
    ///
    /// Returns how many were found. Intended to be called periodically.
    pub fn check_aging_operations(&self) -> usize {
        let now = Instant::now();
        let threshold = self.core.config.aging_warning_threshold();
        let mut aging = 0;

        for entry in self.core.registry.iter() {
            let age = now.duration_since(entry.value().started_at);
            if age > threshold {
                aging += 1;
                warn!(
                    operation_id = %entry.key(),
                    kind = %entry.value().descriptor.kind(),
                    transport = %self.core.transport.name(),
                    age_ms = age.as_millis() as u64,
                    threshold_ms = self.core.config.aging_warning_threshold_ms,
                    "Pending operation aging - slow transport detected"
                );
            }
        }
        aging
    }

    fn handle_for<R>(&self, descriptor: &OperationDescriptor) -> CompletionHandle<R>
    where
        R: Clone + Send + 'static,
    {
        let operation_id = descriptor.operation_id();
        CompletionHandle::new(
            operation_id,
            descriptor.kind(),
            self.core.executor.clone(),
            CancelToken {
                operation_id,
                core: Arc::downgrade(&self.core),
            },
        )
    }

    fn launch<R>(
        &self,
        descriptor: OperationDescriptor,
        handle: &CompletionHandle<R>,
        convert: fn(OperationResponse) -> GatewayResult<R>,
    ) where
        R: Clone + Send + 'static,
    {
        let core = &self.core;
        let operation_id = descriptor.operation_id();
        let kind = descriptor.kind();
        core.counters.submitted.fetch_add(1, Ordering::Relaxed);

        if core.closed.load(Ordering::SeqCst) {
            core.counters.failed.fetch_add(1, Ordering::Relaxed);
            debug!(
                operation_id = %operation_id,
                kind = %kind,
                "Submission after close"
            );
            handle.resolve(Err(GatewayError::Closed));
            return;
        }

        let limit = core.config.max_in_flight;
        let in_flight = core.in_flight.fetch_add(1, Ordering::SeqCst);
        if limit > 0 && in_flight >= limit {
            core.in_flight.fetch_sub(1, Ordering::SeqCst);
            core.counters.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(
                operation_id = %operation_id,
                kind = %kind,
                in_flight = in_flight,
                limit = limit,
                "Operation rejected - in-flight limit reached"
            );
            handle.resolve(Err(GatewayError::Rejected { in_flight, limit }));
            return;
        }

        let descriptor = descriptor.into_shared();
        let resolver = handle.clone();
        let completer: Completer = Box::new(move |outcome, record| {
            let outcome = outcome.and_then(convert);
            record(outcome.as_ref().map(|_| ()));
            resolver.resolve(outcome);
        });

        core.registry.insert(
            operation_id,
            PendingOperation {
                descriptor: descriptor.clone(),
                completer,
                started_at: Instant::now(),
                task: None,
            },
        );

        // close() may have drained the registry between the check and the insert
        if core.closed.load(Ordering::SeqCst) {
            core.finish(operation_id, Err(GatewayError::Closed));
            return;
        }

        debug!(
            operation_id = %operation_id,
            kind = %kind,
            transport = %core.transport.name(),
            "Operation dispatched"
        );

        let task_core = core.clone();
        let transport = core.transport.clone();
        let task = core.runtime.spawn(async move {
            let outcome = AssertUnwindSafe(transport.execute(descriptor))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(GatewayError::dispatch(format!(
                        "transport panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                });
            task_core.finish(operation_id, outcome);
        });

        if let Some(mut pending) = core.registry.get_mut(&operation_id) {
            pending.task = Some(task.abort_handle());
        }
    }
}
