//! # Transport Boundary
//!
//! The dispatcher does not know how operations reach the cluster. It hands
//! each descriptor to a [`Transport`] and awaits exactly one outcome.
//!
//! Two shapes are supported:
//!
//! - [`Transport`]: an async method returning the outcome.
//! - [`CallbackTransport`]: a synchronous method that receives a one-shot
//!   [`CompletionCallback`] and completes it later from any thread. Wrap it in
//!   [`CallbackTransportAdapter`] to plug it into the dispatcher.
//!
//! A callback that is dropped without being completed turns into a
//! [`GatewayError::Transport`] failure instead of a forever-pending operation.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use super::descriptor::{OperationDescriptor, OperationResponse};
use crate::error::{GatewayError, GatewayResult};

/// Executes operations against the cluster
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Execute one operation and return its outcome
    async fn execute(&self, descriptor: Arc<OperationDescriptor>)
        -> GatewayResult<OperationResponse>;

    /// Best-effort notification that an operation was cancelled.
    ///
    /// The dispatcher has already delivered the cancelled outcome when this
    /// is called; any later result for `operation_id` is discarded.
    fn on_cancel(&self, _operation_id: Uuid) {}

    /// Name used in logs
    fn name(&self) -> &str {
        "transport"
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(
        &self,
        descriptor: Arc<OperationDescriptor>,
    ) -> GatewayResult<OperationResponse> {
        (**self).execute(descriptor).await
    }

    fn on_cancel(&self, operation_id: Uuid) {
        (**self).on_cancel(operation_id)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// One-shot completion for a [`CallbackTransport`].
///
/// Consumed by [`complete`](Self::complete), so it can be completed at most
/// once.
#[derive(Debug)]
pub struct CompletionCallback {
    operation_id: Uuid,
    sender: oneshot::Sender<GatewayResult<OperationResponse>>,
}

impl CompletionCallback {
    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }

    pub fn complete(self, outcome: GatewayResult<OperationResponse>) {
        if self.sender.send(outcome).is_err() {
            debug!(
                operation_id = %self.operation_id,
                "Completion arrived after the operation stopped waiting"
            );
        }
    }

    pub fn respond(self, response: OperationResponse) {
        self.complete(Ok(response))
    }

    pub fn fail(self, error: GatewayError) {
        self.complete(Err(error))
    }
}

/// Transport that reports completion through a callback
pub trait CallbackTransport: Send + Sync + Debug {
    fn execute(&self, descriptor: Arc<OperationDescriptor>, on_complete: CompletionCallback);

    fn on_cancel(&self, _operation_id: Uuid) {}

    fn name(&self) -> &str {
        "callback-transport"
    }
}

/// Adapts a [`CallbackTransport`] to the async [`Transport`] trait
#[derive(Debug)]
pub struct CallbackTransportAdapter<T> {
    inner: T,
}

impl<T> CallbackTransportAdapter<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: CallbackTransport> Transport for CallbackTransportAdapter<T> {
    async fn execute(
        &self,
        descriptor: Arc<OperationDescriptor>,
    ) -> GatewayResult<OperationResponse> {
        let operation_id = descriptor.operation_id();
        let (sender, receiver) = oneshot::channel();

        self.inner.execute(
            descriptor,
            CompletionCallback {
                operation_id,
                sender,
            },
        );

        match receiver.await {
            Ok(outcome) => outcome,
            Err(_) => Err(GatewayError::transport(format!(
                "{} dropped the completion callback for operation {operation_id}",
                self.inner.name()
            ))),
        }
    }

    fn on_cancel(&self, operation_id: Uuid) {
        self.inner.on_cancel(operation_id)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
