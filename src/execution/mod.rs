//! # Execution
//!
//! Operation descriptors, completion handles, listeners, the transport
//! boundary and the dispatcher that ties them together.

pub mod completion;
pub mod descriptor;
pub mod dispatcher;
pub mod listener;
pub mod observer;
pub mod transport;

pub use completion::CompletionHandle;
pub use descriptor::{
    GatewayAction, OperationDescriptor, OperationKind, OperationRequest, OperationResponse,
};
pub use dispatcher::{CancelToken, Dispatcher, DispatcherStats, PendingMetrics};
pub use listener::{listener_fn, ActionListener, FnListener, ListenerExecutor};
pub use observer::{FaultObserver, TracingObserver};
pub use transport::{CallbackTransport, CallbackTransportAdapter, CompletionCallback, Transport};
