//! # Gateway
//!
//! Caller-facing client. Every data operation is offered twice:
//!
//! - `search(request)` returns a [`CompletionHandle`] the caller can block on,
//!   poll, await or attach listeners to.
//! - `search_with(request, listener)` returns nothing and notifies the
//!   listener exactly once.
//!
//! Both forms go through the same dispatcher path, so for identical transport
//! behavior they observe the same outcome.
//!
//! ## Runtime ownership
//!
//! The gateway dispatches on a tokio runtime. [`GatewayBuilder::runtime`]
//! supplies one explicitly; otherwise the ambient runtime is used when
//! building from inside one, and a dedicated multi-thread runtime is created
//! when there is none. An owned runtime is shut down when the last gateway
//! clone is dropped.
//!
//! Blocking reads (`get`, `get_timeout`) must not run on an async worker
//! thread; use `CompletionHandle::wait` from async code.

use std::sync::Arc;

use tokio::runtime::{Handle, Runtime};
use tracing::{debug, info, warn};

use super::admin::AdminGateway;
use crate::action::{
    CountRequest, CountResponse, DeleteByQueryRequest, DeleteByQueryResponse, DeleteRequest,
    DeleteResponse, GetRequest, GetResponse, IndexRequest, IndexResponse, MoreLikeThisRequest,
    SearchRequest, SearchResponse, SearchScrollRequest, TermsRequest, TermsResponse,
};
use crate::config::GatewayConfig;
use crate::error::ConfigurationError;
use crate::execution::{
    ActionListener, CallbackTransport, CallbackTransportAdapter, CompletionHandle,
    Dispatcher, DispatcherStats, FaultObserver, GatewayAction, PendingMetrics, TracingObserver,
    Transport,
};

struct GatewayInner {
    dispatcher: Dispatcher,
    config: GatewayConfig,
    runtime: Option<Runtime>,
}

impl Drop for GatewayInner {
    fn drop(&mut self) {
        self.dispatcher.close();

        if let Some(runtime) = self.runtime.take() {
            // Handles may outlive the runtime; their late listeners need
            // somewhere to run
            self.dispatcher.release_runtime();

            // A runtime cannot be blocked on from inside an async context
            if Handle::try_current().is_ok() {
                debug!("Gateway dropped inside a runtime - shutting down in background");
                runtime.shutdown_background();
            } else {
                // Listeners of the operations closed above are still queued
                let timeout = self.config.dispatcher.shutdown_timeout();
                if !self.dispatcher.wait_for_listeners(timeout) {
                    warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        "Listeners still running at gateway shutdown"
                    );
                }
                runtime.shutdown_timeout(timeout);
            }
        }
    }
}

/// Client for one cluster.
///
/// Cheap to clone; clones share the dispatcher and runtime.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("cluster_name", &self.inner.config.cluster_name)
            .field("dispatcher", &self.inner.dispatcher)
            .field("owned_runtime", &self.inner.runtime.is_some())
            .finish()
    }
}

macro_rules! operation_pair {
    ($(#[$doc:meta])* $name:ident, $name_with:ident, $request:ty => $response:ty) => {
        $(#[$doc])*
        pub fn $name(&self, request: $request) -> CompletionHandle<$response> {
            self.execute(request)
        }

        $(#[$doc])*
        ///
        /// Listener form: the listener fires exactly once, asynchronously.
        pub fn $name_with<L>(&self, request: $request, listener: L)
        where
            L: ActionListener<$response>,
        {
            self.execute_with(request, listener);
        }
    };
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Submit any typed request
    pub fn execute<A: GatewayAction>(&self, request: A) -> CompletionHandle<A::Response> {
        self.inner.dispatcher.execute(request)
    }

    /// Submit any typed request in listener form; the returned handle
    /// observes the same outcome the listener receives
    pub fn execute_with<A, L>(&self, request: A, listener: L) -> CompletionHandle<A::Response>
    where
        A: GatewayAction,
        L: ActionListener<A::Response>,
    {
        self.inner.dispatcher.execute_with(request, listener)
    }

    operation_pair!(
        /// Index a document
        index, index_with, IndexRequest => IndexResponse
    );
    operation_pair!(
        /// Delete a document by id
        delete, delete_with, DeleteRequest => DeleteResponse
    );
    operation_pair!(
        /// Delete every document matching a query, reported per index
        delete_by_query, delete_by_query_with, DeleteByQueryRequest => DeleteByQueryResponse
    );
    operation_pair!(
        /// Fetch a document by id
        get, get_with, GetRequest => GetResponse
    );
    operation_pair!(
        /// Count documents matching a query
        count, count_with, CountRequest => CountResponse
    );
    operation_pair!(
        /// Run a search
        search, search_with, SearchRequest => SearchResponse
    );
    operation_pair!(
        /// Fetch the next page of a scrolled search
        search_scroll, search_scroll_with, SearchScrollRequest => SearchResponse
    );
    operation_pair!(
        /// Term statistics for one or more fields
        terms, terms_with, TermsRequest => TermsResponse
    );
    operation_pair!(
        /// Search for documents similar to an existing one
        more_like_this, more_like_this_with, MoreLikeThisRequest => SearchResponse
    );

    /// Administrative operations
    pub fn admin(&self) -> AdminGateway {
        AdminGateway::new(self.inner.dispatcher.clone())
    }

    /// Stop accepting work; pending operations resolve with
    /// [`GatewayError::Closed`](crate::GatewayError::Closed)
    pub fn close(&self) {
        self.inner.dispatcher.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.dispatcher.is_closed()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn stats(&self) -> DispatcherStats {
        self.inner.dispatcher.stats()
    }

    pub fn pending_metrics(&self) -> PendingMetrics {
        self.inner.dispatcher.pending_metrics()
    }
}

/// Builder for [`Gateway`]
#[derive(Default)]
pub struct GatewayBuilder {
    config: Option<GatewayConfig>,
    transport: Option<Arc<dyn Transport>>,
    observer: Option<Arc<dyn FaultObserver>>,
    runtime: Option<Handle>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from configuration loaded from file and environment
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Ok(Self::new().config(GatewayConfig::load()?))
    }

    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn callback_transport<T: CallbackTransport + 'static>(self, transport: T) -> Self {
        self.transport(CallbackTransportAdapter::new(transport))
    }

    pub fn observer(mut self, observer: Arc<dyn FaultObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Dispatch on an existing runtime instead of the ambient or an owned one
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<Gateway, ConfigurationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let transport = self.transport.ok_or(ConfigurationError::MissingTransport)?;
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(TracingObserver) as Arc<dyn FaultObserver>);

        let (handle, runtime) = match self.runtime.or_else(|| Handle::try_current().ok()) {
            Some(handle) => (handle, None),
            None => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(config.dispatcher.worker_threads)
                    .thread_name("gateway-dispatch")
                    .enable_all()
                    .build()?;
                (runtime.handle().clone(), Some(runtime))
            }
        };

        info!(
            cluster_name = %config.cluster_name,
            nodes = ?config.nodes,
            transport = %transport.name(),
            owned_runtime = runtime.is_some(),
            "Gateway started"
        );

        let dispatcher =
            Dispatcher::with_observer(transport, handle, config.dispatcher.clone(), observer);

        Ok(Gateway {
            inner: Arc::new(GatewayInner {
                dispatcher,
                config,
                runtime,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Requests;
    use crate::error::GatewayError;
    use crate::execution::OperationResponse;
    use crate::test_helpers::{search_response, ListenerProbe, ScriptedTransport};
    use std::time::Duration;

    fn search_transport() -> ScriptedTransport {
        ScriptedTransport::answering(OperationResponse::Search(search_response(2)))
    }

    #[test]
    fn test_build_requires_transport() {
        let result = GatewayBuilder::new().build();
        assert!(matches!(result, Err(ConfigurationError::MissingTransport)));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = GatewayConfig::default();
        config.cluster_name = String::new();
        let result = GatewayBuilder::new()
            .config(config)
            .transport(search_transport())
            .build();
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_owned_runtime_serves_blocking_get() {
        let gateway = Gateway::builder()
            .transport(search_transport())
            .build()
            .unwrap();
        assert!(format!("{gateway:?}").contains("owned_runtime: true"));

        let request = Requests::search_request(["twitter"]).build().unwrap();
        let response = gateway.search(request).get().unwrap();
        assert_eq!(response.total_hits(), 2);
    }

    #[test]
    fn test_listener_and_future_forms_agree() {
        let gateway = Gateway::builder()
            .transport(search_transport())
            .build()
            .unwrap();
        let request = Requests::search_request(["twitter"]).build().unwrap();
        let probe = ListenerProbe::<SearchResponse>::new();

        gateway.search_with(request.clone(), probe.listener());
        let from_future = gateway.search(request).get();
        let from_listener = probe.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(from_future, from_listener);
    }

    #[test]
    fn test_close_rejects_new_work() {
        let gateway = Gateway::builder()
            .transport(search_transport())
            .build()
            .unwrap();
        gateway.close();
        assert!(gateway.is_closed());

        let request = Requests::search_request(["twitter"]).build().unwrap();
        assert_eq!(gateway.search(request).get(), Err(GatewayError::Closed));
    }

    #[test]
    fn test_handle_outliving_gateway_still_fires_late_listener() {
        let gateway = Gateway::builder()
            .transport(search_transport())
            .build()
            .unwrap();
        let request = Requests::search_request(["twitter"]).build().unwrap();
        let handle = gateway.search(request);
        let response = handle.get().unwrap();

        drop(gateway);

        let probe = ListenerProbe::<SearchResponse>::new();
        handle.add_listener(probe.listener());
        assert_eq!(probe.recv_timeout(Duration::from_secs(2)), Some(Ok(response)));
        assert_eq!(probe.recv_timeout(Duration::from_millis(50)), None);
        assert!(!handle.cancel());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ambient_runtime_is_reused() {
        let gateway = Gateway::builder()
            .transport(search_transport())
            .build()
            .unwrap();
        assert!(format!("{gateway:?}").contains("owned_runtime: false"));

        let request = Requests::search_request(["twitter"]).build().unwrap();
        let response = gateway.search(request).wait().await.unwrap();
        assert_eq!(response.total_hits(), 2);
    }
}
