// Test Helpers Module - in-process transports, observers and fixtures
//
// Shared by unit tests, the integration tests under tests/ and the benches.
// Nothing here talks to a real cluster.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use crossbeam::channel::{self, Receiver, Sender};
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::action::{
    ClearRealmCacheResponse, CountResponse, IndexResponse, NodeCacheClearStatus, SearchHit,
    SearchHits, SearchResponse, ShardStats,
};
use crate::error::{GatewayError, GatewayResult};
use crate::execution::{
    ActionListener, CallbackTransport, CompletionCallback, FaultObserver, OperationDescriptor,
    OperationKind, OperationResponse, Transport,
};

type Handler = Arc<dyn Fn(&OperationDescriptor) -> GatewayResult<OperationResponse> + Send + Sync>;

/// Transport answering every operation through a closure
pub struct ScriptedTransport {
    handler: Handler,
    latency: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<OperationKind>>,
    cancelled: Mutex<Vec<Uuid>>,
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("latency", &self.latency)
            .field("calls", &self.calls())
            .finish()
    }
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&OperationDescriptor) -> GatewayResult<OperationResponse> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            latency: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    /// Answer every operation with a clone of `response`
    pub fn answering(response: OperationResponse) -> Self {
        Self::new(move |_| Ok(response.clone()))
    }

    /// Fail every operation with `error`
    pub fn failing(error: GatewayError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_kinds(&self) -> Vec<OperationKind> {
        self.seen.lock().clone()
    }

    pub fn cancelled(&self) -> Vec<Uuid> {
        self.cancelled.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        descriptor: Arc<OperationDescriptor>,
    ) -> GatewayResult<OperationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(descriptor.kind());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        (self.handler)(&descriptor)
    }

    fn on_cancel(&self, operation_id: Uuid) {
        self.cancelled.lock().push(operation_id);
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Transport that never answers
#[derive(Debug, Default)]
pub struct StalledTransport {
    started: AtomicUsize,
    cancelled: Mutex<Vec<Uuid>>,
}

impl StalledTransport {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> Vec<Uuid> {
        self.cancelled.lock().clone()
    }
}

#[async_trait]
impl Transport for StalledTransport {
    async fn execute(
        &self,
        _descriptor: Arc<OperationDescriptor>,
    ) -> GatewayResult<OperationResponse> {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    fn on_cancel(&self, operation_id: Uuid) {
        self.cancelled.lock().push(operation_id);
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

/// Callback transport completed by hand from the test body
#[derive(Debug)]
pub struct ManualTransport {
    callbacks: DashMap<Uuid, CompletionCallback>,
    arrivals: Sender<Uuid>,
    arrived: Receiver<Uuid>,
    cancelled: Mutex<Vec<Uuid>>,
}

impl Default for ManualTransport {
    fn default() -> Self {
        let (arrivals, arrived) = channel::unbounded();
        Self {
            callbacks: DashMap::new(),
            arrivals,
            arrived,
            cancelled: Mutex::new(Vec::new()),
        }
    }
}

impl ManualTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wait for the transport to receive its next operation
    pub fn next_operation(&self, timeout: Duration) -> Option<Uuid> {
        self.arrived.recv_timeout(timeout).ok()
    }

    /// Complete a held callback; false if there is none for `operation_id`
    pub fn complete(&self, operation_id: Uuid, outcome: GatewayResult<OperationResponse>) -> bool {
        match self.callbacks.remove(&operation_id) {
            Some((_, callback)) => {
                callback.complete(outcome);
                true
            }
            None => false,
        }
    }

    /// Drop a held callback without completing it
    pub fn abandon(&self, operation_id: Uuid) -> bool {
        self.callbacks.remove(&operation_id).is_some()
    }

    pub fn held(&self) -> usize {
        self.callbacks.len()
    }

    pub fn cancelled(&self) -> Vec<Uuid> {
        self.cancelled.lock().clone()
    }
}

impl CallbackTransport for Arc<ManualTransport> {
    fn execute(&self, descriptor: Arc<OperationDescriptor>, on_complete: CompletionCallback) {
        let operation_id = descriptor.operation_id();
        self.callbacks.insert(operation_id, on_complete);
        let _ = self.arrivals.send(operation_id);
    }

    fn on_cancel(&self, operation_id: Uuid) {
        self.cancelled.lock().push(operation_id);
    }

    fn name(&self) -> &str {
        "manual"
    }
}

/// Observer that records every fault it is told about
#[derive(Debug, Default)]
pub struct RecordingObserver {
    listener_faults: Mutex<Vec<(Uuid, String)>>,
    dispatch_faults: Mutex<Vec<(Uuid, GatewayError)>>,
}

impl RecordingObserver {
    pub fn listener_faults(&self) -> Vec<(Uuid, String)> {
        self.listener_faults.lock().clone()
    }

    pub fn dispatch_faults(&self) -> Vec<(Uuid, GatewayError)> {
        self.dispatch_faults.lock().clone()
    }

    /// Poll until at least `count` listener faults were recorded or `timeout` passes
    pub fn wait_for_listener_faults(&self, count: usize, timeout: Duration) -> Vec<(Uuid, String)> {
        let deadline = Instant::now() + timeout;
        loop {
            let faults = self.listener_faults();
            if faults.len() >= count || Instant::now() >= deadline {
                return faults;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

impl FaultObserver for RecordingObserver {
    fn listener_fault(&self, operation_id: Uuid, _kind: OperationKind, message: &str) {
        self.listener_faults
            .lock()
            .push((operation_id, message.to_string()));
    }

    fn dispatch_fault(&self, operation_id: Uuid, _kind: OperationKind, error: &GatewayError) {
        self.dispatch_faults.lock().push((operation_id, error.clone()));
    }
}

/// Collects listener invocations for assertions
#[derive(Debug)]
pub struct ListenerProbe<T> {
    sender: Sender<GatewayResult<T>>,
    receiver: Receiver<GatewayResult<T>>,
}

impl<T: Send + 'static> Default for ListenerProbe<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> ListenerProbe<T> {
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self { sender, receiver }
    }

    /// A listener reporting into this probe
    pub fn listener(&self) -> impl ActionListener<T> {
        let sender = self.sender.clone();
        move |outcome: GatewayResult<T>| {
            let _ = sender.send(outcome);
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<GatewayResult<T>> {
        self.receiver.recv_timeout(timeout).ok()
    }

    pub fn try_recv(&self) -> Option<GatewayResult<T>> {
        self.receiver.try_recv().ok()
    }
}

pub fn search_response(total: u64) -> SearchResponse {
    let hits = (0..total.min(10))
        .map(|i| SearchHit {
            index: "twitter".to_string(),
            doc_type: "_doc".to_string(),
            id: i.to_string(),
            score: Some(1.0),
            source: Some(serde_json::json!({ "user": "kimchy", "seq": i })),
        })
        .collect();

    SearchResponse {
        scroll_id: None,
        took_ms: 3,
        timed_out: false,
        shards: ShardStats::all_successful(5),
        hits: SearchHits {
            total,
            max_score: Some(1.0),
            hits,
        },
    }
}

pub fn count_response(count: u64) -> CountResponse {
    CountResponse {
        count,
        shards: ShardStats::all_successful(5),
    }
}

pub fn index_response(index: &str, id: &str) -> IndexResponse {
    IndexResponse {
        index: index.to_string(),
        doc_type: "_doc".to_string(),
        id: id.to_string(),
        version: 1,
        created: true,
    }
}

/// Per-node cache clear response; `None` means the node acknowledged
pub fn realm_cache_response(nodes: &[(&str, Option<&str>)]) -> ClearRealmCacheResponse {
    nodes
        .iter()
        .fold(ClearRealmCacheResponse::new("test-cluster"), |response, (node, error)| {
            let status = match error {
                Some(error) => NodeCacheClearStatus::failed(*error),
                None => NodeCacheClearStatus::cleared(),
            };
            response.with_node(*node, status)
        })
}
