//! End-to-end behavior of the gateway against in-process transports.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cluster_gateway::action::{
    ClearRealmCacheResponse, CountResponse, DeleteByQueryResponse, DeleteResponse, GetResponse,
    SearchResponse, TermsResponse,
};
use cluster_gateway::test_helpers::{
    count_response, index_response, realm_cache_response, search_response, ListenerProbe,
    ManualTransport, ScriptedTransport, StalledTransport,
};
use cluster_gateway::{
    listener_fn, CallbackTransportAdapter, DispatcherConfig, GatewayError, GatewayResult,
    OperationKind, OperationRequest, OperationResponse, Requests,
};
use common::{gateway_with, gateway_with_config};
use serde_json::json;

const WAIT: Duration = Duration::from_secs(5);

/// Answers each request kind with a response of the matching shape
fn answer_by_kind(request: &OperationRequest) -> OperationResponse {
    match request {
        OperationRequest::Index(r) => OperationResponse::Index(index_response(&r.index, "1")),
        OperationRequest::Delete(r) => OperationResponse::Delete(DeleteResponse {
            index: r.index.clone(),
            doc_type: r.doc_type.clone(),
            id: r.id.clone(),
            version: 2,
            found: true,
        }),
        OperationRequest::DeleteByQuery(_) => {
            OperationResponse::DeleteByQuery(DeleteByQueryResponse::default())
        }
        OperationRequest::Get(r) => {
            OperationResponse::Get(GetResponse::missing(&r.index, &r.doc_type, &r.id))
        }
        OperationRequest::Count(_) => OperationResponse::Count(count_response(7)),
        OperationRequest::Search(_)
        | OperationRequest::SearchScroll(_)
        | OperationRequest::MoreLikeThis(_) => OperationResponse::Search(search_response(2)),
        OperationRequest::Terms(_) => OperationResponse::Terms(TermsResponse::default()),
        OperationRequest::ClearRealmCache(_) => OperationResponse::ClearRealmCache(
            realm_cache_response(&[("nodeA", None)]),
        ),
    }
}

#[test]
fn test_search_future_and_listener_observe_identical_response() {
    let (gateway, _) = gateway_with(ScriptedTransport::answering(OperationResponse::Search(
        search_response(2),
    )));
    let request = Requests::search_request(["twitter"])
        .query(json!({ "term": { "user": "kimchy" } }))
        .build()
        .unwrap();

    let from_future = gateway.search(request.clone()).get().unwrap();

    let probe = ListenerProbe::<SearchResponse>::new();
    gateway.search_with(request, probe.listener());
    let from_listener = probe.recv_timeout(WAIT).expect("listener should fire").unwrap();

    assert_eq!(from_future.total_hits(), 2);
    assert_eq!(from_future, from_listener);
    // Exactly once
    assert_eq!(probe.recv_timeout(Duration::from_millis(100)), None);
}

#[test]
fn test_remote_failure_reaches_both_forms_unchanged() {
    let failure = GatewayError::remote(404, "index_not_found_exception");
    let (gateway, _) = gateway_with(ScriptedTransport::failing(failure.clone()));
    let request = Requests::get_request("missing").id("1").build().unwrap();

    assert_eq!(gateway.get(request.clone()).get(), Err(failure.clone()));

    let (tx, rx) = crossbeam::channel::bounded(1);
    gateway.get_with(
        request,
        listener_fn(
            |_: GetResponse| panic!("on_response must not be called"),
            move |error: GatewayError| tx.send(error).unwrap(),
        ),
    );
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), failure);
}

#[test]
fn test_clear_realm_cache_partial_failure_is_success() {
    let (gateway, _) = gateway_with(ScriptedTransport::answering(
        OperationResponse::ClearRealmCache(realm_cache_response(&[
            ("nodeA", None),
            ("nodeB", None),
            ("nodeC", Some("node not reachable")),
        ])),
    ));
    let request = Requests::clear_realm_cache_request()
        .realms(["ldap1"])
        .build()
        .unwrap();

    let response = gateway.admin().clear_realm_cache(request.clone()).get().unwrap();
    assert!(response.is_partial());
    assert_eq!(response.acknowledged().collect::<Vec<_>>(), ["nodeA", "nodeB"]);
    assert_eq!(
        response.failed().collect::<Vec<_>>(),
        [("nodeC", "node not reachable")]
    );

    let probe = ListenerProbe::<ClearRealmCacheResponse>::new();
    gateway.admin().clear_realm_cache_with(request, probe.listener());
    assert_eq!(probe.recv_timeout(WAIT), Some(Ok(response)));
}

#[test]
fn test_clear_realm_cache_total_failure_is_transport_fault() {
    let (gateway, _) = gateway_with(ScriptedTransport::answering(
        OperationResponse::ClearRealmCache(realm_cache_response(&[
            ("nodeA", Some("timeout")),
            ("nodeB", Some("timeout")),
            ("nodeC", Some("node not reachable")),
        ])),
    ));
    let request = Requests::clear_realm_cache_request().build().unwrap();

    let from_future = gateway.admin().clear_realm_cache(request.clone()).get();
    match &from_future {
        Err(GatewayError::Transport { reason }) => {
            assert!(reason.contains("all 3 nodes"));
            assert!(reason.contains("nodeC: node not reachable"));
        }
        other => panic!("Expected transport fault, got {other:?}"),
    }

    let (tx, rx) = crossbeam::channel::bounded(1);
    gateway.admin().clear_realm_cache_with(
        request,
        listener_fn(
            |_: ClearRealmCacheResponse| panic!("on_response must not be called"),
            move |error: GatewayError| tx.send(error).unwrap(),
        ),
    );
    assert_eq!(Err(rx.recv_timeout(WAIT).unwrap()), from_future);
}

#[test]
fn test_listener_registered_after_resolution_fires_once() {
    let (gateway, _) = gateway_with(ScriptedTransport::answering(OperationResponse::Count(
        count_response(11),
    )));
    let handle = gateway.count(Requests::count_request(["twitter"]).build().unwrap());
    let response = handle.get().unwrap();
    assert!(handle.is_done());

    let probe = ListenerProbe::<CountResponse>::new();
    handle.add_listener(probe.listener());

    assert_eq!(probe.recv_timeout(WAIT), Some(Ok(response)));
    assert_eq!(probe.recv_timeout(Duration::from_millis(100)), None);
}

#[test]
fn test_panicking_listener_does_not_affect_others() {
    let (gateway, observer) = gateway_with(
        ScriptedTransport::answering(OperationResponse::Count(count_response(1)))
            .with_latency(Duration::from_millis(50)),
    );
    let handle = gateway.count(Requests::count_request(["twitter"]).build().unwrap());

    let first = ListenerProbe::<CountResponse>::new();
    let last = ListenerProbe::<CountResponse>::new();
    handle.add_listener(first.listener());
    handle.add_listener(|_: GatewayResult<CountResponse>| panic!("listener bug"));
    handle.add_listener(last.listener());

    assert!(first.recv_timeout(WAIT).unwrap().is_ok());
    assert!(last.recv_timeout(WAIT).unwrap().is_ok());
    assert_eq!(handle.get().unwrap().count, 1);

    let faults = observer.wait_for_listener_faults(1, WAIT);
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].0, handle.operation_id());
    assert!(faults[0].1.contains("listener bug"));
}

#[test]
fn test_listener_may_block_on_another_handle() {
    let (gateway, _) = gateway_with(
        ScriptedTransport::answering(OperationResponse::Count(count_response(4)))
            .with_latency(Duration::from_millis(20)),
    );
    let request = Requests::count_request(["twitter"]).build().unwrap();

    let (tx, rx) = crossbeam::channel::bounded(1);
    let nested = gateway.clone();
    let nested_request = request.clone();
    gateway.count_with(request, move |outcome: GatewayResult<CountResponse>| {
        let first = outcome.unwrap().count;
        let second = nested.count(nested_request).get().unwrap().count;
        tx.send(first + second).unwrap();
    });

    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 8);
}

#[test]
fn test_every_operation_routes_with_its_kind() {
    let transport = Arc::new(ScriptedTransport::new(|descriptor| {
        Ok(answer_by_kind(descriptor.request()))
    }));
    let (gateway, _) = gateway_with(transport.clone());

    gateway
        .index(
            Requests::index_request("twitter")
                .source(json!({ "user": "kimchy" }))
                .build()
                .unwrap(),
        )
        .get()
        .unwrap();
    gateway
        .delete(Requests::delete_request("twitter").id("1").build().unwrap())
        .get()
        .unwrap();
    gateway
        .delete_by_query(
            Requests::delete_by_query_request(["twitter"])
                .query(json!({ "match_all": {} }))
                .build()
                .unwrap(),
        )
        .get()
        .unwrap();
    let document = gateway
        .get(Requests::get_request("twitter").id("1").build().unwrap())
        .get()
        .unwrap();
    assert!(!document.exists);
    gateway
        .count(Requests::count_request(["twitter"]).build().unwrap())
        .get()
        .unwrap();
    gateway
        .search(Requests::search_request(["twitter"]).build().unwrap())
        .get()
        .unwrap();
    gateway
        .search_scroll(Requests::search_scroll_request("c2Nhbjs2").build().unwrap())
        .get()
        .unwrap();
    gateway
        .terms(
            Requests::terms_request(["twitter"])
                .fields(["user"])
                .build()
                .unwrap(),
        )
        .get()
        .unwrap();
    gateway
        .more_like_this(
            Requests::more_like_this_request("twitter")
                .id("1")
                .build()
                .unwrap(),
        )
        .get()
        .unwrap();
    gateway
        .admin()
        .clear_realm_cache(Requests::clear_realm_cache_request().build().unwrap())
        .get()
        .unwrap();

    assert_eq!(transport.seen_kinds(), OperationKind::ALL.to_vec());
    assert_eq!(gateway.stats().succeeded, OperationKind::ALL.len() as u64);
}

#[test]
fn test_mismatched_transport_response_is_dispatch_fault() {
    let (gateway, observer) = gateway_with(ScriptedTransport::answering(
        OperationResponse::Count(count_response(1)),
    ));
    let handle = gateway.search(Requests::search_request(["twitter"]).build().unwrap());

    assert!(matches!(handle.get(), Err(GatewayError::Dispatch { .. })));
    assert_eq!(observer.dispatch_faults().len(), 1);
}

#[test]
fn test_timed_get_leaves_operation_pending() {
    let transport = Arc::new(StalledTransport::default());
    let (gateway, _) = gateway_with(transport.clone());
    let handle = gateway.count(Requests::count_request(["twitter"]).build().unwrap());

    let err = handle.get_timeout(Duration::from_millis(20)).unwrap_err();
    assert!(matches!(err, GatewayError::Timeout { .. }));
    assert!(!handle.is_done());
    assert_eq!(gateway.pending_metrics().pending_count, 1);

    assert!(handle.cancel());
    assert_eq!(
        handle.get(),
        Err(GatewayError::Cancelled {
            operation_id: handle.operation_id()
        })
    );
    assert_eq!(transport.cancelled(), vec![handle.operation_id()]);
}

#[test]
fn test_callback_transport_completes_from_another_thread() {
    let transport = ManualTransport::new();
    let (gateway, _) = gateway_with(CallbackTransportAdapter::new(transport.clone()));
    let handle = gateway.count(Requests::count_request(["twitter"]).build().unwrap());

    let operation_id = transport.next_operation(WAIT).expect("transport should be called");
    assert_eq!(operation_id, handle.operation_id());

    let completer = transport.clone();
    std::thread::spawn(move || {
        completer.complete(operation_id, Ok(OperationResponse::Count(count_response(5))));
    });

    assert_eq!(handle.get().unwrap().count, 5);
}

#[test]
fn test_abandoned_callback_is_transport_fault() {
    let transport = ManualTransport::new();
    let (gateway, _) = gateway_with(CallbackTransportAdapter::new(transport.clone()));
    let handle = gateway.count(Requests::count_request(["twitter"]).build().unwrap());

    let operation_id = transport.next_operation(WAIT).unwrap();
    assert!(transport.abandon(operation_id));

    match handle.get() {
        Err(GatewayError::Transport { reason }) => {
            assert!(reason.contains("dropped the completion callback"));
        }
        other => panic!("Expected transport fault, got {other:?}"),
    }
}

#[test]
fn test_completion_after_cancel_is_discarded() {
    let transport = ManualTransport::new();
    let (gateway, _) = gateway_with(CallbackTransportAdapter::new(transport.clone()));
    let probe = ListenerProbe::<CountResponse>::new();
    let handle = gateway.execute_with(
        Requests::count_request(["twitter"]).build().unwrap(),
        probe.listener(),
    );

    let operation_id = transport.next_operation(WAIT).unwrap();
    assert_eq!(operation_id, handle.operation_id());
    assert!(handle.cancel());
    assert_eq!(transport.cancelled(), vec![operation_id]);

    transport.complete(operation_id, Ok(OperationResponse::Count(count_response(5))));

    assert_eq!(
        probe.recv_timeout(WAIT),
        Some(Err(GatewayError::Cancelled { operation_id }))
    );
    assert_eq!(probe.recv_timeout(Duration::from_millis(100)), None);
}

#[test]
fn test_in_flight_limit_rejects_through_listener() {
    let (gateway, _) = gateway_with_config(
        StalledTransport::default(),
        DispatcherConfig::default().with_max_in_flight(2),
    );
    let request = Requests::count_request(["twitter"]).build().unwrap();

    let held = [gateway.count(request.clone()), gateway.count(request.clone())];
    let probe = ListenerProbe::<CountResponse>::new();
    gateway.count_with(request, probe.listener());

    assert_eq!(
        probe.recv_timeout(WAIT),
        Some(Err(GatewayError::Rejected {
            in_flight: 2,
            limit: 2
        }))
    );
    assert!(held.iter().all(|handle| !handle.is_done()));
}

#[test]
fn test_dropping_gateway_resolves_pending_operations_as_closed() {
    let (gateway, _) = gateway_with(StalledTransport::default());
    let request = Requests::count_request(["twitter"]).build().unwrap();
    let handle = gateway.count(request.clone());

    let resolved = Arc::new(AtomicUsize::new(0));
    let counter = resolved.clone();
    gateway.count_with(request, move |outcome: GatewayResult<CountResponse>| {
        assert_eq!(outcome.unwrap_err(), GatewayError::Closed);
        counter.fetch_add(1, Ordering::SeqCst);
    });

    drop(gateway);

    assert_eq!(handle.get(), Err(GatewayError::Closed));
    assert_eq!(resolved.load(Ordering::SeqCst), 1);
}
