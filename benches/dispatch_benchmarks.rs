//! Dispatch Path Benchmarks
//!
//! Round-trip cost of the future and listener forms against an in-process
//! transport, plus request building and serialization.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;

use cluster_gateway::action::{CountResponse, Requests};
use cluster_gateway::test_helpers::{count_response, search_response, ListenerProbe, ScriptedTransport};
use cluster_gateway::{Gateway, OperationResponse};

fn count_gateway() -> Gateway {
    let transport = Arc::new(ScriptedTransport::answering(OperationResponse::Count(
        count_response(42),
    )));
    Gateway::builder()
        .transport(transport)
        .build()
        .expect("benchmark gateway")
}

/// Benchmark a blocking future-form round trip
fn benchmark_future_round_trip(c: &mut Criterion) {
    let gateway = count_gateway();
    let request = Requests::count_request(["twitter"]).build().unwrap();

    c.bench_function("future_round_trip", |b| {
        b.iter(|| black_box(gateway.count(request.clone()).get().unwrap()));
    });
}

/// Benchmark a listener-form round trip
fn benchmark_listener_round_trip(c: &mut Criterion) {
    let gateway = count_gateway();
    let request = Requests::count_request(["twitter"]).build().unwrap();
    let probe = ListenerProbe::<CountResponse>::new();

    c.bench_function("listener_round_trip", |b| {
        b.iter(|| {
            gateway.count_with(request.clone(), probe.listener());
            black_box(probe.recv_timeout(Duration::from_secs(5)))
        });
    });
}

/// Benchmark many operations outstanding at once
fn benchmark_concurrent_submissions(c: &mut Criterion) {
    let gateway = count_gateway();
    let request = Requests::count_request(["twitter"]).build().unwrap();
    let mut group = c.benchmark_group("concurrent_submissions");

    for batch in [10, 100, 500].iter() {
        group.bench_with_input(BenchmarkId::new("batch", batch), batch, |b, &batch| {
            b.iter(|| {
                let handles: Vec<_> = (0..batch).map(|_| gateway.count(request.clone())).collect();
                for handle in handles {
                    black_box(handle.get().unwrap());
                }
            });
        });
    }

    group.finish();
}

/// Benchmark building and serializing a search request and response
fn benchmark_search_payloads(c: &mut Criterion) {
    c.bench_function("search_request_build", |b| {
        b.iter(|| {
            Requests::search_request(["twitter", "facebook"])
                .query(serde_json::json!({"term": {"user": "kimchy"}}))
                .from(black_box(20))
                .size(black_box(10))
                .build()
                .unwrap()
        });
    });

    let response = search_response(10);
    c.bench_function("search_response_serialization", |b| {
        b.iter(|| serde_json::to_string(&response).unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_future_round_trip,
    benchmark_listener_round_trip,
    benchmark_concurrent_submissions,
    benchmark_search_payloads
);
criterion_main!(benches);
