#![allow(dead_code)]

pub mod strategies;

use std::sync::Arc;

use cluster_gateway::test_helpers::RecordingObserver;
use cluster_gateway::{DispatcherConfig, Gateway, GatewayConfig, Transport};

pub use strategies::*;

/// Gateway on its own runtime, reporting faults into the returned observer
pub fn gateway_with<T: Transport + 'static>(transport: T) -> (Gateway, Arc<RecordingObserver>) {
    gateway_with_config(transport, DispatcherConfig::default())
}

pub fn gateway_with_config<T: Transport + 'static>(
    transport: T,
    dispatcher: DispatcherConfig,
) -> (Gateway, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::default());
    let config = GatewayConfig {
        cluster_name: "test-cluster".to_string(),
        dispatcher: dispatcher.with_worker_threads(2),
        ..GatewayConfig::default()
    };

    let gateway = Gateway::builder()
        .config(config)
        .transport(transport)
        .observer(observer.clone())
        .build()
        .expect("gateway should build");

    (gateway, observer)
}
