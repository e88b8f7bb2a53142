#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Cluster Gateway
//!
//! Client-side gateway for issuing document, search and administrative
//! operations against a remote search cluster.
//!
//! ## Overview
//!
//! Every operation can be consumed in two ways:
//!
//! - **Future style**: the call returns a [`CompletionHandle`] that can be
//!   blocked on (`get`, `get_timeout`), polled (`is_done`, `try_get`),
//!   awaited (`wait`) or cancelled.
//! - **Listener style**: the call takes an [`ActionListener`] and returns
//!   nothing; the listener is notified exactly once, asynchronously.
//!
//! Both styles share one dispatch path, so they observe identical outcomes.
//! The wire protocol is behind the [`Transport`] trait.
//!
//! ## Module Organization
//!
//! - [`action`] - Request and response types with validating builders
//! - [`execution`] - Descriptors, completion handles, listeners, dispatcher
//! - [`client`] - The [`Gateway`] and its admin sub-gateway
//! - [`config`] - Configuration loading
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cluster_gateway::{Gateway, GatewayConfig, Requests};
//!
//! let gateway = Gateway::builder()
//!     .config(GatewayConfig::load()?)
//!     .transport(my_transport)
//!     .build()?;
//!
//! let request = Requests::get_request("twitter").id("1").build()?;
//! let document = gateway.get(request).get()?;
//!
//! let request = Requests::search_request(["twitter"]).size(20).build()?;
//! gateway.search_with(request, |outcome| {
//!     if let Ok(response) = outcome {
//!         println!("{} hits", response.total_hits());
//!     }
//! });
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! ```

pub mod action;
pub mod client;
pub mod config;
pub mod error;
pub mod execution;
pub mod logging;
pub mod test_helpers;

pub use action::{Requests, ShardFailure, ShardStats};
pub use client::{AdminGateway, Gateway, GatewayBuilder};
pub use config::{DispatcherConfig, GatewayConfig, LoggingConfig};
pub use error::{ConfigurationError, GatewayError, GatewayResult, ValidationError};
pub use execution::{
    listener_fn, ActionListener, CallbackTransport, CallbackTransportAdapter, CancelToken,
    CompletionCallback, CompletionHandle, Dispatcher, DispatcherStats, FaultObserver,
    GatewayAction, OperationDescriptor, OperationKind, OperationRequest, OperationResponse,
    PendingMetrics, Transport,
};
pub use logging::init_structured_logging;
