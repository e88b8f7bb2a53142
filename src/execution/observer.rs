//! Fault observation for failures that cannot be delivered to a caller.
//!
//! A panicking listener has nobody left to report to, and internal dispatch
//! faults are worth surfacing beyond the handle that received them. Both go
//! to a [`FaultObserver`]. Observer methods are called from dispatcher and
//! blocking-pool threads and must return promptly.

use std::fmt::Debug;

use uuid::Uuid;

use super::descriptor::OperationKind;
use crate::error::GatewayError;
use crate::logging::log_error;

pub trait FaultObserver: Send + Sync + Debug {
    /// A listener panicked while handling the outcome of `operation_id`
    fn listener_fault(&self, operation_id: Uuid, kind: OperationKind, message: &str);

    /// An operation resolved with an internal dispatch fault
    fn dispatch_fault(&self, operation_id: Uuid, kind: OperationKind, error: &GatewayError);
}

/// Default observer: structured error logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl FaultObserver for TracingObserver {
    fn listener_fault(&self, operation_id: Uuid, kind: OperationKind, message: &str) {
        log_error(
            "listener",
            kind.as_str(),
            message,
            Some(&format!("operation_id={operation_id}")),
        );
    }

    fn dispatch_fault(&self, operation_id: Uuid, kind: OperationKind, error: &GatewayError) {
        log_error(
            "dispatcher",
            kind.as_str(),
            &error.to_string(),
            Some(&format!("operation_id={operation_id}")),
        );
    }
}
