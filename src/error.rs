//! # Gateway Error Types
//!
//! Classified failures observed through a completion handle or a listener,
//! plus the build-time validation error raised by request builders.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Gateway operation result type
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Post-submission failure of an operation.
///
/// Every variant is delivered through the same channel as a successful
/// response: raised from `CompletionHandle::get()` and passed to
/// `ActionListener::on_failure`. The value is cloneable so all observers of
/// one operation see an identical error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Transport failure: {reason}")]
    Transport { reason: String },

    #[error("Remote failure: {status} - {reason}")]
    Remote { status: u16, reason: String },

    #[error("Dispatch failure: {reason}")]
    Dispatch { reason: String },

    #[error("Operation {operation_id} was cancelled")]
    Cancelled { operation_id: Uuid },

    #[error("Timed out after {waited_ms}ms waiting for operation {operation_id}")]
    Timeout { operation_id: Uuid, waited_ms: u64 },

    #[error("Operation rejected: {in_flight} operations in flight (limit {limit})")]
    Rejected { in_flight: usize, limit: usize },

    #[error("Gateway is closed")]
    Closed,
}

impl GatewayError {
    /// Create a transport (connectivity) failure
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Create a failure reported by the cluster itself
    pub fn remote(status: u16, reason: impl Into<String>) -> Self {
        Self::Remote {
            status,
            reason: reason.into(),
        }
    }

    /// Create an internal dispatch failure
    pub fn dispatch(reason: impl Into<String>) -> Self {
        Self::Dispatch {
            reason: reason.into(),
        }
    }

    /// Check if the failure is worth retrying with a fresh submission
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport { .. } => true,
            GatewayError::Rejected { .. } => true,
            GatewayError::Timeout { .. } => true,
            GatewayError::Remote { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// True for the caller-initiated cancellation outcome
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Cancelled { .. })
    }

    /// Short label used in structured logs
    pub fn label(&self) -> &'static str {
        match self {
            GatewayError::Transport { .. } => "transport",
            GatewayError::Remote { .. } => "remote",
            GatewayError::Dispatch { .. } => "dispatch",
            GatewayError::Cancelled { .. } => "cancelled",
            GatewayError::Timeout { .. } => "timeout",
            GatewayError::Rejected { .. } => "rejected",
            GatewayError::Closed => "closed",
        }
    }
}

/// Malformed request parameters found while building a request.
///
/// Collects every problem rather than stopping at the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
pub struct ValidationError {
    errors: Vec<String>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: ")?;
        for (i, error) in self.errors.iter().enumerate() {
            write!(f, "{}: {error};", i + 1)?;
        }
        Ok(())
    }
}

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to start dispatch runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("No transport configured")]
    MissingTransport,
}

impl ConfigurationError {
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
