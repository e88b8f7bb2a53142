//! # Gateway Configuration
//!
//! Layered configuration: built-in defaults, then an optional file, then
//! environment variables.
//!
//! ```rust,no_run
//! use cluster_gateway::config::GatewayConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // GATEWAY__DISPATCHER__MAX_IN_FLIGHT=64 overrides the file and defaults
//! let config = GatewayConfig::load()?;
//! println!("cluster: {}", config.cluster_name);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigurationError;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "GATEWAY";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG";

/// Root gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Name of the cluster this gateway talks to
    pub cluster_name: String,
    /// Seed node addresses handed to the transport
    pub nodes: Vec<String>,
    /// Dispatcher tuning
    pub dispatcher: DispatcherConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            cluster_name: "default".to_string(),
            nodes: vec!["127.0.0.1:9300".to_string()],
            dispatcher: DispatcherConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum operations in flight at once; 0 means unbounded
    pub max_in_flight: usize,
    /// Worker threads for a gateway-owned runtime
    pub worker_threads: usize,
    /// Pending operations older than this are reported as aging
    pub aging_warning_threshold_ms: u64,
    /// Listener invocations slower than this are logged
    pub slow_listener_threshold_ms: u64,
    /// Upper bound on waiting for an owned runtime to stop
    pub shutdown_timeout_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 0,
            worker_threads: 4,
            aging_warning_threshold_ms: 30_000,
            slow_listener_threshold_ms: 1_000,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl DispatcherConfig {
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    pub fn with_aging_warning_threshold_ms(mut self, threshold_ms: u64) -> Self {
        self.aging_warning_threshold_ms = threshold_ms;
        self
    }

    pub fn with_slow_listener_threshold_ms(mut self, threshold_ms: u64) -> Self {
        self.slow_listener_threshold_ms = threshold_ms;
        self
    }

    pub fn with_shutdown_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.shutdown_timeout_ms = timeout_ms;
        self
    }

    pub fn aging_warning_threshold(&self) -> Duration {
        Duration::from_millis(self.aging_warning_threshold_ms)
    }

    pub fn slow_listener_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_listener_threshold_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive; falls back to an environment-derived level when empty
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl GatewayConfig {
    /// Load defaults, then `config/gateway.*` or `$GATEWAY_CONFIG`, then
    /// `GATEWAY__*` environment variables.
    pub fn load() -> Result<Self, ConfigurationError> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_from_sources(explicit.as_deref(), ENV_PREFIX)
    }

    /// Load a single explicit file over the defaults, without environment overrides
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let config: Self = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load with an explicit file (or the default search path) and env prefix
    pub fn load_from_sources(
        file: Option<&Path>,
        env_prefix: &str,
    ) -> Result<Self, ConfigurationError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        builder = match file {
            Some(path) => {
                debug!("Loading gateway config from: {}", path.display());
                builder.add_source(config::File::from(path))
            }
            None => builder.add_source(config::File::with_name("config/gateway").required(false)),
        };

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("nodes")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        debug!("Loaded gateway configuration: {:?}", config);
        Ok(config)
    }

    /// Reject values the gateway cannot run with
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.cluster_name.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "cluster_name",
                "must not be empty",
            ));
        }
        if self.dispatcher.worker_threads == 0 {
            return Err(ConfigurationError::invalid_value(
                "dispatcher.worker_threads",
                "must be at least 1",
            ));
        }
        if self.dispatcher.shutdown_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "dispatcher.shutdown_timeout_ms",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}
