//! # Constants
//!
//! Default values for controller configuration.

/// Field manager recorded on every write the operator makes
pub const FIELD_MANAGER: &str = "ec2-operator";

/// Reporting component on published events
pub const CONTROLLER_NAME: &str = "ec2-operator";

/// Delay before retrying a record whose credential secret is missing (seconds)
pub const DEFAULT_SECRET_REQUEUE_SECS: u64 = 30;

/// Delay between provisioning steps of one instance (milliseconds)
pub const DEFAULT_IMMEDIATE_REQUEUE_MS: u64 = 1000;

/// Delay before retrying after a resourceVersion conflict (milliseconds)
pub const DEFAULT_CONFLICT_REQUEUE_MS: u64 = 500;

/// Fibonacci backoff bounds for failed reconciles (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Minimum retry delay after EC2 throttled a call (seconds)
pub const DEFAULT_THROTTLE_BACKOFF_SECS: u64 = 30;

/// Wait before restarting a watch stream that ended or failed (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Port for /metrics, /healthz and /readyz
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// `EnvFilter` directive when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "ec2_operator=info";
