//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_CONFLICT_REQUEUE_MS,
    DEFAULT_IMMEDIATE_REQUEUE_MS, DEFAULT_METRICS_PORT, DEFAULT_SECRET_REQUEUE_SECS,
    DEFAULT_THROTTLE_BACKOFF_SECS, DEFAULT_WATCH_RESTART_DELAY_SECS,
};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Controller-level configuration
///
/// All settings have defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Wait before retrying when the credential secret is missing (seconds)
    pub secret_requeue_secs: u64,
    /// Wait between instance provisioning steps (milliseconds)
    pub immediate_requeue_ms: u64,
    /// Wait before retrying after a write conflict (milliseconds)
    pub conflict_requeue_ms: u64,
    /// Fibonacci backoff floor for failed reconciles (seconds)
    pub backoff_min_secs: u64,
    /// Fibonacci backoff ceiling for failed reconciles (seconds)
    pub backoff_max_secs: u64,
    /// Retry floor when EC2 answered with a throttling error (seconds)
    pub throttle_backoff_secs: u64,
    /// Watch stream restart delay (seconds)
    pub watch_restart_delay_secs: u64,
    /// Only watch this namespace; all namespaces when `None`
    pub watch_namespace: Option<String>,
    pub metrics_port: u16,
    /// EC2 endpoint override, e.g. a local emulator
    pub ec2_endpoint_url: Option<String>,
    pub log_format: LogFormat,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            secret_requeue_secs: DEFAULT_SECRET_REQUEUE_SECS,
            immediate_requeue_ms: DEFAULT_IMMEDIATE_REQUEUE_MS,
            conflict_requeue_ms: DEFAULT_CONFLICT_REQUEUE_MS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            throttle_backoff_secs: DEFAULT_THROTTLE_BACKOFF_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_namespace: None,
            metrics_port: DEFAULT_METRICS_PORT,
            ec2_endpoint_url: None,
            log_format: LogFormat::Text,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup, e.g. a map in tests
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = &lookup;
        Self {
            secret_requeue_secs: var_or_default(
                lookup,
                "SECRET_REQUEUE_SECS",
                DEFAULT_SECRET_REQUEUE_SECS,
            ),
            immediate_requeue_ms: var_or_default(
                lookup,
                "IMMEDIATE_REQUEUE_MS",
                DEFAULT_IMMEDIATE_REQUEUE_MS,
            ),
            conflict_requeue_ms: var_or_default(
                lookup,
                "CONFLICT_REQUEUE_MS",
                DEFAULT_CONFLICT_REQUEUE_MS,
            ),
            backoff_min_secs: var_or_default(lookup, "BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS),
            backoff_max_secs: var_or_default(lookup, "BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            throttle_backoff_secs: var_or_default(
                lookup,
                "THROTTLE_BACKOFF_SECS",
                DEFAULT_THROTTLE_BACKOFF_SECS,
            ),
            watch_restart_delay_secs: var_or_default(
                lookup,
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            watch_namespace: var_non_empty(lookup, "WATCH_NAMESPACE"),
            metrics_port: var_or_default(lookup, "METRICS_PORT", DEFAULT_METRICS_PORT),
            ec2_endpoint_url: var_non_empty(lookup, "AWS_EC2_ENDPOINT_URL"),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn secret_requeue(&self) -> Duration {
        Duration::from_secs(self.secret_requeue_secs)
    }

    #[must_use]
    pub fn immediate_requeue(&self) -> Duration {
        Duration::from_millis(self.immediate_requeue_ms)
    }

    #[must_use]
    pub fn conflict_requeue(&self) -> Duration {
        Duration::from_millis(self.conflict_requeue_ms)
    }

    #[must_use]
    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}

/// Read a variable, falling back to `default` when unset or unparsable
fn var_or_default<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn var_non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
