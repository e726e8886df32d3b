//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `ec2_operator_reconciliations_total{kind}` - Reconciles started
//! - `ec2_operator_reconciliation_errors_total{kind,reason}` - Reconciles that returned an error
//! - `ec2_operator_reconciliation_duration_seconds{kind}` - Reconcile latency
//! - `ec2_operator_provider_calls_total{operation}` - EC2 API calls made
//! - `ec2_operator_provider_errors_total{operation}` - EC2 API calls that failed
//! - `ec2_operator_requeues_total{reason}` - Requeues by cause

use anyhow::Result;
use prometheus::core::Collector;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("ec2_operator_reconciliations_total", "Total number of reconciliations"),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ec2_operator_reconciliation_errors_total",
            "Total number of reconciliation errors",
        ),
        &["kind", "reason"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "ec2_operator_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static PROVIDER_CALLS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("ec2_operator_provider_calls_total", "Total number of EC2 API calls"),
        &["operation"],
    )
    .expect("Failed to create PROVIDER_CALLS_TOTAL metric - this should never happen")
});

static PROVIDER_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ec2_operator_provider_errors_total",
            "Total number of failed EC2 API calls",
        ),
        &["operation"],
    )
    .expect("Failed to create PROVIDER_ERRORS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("ec2_operator_requeues_total", "Total number of requeues by reason"),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

fn register(collector: Box<dyn Collector>) -> prometheus::Result<()> {
    match REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Register every metric with the shared registry. Safe to call more than once.
#[allow(
    clippy::missing_errors_doc,
    reason = "Only fails on conflicting metric descriptors"
)]
pub fn register_metrics() -> Result<()> {
    register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    register(Box::new(RECONCILIATION_DURATION.clone()))?;
    register(Box::new(PROVIDER_CALLS_TOTAL.clone()))?;
    register(Box::new(PROVIDER_ERRORS_TOTAL.clone()))?;
    register(Box::new(REQUEUES_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str, reason: &str) {
    RECONCILIATION_ERRORS_TOTAL
        .with_label_values(&[kind, reason])
        .inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_provider_calls(operation: &str) {
    PROVIDER_CALLS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn increment_provider_errors(operation: &str) {
    PROVIDER_ERRORS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

#[cfg(test)]
pub(crate) fn requeues_total(reason: &str) -> u64 {
    REQUEUES_TOTAL.with_label_values(&[reason]).get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_twice() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_increment_reconciliations() {
        let before = RECONCILIATIONS_TOTAL.with_label_values(&["Instance"]).get();
        increment_reconciliations("Instance");
        let after = RECONCILIATIONS_TOTAL.with_label_values(&["Instance"]).get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_errors_are_labelled_by_reason() {
        let before = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["ImportKeyPair", "TeardownFailure"])
            .get();
        increment_reconciliation_errors("ImportKeyPair", "TeardownFailure");
        let after = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["ImportKeyPair", "TeardownFailure"])
            .get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_provider_calls_and_errors() {
        let calls = PROVIDER_CALLS_TOTAL.with_label_values(&["CreateTags"]).get();
        let errors = PROVIDER_ERRORS_TOTAL.with_label_values(&["CreateTags"]).get();
        increment_provider_calls("CreateTags");
        increment_provider_errors("CreateTags");
        assert_eq!(
            PROVIDER_CALLS_TOTAL.with_label_values(&["CreateTags"]).get(),
            calls + 1
        );
        assert_eq!(
            PROVIDER_ERRORS_TOTAL.with_label_values(&["CreateTags"]).get(),
            errors + 1
        );
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        let before = RECONCILIATION_DURATION
            .with_label_values(&["Instance"])
            .get_sample_count();
        observe_reconciliation_duration("Instance", 0.25);
        let after = RECONCILIATION_DURATION
            .with_label_values(&["Instance"])
            .get_sample_count();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_gathered_names_are_prefixed() {
        register_metrics().unwrap();
        increment_requeues_total("secret-unresolved");
        let names: Vec<String> = REGISTRY
            .gather()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert!(names.iter().all(|n| n.starts_with("ec2_operator_")));
        assert!(names.contains(&"ec2_operator_requeues_total".to_string()));
    }
}
