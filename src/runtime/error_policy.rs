//! # Error Policy
//!
//! Decides when a record whose reconcile failed is tried again.
//!
//! - Invalid credentials and validation failures wait for the record to change
//! - Write conflicts retry after a short fixed delay
//! - Everything else backs off per record along a Fibonacci sequence,
//!   never below `THROTTLE_BACKOFF_SECS` when EC2 throttled the call

use crate::controller::reconciler::{Reconcilable, ReconcileError};
use crate::crd::ManagedRecord;
use crate::observability::metrics;
use crate::runtime::watch_loop::RuntimeContext;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Error policy handed to `kube-runtime`
pub fn handle_reconciliation_error<K: Reconcilable>(
    obj: Arc<K>,
    error: &ReconcileError,
    ctx: Arc<RuntimeContext>,
) -> Action {
    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.reconciliation_error",
        resource.kind = K::KIND,
        resource.name = obj.name_any().as_str(),
        resource.namespace = obj.namespace().unwrap_or_default().as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    retry_action(&obj.record_key(), error, &ctx)
}

pub(crate) fn retry_action(key: &str, error: &ReconcileError, ctx: &RuntimeContext) -> Action {
    if !error.is_retryable() {
        warn!(
            reason = error.reason(),
            "Not retrying until the record or its secret changes"
        );
        return Action::await_change();
    }

    if matches!(error, ReconcileError::PersistConflict) {
        metrics::increment_requeues_total("conflict");
        return Action::requeue(ctx.config.conflict_requeue());
    }

    let mut backoff_seconds = ctx.next_backoff(key);
    if error.is_throttled() {
        backoff_seconds = backoff_seconds.max(ctx.config.throttle_backoff_secs);
        warn!(
            floor_secs = ctx.config.throttle_backoff_secs,
            "EC2 throttled the request"
        );
    }
    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::seconds(i64::try_from(backoff_seconds).unwrap_or(i64::MAX));
    info!(
        "Retrying with Fibonacci backoff: {}s, next attempt at {}",
        backoff_seconds,
        next_trigger_time.to_rfc3339()
    );

    metrics::increment_requeues_total(if error.is_throttled() {
        "throttled"
    } else {
        "error-backoff"
    });
    Action::requeue(Duration::from_secs(backoff_seconds))
}
