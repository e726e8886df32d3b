//! # Watch Loop
//!
//! Runs a `kube-runtime` controller for one record kind and restarts it
//! whenever the watch stream ends, until shutdown is requested.

use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::reconciler::{Reconcilable, ReconcileError, ReconcileOutcome, Reconciler};
use crate::crd::ManagedRecord;
use crate::observability::events::{actions, EventPublisher};
use crate::observability::metrics;
use crate::runtime::error_policy::handle_reconciliation_error;
use crate::runtime::shutdown::{wait_before_restart, Shutdown};
use crate::server::ServerState;
use futures::StreamExt;
use kube::api::Api;
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
use kube_runtime::{controller::Action, watcher, Controller};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// State shared by every reconcile and error policy call of one controller
pub struct RuntimeContext {
    pub reconciler: Arc<Reconciler>,
    pub config: ControllerConfig,
    pub events: Arc<dyn EventPublisher>,
    /// Per-record backoff, keyed by `kind/namespace/name`
    pub backoff_states: Mutex<HashMap<String, FibonacciBackoff>>,
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("reconciler", &self.reconciler)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RuntimeContext {
    #[must_use]
    pub fn new(
        reconciler: Arc<Reconciler>,
        config: ControllerConfig,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            reconciler,
            config,
            events,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Next delay in the record's backoff sequence, in seconds
    pub(crate) fn next_backoff(&self, key: &str) -> u64 {
        match self.backoff_states.lock() {
            Ok(mut states) => states
                .entry(key.to_string())
                .or_insert_with(|| {
                    FibonacciBackoff::new(self.config.backoff_min_secs, self.config.backoff_max_secs)
                })
                .next_backoff_seconds(),
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using maximum backoff", e);
                self.config.backoff_max_secs
            }
        }
    }

    pub(crate) fn reset_backoff(&self, key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(key);
        }
    }
}

/// Run the controller for kind `K` until `shutdown` resolves.
///
/// Watches one namespace when `watch_namespace` is configured, otherwise
/// every namespace. In-flight reconciles finish before the loop returns.
///
/// # Errors
///
/// Currently infallible; the signature leaves room for startup checks.
pub async fn run_watch_loop<K: Reconcilable>(
    client: Client,
    ctx: Arc<RuntimeContext>,
    server_state: Arc<ServerState>,
    shutdown: Shutdown,
) -> Result<(), anyhow::Error> {
    let api: Api<K> = match &ctx.config.watch_namespace {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::all(client),
    };

    loop {
        if !server_state.is_ready.load(Ordering::Relaxed) {
            info!(kind = K::KIND, "Shutdown requested, exiting watch loop");
            break;
        }

        info!(kind = K::KIND, "Starting controller watch loop...");
        Controller::new(api.clone(), watcher::Config::default().any_semantic())
            .graceful_shutdown_on(shutdown.clone())
            .run(reconcile::<K>, handle_reconciliation_error::<K>, Arc::clone(&ctx))
            .for_each(|result| async move {
                match result {
                    Ok((obj, action)) => {
                        debug!(resource = %obj.name, action = ?action, "watch.event.reconciled");
                    }
                    Err(e) => warn!(kind = K::KIND, error = %e, "Controller stream error"),
                }
            })
            .await;

        if !server_state.is_ready.load(Ordering::Relaxed) {
            info!(kind = K::KIND, "Shutdown requested, exiting watch loop");
            break;
        }

        let delay = ctx.config.watch_restart_delay();
        warn!(
            kind = K::KIND,
            "Controller watch stream ended, restarting in {} seconds...",
            delay.as_secs()
        );
        if !wait_before_restart(delay, shutdown.clone()).await {
            info!(kind = K::KIND, "Shutdown requested, exiting watch loop");
            break;
        }
    }

    info!(kind = K::KIND, "Controller stopped gracefully");
    Ok(())
}

/// Reconcile entry point handed to `kube-runtime`
pub async fn reconcile<K: Reconcilable>(
    obj: Arc<K>,
    ctx: Arc<RuntimeContext>,
) -> Result<Action, ReconcileError> {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();
    let span = info_span!(
        "controller.reconcile",
        resource.kind = K::KIND,
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
    );

    async move {
        metrics::increment_reconciliations(K::KIND);
        let started = Instant::now();
        let result = ctx.reconciler.reconcile::<K>(&namespace, &name).await;
        metrics::observe_reconciliation_duration(K::KIND, started.elapsed().as_secs_f64());

        match result {
            Ok(outcome) => {
                ctx.reset_backoff(&obj.record_key());
                Ok(action_for(outcome, &ctx.config))
            }
            Err(err) => {
                error!(error = %err, reason = err.reason(), "Reconciliation failed");
                metrics::increment_reconciliation_errors(K::KIND, err.reason());
                let action = if obj.deletion_requested() {
                    actions::DELETE
                } else {
                    actions::RECONCILE
                };
                ctx.events
                    .publish(
                        &obj.object_ref(&()),
                        EventType::Warning,
                        err.reason(),
                        action,
                        Some(err.to_string()),
                    )
                    .await;
                Err(err)
            }
        }
    }
    .instrument(span)
    .await
}

pub(crate) fn action_for(outcome: ReconcileOutcome, config: &ControllerConfig) -> Action {
    match outcome {
        ReconcileOutcome::Done => Action::await_change(),
        ReconcileOutcome::RequeueAfter(delay) => {
            metrics::increment_requeues_total("secret-unresolved");
            Action::requeue(delay)
        }
        ReconcileOutcome::RequeueImmediate => {
            metrics::increment_requeues_total("next-step");
            Action::requeue(config.immediate_requeue())
        }
    }
}
