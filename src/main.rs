//! # EC2 Operator
//!
//! Entry point: sets up logging, the metrics server and one watch loop per
//! record kind, then runs until SIGINT/SIGTERM.

use anyhow::{Context, Result};
use ec2_operator::config::{ControllerConfig, LogFormat};
use ec2_operator::constants::{CONTROLLER_NAME, DEFAULT_LOG_FILTER};
use ec2_operator::controller::reconciler::Reconciler;
use ec2_operator::crd::{ImportKeyPair, Instance};
use ec2_operator::observability::events::KubeEventPublisher;
use ec2_operator::observability::metrics;
use ec2_operator::provider::aws::Ec2ClientFactory;
use ec2_operator::runtime::{run_watch_loop, shutdown_on_signal, RuntimeContext};
use ec2_operator::server::{start_server, ServerState};
use ec2_operator::store::{KubeRecordStore, KubeSecretStore};
use kube::Client;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // kube and the AWS SDK both need a process-wide rustls provider
    if rustls::crypto::CryptoProvider::install_default(rustls::crypto::ring::default_provider())
        .is_err()
    {
        eprintln!("rustls crypto provider already installed");
    }

    let config = ControllerConfig::from_env();
    init_tracing(config.log_format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        build_datetime = env!("BUILD_DATETIME"),
        git_hash = env!("BUILD_GIT_HASH"),
        "Starting EC2 operator"
    );
    info!(config = ?config, "Loaded controller configuration");

    metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_port = config.metrics_port;
    let server_state_clone = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let reconciler = Arc::new(Reconciler::new(
        Arc::new(KubeRecordStore::<Instance>::new(client.clone())),
        Arc::new(KubeRecordStore::<ImportKeyPair>::new(client.clone())),
        Arc::new(KubeSecretStore::new(client.clone())),
        Arc::new(Ec2ClientFactory::new(config.ec2_endpoint_url.clone())),
        config.secret_requeue(),
    ));
    let events = Arc::new(KubeEventPublisher::new(client.clone(), CONTROLLER_NAME));
    let instance_ctx = Arc::new(RuntimeContext::new(
        Arc::clone(&reconciler),
        config.clone(),
        Arc::clone(&events),
    ));
    let key_pair_ctx = Arc::new(RuntimeContext::new(reconciler, config, events));

    server_state.is_ready.store(true, Ordering::Relaxed);

    // SIGTERM or SIGINT flips readiness, then stops both controllers
    let shutdown = shutdown_on_signal(Arc::clone(&server_state));
    tokio::spawn(shutdown.clone());

    let (instances, key_pairs) = futures::join!(
        run_watch_loop::<Instance>(
            client.clone(),
            instance_ctx,
            Arc::clone(&server_state),
            shutdown.clone(),
        ),
        run_watch_loop::<ImportKeyPair>(client, key_pair_ctx, Arc::clone(&server_state), shutdown),
    );
    instances?;
    key_pairs?;

    info!("EC2 operator stopped");
    Ok(())
}
