//! # Shutdown
//!
//! One shutdown future shared by every watch loop. It resolves on SIGTERM
//! (what the kubelet sends) or SIGINT, and marks the server not ready
//! before any controller sees it.

use crate::server::ServerState;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Cloneable handle that resolves once shutdown has begun
pub type Shutdown = Shared<BoxFuture<'static, ()>>;

/// Shutdown handle driven by process signals
#[must_use]
pub fn shutdown_on_signal(server_state: Arc<ServerState>) -> Shutdown {
    shutdown_on(wait_for_signal(), server_state)
}

/// Shutdown handle driven by any trigger future
pub fn shutdown_on(
    trigger: impl Future<Output = ()> + Send + 'static,
    server_state: Arc<ServerState>,
) -> Shutdown {
    async move {
        trigger.await;
        info!("Received shutdown signal, initiating graceful shutdown...");
        server_state.is_ready.store(false, Ordering::Relaxed);
    }
    .boxed()
    .shared()
}

async fn wait_for_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }
}

/// Sleep `delay` before a watch restart. `false` when shutdown began first.
pub async fn wait_before_restart(delay: Duration, shutdown: Shutdown) -> bool {
    tokio::select! {
        () = tokio::time::sleep(delay) => true,
        () = shutdown => false,
    }
}
