//! # Runtime
//!
//! Wires the reconciler into `kube-runtime` controllers, one per record kind.

pub mod error_policy;
pub mod shutdown;
pub mod watch_loop;

pub use shutdown::{shutdown_on_signal, Shutdown};
pub use watch_loop::{run_watch_loop, RuntimeContext};
