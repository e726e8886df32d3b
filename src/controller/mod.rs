//! # Controller
//!
//! Reconciliation logic for `Instance` and `ImportKeyPair` records.
//!
//! - `reconciler/` - Fetch, step and persist skeleton shared by both kinds
//! - `state/` - Pure transition tables for each kind
//! - `credentials.rs` - Credential secret resolution
//! - `finalizer.rs` - Finalizer marker bookkeeping
//! - `backoff.rs` - Fibonacci retry delays

pub mod backoff;
pub mod credentials;
pub mod finalizer;
pub mod reconciler;
pub mod state;
