//! # EC2 Operator
//!
//! A Kubernetes controller that provisions EC2 instances and imported key
//! pairs from declarative `Instance` and `ImportKeyPair` records.
//!
//! Each record names a `Secret` in its own namespace holding static AWS
//! keys, so one operator can manage resources in any number of accounts
//! and regions. A finalizer on every record guarantees the cloud resource
//! is removed before the record is.
//!
//! ## Modules
//!
//! - `crd` - Record types and their status phases
//! - `controller` - Reconciliation skeleton and per-kind state machines
//! - `provider` - EC2 client surface and its AWS SDK implementation
//! - `store` - Record and secret access, Kubernetes backed
//! - `runtime` - `kube-runtime` watch loops and retry policy
//! - `observability` - Prometheus metrics and Kubernetes Events

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod provider;
pub mod runtime;
pub mod server;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
