//! # Status State Machines
//!
//! Pure transition logic per record kind. Nothing here talks to EC2 or the
//! API server; the reconciler performs the call a step names and feeds the
//! result back in.

pub mod instance;
pub mod keypair;

pub use instance::{InstanceOutcome, InstanceStep};
pub use keypair::{KeyPairStep, ValidationError};
