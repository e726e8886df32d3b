//! # Configuration
//!
//! Controller settings, loaded once at startup from environment variables.

mod controller;

pub use controller::{ControllerConfig, LogFormat};
