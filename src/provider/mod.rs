//! # Cloud Provider
//!
//! The narrow client surface the reconciler drives. One client is built per
//! reconcile from the record's credentials and region.
//!
//! Every method is a single request with no internal retry; failures are
//! returned as [`ProviderError`] and the caller decides what happens next.

use crate::crd::{InstanceSpec, Tag};
use crate::store::SecretPayload;
use async_trait::async_trait;
use thiserror::Error;

pub mod aws;

/// What EC2 reported back from a launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedInstance {
    pub instance_id: String,
    /// Empty when EC2 has not assigned one yet
    pub private_ip: String,
}

/// A failed provider call, with the provider's error code passed through
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed{}: {message}", code_suffix(.code.as_deref()))]
pub struct ProviderError {
    pub operation: &'static str,
    pub code: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(operation: &'static str, code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            operation,
            code,
            message: message.into(),
        }
    }

    /// The target resource no longer exists
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code.as_deref().is_some_and(aws::is_not_found_code)
    }

    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.code.as_deref().is_some_and(aws::is_throttling_code)
    }
}

fn code_suffix(code: Option<&str>) -> String {
    code.map(|c| format!(" ({c})")).unwrap_or_default()
}

/// The credential secret exists but cannot be used to build a client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("credential secret is missing field '{0}'")]
    MissingField(&'static str),
    #[error("credential secret field '{0}' is empty or not valid UTF-8")]
    InvalidField(&'static str),
}

#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Launch one instance. Repeating a call with the same non-empty
    /// `client_token` returns the instance the first call created.
    async fn launch(
        &self,
        spec: &InstanceSpec,
        client_token: &str,
    ) -> Result<LaunchedInstance, ProviderError>;

    /// Public IP of the instance, `None` until one is assigned
    async fn describe_public_ip(&self, instance_id: &str) -> Result<Option<String>, ProviderError>;

    async fn tag(&self, instance_id: &str, tags: &[Tag]) -> Result<(), ProviderError>;

    async fn terminate(&self, instance_id: &str) -> Result<(), ProviderError>;

    /// Returns the key pair id
    async fn import_key(
        &self,
        key_name: &str,
        public_key: &str,
        tags: &[Tag],
    ) -> Result<String, ProviderError>;

    async fn delete_key(&self, key_pair_id: &str) -> Result<(), ProviderError>;
}

/// Builds a [`CloudClient`] for one reconcile
#[async_trait]
pub trait CloudClientFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the payload lacks usable keys.
    async fn connect(
        &self,
        credentials: &SecretPayload,
        region: &str,
    ) -> Result<Box<dyn CloudClient>, CredentialError>;
}
