//! # Types
//!
//! Core types for the reconciler.

use crate::controller::state::ValidationError;
use crate::crd::{ImportKeyPair, Instance};
use crate::provider::{CloudClientFactory, CredentialError, ProviderError};
use crate::store::{RecordStore, SecretStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Secret exists but its keys are unusable; fixing it changes nothing we watch
    #[error("invalid credentials: {0}")]
    CredentialInvalid(#[from] CredentialError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("provider call failed: {0}")]
    ProviderTransient(#[from] ProviderError),

    /// The record changed between read and write
    #[error("record was modified concurrently")]
    PersistConflict,

    /// Cleanup failed; the finalizer stays until it succeeds
    #[error("teardown failed: {0}")]
    TeardownFailure(#[source] ProviderError),

    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for ReconcileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::PersistConflict,
            other => Self::Store(other),
        }
    }
}

impl ReconcileError {
    /// Whether retrying without a spec change can ever succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::CredentialInvalid(_) | Self::Validation(_))
    }

    /// EC2 rejected the call for exceeding its request rate
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        match self {
            Self::ProviderTransient(err) | Self::TeardownFailure(err) => err.is_throttled(),
            _ => false,
        }
    }

    /// Stable reason used for events and metric labels
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::CredentialInvalid(_) => "CredentialInvalid",
            Self::Validation(_) => "ValidationFailure",
            Self::ProviderTransient(_) => "ProviderTransient",
            Self::PersistConflict => "PersistConflict",
            Self::TeardownFailure(_) => "TeardownFailure",
            Self::Store(_) => "StoreError",
        }
    }
}

/// What the watch framework should do after a successful reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing left to do until the record changes
    Done,
    RequeueAfter(Duration),
    /// More provisioning steps remain
    RequeueImmediate,
}

/// Result of one state machine step for a record
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult<S> {
    /// New status to persist, `None` when nothing changed
    pub status: Option<S>,
    pub outcome: ReconcileOutcome,
}

impl<S> StepResult<S> {
    #[must_use]
    pub fn idle() -> Self {
        Self {
            status: None,
            outcome: ReconcileOutcome::Done,
        }
    }
}

/// Shared dependencies of every reconcile
#[derive(Clone)]
pub struct Reconciler {
    pub(super) instances: Arc<dyn RecordStore<Instance>>,
    pub(super) key_pairs: Arc<dyn RecordStore<ImportKeyPair>>,
    pub(super) secrets: Arc<dyn SecretStore>,
    pub(super) clients: Arc<dyn CloudClientFactory>,
    pub(super) secret_requeue: Duration,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("secret_requeue", &self.secret_requeue)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        instances: Arc<dyn RecordStore<Instance>>,
        key_pairs: Arc<dyn RecordStore<ImportKeyPair>>,
        secrets: Arc<dyn SecretStore>,
        clients: Arc<dyn CloudClientFactory>,
        secret_requeue: Duration,
    ) -> Self {
        Self {
            instances,
            key_pairs,
            secrets,
            clients,
            secret_requeue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_persist_conflict() {
        assert!(matches!(
            ReconcileError::from(StoreError::Conflict),
            ReconcileError::PersistConflict
        ));
        assert!(matches!(
            ReconcileError::from(StoreError::Backend("boom".to_string())),
            ReconcileError::Store(_)
        ));
    }

    #[test]
    fn test_retryability() {
        assert!(!ReconcileError::Validation(ValidationError::EmptyPublicKey).is_retryable());
        assert!(!ReconcileError::CredentialInvalid(CredentialError::MissingField("aws_access_key"))
            .is_retryable());
        assert!(ReconcileError::PersistConflict.is_retryable());
        assert!(
            ReconcileError::TeardownFailure(ProviderError::new("DeleteKeyPair", None, "io"))
                .is_retryable()
        );
    }

    #[test]
    fn test_reasons_are_stable() {
        assert_eq!(ReconcileError::PersistConflict.reason(), "PersistConflict");
        assert_eq!(
            ReconcileError::Validation(ValidationError::EmptyPublicKey).reason(),
            "ValidationFailure"
        );
    }

    #[test]
    fn test_throttling_is_detected_on_provider_errors_only() {
        let throttled = ProviderError::new(
            "RunInstances",
            Some("RequestLimitExceeded".to_string()),
            "slow down",
        );
        assert!(ReconcileError::ProviderTransient(throttled.clone()).is_throttled());
        assert!(ReconcileError::TeardownFailure(throttled).is_throttled());
        assert!(!ReconcileError::ProviderTransient(ProviderError::new(
            "RunInstances",
            Some("InsufficientInstanceCapacity".to_string()),
            "no capacity",
        ))
        .is_throttled());
        assert!(!ReconcileError::PersistConflict.is_throttled());
    }
}
