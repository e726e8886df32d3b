//! # Store Boundary
//!
//! Traits the reconciler uses to read and write records and credential
//! secrets. The Kubernetes implementations live in [`kubernetes`]; tests
//! swap in in-memory versions.

mod kubernetes;

pub use kubernetes::{KubeRecordStore, KubeSecretStore};

use crate::crd::ManagedRecord;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use zeroize::Zeroize;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The record changed since it was read
    #[error("resourceVersion conflict")]
    Conflict,
    #[error("object not found")]
    NotFound,
    #[error("store request failed: {0}")]
    Backend(String),
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(api_err) if api_err.code == 409 => Self::Conflict,
            kube::Error::Api(api_err) if api_err.code == 404 => Self::NotFound,
            other => Self::Backend(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Backend(format!("serialization failed: {err}"))
    }
}

/// Decoded key/value contents of a credential secret.
///
/// Values are wiped from memory on drop and never printed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretPayload(BTreeMap<String, Vec<u8>>);

impl SecretPayload {
    #[must_use]
    pub fn new(data: BTreeMap<String, Vec<u8>>) -> Self {
        Self(data)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.0.get(key).map(Vec::as_slice)
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> FromIterator<(K, V)> for SecretPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<Secret> for SecretPayload {
    /// `data` is already base64-decoded by the client; `stringData` entries
    /// override it the same way the API server merges them on write.
    fn from(secret: Secret) -> Self {
        let mut data: BTreeMap<String, Vec<u8>> = secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.0))
            .collect();
        for (k, v) in secret.string_data.unwrap_or_default() {
            data.insert(k, v.into_bytes());
        }
        Self(data)
    }
}

impl Drop for SecretPayload {
    fn drop(&mut self) {
        for value in self.0.values_mut() {
            value.zeroize();
        }
    }
}

impl fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretPayload")
            .field("keys", &self.0.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Opaque key/value secret lookup
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// `Ok(None)` when the secret does not exist.
    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<SecretPayload>, StoreError>;
}

/// Versioned record storage with optimistic concurrency.
///
/// Both writes are conditional on the `resourceVersion` carried by the
/// record passed in and return the record as stored afterwards.
#[async_trait]
pub trait RecordStore<K: ManagedRecord>: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError>;

    /// Write `status` only
    async fn update_status(&self, record: &K) -> Result<K, StoreError>;

    /// Write `metadata.finalizers` only
    async fn update_finalizers(&self, record: &K) -> Result<K, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;

    #[test]
    fn test_payload_from_secret_merges_string_data() {
        let secret = Secret {
            data: Some(BTreeMap::from([
                ("aws_access_key".to_string(), ByteString(b"AKIA".to_vec())),
                ("aws_secret_key".to_string(), ByteString(b"old".to_vec())),
            ])),
            string_data: Some(BTreeMap::from([(
                "aws_secret_key".to_string(),
                "new".to_string(),
            )])),
            ..Secret::default()
        };

        let payload = SecretPayload::from(secret);
        assert_eq!(payload.get("aws_access_key"), Some(&b"AKIA"[..]));
        assert_eq!(payload.get("aws_secret_key"), Some(&b"new"[..]));
    }

    #[test]
    fn test_payload_debug_hides_values() {
        let payload: SecretPayload = [("aws_secret_key", "hunter2")].into_iter().collect();
        let rendered = format!("{payload:?}");
        assert!(rendered.contains("aws_secret_key"));
        assert!(!rendered.contains("hunter2"));
    }
}
