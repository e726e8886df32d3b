//! # Credential Resolution
//!
//! Looks up the credential secret a record references, in the record's own
//! namespace.

use crate::store::{SecretPayload, SecretStore, StoreError};
use thiserror::Error;
use tracing::debug;

/// The referenced secret could not be read.
///
/// Usually an ordering race (the secret is created after the record), so the
/// caller waits a fixed delay rather than treating it as a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretUnresolved {
    #[error("spec.credentialSecret is empty")]
    EmptyReference,
    #[error("secret {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },
    #[error("secret {namespace}/{name} lookup failed: {source}")]
    Lookup {
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },
}

/// Fetch the credential secret `namespace/name`.
///
/// # Errors
///
/// Returns [`SecretUnresolved`] when the reference is empty, the secret does
/// not exist, or the lookup itself fails.
pub async fn resolve_credentials(
    store: &dyn SecretStore,
    namespace: &str,
    name: &str,
) -> Result<SecretPayload, SecretUnresolved> {
    if name.trim().is_empty() {
        return Err(SecretUnresolved::EmptyReference);
    }

    match store.get_secret(namespace, name).await {
        Ok(Some(payload)) => {
            debug!(secret.name = %name, secret.namespace = %namespace, "Resolved credential secret");
            Ok(payload)
        }
        Ok(None) | Err(StoreError::NotFound) => Err(SecretUnresolved::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }),
        Err(source) => Err(SecretUnresolved::Lookup {
            namespace: namespace.to_string(),
            name: name.to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockSecretStore;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_empty_reference_never_hits_store() {
        let mut store = MockSecretStore::new();
        store.expect_get_secret().never();

        let err = resolve_credentials(&store, "default", "").await.unwrap_err();
        assert_eq!(err, SecretUnresolved::EmptyReference);
    }

    #[tokio::test]
    async fn test_missing_secret() {
        let mut store = MockSecretStore::new();
        store
            .expect_get_secret()
            .with(eq("default"), eq("aws-creds"))
            .times(1)
            .returning(|_, _| Ok(None));

        let err = resolve_credentials(&store, "default", "aws-creds")
            .await
            .unwrap_err();
        assert!(matches!(err, SecretUnresolved::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_unresolved() {
        let mut store = MockSecretStore::new();
        store
            .expect_get_secret()
            .returning(|_, _| Err(StoreError::Backend("connection refused".to_string())));

        let err = resolve_credentials(&store, "default", "aws-creds")
            .await
            .unwrap_err();
        assert!(matches!(err, SecretUnresolved::Lookup { .. }));
    }

    #[tokio::test]
    async fn test_found_secret_is_returned() {
        let mut store = MockSecretStore::new();
        store.expect_get_secret().returning(|_, _| {
            Ok(Some([("aws_access_key", "AKIA")].into_iter().collect()))
        });

        let payload = resolve_credentials(&store, "default", "aws-creds")
            .await
            .unwrap();
        assert_eq!(payload.get("aws_access_key"), Some(&b"AKIA"[..]));
    }
}
