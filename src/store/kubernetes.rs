//! Kubernetes API implementations of the store traits.

use super::{RecordStore, SecretPayload, SecretStore, StoreError};
use crate::constants::FIELD_MANAGER;
use crate::crd::ManagedRecord;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use std::marker::PhantomData;
use tracing::debug;

/// Records of kind `K`, read and written through the API server
pub struct KubeRecordStore<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeRecordStore<K> {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

impl<K> std::fmt::Debug for KubeRecordStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeRecordStore").finish_non_exhaustive()
    }
}

fn namespace_of<K: ManagedRecord>(record: &K) -> Result<String, StoreError> {
    record
        .namespace()
        .ok_or_else(|| StoreError::Backend(format!("{} has no namespace", K::KIND)))
}

fn resource_version_of<K: ManagedRecord>(record: &K) -> Result<String, StoreError> {
    record
        .resource_version()
        .ok_or_else(|| StoreError::Backend(format!("{} has no resourceVersion", K::KIND)))
}

#[async_trait]
impl<K: ManagedRecord> RecordStore<K> for KubeRecordStore<K> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn update_status(&self, record: &K) -> Result<K, StoreError> {
        let namespace = namespace_of(record)?;
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);

        let status = serde_json::to_value(record)?
            .get("status")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        // resourceVersion in a merge patch body is a precondition, so a stale
        // read fails with 409 instead of overwriting a newer status.
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": resource_version_of(record)? },
            "status": status,
        });

        debug!(
            kind = K::KIND,
            name = %record.name_any(),
            namespace = %namespace,
            "Patching status"
        );
        Ok(api
            .patch_status(
                &record.name_any(),
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await?)
    }

    async fn update_finalizers(&self, record: &K) -> Result<K, StoreError> {
        let namespace = namespace_of(record)?;
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);

        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": resource_version_of(record)?,
                "finalizers": record.finalizers(),
            }
        });

        debug!(
            kind = K::KIND,
            name = %record.name_any(),
            namespace = %namespace,
            finalizers = ?record.finalizers(),
            "Patching finalizers"
        );
        Ok(api
            .patch(
                &record.name_any(),
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await?)
    }
}

/// Core `Secret` lookup
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<SecretPayload>, StoreError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?.map(SecretPayload::from))
    }
}
