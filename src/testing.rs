//! In-memory stand-ins for the API server and EC2, used by unit tests.

use crate::crd::{InstanceSpec, ManagedRecord, Tag};
use crate::observability::events::EventPublisher;
use crate::provider::aws::{StaticKeys, ACCESS_KEY_FIELD, SECRET_KEY_FIELD};
use crate::provider::{
    CloudClient, CloudClientFactory, CredentialError, LaunchedInstance, ProviderError,
};
use crate::store::{RecordStore, SecretPayload, SecretStore, StoreError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::runtime::events::EventType;
use kube::ResourceExt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub fn deletion_timestamp() -> Time {
    serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z")).unwrap()
}

pub fn provider_error(operation: &'static str, code: &str) -> ProviderError {
    ProviderError::new(operation, Some(code.to_string()), format!("{code} (fake)"))
}

/// Record store with resourceVersion checks and finalizer-gated purge
pub struct InMemoryRecordStore<K> {
    records: Mutex<HashMap<(String, String), K>>,
    next_version: Mutex<u64>,
    fail_next_write: Mutex<bool>,
}

impl<K> Default for InMemoryRecordStore<K> {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            next_version: Mutex::new(1),
            fail_next_write: Mutex::new(false),
        }
    }
}

fn key_of<K: ManagedRecord>(record: &K) -> (String, String) {
    (record.namespace().unwrap_or_default(), record.name_any())
}

impl<K: ManagedRecord> InMemoryRecordStore<K> {
    pub fn with(records: Vec<K>) -> Self {
        let store = Self::default();
        for mut record in records {
            record.meta_mut().resource_version = Some(store.bump());
            store.records.lock().unwrap().insert(key_of(&record), record);
        }
        store
    }

    fn bump(&self) -> String {
        let mut version = self.next_version.lock().unwrap();
        let current = *version;
        *version += 1;
        current.to_string()
    }

    pub fn get_stored(&self, namespace: &str, name: &str) -> Option<K> {
        self.records
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Simulate an edit landing between read and write
    pub fn conflict_on_next_write(&self) {
        *self.fail_next_write.lock().unwrap() = true;
    }

    /// Simulate the owner deleting the record
    pub fn mark_deleted(&self, namespace: &str, name: &str) {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.get_mut(&(namespace.to_string(), name.to_string())) {
            record.meta_mut().deletion_timestamp = Some(deletion_timestamp());
        }
    }

    fn write(&self, record: &K, merge: impl FnOnce(&mut K, &K)) -> Result<K, StoreError> {
        if std::mem::take(&mut *self.fail_next_write.lock().unwrap()) {
            return Err(StoreError::Conflict);
        }

        let key = key_of(record);
        let mut records = self.records.lock().unwrap();
        let stored = records.get_mut(&key).ok_or(StoreError::NotFound)?;
        if stored.resource_version() != record.resource_version() {
            return Err(StoreError::Conflict);
        }

        merge(stored, record);
        stored.meta_mut().resource_version = Some(self.bump());
        let updated = stored.clone();

        if updated.meta().deletion_timestamp.is_some() && updated.finalizers().is_empty() {
            records.remove(&key);
        }
        Ok(updated)
    }
}

#[async_trait]
impl<K: ManagedRecord> RecordStore<K> for InMemoryRecordStore<K> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        Ok(self.get_stored(namespace, name))
    }

    async fn update_status(&self, record: &K) -> Result<K, StoreError> {
        self.write(record, |stored, incoming| {
            let mut value = serde_json::to_value(&*stored).unwrap();
            value["status"] = serde_json::to_value(incoming).unwrap()["status"].clone();
            let metadata = stored.meta().clone();
            *stored = serde_json::from_value(value).unwrap();
            *stored.meta_mut() = metadata;
        })
    }

    async fn update_finalizers(&self, record: &K) -> Result<K, StoreError> {
        self.write(record, |stored, incoming| {
            stored.meta_mut().finalizers = incoming.meta().finalizers.clone();
        })
    }
}

/// Event sink that keeps `(type, reason, action)` of everything published
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<(EventType, String, String)>>,
}

impl RecordingEventPublisher {
    pub fn events(&self) -> Vec<(EventType, String, String)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        _note: Option<String>,
    ) {
        self.events
            .lock()
            .unwrap()
            .push((type_, reason.to_string(), action.to_string()));
    }
}

/// Secret lookup backed by a map
#[derive(Default)]
pub struct InMemorySecretStore {
    secrets: HashMap<(String, String), SecretPayload>,
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<SecretPayload>, StoreError> {
        Ok(self
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}

pub fn secret_store_with(namespace: &str, name: &str, payload: SecretPayload) -> InMemorySecretStore {
    let mut store = InMemorySecretStore::default();
    store
        .secrets
        .insert((namespace.to_string(), name.to_string()), payload);
    store
}

pub fn secret_store_with_keys(namespace: &str, name: &str) -> InMemorySecretStore {
    secret_store_with(
        namespace,
        name,
        [
            (ACCESS_KEY_FIELD, "AKIAFAKEFAKEFAKE"),
            (SECRET_KEY_FIELD, "fake-secret-key"),
        ]
        .into_iter()
        .collect(),
    )
}

#[derive(Default)]
struct FakeCloudState {
    calls: Vec<String>,
    launch: Option<LaunchedInstance>,
    launched: u32,
    by_token: HashMap<String, LaunchedInstance>,
    public_ips: HashMap<String, String>,
    tags: HashMap<String, Vec<Tag>>,
    import_id: Option<String>,
    imported: HashMap<String, (String, Vec<Tag>)>,
    failures: HashMap<&'static str, VecDeque<ProviderError>>,
}

/// EC2 double that logs every call as `"<Operation> <target>"`
#[derive(Clone, Default)]
pub struct FakeCloud {
    state: Arc<Mutex<FakeCloudState>>,
}

impl FakeCloud {
    pub fn launch_returns(&self, instance_id: &str, private_ip: &str) {
        self.state.lock().unwrap().launch = Some(LaunchedInstance {
            instance_id: instance_id.to_string(),
            private_ip: private_ip.to_string(),
        });
    }

    pub fn import_returns(&self, key_pair_id: &str) {
        self.state.lock().unwrap().import_id = Some(key_pair_id.to_string());
    }

    pub fn assign_public_ip(&self, instance_id: &str, ip: &str) {
        self.state
            .lock()
            .unwrap()
            .public_ips
            .insert(instance_id.to_string(), ip.to_string());
    }

    /// Fail the next call of `operation` with `err`
    pub fn fail_next(&self, operation: &'static str, err: ProviderError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(operation)
            .or_default()
            .push_back(err);
    }

    /// Distinct instances created so far
    pub fn launched(&self) -> u32 {
        self.state.lock().unwrap().launched
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn tagged(&self, instance_id: &str) -> Option<Vec<Tag>> {
        self.state.lock().unwrap().tags.get(instance_id).cloned()
    }

    /// `(public key, tags)` imported under `key_name`
    pub fn imported(&self, key_name: &str) -> Option<(String, Vec<Tag>)> {
        self.state.lock().unwrap().imported.get(key_name).cloned()
    }

    fn record(&self, operation: &'static str, target: &str) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{operation} {target}"));
        match state.failures.get_mut(operation).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CloudClient for FakeCloud {
    async fn launch(
        &self,
        spec: &InstanceSpec,
        client_token: &str,
    ) -> Result<LaunchedInstance, ProviderError> {
        self.record("RunInstances", &spec.image_id)?;
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.by_token.get(client_token) {
            return Ok(existing.clone());
        }
        state.launched += 1;
        let launched = state.launch.clone().unwrap_or_else(|| LaunchedInstance {
            instance_id: format!("i-fake{:04}", state.launched),
            private_ip: "10.0.0.10".to_string(),
        });
        if !client_token.is_empty() {
            state
                .by_token
                .insert(client_token.to_string(), launched.clone());
        }
        Ok(launched)
    }

    async fn describe_public_ip(&self, instance_id: &str) -> Result<Option<String>, ProviderError> {
        self.record("DescribeInstances", instance_id)?;
        Ok(self.state.lock().unwrap().public_ips.get(instance_id).cloned())
    }

    async fn tag(&self, instance_id: &str, tags: &[Tag]) -> Result<(), ProviderError> {
        self.record("CreateTags", instance_id)?;
        self.state
            .lock()
            .unwrap()
            .tags
            .insert(instance_id.to_string(), tags.to_vec());
        Ok(())
    }

    async fn terminate(&self, instance_id: &str) -> Result<(), ProviderError> {
        self.record("TerminateInstances", instance_id)
    }

    async fn import_key(
        &self,
        key_name: &str,
        public_key: &str,
        tags: &[Tag],
    ) -> Result<String, ProviderError> {
        self.record("ImportKeyPair", key_name)?;
        let mut state = self.state.lock().unwrap();
        state
            .imported
            .insert(key_name.to_string(), (public_key.to_string(), tags.to_vec()));
        Ok(state
            .import_id
            .clone()
            .unwrap_or_else(|| format!("key-{key_name}")))
    }

    async fn delete_key(&self, key_pair_id: &str) -> Result<(), ProviderError> {
        self.record("DeleteKeyPair", key_pair_id)
    }
}

/// Hands out the shared [`FakeCloud`] after the same key checks the EC2 factory does
pub struct FakeClientFactory {
    cloud: FakeCloud,
}

impl FakeClientFactory {
    pub fn new(cloud: FakeCloud) -> Self {
        Self { cloud }
    }
}

#[async_trait]
impl CloudClientFactory for FakeClientFactory {
    async fn connect(
        &self,
        credentials: &SecretPayload,
        _region: &str,
    ) -> Result<Box<dyn CloudClient>, CredentialError> {
        StaticKeys::from_payload(credentials)?;
        Ok(Box::new(self.cloud.clone()))
    }
}
