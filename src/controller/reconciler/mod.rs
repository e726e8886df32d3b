//! # Reconciler
//!
//! Drives one record one step closer to its declared state.
//!
//! ## Reconciliation Flow
//!
//! 1. Fetch the record (gone means done)
//! 2. Resolve the credential secret (missing means retry after a fixed delay)
//! 3. Build an EC2 client from it
//! 4. Deletion requested: tear down the cloud resource, then drop the finalizer
//! 5. Otherwise: run one state machine step and persist the new status,
//!    adding the finalizer if it is not there yet
//!
//! The skeleton is shared; each kind supplies its step and teardown through
//! [`Reconcilable`].

mod instance;
mod keypair;
pub mod types;

pub use types::{ReconcileError, ReconcileOutcome, Reconciler, StepResult};

use crate::controller::credentials::resolve_credentials;
use crate::controller::finalizer::FinalizerSet;
use crate::crd::{ImportKeyPair, Instance, ManagedRecord};
use crate::provider::{CloudClient, ProviderError};
use crate::store::{RecordStore, StoreError};
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, info, warn};

/// Per-kind behaviour plugged into the shared reconcile skeleton
#[async_trait]
pub trait Reconcilable: ManagedRecord {
    type Status: Clone + PartialEq + Send + Sync + std::fmt::Debug;

    fn store(reconciler: &Reconciler) -> &dyn RecordStore<Self>;

    fn set_status(&mut self, status: Self::Status);

    /// Delete the cloud resource. Succeeds when there is nothing to delete.
    async fn teardown(&self, client: &dyn CloudClient) -> Result<(), ProviderError>;

    /// Perform the one provider call the current status calls for.
    async fn step(
        &self,
        client: &dyn CloudClient,
    ) -> Result<StepResult<Self::Status>, ReconcileError>;
}

impl Reconciler {
    /// Reconcile the record `namespace/name` of kind `K`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] for failures the watch framework should
    /// retry or surface; an unresolved credential secret is not an error
    /// and yields [`ReconcileOutcome::RequeueAfter`].
    pub async fn reconcile<K: Reconcilable>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let store = K::store(self);
        let Some(record) = store.get(namespace, name).await? else {
            debug!("Record no longer exists, nothing to do");
            return Ok(ReconcileOutcome::Done);
        };

        let credentials = match resolve_credentials(
            self.secrets.as_ref(),
            namespace,
            record.credential_secret(),
        )
        .await
        {
            Ok(credentials) => credentials,
            Err(err) => {
                warn!(
                    error = %err,
                    retry_in_secs = self.secret_requeue.as_secs(),
                    "Credential secret unresolved, retrying later"
                );
                return Ok(ReconcileOutcome::RequeueAfter(self.secret_requeue));
            }
        };

        let client = self.clients.connect(&credentials, record.region()).await?;
        drop(credentials);

        if record.deletion_requested() {
            return finalize(store, record, client.as_ref()).await;
        }

        let step = record.step(client.as_ref()).await?;
        if let Some(status) = step.status {
            persist(store, record, status).await?;
        }
        Ok(step.outcome)
    }

    /// # Errors
    ///
    /// See [`Reconciler::reconcile`].
    pub async fn reconcile_instance(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        self.reconcile::<Instance>(namespace, name).await
    }

    /// # Errors
    ///
    /// See [`Reconciler::reconcile`].
    pub async fn reconcile_key_pair(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        self.reconcile::<ImportKeyPair>(namespace, name).await
    }
}

/// Write the new status, claiming the finalizer first if the record does
/// not carry it yet.
async fn persist<K: Reconcilable>(
    store: &dyn RecordStore<K>,
    mut record: K,
    status: K::Status,
) -> Result<(), ReconcileError> {
    let mut finalizers = FinalizerSet::of(&record);
    if finalizers.add(K::FINALIZER) {
        finalizers.apply_to(&mut record);
        record = store.update_finalizers(&record).await?;
        debug!(finalizer = K::FINALIZER, "Added finalizer");
    }

    record.set_status(status);
    store.update_status(&record).await?;
    Ok(())
}

async fn finalize<K: Reconcilable>(
    store: &dyn RecordStore<K>,
    mut record: K,
    client: &dyn CloudClient,
) -> Result<ReconcileOutcome, ReconcileError> {
    let mut finalizers = FinalizerSet::of(&record);
    if !finalizers.has(K::FINALIZER) {
        debug!("Deletion requested and no cleanup owed");
        return Ok(ReconcileOutcome::Done);
    }

    record
        .teardown(client)
        .await
        .map_err(ReconcileError::TeardownFailure)?;

    finalizers.remove(K::FINALIZER);
    finalizers.apply_to(&mut record);
    match store.update_finalizers(&record).await {
        Ok(_) | Err(StoreError::NotFound) => {}
        Err(err) => return Err(err.into()),
    }

    info!(
        kind = K::KIND,
        name = %record.name_any(),
        "Cloud resource removed, finalizer released"
    );
    Ok(ReconcileOutcome::Done)
}
