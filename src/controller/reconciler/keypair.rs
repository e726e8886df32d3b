//! Key pair import and teardown.

use super::{Reconcilable, ReconcileError, ReconcileOutcome, Reconciler, StepResult};
use crate::controller::state::keypair::{imported, plan};
use crate::controller::state::KeyPairStep;
use crate::crd::{with_name_tag, ImportKeyPair, ImportKeyPairStatus};
use crate::provider::{CloudClient, ProviderError};
use crate::store::RecordStore;
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{info, warn};

#[async_trait]
impl Reconcilable for ImportKeyPair {
    type Status = ImportKeyPairStatus;

    fn store(reconciler: &Reconciler) -> &dyn RecordStore<Self> {
        reconciler.key_pairs.as_ref()
    }

    fn set_status(&mut self, status: ImportKeyPairStatus) {
        self.status = Some(status);
    }

    async fn teardown(&self, client: &dyn CloudClient) -> Result<(), ProviderError> {
        let key_pair_id = self
            .status
            .as_ref()
            .map(|s| s.key_pair_id.as_str())
            .unwrap_or_default();
        if key_pair_id.is_empty() {
            info!("No key pair was ever imported, nothing to delete");
            return Ok(());
        }

        match client.delete_key(key_pair_id).await {
            Ok(()) => {
                info!(key_pair.id = %key_pair_id, "Key pair deleted");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                warn!(key_pair.id = %key_pair_id, "Key pair already gone");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn step(
        &self,
        client: &dyn CloudClient,
    ) -> Result<StepResult<ImportKeyPairStatus>, ReconcileError> {
        let current = self.status.clone().unwrap_or_default();
        let phase = match current.phase() {
            Ok(phase) => phase,
            Err(err) => {
                warn!(error = %err, "Leaving key pair with unrecognized status untouched");
                return Ok(StepResult::idle());
            }
        };

        match plan(phase, &self.spec)? {
            KeyPairStep::Import => {
                let key_name = self.key_name();
                let tags = with_name_tag(&self.spec.tags, &self.name_any());
                let key_pair_id = client
                    .import_key(&key_name, &self.spec.public_key, &tags)
                    .await?;
                info!(key.name = %key_name, key_pair.id = %key_pair_id, "Key pair imported");
                Ok(StepResult {
                    status: Some(imported(key_pair_id)),
                    outcome: ReconcileOutcome::Done,
                })
            }
            KeyPairStep::Idle => Ok(StepResult::idle()),
        }
    }
}
