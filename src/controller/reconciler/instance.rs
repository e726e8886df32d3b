//! Instance steps and teardown.

use super::{Reconcilable, ReconcileError, ReconcileOutcome, Reconciler, StepResult};
use crate::controller::state::instance::{apply, plan};
use crate::controller::state::{InstanceOutcome, InstanceStep};
use crate::crd::{with_name_tag, Instance, InstancePhase, InstanceStatus};
use crate::provider::{CloudClient, ProviderError};
use crate::store::RecordStore;
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{info, warn};

#[async_trait]
impl Reconcilable for Instance {
    type Status = InstanceStatus;

    fn store(reconciler: &Reconciler) -> &dyn RecordStore<Self> {
        reconciler.instances.as_ref()
    }

    fn set_status(&mut self, status: InstanceStatus) {
        self.status = Some(status);
    }

    async fn teardown(&self, client: &dyn CloudClient) -> Result<(), ProviderError> {
        let instance_id = self
            .status
            .as_ref()
            .map(|s| s.instance_id.as_str())
            .unwrap_or_default();
        if instance_id.is_empty() {
            info!("No instance was ever launched, nothing to terminate");
            return Ok(());
        }

        match client.terminate(instance_id).await {
            Ok(()) => {
                info!(instance.id = %instance_id, "Instance terminated");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                warn!(instance.id = %instance_id, "Instance already gone");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn step(
        &self,
        client: &dyn CloudClient,
    ) -> Result<StepResult<InstanceStatus>, ReconcileError> {
        let current = self.status.clone().unwrap_or_default();
        let phase = match current.phase() {
            Ok(phase) => phase,
            Err(err) => {
                warn!(error = %err, "Leaving instance with unrecognized status untouched");
                return Ok(StepResult::idle());
            }
        };

        let outcome = match plan(phase, &self.spec) {
            InstanceStep::Launch => {
                // Keyed on the UID so a retry after a lost status write gets the same instance
                let token = self.uid().unwrap_or_default();
                let launched = client.launch(&self.spec, &token).await?;
                InstanceOutcome::Launched {
                    instance_id: launched.instance_id,
                    private_ip: launched.private_ip,
                }
            }
            InstanceStep::Tag { next } => {
                let tags = with_name_tag(&self.spec.tags, &self.name_any());
                client.tag(&current.instance_id, &tags).await?;
                InstanceOutcome::Tagged { next }
            }
            InstanceStep::AwaitPublicIp => {
                InstanceOutcome::PublicIp(client.describe_public_ip(&current.instance_id).await?)
            }
            InstanceStep::Idle => return Ok(StepResult::idle()),
        };

        let next = apply(&current, outcome);
        let next_phase = next.phase().unwrap_or(phase);
        if next_phase != phase {
            info!(
                from = %phase,
                to = %next_phase,
                instance.id = %next.instance_id,
                "Instance status advanced"
            );
        }

        let outcome = if next_phase.is_terminal() {
            ReconcileOutcome::Done
        } else {
            ReconcileOutcome::RequeueImmediate
        };
        Ok(StepResult {
            status: (next != current).then_some(next),
            outcome,
        })
    }
}
