//! Instance provisioning state machine.
//!
//! `"" -> waitfortag -> [waitforpublicip] -> provisioned`
//!
//! Only [`InstancePhase::Unsubmitted`] plans a launch, so a record that has
//! already been submitted can never be launched a second time.

use crate::crd::{InstancePhase, InstanceSpec, InstanceStatus};

/// The single provider call one reconcile makes for an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStep {
    Launch,
    /// Apply tags, then move to `next`
    Tag { next: InstancePhase },
    AwaitPublicIp,
    Idle,
}

/// Result of the provider call made for an [`InstanceStep`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceOutcome {
    Launched {
        instance_id: String,
        private_ip: String,
    },
    Tagged {
        next: InstancePhase,
    },
    PublicIp(Option<String>),
}

#[must_use]
pub fn plan(phase: InstancePhase, spec: &InstanceSpec) -> InstanceStep {
    match phase {
        InstancePhase::Unsubmitted => InstanceStep::Launch,
        InstancePhase::WaitForTag => InstanceStep::Tag {
            next: if spec.public_ip_address {
                InstancePhase::WaitForPublicIp
            } else {
                InstancePhase::Provisioned
            },
        },
        InstancePhase::WaitForPublicIp => InstanceStep::AwaitPublicIp,
        InstancePhase::Provisioned => InstanceStep::Idle,
    }
}

/// Status after a successful provider call.
#[must_use]
pub fn apply(current: &InstanceStatus, outcome: InstanceOutcome) -> InstanceStatus {
    let mut next = current.clone();
    match outcome {
        InstanceOutcome::Launched {
            instance_id,
            private_ip,
        } => {
            next.instance_id = instance_id;
            next.private_ip = private_ip;
            next.status = InstancePhase::WaitForTag.as_str().to_string();
        }
        InstanceOutcome::Tagged { next: phase } => {
            next.status = phase.as_str().to_string();
        }
        InstanceOutcome::PublicIp(Some(ip)) if !ip.is_empty() => {
            next.public_ip = ip;
            next.status = InstancePhase::Provisioned.as_str().to_string();
        }
        InstanceOutcome::PublicIp(_) => {}
    }
    next
}
