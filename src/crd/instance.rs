//! # Instance
//!
//! An EC2 virtual machine declared as a custom resource.

use super::common::{Tag, UnrecognizedPhase};
use super::ManagedRecord;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Finalizer owed by every launched instance
pub const INSTANCE_FINALIZER: &str = "instance.cattle.io";

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Instance",
    group = "ec2.cattle.io",
    version = "v1alpha1",
    namespaced,
    status = "InstanceStatus",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}"#,
    printcolumn = r#"{"name":"InstanceID", "type":"string", "jsonPath":".status.instanceID"}"#,
    printcolumn = r#"{"name":"PublicIP", "type":"string", "jsonPath":".status.publicIP"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpec {
    #[serde(rename = "imageID")]
    pub image_id: String,
    pub instance_type: String,
    /// Existing key pair to install on the instance
    #[serde(rename = "keyname", default, skip_serializing_if = "String::is_empty")]
    pub key_name: String,
    #[serde(rename = "securityGroupIDS", default, skip_serializing_if = "Vec::is_empty")]
    pub security_group_ids: Vec<String>,
    /// Security group names (default VPC only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<String>,
    #[serde(rename = "subnetID", default, skip_serializing_if = "String::is_empty")]
    pub subnet_id: String,
    /// Kept so existing manifests survive schema pruning; not sent to EC2
    #[serde(rename = "blockDeviceMapping", default, skip_serializing_if = "String::is_empty")]
    pub block_device_mapping: String,
    /// Plain text user data, encoded before launch
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_data: String,
    /// Instance profile ARN or name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub iam_instance_profile: String,
    #[serde(rename = "tagSpecification", default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    /// Secret holding `aws_access_key` and `aws_secret_key`
    #[serde(rename = "credentialSecret")]
    pub credential_secret: String,
    /// Wait for a public address before reporting provisioned
    #[serde(rename = "publicIPAddress", default)]
    pub public_ip_address: bool,
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatus {
    #[serde(default)]
    pub status: String,
    #[serde(rename = "instanceID", default)]
    pub instance_id: String,
    #[serde(rename = "privateIP", default)]
    pub private_ip: String,
    #[serde(rename = "publicIP", default)]
    pub public_ip: String,
}

impl InstanceStatus {
    /// Parse the stored status string.
    ///
    /// # Errors
    ///
    /// Returns [`UnrecognizedPhase`] when the stored value is not a known phase.
    pub fn phase(&self) -> Result<InstancePhase, UnrecognizedPhase> {
        self.status.parse()
    }
}

/// Provisioning progress of an instance, in the only order it may advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstancePhase {
    /// Never submitted to EC2
    Unsubmitted,
    WaitForTag,
    WaitForPublicIp,
    Provisioned,
}

impl InstancePhase {
    /// Value written to `status.status`
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsubmitted => "",
            Self::WaitForTag => "waitfortag",
            Self::WaitForPublicIp => "waitforpublicip",
            Self::Provisioned => "provisioned",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Provisioned
    }
}

impl FromStr for InstancePhase {
    type Err = UnrecognizedPhase;

    // Older controllers wrote mixed-case values, so matching ignores case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(Self::Unsubmitted),
            "waitfortag" => Ok(Self::WaitForTag),
            "waitforpublicip" => Ok(Self::WaitForPublicIp),
            "provisioned" => Ok(Self::Provisioned),
            _ => Err(UnrecognizedPhase(s.to_string())),
        }
    }
}

impl fmt::Display for InstancePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsubmitted => f.write_str("unsubmitted"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl ManagedRecord for Instance {
    const KIND: &'static str = "Instance";
    const FINALIZER: &'static str = INSTANCE_FINALIZER;

    fn credential_secret(&self) -> &str {
        &self.spec.credential_secret
    }

    fn region(&self) -> &str {
        &self.spec.region
    }
}
