//! # ImportKeyPair
//!
//! An SSH public key imported into EC2 as a key pair.

use super::common::{Tag, UnrecognizedPhase};
use super::ManagedRecord;
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Finalizer owed by every imported key pair
pub const KEYPAIR_FINALIZER: &str = "keypair.cattle.io";

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ImportKeyPair",
    group = "ec2.cattle.io",
    version = "v1alpha1",
    namespaced,
    status = "ImportKeyPairStatus",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}"#,
    printcolumn = r#"{"name":"KeyPairID", "type":"string", "jsonPath":".status.keyPairID"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ImportKeyPairSpec {
    /// EC2 key name, the record name when empty
    #[serde(default)]
    pub key_name: String,
    /// OpenSSH public key material
    #[serde(default)]
    pub public_key: String,
    #[serde(rename = "tagSpecification", default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(rename = "credentialSecret")]
    pub credential_secret: String,
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportKeyPairStatus {
    #[serde(default)]
    pub status: String,
    #[serde(rename = "keyPairID", default)]
    pub key_pair_id: String,
}

impl ImportKeyPairStatus {
    /// Parse the stored status string.
    ///
    /// # Errors
    ///
    /// Returns [`UnrecognizedPhase`] when the stored value is not a known phase.
    pub fn phase(&self) -> Result<KeyPairPhase, UnrecognizedPhase> {
        self.status.parse()
    }
}

impl ImportKeyPair {
    /// Key name sent to EC2
    #[must_use]
    pub fn key_name(&self) -> String {
        if self.spec.key_name.trim().is_empty() {
            self.name_any()
        } else {
            self.spec.key_name.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyPairPhase {
    Unsubmitted,
    Provisioned,
}

impl KeyPairPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsubmitted => "",
            Self::Provisioned => "provisioned",
        }
    }
}

impl FromStr for KeyPairPhase {
    type Err = UnrecognizedPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(Self::Unsubmitted),
            "provisioned" => Ok(Self::Provisioned),
            _ => Err(UnrecognizedPhase(s.to_string())),
        }
    }
}

impl fmt::Display for KeyPairPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsubmitted => f.write_str("unsubmitted"),
            Self::Provisioned => f.write_str("provisioned"),
        }
    }
}

impl ManagedRecord for ImportKeyPair {
    const KIND: &'static str = "ImportKeyPair";
    const FINALIZER: &'static str = KEYPAIR_FINALIZER;

    fn credential_secret(&self) -> &str {
        &self.spec.credential_secret
    }

    fn region(&self) -> &str {
        &self.spec.region
    }
}
