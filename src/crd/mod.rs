//! # Custom Resource Definitions
//!
//! CRD types for the EC2 operator.
//!
//! ## Module Structure
//!
//! - `common.rs` - Tags and the phase parsing error shared by every kind
//! - `instance.rs` - `Instance` (EC2 virtual machine)
//! - `keypair.rs` - `ImportKeyPair` (imported SSH public key)
//!
//! Every kind implements [`ManagedRecord`], which is all the generic
//! reconciliation skeleton needs to know about a record.

mod common;
mod instance;
mod keypair;

pub use common::{with_name_tag, Tag, UnrecognizedPhase, NAME_TAG_KEY};
pub use instance::{Instance, InstancePhase, InstanceSpec, InstanceStatus, INSTANCE_FINALIZER};
pub use keypair::{
    ImportKeyPair, ImportKeyPairSpec, ImportKeyPairStatus, KeyPairPhase, KEYPAIR_FINALIZER,
};

use k8s_openapi::NamespaceResourceScope;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// API group shared by every record kind
pub const API_GROUP: &str = "ec2.cattle.io";

/// A declarative record whose cloud resource this operator owns.
pub trait ManagedRecord:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + std::fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Kind name used in logs, metrics and events
    const KIND: &'static str;

    /// Marker whose presence means cloud cleanup is still owed
    const FINALIZER: &'static str;

    /// Name of the credential `Secret` in the record's own namespace
    fn credential_secret(&self) -> &str;

    /// AWS region the resource lives in
    fn region(&self) -> &str;

    /// True once the owner has asked for deletion
    fn deletion_requested(&self) -> bool {
        self.meta().deletion_timestamp.is_some()
    }

    /// `kind/namespace/name` key used for per-record bookkeeping
    fn record_key(&self) -> String {
        format!(
            "{}/{}/{}",
            Self::KIND,
            self.namespace().unwrap_or_default(),
            self.name_any()
        )
    }
}
