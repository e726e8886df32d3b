//! # Shared CRD Types
//!
//! Types used by more than one record kind.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tag key the operator always adds, carrying the record name
pub const NAME_TAG_KEY: &str = "Name";

/// A user-specified `{name, value}` tag applied to the cloud resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct Tag {
    /// Tag key
    pub name: String,
    /// Tag value
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// User tags followed by the synthetic `Name` tag.
///
/// Duplicates are passed through untouched; the provider decides which wins.
#[must_use]
pub fn with_name_tag(tags: &[Tag], record_name: &str) -> Vec<Tag> {
    let mut all = Vec::with_capacity(tags.len() + 1);
    all.extend_from_slice(tags);
    all.push(Tag::new(NAME_TAG_KEY, record_name));
    all
}

/// A stored status string that matches no known phase of its kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized status value '{0}'")]
pub struct UnrecognizedPhase(pub String);
