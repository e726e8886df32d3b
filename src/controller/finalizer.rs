//! # Finalizers
//!
//! Set semantics over `metadata.finalizers`.
//!
//! Markers owned by other controllers are preserved in their original order.

use kube::Resource;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizerSet {
    markers: Vec<String>,
}

impl FinalizerSet {
    /// Snapshot the finalizers currently on a record
    pub fn of<K: Resource>(record: &K) -> Self {
        Self {
            markers: record.meta().finalizers.clone().unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn has(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| m == marker)
    }

    /// Returns true if the marker was not already present.
    pub fn add(&mut self, marker: &str) -> bool {
        if self.has(marker) {
            return false;
        }
        self.markers.push(marker.to_string());
        true
    }

    /// Returns true if the marker was present.
    pub fn remove(&mut self, marker: &str) -> bool {
        let before = self.markers.len();
        self.markers.retain(|m| m != marker);
        self.markers.len() != before
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Value for `metadata.finalizers`; an empty set clears the field.
    #[must_use]
    pub fn into_metadata(self) -> Option<Vec<String>> {
        if self.markers.is_empty() {
            None
        } else {
            Some(self.markers)
        }
    }

    /// Write the set back onto a record
    pub fn apply_to<K: Resource>(self, record: &mut K) {
        record.meta_mut().finalizers = self.into_metadata();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Instance, InstanceSpec, INSTANCE_FINALIZER};

    fn instance_with(finalizers: Option<Vec<&str>>) -> Instance {
        let mut record = Instance::new("web-1", InstanceSpec::default());
        record.metadata.finalizers =
            finalizers.map(|f| f.into_iter().map(String::from).collect());
        record
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut set = FinalizerSet::default();
        assert!(set.add(INSTANCE_FINALIZER));
        assert!(!set.add(INSTANCE_FINALIZER));
        assert_eq!(set.into_metadata(), Some(vec![INSTANCE_FINALIZER.to_string()]));
    }

    #[test]
    fn test_remove_keeps_foreign_markers_in_order() {
        let record = instance_with(Some(vec!["a.example", INSTANCE_FINALIZER, "b.example"]));
        let mut set = FinalizerSet::of(&record);
        assert!(set.remove(INSTANCE_FINALIZER));
        assert!(!set.remove(INSTANCE_FINALIZER));
        assert_eq!(
            set.into_metadata(),
            Some(vec!["a.example".to_string(), "b.example".to_string()])
        );
    }

    #[test]
    fn test_empty_set_clears_metadata() {
        let mut record = instance_with(Some(vec![INSTANCE_FINALIZER]));
        let mut set = FinalizerSet::of(&record);
        set.remove(INSTANCE_FINALIZER);
        set.apply_to(&mut record);
        assert!(record.metadata.finalizers.is_none());
    }

    #[test]
    fn test_missing_finalizers_field_is_empty_set() {
        let set = FinalizerSet::of(&instance_with(None));
        assert!(set.is_empty());
        assert!(!set.has(INSTANCE_FINALIZER));
    }
}
