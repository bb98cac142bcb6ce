//! Canonicalisation patches applied on admission.
//!
//! Builders are pure: they read the typed object and return an ordered [`PatchSet`]. They
//! never reject anything.

pub mod backend_group;
pub mod bind;
pub mod load_balancer;
pub mod load_balancer_driver;

use std::collections::BTreeMap;

use json_patch::{AddOperation, Patch, PatchOperation, RemoveOperation, ReplaceOperation};
use serde_json::Value;

use crate::util::escape_pointer;

/// Ordered list of JSON patch operations.
#[derive(Debug, Clone, Default)]
pub struct PatchSet(Vec<PatchOperation>);

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, path: impl Into<String>, value: Value) -> Self {
        self.0.push(PatchOperation::Add(AddOperation {
            path: path.into(),
            value,
        }));
        self
    }

    pub fn replace(mut self, path: impl Into<String>, value: Value) -> Self {
        self.0.push(PatchOperation::Replace(ReplaceOperation {
            path: path.into(),
            value,
        }));
        self
    }

    pub fn remove(mut self, path: impl Into<String>) -> Self {
        self.0
            .push(PatchOperation::Remove(RemoveOperation { path: path.into() }));
        self
    }

    pub fn extend(mut self, other: PatchSet) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_patch(self) -> Patch {
        Patch(self.0)
    }
}

/// Makes `desired` present in the labels, leaving every other label alone.
///
/// A missing label map is created whole; otherwise only differing keys are added or replaced.
pub fn ensure_labels(
    existing: Option<&BTreeMap<String, String>>,
    desired: &BTreeMap<String, String>,
) -> PatchSet {
    if desired.is_empty() {
        return PatchSet::new();
    }
    let Some(existing) = existing else {
        return PatchSet::new().add("/metadata/labels", serde_json::json!(desired));
    };
    desired
        .iter()
        .fold(PatchSet::new(), |patch, (key, value)| {
            let path = format!("/metadata/labels/{}", escape_pointer(key));
            match existing.get(key) {
                Some(current) if current == value => patch,
                Some(_) => patch.replace(path, Value::String(value.clone())),
                None => patch.add(path, Value::String(value.clone())),
            }
        })
}
