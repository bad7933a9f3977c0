//! Orphan selection shared by all targets
//!
//! An orphan is a live object whose kind is managed in this run and whose
//! identity was not applied in this run. Comparison is on the lowercased kind
//! and the exact name.

use std::collections::HashSet;

use appdeploy_core::{ManagedKinds, Manifest};

/// Identities applied during a run, keyed by `(lowercase kind, name)`
#[derive(Debug, Clone, Default)]
pub struct AppliedSet {
    entries: HashSet<(String, String)>,
}

impl AppliedSet {
    pub fn new<'a>(applied: impl IntoIterator<Item = &'a Manifest>) -> Self {
        Self {
            entries: applied
                .into_iter()
                .map(|m| (m.kind_key(), m.name.clone()))
                .collect(),
        }
    }

    pub fn contains(&self, manifest: &Manifest) -> bool {
        self.entries
            .contains(&(manifest.kind_key(), manifest.name.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Select the handles of live objects that must be deleted
///
/// Each live object is paired with whatever handle the target needs to delete
/// it (a path, a raw `kubectl` reference, ...).
pub fn orphans<T>(
    live: impl IntoIterator<Item = (Manifest, T)>,
    applied: &AppliedSet,
    managed: &ManagedKinds,
) -> Vec<T> {
    live.into_iter()
        .filter(|(manifest, _)| managed.is_managed(&manifest.kind) && !applied.contains(manifest))
        .map(|(_, handle)| handle)
        .collect()
}
