//! In-memory target for testing
//!
//! Records every call so tests can assert on the run lifecycle without a
//! filesystem or a cluster.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use appdeploy_core::{ManagedKinds, Manifest, ProcessVariables};

use super::Target;
use crate::error::{KubeError, Result};
use crate::reconcile::{AppliedSet, orphans};

/// Counts of target calls for assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TargetCounts {
    pub prepares: usize,
    pub applies: usize,
    pub cleanups: usize,
}

#[derive(Debug, Default)]
struct MockTargetState {
    /// Objects currently held, by identity
    objects: BTreeMap<Manifest, Vec<u8>>,
    /// Namespace from the last prepare
    namespace: Option<String>,
    managed: ManagedKinds,
    /// Names whose apply fails
    failing: Vec<String>,
    /// Identities passed to the last cleanup
    last_cleanup: Option<Vec<Manifest>>,
    counts: TargetCounts,
}

/// Target keeping manifests in memory
#[derive(Debug, Clone, Default)]
pub struct MockTarget {
    state: Arc<RwLock<MockTargetState>>,
}

impl MockTarget {
    /// Create a new empty mock target
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with pre-existing objects (identity only)
    pub fn with_objects(self, objects: &[Manifest]) -> Self {
        {
            let mut state = self.state.write().unwrap();
            for m in objects {
                state.objects.insert(normalize(m), Vec::new());
            }
        }
        self
    }

    /// Fail applies of the manifest with this name
    pub fn fail_on(self, name: &str) -> Self {
        self.state.write().unwrap().failing.push(name.to_string());
        self
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> TargetCounts {
        self.state.read().unwrap().counts.clone()
    }

    /// Objects currently held, sorted
    pub fn objects(&self) -> Vec<Manifest> {
        self.state.read().unwrap().objects.keys().cloned().collect()
    }

    /// Content held for one object, by `kind--name.yaml` filename
    pub fn content(&self, filename: &str) -> Option<String> {
        self.state
            .read()
            .unwrap()
            .objects
            .iter()
            .find(|(m, _)| m.filename() == filename)
            .map(|(_, raw)| String::from_utf8_lossy(raw).into_owned())
    }

    pub fn namespace(&self) -> Option<String> {
        self.state.read().unwrap().namespace.clone()
    }

    /// Applied set handed to the last cleanup
    pub fn last_cleanup(&self) -> Option<Vec<Manifest>> {
        self.state.read().unwrap().last_cleanup.clone()
    }
}

fn normalize(m: &Manifest) -> Manifest {
    Manifest::new(m.kind_key(), m.name.clone())
}

#[async_trait]
impl Target for MockTarget {
    async fn prepare(&mut self, vars: &ProcessVariables) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.counts.prepares += 1;
        state.namespace = Some(vars.namespace.clone());
        state.managed = ManagedKinds::for_variables(vars);
        Ok(())
    }

    async fn apply(&self, manifest: &Manifest, raw: &[u8]) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.counts.applies += 1;

        if state.failing.contains(&manifest.name) {
            return Err(KubeError::Command {
                program: "mock".to_string(),
                command: format!("apply {}", manifest),
                message: "injected failure".to_string(),
            });
        }

        state.objects.insert(normalize(manifest), raw.to_vec());
        Ok(())
    }

    async fn cleanup(&self, applied: &[Manifest]) -> Result<Vec<Manifest>> {
        let mut state = self.state.write().unwrap();
        state.counts.cleanups += 1;
        state.last_cleanup = Some(applied.to_vec());

        let applied = AppliedSet::new(applied);
        let live = state.objects.keys().map(|m| (m.clone(), m.clone()));
        let mut deleted = orphans(live, &applied, &state.managed);
        for m in &deleted {
            state.objects.remove(m);
        }

        deleted.sort();
        Ok(deleted)
    }
}
