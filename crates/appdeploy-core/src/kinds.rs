//! Managed kinds: the whitelist of resource kinds subject to reconciliation
//!
//! Resources of any other kind are never listed or deleted during cleanup,
//! even when they no longer appear in the manifest set.

use crate::variables::ProcessVariables;

/// Kind gated behind the cronjob-management flag
pub const CRONJOB_KIND: &str = "cronjob";

/// Kinds reconciled by default
pub const DEFAULT_MANAGED_KINDS: &[&str] = &["deployment", "service", "secret", CRONJOB_KIND];

/// Ordered set of lowercase kind names subject to reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedKinds {
    kinds: Vec<String>,
    manage_cronjobs: bool,
}

impl Default for ManagedKinds {
    fn default() -> Self {
        Self::new(DEFAULT_MANAGED_KINDS.iter().copied())
    }
}

impl ManagedKinds {
    /// Create a whitelist from kind names (case-insensitive, duplicates dropped)
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for kind in kinds {
            let kind = kind.as_ref().to_lowercase();
            if !unique.contains(&kind) {
                unique.push(kind);
            }
        }
        Self {
            kinds: unique,
            manage_cronjobs: false,
        }
    }

    /// Default whitelist with cronjob handling taken from the run's variables
    pub fn for_variables(vars: &ProcessVariables) -> Self {
        Self::default().with_cronjobs(vars.manage_cronjobs)
    }

    /// Enable or disable reconciliation of cronjobs
    pub fn with_cronjobs(mut self, manage: bool) -> Self {
        self.manage_cronjobs = manage;
        self
    }

    /// Kinds that are reconciled in this run, in whitelist order
    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.kinds
            .iter()
            .map(String::as_str)
            .filter(|kind| self.manage_cronjobs || *kind != CRONJOB_KIND)
    }

    /// Whether `kind` is reconciled in this run
    pub fn is_managed(&self, kind: &str) -> bool {
        let kind = kind.to_lowercase();
        self.active().any(|k| k == kind)
    }
}
