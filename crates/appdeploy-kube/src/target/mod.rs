//! Deployment targets
//!
//! A target receives rendered manifests and removes the ones that are no
//! longer produced. The lifecycle of one run is:
//!
//! 1. [`Target::prepare`] once, before any manifest is applied
//! 2. [`Target::apply`] once per manifest, possibly concurrently
//! 3. [`Target::cleanup`] once, with every identity applied in the run
//!
//! Cleanup is never called when an apply failed.

mod folder;
mod kubernetes;
mod mock;

pub use folder::FolderTarget;
pub use kubernetes::KubernetesTarget;
pub use mock::{MockTarget, TargetCounts};

use async_trait::async_trait;

use appdeploy_core::{Manifest, ProcessVariables};

use crate::error::Result;

/// Destination for rendered manifests
#[async_trait]
pub trait Target: Send + Sync {
    /// Get the destination ready for the run
    async fn prepare(&mut self, vars: &ProcessVariables) -> Result<()>;

    /// Apply one manifest; `raw` is the rendered document, untouched
    async fn apply(&self, manifest: &Manifest, raw: &[u8]) -> Result<()>;

    /// Delete managed objects that are not in `applied`
    ///
    /// Returns the identities that were removed.
    async fn cleanup(&self, applied: &[Manifest]) -> Result<Vec<Manifest>>;
}
