//! Filesystem target: writes manifests as files into one directory

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use appdeploy_core::{ManagedKinds, Manifest, ProcessVariables};

use super::Target;
use crate::error::Result;

/// Writes every manifest to `<dir>/<kind>--<name>.yaml`
#[derive(Debug, Clone)]
pub struct FolderTarget {
    path: PathBuf,
    managed: ManagedKinds,
}

/// A file in the output directory that carries a kind prefix
struct LiveFile {
    manifest: Manifest,
    filename: String,
    path: PathBuf,
}

impl FolderTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            managed: ManagedKinds::default(),
        }
    }

    /// Replace the managed-kind whitelist
    pub fn with_managed_kinds(mut self, managed: ManagedKinds) -> Self {
        self.managed = managed;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn live_files(&self) -> Result<Vec<LiveFile>> {
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        let mut live = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            // Files without a kind prefix are not ours
            if let Ok(manifest) = Manifest::from_filename(&filename) {
                live.push(LiveFile {
                    manifest,
                    filename,
                    path: entry.path(),
                });
            }
        }

        Ok(live)
    }
}

#[async_trait]
impl Target for FolderTarget {
    async fn prepare(&mut self, vars: &ProcessVariables) -> Result<()> {
        self.managed = self.managed.clone().with_cronjobs(vars.manage_cronjobs);
        tokio::fs::create_dir_all(&self.path).await?;
        tracing::debug!(path = %self.path.display(), "output directory ready");
        Ok(())
    }

    async fn apply(&self, manifest: &Manifest, raw: &[u8]) -> Result<()> {
        let path = manifest.path_in(&self.path);
        tokio::fs::write(&path, raw).await?;
        tracing::debug!(path = %path.display(), "wrote manifest");
        Ok(())
    }

    async fn cleanup(&self, applied: &[Manifest]) -> Result<Vec<Manifest>> {
        // Exact filename match: `service--web.yml` is stale even when
        // `service--web.yaml` was written in this run.
        let written: HashSet<String> = applied.iter().map(Manifest::filename).collect();

        let mut deleted = Vec::new();
        for file in self.live_files().await? {
            // Only lowercase prefixes are ever written, so `Service--x.yaml` is not ours
            let managed = self.managed.active().any(|kind| kind == file.manifest.kind);
            if !managed || written.contains(&file.filename) {
                continue;
            }
            tracing::info!(path = %file.path.display(), "deleting stale manifest file");
            tokio::fs::remove_file(&file.path).await?;
            deleted.push(file.manifest);
        }

        deleted.sort();
        Ok(deleted)
    }
}
