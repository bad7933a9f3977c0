//! Manifest sources
//!
//! A source is a named collection of template items plus a variable map. The
//! folder source treats every `.yaml`/`.yml` file in one directory as an item,
//! except `variables.yaml` (or `variables.yml`), which holds the variables.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use appdeploy_core::Values;

use crate::error::{KubeError, Result};

/// Reserved files holding the source's variable map; at most one may exist
pub const VARIABLES_FILES: &[&str] = &["variables.yaml", "variables.yml"];

/// Extensions recognized as template items
pub const TEMPLATE_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Provider of template items and variables
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Names of all template items
    async fn names(&self) -> Result<Vec<String>>;

    /// Raw content of one item
    async fn get(&self, name: &str) -> Result<Vec<u8>>;

    /// The source's variable map (empty when it defines none)
    async fn variables(&self) -> Result<Values>;
}

#[async_trait]
impl<S: ManifestSource + ?Sized> ManifestSource for Arc<S> {
    async fn names(&self) -> Result<Vec<String>> {
        (**self).names().await
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>> {
        (**self).get(name).await
    }

    async fn variables(&self) -> Result<Values> {
        (**self).variables().await
    }
}

/// Source backed by a single directory (non-recursive)
#[derive(Debug, Clone)]
pub struct FolderSource {
    path: PathBuf,
}

impl FolderSource {
    /// Open a folder source, failing if `path` is not a readable directory
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_dir() {
            return Err(KubeError::InvalidConfig(format!(
                "source folder {} does not exist or is not a directory",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_template(name: &str) -> bool {
        if VARIABLES_FILES.contains(&name) {
            return false;
        }
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
    }

    fn item_path(&self, name: &str) -> Result<PathBuf> {
        // Items are plain file names; anything with a path component is foreign
        if name.contains('/') || name.contains('\\') || !Self::is_template(name) {
            return Err(KubeError::UnknownItem {
                name: name.to_string(),
            });
        }
        Ok(self.path.join(name))
    }
}

#[async_trait]
impl ManifestSource for FolderSource {
    async fn names(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
                continue;
            };
            if Self::is_template(&name) {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.item_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(KubeError::UnknownItem {
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn variables(&self) -> Result<Values> {
        let present: Vec<PathBuf> = VARIABLES_FILES
            .iter()
            .map(|name| self.path.join(name))
            .filter(|path| path.is_file())
            .collect();

        let path = match present.as_slice() {
            [] => return Ok(Values::new()),
            [path] => path,
            _ => {
                return Err(KubeError::InvalidConfig(format!(
                    "{} holds both {}, keep only one",
                    self.path.display(),
                    VARIABLES_FILES.join(" and ")
                )));
            }
        };
        tracing::debug!(path = %path.display(), "reading variables");
        let content = tokio::fs::read_to_string(path).await?;
        Ok(Values::from_yaml(&content)?)
    }
}

/// In-memory source, used by tests and embedders
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    items: BTreeMap<String, Vec<u8>>,
    variables: Values,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template item
    pub fn with_item(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.items.insert(name.into(), content.into());
        self
    }

    /// Set the variable map
    pub fn with_variables(mut self, variables: Values) -> Self {
        self.variables = variables;
        self
    }
}

#[async_trait]
impl ManifestSource for MemorySource {
    async fn names(&self) -> Result<Vec<String>> {
        Ok(self.items.keys().cloned().collect())
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>> {
        self.items
            .get(name)
            .cloned()
            .ok_or_else(|| KubeError::UnknownItem {
                name: name.to_string(),
            })
    }

    async fn variables(&self) -> Result<Values> {
        Ok(self.variables.clone())
    }
}
