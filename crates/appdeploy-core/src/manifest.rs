//! Manifest identity and the rendered manifest envelope
//!
//! A [`Manifest`] is the minimal identity of a rendered resource: its kind and
//! name. Everything else in the document is opaque and travels untouched inside
//! a [`RenderedManifest`].
//!
//! Two string forms are derived from the identity:
//! - the file stem `lowercase(kind)--name` (plus `.yaml` for files), which is
//!   the only on-disk contract and is parsed back during cleanup
//! - the cluster reference `lowercase(kind)/name`, matching `kubectl -o name`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Separator between kind and name in manifest filenames
pub const FILENAME_SEPARATOR: &str = "--";

/// Extension used for written manifest files
pub const MANIFEST_EXTENSION: &str = "yaml";

/// Identity of a rendered resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Manifest {
    /// Resource kind as written in the document (e.g. `Service`)
    pub kind: String,
    /// `metadata.name` of the resource
    pub name: String,
}

impl Manifest {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Lowercased kind, used for managed-kind matching
    pub fn kind_key(&self) -> String {
        self.kind.to_lowercase()
    }

    /// `lowercase(kind)--name`
    pub fn file_stem(&self) -> String {
        format!("{}{}{}", self.kind_key(), FILENAME_SEPARATOR, self.name)
    }

    /// `lowercase(kind)--name.yaml`
    pub fn filename(&self) -> String {
        format!("{}.{}", self.file_stem(), MANIFEST_EXTENSION)
    }

    /// Full path of the manifest file inside `folder`
    pub fn path_in(&self, folder: impl AsRef<Path>) -> PathBuf {
        folder.as_ref().join(self.filename())
    }

    /// `lowercase(kind)/name`, as printed by `kubectl get <kind> -o name`
    pub fn cluster_ref(&self) -> String {
        format!("{}/{}", self.kind_key(), self.name)
    }

    /// Recover the identity from a manifest filename
    ///
    /// The kind is everything before the first `--`, the name everything after
    /// it up to the `.yaml` extension. Names that themselves contain `--` are
    /// kept as-is in the name part.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let stem = filename
            .strip_suffix(".yaml")
            .or_else(|| filename.strip_suffix(".yml"))
            .unwrap_or(filename);

        match stem.split_once(FILENAME_SEPARATOR) {
            Some((kind, name)) if !kind.is_empty() && !name.is_empty() => {
                Ok(Self::new(kind, name))
            }
            _ => Err(CoreError::InvalidFilename {
                name: filename.to_string(),
            }),
        }
    }

    /// Recover the identity from a `kubectl -o name` line
    ///
    /// Handles both `deployment/web` and the group-qualified
    /// `deployment.apps/web` forms; the kind comes back lowercased.
    pub fn from_cluster_ref(line: &str) -> Option<Self> {
        let (resource, name) = line.trim().split_once('/')?;
        let kind = resource.split('.').next().unwrap_or(resource);
        if kind.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(kind.to_lowercase(), name))
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cluster_ref())
    }
}

/// A rendered document together with its identity
///
/// The raw bytes are exactly what the renderer produced (after trimming) and
/// are handed to targets without re-serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedManifest {
    pub manifest: Manifest,
    pub raw: Vec<u8>,
}

impl RenderedManifest {
    pub fn new(manifest: Manifest, raw: impl Into<Vec<u8>>) -> Self {
        Self {
            manifest,
            raw: raw.into(),
        }
    }

    /// Raw content as text (lossy for non UTF-8 input)
    pub fn content(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }
}
