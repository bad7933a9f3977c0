//! Error types for appdeploy-kube

use thiserror::Error;

/// Result type for appdeploy-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while deploying a manifest folder
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// The source resolved to zero manifests
    #[error("Cowardly refusing a source with 0 manifests, this would delete everything")]
    EmptySource,

    /// A source item does not exist
    #[error("unknown source item: {name}")]
    UnknownItem { name: String },

    /// A source item is not valid UTF-8 text
    #[error("template is not valid UTF-8")]
    InvalidEncoding { name: String },

    /// Rendering or identification of a single item failed
    ///
    /// Only ever reported inside [`KubeError::ApplyFailed`], which names the item.
    #[error("{source}")]
    Render {
        item: String,
        #[source]
        source: appdeploy_engine::EngineError,
    },

    /// One or more items failed during the apply pass
    #[error("{failed} of {total} manifest(s) failed, first failure in {item}: {source}")]
    ApplyFailed {
        failed: usize,
        total: usize,
        item: String,
        #[source]
        source: Box<KubeError>,
    },

    /// Several items rendered to the same resource
    #[error("{manifest} is produced by several items: {}", .items.join(", "))]
    DuplicateManifest {
        manifest: appdeploy_core::Manifest,
        items: Vec<String>,
    },

    /// External command failed, output captured verbatim
    #[error("{program} {command} failed: {message}")]
    Command {
        program: String,
        command: String,
        message: String,
    },

    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Resource lookup came back empty
    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    /// A resource never became visible within the retry budget
    #[error("{what} did not become available after {attempts} attempt(s)")]
    ProvisioningTimeout { what: String, attempts: u32 },

    /// Kubeconfig could not be read or resolved
    #[error("kubeconfig error: {0}")]
    Kubeconfig(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An apply task panicked
    #[error("apply task panicked: {0}")]
    TaskPanicked(String),

    /// Variables or manifest identity error
    #[error(transparent)]
    Core(#[from] appdeploy_core::CoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KubeError {
    /// Wrap a render/identification error with the item it came from
    pub fn render(item: impl Into<String>, source: appdeploy_engine::EngineError) -> Self {
        KubeError::Render {
            item: item.into(),
            source,
        }
    }

    /// Check if this is a "not found" lookup error
    pub fn is_not_found(&self) -> bool {
        match self {
            KubeError::NotFound { .. } => true,
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 404,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        let err = KubeError::NotFound {
            kind: "namespace".to_string(),
            name: "staging".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!KubeError::EmptySource.is_not_found());
    }

    #[test]
    fn test_api_not_found() {
        let err = KubeError::Api(kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: "namespaces \"staging\" not found".to_string(),
            reason: "NotFound".to_string(),
            code: 404,
        }));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_empty_source_message() {
        assert!(KubeError::EmptySource.to_string().contains("0 manifests"));
    }

    #[test]
    fn test_command_message() {
        let err = KubeError::Command {
            program: "kubectl".to_string(),
            command: "get service -o name".to_string(),
            message: "exit status: 1, error: Unauthorized".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "kubectl get service -o name failed: exit status: 1, error: Unauthorized"
        );
    }
}
