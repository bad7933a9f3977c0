//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use appdeploy_engine::{EngineError, TemplateError};
use appdeploy_kube::KubeError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Invalid user input (`--var`, variable values)
    #[error("Invalid input: {message}")]
    #[diagnostic(code(appdeploy::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Manifest folder missing, empty or unreadable
    #[error("Source error: {message}")]
    #[diagnostic(code(appdeploy::cli::source))]
    Source {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Template rendering failed, with the template diagnostic attached
    #[error("{summary}")]
    #[diagnostic(code(appdeploy::cli::template))]
    Template {
        summary: String,
        #[source]
        #[diagnostic_source]
        source: TemplateError,
    },

    /// Rendered output is not a usable manifest
    #[error("Manifest error: {message}")]
    #[diagnostic(
        code(appdeploy::cli::manifest),
        help("every template must render to one document with `kind` and `metadata.name`, or to nothing")
    )]
    Manifest { message: String },

    /// A target operation failed
    #[error("Deploy failed: {message}")]
    #[diagnostic(code(appdeploy::cli::deploy))]
    Deploy { message: String },

    /// Kubeconfig, API access or provisioning failed
    #[error("Cluster error: {message}")]
    #[diagnostic(code(appdeploy::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(appdeploy::cli::io))]
    Io { message: String },

    /// Anything else
    #[error("{message}")]
    #[diagnostic(code(appdeploy::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Source { .. } => exit_codes::SOURCE_ERROR,
            CliError::Template { .. } | CliError::Manifest { .. } => exit_codes::TEMPLATE_ERROR,
            CliError::Deploy { .. } => exit_codes::DEPLOY_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a source error with help text
    pub fn source_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a cluster error with help text
    pub fn cluster_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Cluster {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Pick the error category from the underlying cause
    fn classify(cause: &KubeError, message: String) -> Self {
        match cause {
            KubeError::EmptySource => Self::Source {
                message,
                help: Some("add at least one .yaml template to the folder".to_string()),
            },
            KubeError::UnknownItem { .. }
            | KubeError::InvalidEncoding { .. }
            | KubeError::InvalidConfig(_) => Self::Source {
                message,
                help: None,
            },
            KubeError::Render { .. } => Self::Manifest { message },
            KubeError::DuplicateManifest { .. } => Self::Source {
                message,
                help: Some("give each resource a distinct kind and metadata.name".to_string()),
            },
            KubeError::Core(_) => Self::Input {
                message,
                help: Some("`imagePullSecrets` must be a list of names, `manageCronjobs` a boolean".to_string()),
            },
            KubeError::Command { .. } => Self::Deploy { message },
            KubeError::Kubeconfig(_) => Self::Cluster {
                message,
                help: Some("check --kubeconfig and --context, or use --output-dir to write files instead".to_string()),
            },
            KubeError::Api(_) | KubeError::NotFound { .. } | KubeError::ProvisioningTimeout { .. } => {
                Self::Cluster {
                    message,
                    help: None,
                }
            }
            KubeError::Io(_) => Self::Io { message },
            _ => Self::Other { message },
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::ApplyFailed {
                failed,
                total,
                item,
                source,
            } => match *source {
                KubeError::Render {
                    source: EngineError::Template(template),
                    ..
                } => CliError::Template {
                    summary: format!(
                        "{} of {} manifest(s) failed, first failure in {}",
                        failed, total, item
                    ),
                    source: template,
                },
                cause => {
                    let message = format!(
                        "{} of {} manifest(s) failed, first failure in {}: {}",
                        failed, total, item, cause
                    );
                    Self::classify(&cause, message)
                }
            },
            other => {
                let message = other.to_string();
                Self::classify(&other, message)
            }
        }
    }
}

impl From<appdeploy_core::CoreError> for CliError {
    fn from(err: appdeploy_core::CoreError) -> Self {
        CliError::Input {
            message: err.to_string(),
            help: Some("use --var KEY=VALUE, e.g. --var replicas=3 or --var image.tag=v2".to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
