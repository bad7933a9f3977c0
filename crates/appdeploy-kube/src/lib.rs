//! appdeploy Kube - deploying manifest folders to Kubernetes
//!
//! This crate provides:
//! - **Sources**: where templates and variables come from ([`FolderSource`])
//! - **Targets**: where rendered manifests go ([`KubernetesTarget`], [`FolderTarget`])
//! - **Deployer**: concurrent render/apply followed by orphan cleanup
//! - **Ports**: [`CommandRunner`] for kubectl and [`ClusterApi`] for provisioning,
//!   each with an in-memory implementation for tests

pub mod cluster;
pub mod connection;
pub mod deploy;
pub mod error;
pub mod kubectl;
pub mod reconcile;
pub mod retry;
pub mod source;
pub mod target;

pub use cluster::{ClusterApi, ClusterCounts, KubeClusterApi, MockClusterApi};
pub use connection::{ConnectionConfig, default_kubeconfig_path, load_kubeconfig};
pub use deploy::{ApplyOutcome, DeployReport, Deployer, apply_all};
pub use error::{KubeError, Result};
pub use kubectl::{CommandRunner, Kubectl, MockCommandRunner, RecordedCall};
pub use reconcile::{AppliedSet, orphans};
pub use retry::RetryPolicy;
pub use source::{FolderSource, ManifestSource, MemorySource};
pub use target::{FolderTarget, KubernetesTarget, MockTarget, Target, TargetCounts};
