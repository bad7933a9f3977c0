//! Cluster API port used for namespace and service-account provisioning

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, ServiceAccount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use crate::error::{KubeError, Result};

/// Field manager name used for patches
pub const FIELD_MANAGER: &str = "appdeploy";

/// Provisioning operations against the cluster API
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Look up a namespace
    ///
    /// A missing namespace is an error for which
    /// [`KubeError::is_not_found`] returns true.
    async fn get_namespace(&self, name: &str) -> Result<()>;

    /// Create a namespace
    async fn create_namespace(&self, name: &str) -> Result<()>;

    /// Whether a service account exists
    async fn service_account_exists(&self, namespace: &str, name: &str) -> Result<bool>;

    /// Replace the image pull secrets of a service account
    async fn set_image_pull_secrets(
        &self,
        namespace: &str,
        account: &str,
        secrets: &[String],
    ) -> Result<()>;
}

/// [`ClusterApi`] backed by a kube-rs client
#[derive(Clone)]
pub struct KubeClusterApi {
    client: kube::Client,
}

impl KubeClusterApi {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    /// Connect using an already loaded kubeconfig
    pub async fn from_kubeconfig(kubeconfig: Kubeconfig, context: Option<&str>) -> Result<Self> {
        let options = KubeConfigOptions {
            context: context.map(str::to_string),
            ..Default::default()
        };

        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(|e| KubeError::Kubeconfig(e.to_string()))?;

        Ok(Self::new(kube::Client::try_from(config)?))
    }

    pub fn client(&self) -> &kube::Client {
        &self.client
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn get_namespace(&self, name: &str) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.get(name).await.map_err(KubeError::Api)?;
        Ok(())
    }

    async fn create_namespace(&self, name: &str) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        api.create(&PostParams::default(), &namespace)
            .await
            .map_err(KubeError::Api)?;
        Ok(())
    }

    async fn service_account_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await.map_err(KubeError::Api)?.is_some())
    }

    async fn set_image_pull_secrets(
        &self,
        namespace: &str,
        account: &str,
        secrets: &[String],
    ) -> Result<()> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        let refs: Vec<serde_json::Value> = secrets
            .iter()
            .map(|name| serde_json::json!({ "name": name }))
            .collect();
        let patch = serde_json::json!({ "imagePullSecrets": refs });

        api.patch(
            account,
            &PatchParams {
                field_manager: Some(FIELD_MANAGER.to_string()),
                ..Default::default()
            },
            &Patch::Merge(&patch),
        )
        .await
        .map_err(KubeError::Api)?;
        Ok(())
    }
}

/// Counts of operations performed, for assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClusterCounts {
    pub namespace_gets: usize,
    pub namespace_creates: usize,
    pub account_lookups: usize,
    pub secret_patches: usize,
}

#[derive(Debug, Default)]
struct MockClusterState {
    namespaces: BTreeSet<String>,
    /// `(namespace, account)` -> image pull secrets
    accounts: BTreeMap<(String, String), Vec<String>>,
    /// Account lookups that still miss before the default account shows up
    account_delay: usize,
    /// Namespace lookups fail with this message instead of not-found
    namespace_error: Option<String>,
    counts: ClusterCounts,
}

/// In-memory [`ClusterApi`]
///
/// Creating a namespace also creates its `default` service account, which
/// becomes visible only after the configured number of lookups.
#[derive(Debug, Clone, Default)]
pub struct MockClusterApi {
    state: Arc<RwLock<MockClusterState>>,
}

impl MockClusterApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing namespace (and its default account)
    pub fn with_namespace(self, name: &str) -> Self {
        {
            let mut state = self.state.write().unwrap();
            state.namespaces.insert(name.to_string());
            state
                .accounts
                .insert((name.to_string(), "default".to_string()), Vec::new());
        }
        self
    }

    /// Hide service accounts for the first `misses` lookups
    pub fn with_account_delay(self, misses: usize) -> Self {
        self.state.write().unwrap().account_delay = misses;
        self
    }

    /// Fail namespace lookups with a non not-found error
    pub fn with_namespace_error(self, message: &str) -> Self {
        self.state.write().unwrap().namespace_error = Some(message.to_string());
        self
    }

    /// Never show any service account
    pub fn without_accounts(self) -> Self {
        self.with_account_delay(usize::MAX)
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.state.read().unwrap().namespaces.iter().cloned().collect()
    }

    /// Image pull secrets attached to an account
    pub fn image_pull_secrets(&self, namespace: &str, account: &str) -> Option<Vec<String>> {
        self.state
            .read()
            .unwrap()
            .accounts
            .get(&(namespace.to_string(), account.to_string()))
            .cloned()
    }

    pub fn operation_counts(&self) -> ClusterCounts {
        self.state.read().unwrap().counts.clone()
    }
}

#[async_trait]
impl ClusterApi for MockClusterApi {
    async fn get_namespace(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.counts.namespace_gets += 1;

        if let Some(message) = &state.namespace_error {
            return Err(KubeError::InvalidConfig(message.clone()));
        }
        if state.namespaces.contains(name) {
            Ok(())
        } else {
            Err(KubeError::NotFound {
                kind: "namespace".to_string(),
                name: name.to_string(),
            })
        }
    }

    async fn create_namespace(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.counts.namespace_creates += 1;
        state.namespaces.insert(name.to_string());
        state
            .accounts
            .entry((name.to_string(), "default".to_string()))
            .or_default();
        Ok(())
    }

    async fn service_account_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        let mut state = self.state.write().unwrap();
        state.counts.account_lookups += 1;

        if state.account_delay > 0 {
            state.account_delay -= 1;
            return Ok(false);
        }
        Ok(state
            .accounts
            .contains_key(&(namespace.to_string(), name.to_string())))
    }

    async fn set_image_pull_secrets(
        &self,
        namespace: &str,
        account: &str,
        secrets: &[String],
    ) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.counts.secret_patches += 1;

        match state
            .accounts
            .get_mut(&(namespace.to_string(), account.to_string()))
        {
            Some(current) => {
                *current = secrets.to_vec();
                Ok(())
            }
            None => Err(KubeError::NotFound {
                kind: "serviceaccount".to_string(),
                name: format!("{}/{}", namespace, account),
            }),
        }
    }
}
