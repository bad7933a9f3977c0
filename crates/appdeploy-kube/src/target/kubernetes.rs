//! Control-plane target
//!
//! Manifests are applied with `kubectl apply -f -`; live objects of each
//! managed kind are listed with `kubectl get <kind> -o name` and orphans are
//! deleted by the exact reference kubectl printed. Namespace and image pull
//! secret provisioning go through the cluster API.

use async_trait::async_trait;
use std::sync::Arc;

use appdeploy_core::{CRONJOB_KIND, DEFAULT_NAMESPACE, ManagedKinds, Manifest, ProcessVariables};

use super::Target;
use crate::cluster::ClusterApi;
use crate::error::Result;
use crate::kubectl::CommandRunner;
use crate::reconcile::{AppliedSet, orphans};
use crate::retry::RetryPolicy;

/// Service account that receives the image pull secrets
pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// Applies manifests to a cluster
pub struct KubernetesTarget {
    runner: Arc<dyn CommandRunner>,
    cluster: Arc<dyn ClusterApi>,
    namespace: String,
    managed: ManagedKinds,
    retry: RetryPolicy,
}

impl KubernetesTarget {
    pub fn new(runner: Arc<dyn CommandRunner>, cluster: Arc<dyn ClusterApi>) -> Self {
        Self {
            runner,
            cluster,
            namespace: DEFAULT_NAMESPACE.to_string(),
            managed: ManagedKinds::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the managed-kind whitelist
    pub fn with_managed_kinds(mut self, managed: ManagedKinds) -> Self {
        self.managed = managed;
        self
    }

    /// Replace the service-account polling policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Namespace selected by the last `prepare`
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn kubectl(&self, stdin: Option<&[u8]>, args: &[&str]) -> Result<String> {
        let mut full = Vec::with_capacity(args.len() + 2);
        full.push("--namespace".to_string());
        full.push(self.namespace.clone());
        full.extend(args.iter().map(|a| a.to_string()));
        self.runner.run(stdin, &full).await
    }

    async fn ensure_namespace(&self) -> Result<()> {
        match self.cluster.get_namespace(&self.namespace).await {
            Ok(()) => {
                tracing::debug!(namespace = %self.namespace, "namespace exists");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::info!(namespace = %self.namespace, "creating namespace");
                self.cluster.create_namespace(&self.namespace).await
            }
            Err(e) => Err(e),
        }
    }

    async fn attach_pull_secrets(&self, secrets: &[String]) -> Result<()> {
        if secrets.is_empty() {
            return Ok(());
        }

        // The default account is created by a controller after the namespace
        let what = format!(
            "service account {}/{}",
            self.namespace, DEFAULT_SERVICE_ACCOUNT
        );
        let cluster = &self.cluster;
        let namespace = self.namespace.as_str();
        self.retry
            .poll(&what, || async move {
                let exists = cluster
                    .service_account_exists(namespace, DEFAULT_SERVICE_ACCOUNT)
                    .await?;
                Ok(exists.then_some(()))
            })
            .await?;

        tracing::info!(
            namespace = %self.namespace,
            secrets = %secrets.join(","),
            "attaching image pull secrets"
        );
        self.cluster
            .set_image_pull_secrets(&self.namespace, DEFAULT_SERVICE_ACCOUNT, secrets)
            .await
    }

    /// Cronjobs are replaced rather than patched
    async fn delete_existing(&self, manifest: &Manifest) -> Result<()> {
        let reference = manifest.cluster_ref();
        let found = self
            .kubectl(None, &["get", &reference, "-o", "name", "--ignore-not-found"])
            .await?;

        if !found.trim().is_empty() {
            tracing::debug!(resource = %reference, "deleting before re-create");
            self.kubectl(None, &["delete", &reference]).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Target for KubernetesTarget {
    async fn prepare(&mut self, vars: &ProcessVariables) -> Result<()> {
        self.namespace = vars.namespace.clone();
        self.managed = self.managed.clone().with_cronjobs(vars.manage_cronjobs);

        self.ensure_namespace().await?;
        self.attach_pull_secrets(&vars.image_pull_secrets).await
    }

    async fn apply(&self, manifest: &Manifest, raw: &[u8]) -> Result<()> {
        if manifest.kind_key() == CRONJOB_KIND {
            self.delete_existing(manifest).await?;
        }

        let output = self.kubectl(Some(raw), &["apply", "-f", "-"]).await?;
        tracing::debug!(resource = %manifest, output = %output.trim(), "applied");
        Ok(())
    }

    async fn cleanup(&self, applied: &[Manifest]) -> Result<Vec<Manifest>> {
        let applied = AppliedSet::new(applied);
        let mut deleted = Vec::new();

        for kind in self.managed.active() {
            let listed = self.kubectl(None, &["get", kind, "-o", "name"]).await?;

            let live = listed.lines().filter_map(|line| {
                let manifest = Manifest::from_cluster_ref(line)?;
                // Guard against listings that mix in other kinds
                (manifest.kind == kind).then(|| (manifest.clone(), (manifest, line.trim())))
            });

            for (manifest, reference) in orphans(live, &applied, &self.managed) {
                tracing::info!(resource = %reference, namespace = %self.namespace, "deleting orphan");
                self.kubectl(None, &["delete", reference]).await?;
                deleted.push(manifest);
            }
        }

        deleted.sort();
        Ok(deleted)
    }
}
