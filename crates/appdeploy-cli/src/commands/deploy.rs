//! Deploy command - render a manifest folder and apply it

use console::style;
use std::path::PathBuf;
use std::sync::Arc;

use appdeploy_core::{Overrides, parse_set_values};
use appdeploy_engine::Engine;
use appdeploy_kube::{
    ConnectionConfig, DeployReport, Deployer, FolderSource, FolderTarget, KubeClusterApi, Kubectl,
    KubernetesTarget, default_kubeconfig_path, load_kubeconfig,
};

use crate::display;
use crate::error::{CliError, Result};

/// Options of one deploy run
#[derive(Debug, Clone, Default)]
pub struct DeployArgs {
    pub folder: PathBuf,
    pub context: Option<String>,
    pub kubeconfig: Option<PathBuf>,
    pub vars: Vec<String>,
    pub image_pull_secrets: Vec<String>,
    pub manage_cronjobs: bool,
    pub output_dir: Option<PathBuf>,
    pub kubectl: Option<PathBuf>,
}

impl DeployArgs {
    /// Overrides taken from the command line
    ///
    /// Flags that were not given leave the source's own settings alone.
    pub fn overrides(&self) -> Result<Overrides> {
        let mut overrides = Overrides::new().with_variables(parse_set_values(&self.vars)?);
        if !self.image_pull_secrets.is_empty() {
            overrides = overrides.with_image_pull_secrets(self.image_pull_secrets.clone());
        }
        if self.manage_cronjobs {
            overrides = overrides.with_manage_cronjobs(true);
        }
        Ok(overrides)
    }
}

/// Run the deploy command
pub async fn run(args: &DeployArgs) -> Result<DeployReport> {
    let source = FolderSource::new(&args.folder).map_err(|e| {
        CliError::source_with_help(e.to_string(), "pass the folder holding the .yaml templates")
    })?;

    let deployer = Deployer::new(Engine::default()).with_overrides(args.overrides()?);
    let source = Arc::new(source);

    let report = match &args.output_dir {
        Some(dir) => {
            println!(
                "{} Writing manifests from {} to {}",
                style("→").blue().bold(),
                style(args.folder.display()).cyan(),
                style(dir.display()).cyan()
            );
            deployer.run(source, FolderTarget::new(dir)).await?
        }
        None => {
            let target = kubernetes_target(args).await?;
            println!(
                "{} Deploying manifests from {}",
                style("→").blue().bold(),
                style(args.folder.display()).cyan()
            );
            deployer.run(source, target).await?
        }
    };

    display::print_report(&report);
    Ok(report)
}

async fn kubernetes_target(args: &DeployArgs) -> Result<KubernetesTarget> {
    let kubeconfig = args
        .kubeconfig
        .clone()
        .or_else(default_kubeconfig_path)
        .ok_or_else(|| {
            CliError::cluster_with_help("no kubeconfig found", "set $KUBECONFIG or pass --kubeconfig")
        })?;

    let context = args.context.as_deref();
    let loaded = load_kubeconfig(&kubeconfig)?;
    let connection = ConnectionConfig::resolve(&loaded, context)?.with_kubeconfig_path(&kubeconfig);
    tracing::debug!(
        kubeconfig = %kubeconfig.display(),
        context = connection.context.as_deref().unwrap_or_default(),
        server = connection.host.as_deref().unwrap_or_default(),
        "resolved cluster connection"
    );

    let mut kubectl = Kubectl::new(connection);
    if let Some(binary) = &args.kubectl {
        kubectl = kubectl.with_binary(binary);
    }

    let cluster = KubeClusterApi::from_kubeconfig(loaded, context).await?;

    Ok(KubernetesTarget::new(Arc::new(kubectl), Arc::new(cluster)))
}
