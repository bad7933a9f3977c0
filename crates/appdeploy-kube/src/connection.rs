//! Cluster connection settings resolved from a kubeconfig file
//!
//! The file is parsed once with kube's [`Kubeconfig`]; the same value feeds
//! the `kubectl` connection flags built here and the API client in
//! [`crate::cluster`]. Only the selected context, its cluster (server + CA)
//! and its user (client certificate, key, bearer token) are used.

use kube::config::{Kubeconfig, NamedAuthInfo, NamedCluster};
use secrecy::ExposeSecret;
use std::path::{Path, PathBuf};

use crate::error::{KubeError, Result};

/// Environment variable pointing at the kubeconfig file(s)
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Connection settings for one cluster/user pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Kubeconfig file the settings came from
    pub kubeconfig: Option<PathBuf>,
    /// Selected context
    pub context: Option<String>,
    /// API server URL
    pub host: Option<String>,
    /// CA bundle for the API server
    pub ca_file: Option<PathBuf>,
    /// Client certificate
    pub cert_file: Option<PathBuf>,
    /// Client key
    pub key_file: Option<PathBuf>,
    /// Bearer token
    pub token: Option<String>,
}

/// Default kubeconfig location: first entry of `$KUBECONFIG`, else `~/.kube/config`
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    if let Some(paths) = std::env::var_os(KUBECONFIG_ENV) {
        if let Some(first) = std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()) {
            return Some(first);
        }
    }
    dirs::home_dir().map(|home| home.join(".kube").join("config"))
}

/// Read a kubeconfig file
///
/// Relative certificate and key paths come back resolved against the
/// file's directory.
pub fn load_kubeconfig(path: impl AsRef<Path>) -> Result<Kubeconfig> {
    Kubeconfig::read_from(path.as_ref()).map_err(|e| KubeError::Kubeconfig(e.to_string()))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl ConnectionConfig {
    /// Resolve settings for `context` (or the current context) from a loaded kubeconfig
    pub fn resolve(kubeconfig: &Kubeconfig, context: Option<&str>) -> Result<Self> {
        let context_name = non_empty(context)
            .or_else(|| non_empty(kubeconfig.current_context.as_deref()))
            .ok_or_else(|| {
                KubeError::Kubeconfig("no context given and no current-context set".to_string())
            })?;

        let Some(named) = kubeconfig.contexts.iter().find(|c| c.name == context_name) else {
            let known: Vec<&str> = kubeconfig.contexts.iter().map(|c| c.name.as_str()).collect();
            return Err(KubeError::Kubeconfig(format!(
                "Unknown context: {}, should be one of: {}",
                context_name,
                known.join(", ")
            )));
        };

        let cluster_name = named.context.as_ref().map(|c| c.cluster.as_str()).unwrap_or_default();
        let cluster = kubeconfig
            .clusters
            .iter()
            .find(|c| c.name == cluster_name)
            .and_then(|c: &NamedCluster| c.cluster.as_ref())
            .ok_or_else(|| {
                KubeError::Kubeconfig(format!(
                    "Badly configured context, unknown cluster: {}",
                    cluster_name
                ))
            })?;

        let user_name = named
            .context
            .as_ref()
            .and_then(|c| c.user.as_deref())
            .unwrap_or_default();
        let auth = kubeconfig
            .auth_infos
            .iter()
            .find(|a| a.name == user_name)
            .ok_or_else(|| {
                KubeError::Kubeconfig(format!(
                    "Badly configured context, unknown auth: {}",
                    user_name
                ))
            })
            .map(|a: &NamedAuthInfo| a.auth_info.clone().unwrap_or_default())?;

        let file = |value: Option<&String>| non_empty(value.map(String::as_str)).map(PathBuf::from);

        Ok(Self {
            kubeconfig: None,
            context: Some(context_name.to_string()),
            host: non_empty(cluster.server.as_deref()).map(str::to_string),
            ca_file: file(cluster.certificate_authority.as_ref()),
            cert_file: file(auth.client_certificate.as_ref()),
            key_file: file(auth.client_key.as_ref()),
            token: auth
                .token
                .as_ref()
                .map(|t| t.expose_secret().to_string())
                .filter(|t| !t.is_empty()),
        })
    }

    /// Record the kubeconfig file the settings were read from
    pub fn with_kubeconfig_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Connection flags to prepend to every kubectl invocation
    pub fn kubectl_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut push = |flag: &str, value: Option<String>| {
            if let Some(value) = value {
                args.push(flag.to_string());
                args.push(value);
            }
        };

        let path = |p: &Option<PathBuf>| p.as_ref().map(|p| p.display().to_string());

        push("--kubeconfig", path(&self.kubeconfig));
        push("--context", self.context.clone());
        push("--server", self.host.clone());
        push("--certificate-authority", path(&self.ca_file));
        push("--client-certificate", path(&self.cert_file));
        push("--client-key", path(&self.key_file));
        push("--token", self.token.clone());

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
  - name: dev-cluster
    cluster:
      server: https://dev.example.com:6443
      certificate-authority: ca.crt
  - name: prod-cluster
    cluster:
      server: https://prod.example.com
      certificate-authority: /etc/prod/ca.crt
users:
  - name: dev-user
    user:
      client-certificate: dev.crt
      client-key: dev.key
  - name: prod-user
    user:
      token: s3cr3t
contexts:
  - name: dev
    context:
      cluster: dev-cluster
      user: dev-user
  - name: prod
    context:
      cluster: prod-cluster
      user: prod-user
  - name: broken-cluster
    context:
      cluster: nope
      user: dev-user
  - name: broken-user
    context:
      cluster: dev-cluster
      user: nope
"#;

    fn resolve(context: Option<&str>) -> Result<ConnectionConfig> {
        ConnectionConfig::resolve(&Kubeconfig::from_yaml(KUBECONFIG).unwrap(), context)
    }

    #[test]
    fn test_current_context() {
        let config = resolve(None).unwrap();

        assert_eq!(config.context.as_deref(), Some("dev"));
        assert_eq!(config.host.as_deref(), Some("https://dev.example.com:6443"));
        assert_eq!(config.ca_file, Some(PathBuf::from("ca.crt")));
        assert_eq!(config.cert_file, Some(PathBuf::from("dev.crt")));
        assert_eq!(config.key_file, Some(PathBuf::from("dev.key")));
        assert_eq!(config.token, None);
        assert_eq!(config.kubeconfig, None);
    }

    #[test]
    fn test_explicit_context() {
        let config = resolve(Some("prod")).unwrap();

        assert_eq!(config.host.as_deref(), Some("https://prod.example.com"));
        assert_eq!(config.ca_file, Some(PathBuf::from("/etc/prod/ca.crt")));
        assert_eq!(config.token.as_deref(), Some("s3cr3t"));
        assert_eq!(config.cert_file, None);
    }

    #[test]
    fn test_unknown_context() {
        let err = resolve(Some("staging"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("Unknown context: staging"));
        assert!(err.contains("dev, prod"));
    }

    #[test]
    fn test_badly_configured_context() {
        let err = resolve(Some("broken-cluster"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("unknown cluster"));

        let err = resolve(Some("broken-user"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("unknown auth"));
    }

    #[test]
    fn test_no_context() {
        let kubeconfig = Kubeconfig::from_yaml("apiVersion: v1\nkind: Config\ncontexts: []\n").unwrap();
        assert!(ConnectionConfig::resolve(&kubeconfig, None).is_err());
    }

    #[test]
    fn test_kubectl_args() {
        let config = resolve(Some("prod")).unwrap();
        assert_eq!(
            config.kubectl_args(),
            vec![
                "--context",
                "prod",
                "--server",
                "https://prod.example.com",
                "--certificate-authority",
                "/etc/prod/ca.crt",
                "--token",
                "s3cr3t",
            ]
        );

        assert!(ConnectionConfig::default().kubectl_args().is_empty());
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, KUBECONFIG).unwrap();

        let kubeconfig = load_kubeconfig(&path).unwrap();
        let config = ConnectionConfig::resolve(&kubeconfig, None)
            .unwrap()
            .with_kubeconfig_path(&path);
        assert_eq!(config.kubeconfig.as_deref(), Some(path.as_path()));
        assert_eq!(config.ca_file, Some(dir.path().join("ca.crt")));
        assert_eq!(config.cert_file, Some(dir.path().join("dev.crt")));

        let args = config.kubectl_args();
        assert_eq!(args[0], "--kubeconfig");
        assert_eq!(args[2], "--context");
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_kubeconfig(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, KubeError::Kubeconfig(_)));
    }
}
