//! Variable resolution
//!
//! Source-declared variables and explicit overrides are merged into a single
//! [`ProcessVariables`], which is then frozen for the rest of the run. A few
//! keys are special and drive the deployment itself:
//!
//! - `namespace`: destination namespace (string, defaults to `default`)
//! - `imagePullSecrets`: secrets attached to the default service account
//! - `manageCronjobs`: whether cronjobs take part in reconciliation

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};
use crate::values::Values;

/// Namespace used when no variable selects one
pub const DEFAULT_NAMESPACE: &str = "default";

pub const NAMESPACE_KEY: &str = "namespace";
pub const IMAGE_PULL_SECRETS_KEY: &str = "imagePullSecrets";
pub const MANAGE_CRONJOBS_KEY: &str = "manageCronjobs";

/// Resolved variables for one run
///
/// Serialized field names are the names templates see at the top level of
/// their context (`namespace`, `variables.<key>`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessVariables {
    /// Destination namespace
    pub namespace: String,

    /// Image pull secrets for the default service account
    pub image_pull_secrets: Vec<String>,

    /// Include cronjobs in reconciliation
    pub manage_cronjobs: bool,

    /// Free-form variables (source merged with overrides)
    pub variables: Values,
}

impl Default for ProcessVariables {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            image_pull_secrets: Vec::new(),
            manage_cronjobs: false,
            variables: Values::new(),
        }
    }
}

impl ProcessVariables {
    /// Resolve variables from the source and the run's overrides
    ///
    /// Overrides win over source-declared values for identical keys. The
    /// image-pull-secret list and the cronjob flag from `overrides` replace
    /// whatever the source declared.
    pub fn resolve(source: Values, overrides: &Overrides) -> Result<Self> {
        let mut variables = source;
        variables.merge(&overrides.variables);

        let namespace = match variables.get_key(NAMESPACE_KEY) {
            Some(JsonValue::String(ns)) if !ns.is_empty() => ns.clone(),
            _ => DEFAULT_NAMESPACE.to_string(),
        };

        let image_pull_secrets = match &overrides.image_pull_secrets {
            Some(secrets) => secrets.clone(),
            None => string_list(&variables, IMAGE_PULL_SECRETS_KEY)?,
        };

        let manage_cronjobs = match overrides.manage_cronjobs {
            Some(flag) => flag,
            None => bool_flag(&variables, MANAGE_CRONJOBS_KEY)?,
        };

        Ok(Self {
            namespace,
            image_pull_secrets,
            manage_cronjobs,
            variables,
        })
    }

    /// Look up a free-form variable by top-level key
    pub fn variable(&self, key: &str) -> Option<&JsonValue> {
        self.variables.get_key(key)
    }
}

fn string_list(values: &Values, key: &str) -> Result<Vec<String>> {
    match values.get_key(key) {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| CoreError::InvalidVariable {
                        key: key.to_string(),
                        message: format!("expected a list of strings, found {}", item),
                    })
            })
            .collect(),
        Some(other) => Err(CoreError::InvalidVariable {
            key: key.to_string(),
            message: format!("expected a list of strings, found {}", other),
        }),
    }
}

fn bool_flag(values: &Values, key: &str) -> Result<bool> {
    match values.get_key(key) {
        None | Some(JsonValue::Null) => Ok(false),
        Some(JsonValue::Bool(flag)) => Ok(*flag),
        Some(other) => Err(CoreError::InvalidVariable {
            key: key.to_string(),
            message: format!("expected a boolean, found {}", other),
        }),
    }
}

/// Explicit overrides for a run, usually coming from the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Variables merged over the source's variables
    pub variables: Values,

    /// Replaces the source's image pull secrets when set
    pub image_pull_secrets: Option<Vec<String>>,

    /// Replaces the source's cronjob flag when set
    pub manage_cronjobs: Option<bool>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set override variables
    pub fn with_variables(mut self, variables: Values) -> Self {
        self.variables = variables;
        self
    }

    /// Replace the image pull secrets
    pub fn with_image_pull_secrets(mut self, secrets: Vec<String>) -> Self {
        self.image_pull_secrets = Some(secrets);
        self
    }

    /// Force cronjob management on or off
    pub fn with_manage_cronjobs(mut self, manage: bool) -> Self {
        self.manage_cronjobs = Some(manage);
        self
    }
}
