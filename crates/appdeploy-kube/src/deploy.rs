//! Deployment runs: render every source item, apply, then reconcile
//!
//! One run goes through these steps, each gated on the previous one:
//!
//! 1. list source items; an empty source is refused before anything else
//! 2. resolve variables (source + overrides) and freeze them
//! 3. prepare the target
//! 4. render, identify and apply every item concurrently, one task per item
//! 5. when and only when every item succeeded, clean up orphans
//!
//! Failures in step 4 never cancel sibling tasks. Once all tasks finished,
//! failures are ordered by item name and the first one is reported, so the
//! error does not depend on scheduling.
//!
//! Each resource identity is applied at most once per run: the first item to
//! render it claims it, later ones skip the apply. Any identity claimed by
//! more than one item fails the run after the barrier, naming every item.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;

use appdeploy_core::{Manifest, Overrides, ProcessVariables};
use appdeploy_engine::Engine;

use crate::error::{KubeError, Result};
use crate::source::ManifestSource;
use crate::target::Target;

/// Successful outcome of the apply pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Identities applied, sorted
    pub applied: Vec<Manifest>,
    /// Items that rendered to nothing, sorted
    pub skipped: Vec<String>,
}

/// Summary of a full run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployReport {
    /// Namespace the run targeted
    pub namespace: String,
    /// Identities applied, sorted
    pub applied: Vec<Manifest>,
    /// Items that rendered to nothing, sorted
    pub skipped: Vec<String>,
    /// Orphans removed by the cleanup, sorted
    pub deleted: Vec<Manifest>,
}

impl DeployReport {
    /// Human-readable one-line summary
    pub fn summary(&self) -> String {
        format!(
            "{} applied, {} skipped, {} deleted in namespace {}",
            self.applied.len(),
            self.skipped.len(),
            self.deleted.len(),
            self.namespace
        )
    }
}

/// What happened to one item
enum ItemOutcome {
    Applied,
    AlreadyClaimed,
    Skipped,
}

/// Items that rendered to each resource, keyed by file stem
type Claims = BTreeMap<String, (Manifest, Vec<String>)>;

/// Runs a source against a target
#[derive(Debug, Clone, Default)]
pub struct Deployer {
    engine: Arc<Engine>,
    overrides: Overrides,
}

impl Deployer {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
            overrides: Overrides::default(),
        }
    }

    /// Set the run's overrides
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Run the whole pipeline
    ///
    /// `prepare` and `cleanup` are each invoked exactly once on success;
    /// `cleanup` is never invoked when an item failed.
    pub async fn run<S, T>(&self, source: Arc<S>, mut target: T) -> Result<DeployReport>
    where
        S: ManifestSource + ?Sized + 'static,
        T: Target + 'static,
    {
        let names = source.names().await?;
        if names.is_empty() {
            return Err(KubeError::EmptySource);
        }

        let vars = ProcessVariables::resolve(source.variables().await?, &self.overrides)?;
        tracing::info!(
            namespace = %vars.namespace,
            items = names.len(),
            manage_cronjobs = vars.manage_cronjobs,
            "starting deployment"
        );

        target.prepare(&vars).await?;

        let namespace = vars.namespace.clone();
        let target = Arc::new(target);
        let outcome = apply_all(
            self.engine.clone(),
            source,
            names,
            Arc::new(vars),
            target.clone(),
        )
        .await?;

        let deleted = target.cleanup(&outcome.applied).await?;
        tracing::info!(
            applied = outcome.applied.len(),
            skipped = outcome.skipped.len(),
            deleted = deleted.len(),
            "deployment finished"
        );

        Ok(DeployReport {
            namespace,
            applied: outcome.applied,
            skipped: outcome.skipped,
            deleted,
        })
    }
}

/// Render, identify and apply every item concurrently
///
/// Every task runs to completion. On failure the successes are discarded and
/// the failure of the lexicographically smallest item name is returned inside
/// [`KubeError::ApplyFailed`]. Two items producing the same resource fail with
/// [`KubeError::DuplicateManifest`].
pub async fn apply_all<S, T>(
    engine: Arc<Engine>,
    source: Arc<S>,
    names: Vec<String>,
    vars: Arc<ProcessVariables>,
    target: Arc<T>,
) -> Result<ApplyOutcome>
where
    S: ManifestSource + ?Sized + 'static,
    T: Target + ?Sized + 'static,
{
    let total = names.len();
    let claims: Arc<Mutex<Claims>> = Arc::new(Mutex::new(BTreeMap::new()));
    let mut tasks = JoinSet::new();

    for name in names {
        let engine = engine.clone();
        let source = source.clone();
        let vars = vars.clone();
        let target = target.clone();
        let claims = claims.clone();

        tasks.spawn(async move {
            let result = process_item(
                &engine,
                source.as_ref(),
                &name,
                &vars,
                target.as_ref(),
                &claims,
            )
            .await;
            (name, result)
        });
    }

    let mut skipped = Vec::new();
    let mut failures: Vec<(String, KubeError)> = Vec::new();

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(ItemOutcome::Applied | ItemOutcome::AlreadyClaimed))) => {}
            Ok((name, Ok(ItemOutcome::Skipped))) => skipped.push(name),
            Ok((name, Err(e))) => {
                tracing::warn!(item = %name, error = %e, "item failed");
                failures.push((name, e));
            }
            Err(e) => {
                tracing::warn!(error = %e, "apply task did not complete");
                failures.push((String::new(), KubeError::TaskPanicked(e.to_string())));
            }
        }
    }

    if !failures.is_empty() {
        failures.sort_by(|a, b| a.0.cmp(&b.0));
        let failed = failures.len();
        let (item, source) = failures.swap_remove(0);
        return Err(KubeError::ApplyFailed {
            failed,
            total,
            item,
            source: Box::new(source),
        });
    }

    let claims = std::mem::take(&mut *claims.lock().unwrap_or_else(PoisonError::into_inner));
    let mut applied = Vec::with_capacity(claims.len());
    for (manifest, mut items) in claims.into_values() {
        if items.len() > 1 {
            items.sort();
            return Err(KubeError::DuplicateManifest { manifest, items });
        }
        applied.push(manifest);
    }
    applied.sort();
    skipped.sort();

    Ok(ApplyOutcome { applied, skipped })
}

async fn process_item<S, T>(
    engine: &Engine,
    source: &S,
    name: &str,
    vars: &ProcessVariables,
    target: &T,
    claims: &Mutex<Claims>,
) -> Result<ItemOutcome>
where
    S: ManifestSource + ?Sized,
    T: Target + ?Sized,
{
    let raw = source.get(name).await?;
    let template = String::from_utf8(raw).map_err(|_| KubeError::InvalidEncoding {
        name: name.to_string(),
    })?;

    let Some(rendered) = engine
        .render_manifest(name, &template, vars)
        .map_err(|e| KubeError::render(name, e))?
    else {
        tracing::debug!(item = %name, "rendered empty, skipping");
        return Ok(ItemOutcome::Skipped);
    };

    let manifest = rendered.manifest;
    let first = {
        let mut claims = claims.lock().unwrap_or_else(PoisonError::into_inner);
        let (_, items) = claims
            .entry(manifest.file_stem())
            .or_insert_with(|| (manifest.clone(), Vec::new()));
        items.push(name.to_string());
        items.len() == 1
    };
    if !first {
        tracing::debug!(item = %name, resource = %manifest, "resource already claimed, not applying");
        return Ok(ItemOutcome::AlreadyClaimed);
    }

    target.apply(&manifest, &rendered.raw).await?;
    tracing::info!(item = %name, resource = %manifest, "applied");

    Ok(ItemOutcome::Applied)
}
