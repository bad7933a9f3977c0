//! appdeploy CLI - deploy a folder of templated manifests to Kubernetes

use clap::Parser;
use miette::IntoDiagnostic;
use std::path::PathBuf;

mod commands;
mod display;
mod error;
mod exit_codes;

use commands::deploy::DeployArgs;

#[derive(Parser)]
#[command(name = "appdeploy")]
#[command(author = "appdeploy Contributors")]
#[command(version)]
#[command(
    about = "Deploy a folder of Jinja2-templated manifests and remove what is no longer there",
    long_about = None
)]
struct Cli {
    /// Folder holding the manifest templates (and an optional variables.yaml)
    folder: PathBuf,

    /// Kubeconfig context to use (defaults to current-context)
    #[arg(long)]
    context: Option<String>,

    /// Kubeconfig file (defaults to $KUBECONFIG or ~/.kube/config)
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Set a variable (key=value, dotted keys nest)
    #[arg(short = 'v', long = "var")]
    vars: Vec<String>,

    /// Attach an image pull secret to the default service account
    #[arg(long = "image-pull-secret")]
    image_pull_secrets: Vec<String>,

    /// Include cronjobs in orphan cleanup
    #[arg(long)]
    manage_cronjobs: bool,

    /// Write manifests to this directory instead of applying them
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// kubectl binary to use
    #[arg(long, env = "KUBECTL")]
    kubectl: Option<PathBuf>,

    /// Enable debug output
    #[arg(long)]
    debug: bool,
}

impl From<Cli> for DeployArgs {
    fn from(cli: Cli) -> Self {
        DeployArgs {
            folder: cli.folder,
            context: cli.context,
            kubeconfig: cli.kubeconfig,
            vars: cli.vars,
            image_pull_secrets: cli.image_pull_secrets,
            manage_cronjobs: cli.manage_cronjobs,
            output_dir: cli.output_dir,
            kubectl: cli.kubectl,
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "appdeploy=debug" } else { "appdeploy=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(debug)
        .init();
}

fn main() -> miette::Result<()> {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    if cli.debug {
        // SAFETY: We're the only thread at this point (start of main)
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }
    init_tracing(cli.debug);

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let args = DeployArgs::from(cli);

    if let Err(err) = runtime.block_on(commands::deploy::run(&args)) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }

    Ok(())
}
