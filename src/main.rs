//! Corral - lifecycle controller for federated member clusters

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use kube::{Api, Client, CustomResourceExt};
use tokio_util::sync::CancellationToken;

use corral::config::{ControllerConfig, LogFormat};
use corral::controller::{self, ReconciliationEngine};
use corral::crd::MemberCluster;
use corral::telemetry;
use corral::FIELD_MANAGER;

/// Corral - capacity-aware lifecycle controller for federated member clusters
#[derive(Parser, Debug)]
#[command(name = "corral", version, about, long_about = None)]
struct Cli {
    /// Generate the MemberCluster CRD manifest and exit
    #[arg(long)]
    crd: bool,

    #[command(flatten)]
    controller: ControllerArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    ///
    /// Watches MemberCluster resources, samples pod capacity from every
    /// ready member, and keeps their lifecycle annotations current.
    Controller,
}

/// Controller settings; each flag overrides the config file
#[derive(Args, Debug, Default)]
struct ControllerArgs {
    /// Path to a YAML controller configuration file
    #[arg(short = 'c', long = "config", env = "CORRAL_CONFIG", global = true)]
    config_file: Option<PathBuf>,

    /// Seconds between full reconciliation passes
    #[arg(long, env = "CORRAL_MONITOR_PERIOD_SECS", global = true)]
    monitor_period_secs: Option<u64>,

    /// Deadline for each remote call, in seconds
    #[arg(long, env = "CORRAL_CALL_TIMEOUT_SECS", global = true)]
    call_timeout_secs: Option<u64>,

    /// Clusters evaluated concurrently during a pass
    #[arg(long, env = "CORRAL_MAX_CONCURRENT_SYNCS", global = true)]
    max_concurrent_syncs: Option<usize>,

    /// Namespaces whose pods count as system pods (comma separated)
    #[arg(
        long,
        env = "CORRAL_RESERVED_NAMESPACES",
        value_delimiter = ',',
        global = true
    )]
    reserved_namespaces: Vec<String>,

    /// Log output format
    #[arg(long, env = "CORRAL_LOG_FORMAT", value_enum, global = true)]
    log_format: Option<LogFormat>,

    /// Do not install or update the MemberCluster CRD on startup
    #[arg(long, env = "CORRAL_SKIP_CRD_INSTALL", global = true)]
    skip_crd_install: bool,
}

impl ControllerArgs {
    /// Load the config file (if any) and apply flag overrides
    fn resolve(&self) -> anyhow::Result<ControllerConfig> {
        let mut config = match &self.config_file {
            Some(path) => ControllerConfig::load(path)?,
            None => ControllerConfig::default(),
        };

        if let Some(secs) = self.monitor_period_secs {
            config.monitor_period_secs = secs;
        }
        if let Some(secs) = self.call_timeout_secs {
            config.call_timeout_secs = secs;
        }
        if let Some(limit) = self.max_concurrent_syncs {
            config.max_concurrent_syncs = limit;
        }
        if !self.reserved_namespaces.is_empty() {
            config.reserved_namespaces = self.reserved_namespaces.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&MemberCluster::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    let config = cli.controller.resolve()?;
    telemetry::init_logging(config.log_format)?;

    match cli.command {
        Some(Commands::Controller) | None => run_controller(config, &cli.controller).await,
    }
}

/// Run in controller mode
async fn run_controller(config: ControllerConfig, args: &ControllerArgs) -> anyhow::Result<()> {
    tracing::info!(
        monitor_period_secs = config.monitor_period_secs,
        call_timeout_secs = config.call_timeout_secs,
        max_concurrent_syncs = config.max_concurrent_syncs,
        reserved_namespaces = ?config.reserved_namespaces,
        "Starting Corral controller"
    );

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    if !args.skip_crd_install {
        ensure_crd_installed(&client).await?;
    }

    let engine = Arc::new(ReconciliationEngine::new(client, &config));
    engine.set_on_change(Arc::new(|| {
        tracing::debug!("Member cluster set changed");
    }));

    let cancel = CancellationToken::new();
    let handle = controller::spawn(engine, config.monitor_period(), cancel.clone());

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping loops");
    cancel.cancel();
    handle.join().await;

    tracing::info!("Corral controller stopped");
    Ok(())
}

/// Install or update the MemberCluster CRD using server-side apply
///
/// Keeps the CRD schema in step with the running controller version.
async fn ensure_crd_installed(client: &Client) -> anyhow::Result<()> {
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
    use kube::api::{Patch, PatchParams};

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    tracing::info!("Installing MemberCluster CRD...");
    crds.patch(
        "memberclusters.corral.dev",
        &params,
        &Patch::Apply(&MemberCluster::crd()),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to install MemberCluster CRD: {}", e))?;

    tracing::info!("MemberCluster CRD installed/updated");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
