//! hourscaled: the hourscale daemon.
//!
//! Runs the `Scaler` controller against the cluster found through the
//! usual kubeconfig / in-cluster lookup, and ships two offline helpers.
//!
//! # Usage
//!
//! ```text
//! hourscaled run --config /etc/hourscale/hourscaled.toml
//! hourscaled crd | kubectl apply -f -
//! hourscaled check scaler.yaml --hour 12
//! ```

mod check;
mod config;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kube::CustomResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{DaemonConfig, LogFormat, LoggingConfig, Overrides};

#[derive(Parser)]
#[command(name = "hourscaled", about = "hourscale daemon", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the Scaler controller until interrupted.
    Run {
        /// Path to hourscaled.toml.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Only watch Scalers in this namespace.
        #[arg(long)]
        namespace: Option<String>,

        /// Delay between passes over the same Scaler (e.g. "30s").
        #[arg(long, value_parser = humantime::parse_duration)]
        requeue_interval: Option<Duration>,

        /// Delay before retrying a failed pass (e.g. "10s").
        #[arg(long, value_parser = humantime::parse_duration)]
        error_backoff: Option<Duration>,

        #[arg(long, value_enum)]
        log_format: Option<LogFormat>,
    },

    /// Print the Scaler CustomResourceDefinition as YAML.
    Crd,

    /// Validate a Scaler manifest and show whether its window is open.
    Check {
        manifest: PathBuf,

        /// UTC hour to evaluate at (defaults to the current hour).
        #[arg(long, value_parser = clap::value_parser!(i32).range(0..=23))]
        hour: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            namespace,
            requeue_interval,
            error_backoff,
            log_format,
        } => {
            let mut config = match config {
                Some(path) => DaemonConfig::from_file(&path)?,
                None => DaemonConfig::default(),
            };
            config.apply(Overrides {
                namespace,
                requeue_interval,
                error_backoff,
                log_format,
            });
            init_tracing(&config.logging);
            run(config).await
        }
        Command::Crd => {
            let yaml = serde_yaml::to_string(&hourscale_kube::Scaler::crd())?;
            print!("{yaml}");
            Ok(())
        }
        Command::Check { manifest, hour } => {
            init_tracing(&LoggingConfig::default());
            run_check(&manifest, hour)
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    let settings = config.controller_settings()?;
    info!("hourscaled starting");

    let client = kube::Client::try_default()
        .await
        .context("failed to build kubernetes client")?;
    info!("kubernetes client ready");

    // ── Shutdown signal ────────────────────────────────────────

    let shutdown = CancellationToken::new();
    let mut controller = tokio::spawn(hourscale_kube::run(client, settings, shutdown.clone()));

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("failed to install CTRL+C handler")?;
            info!("shutdown signal received");
            shutdown.cancel();
            (&mut controller).await?;
        }
        res = &mut controller => {
            res?;
            warn!("controller exited before shutdown was requested");
        }
    }

    info!("hourscaled stopped");
    Ok(())
}

fn run_check(manifest: &Path, hour: Option<i32>) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(manifest)
        .with_context(|| format!("failed to read {}", manifest.display()))?;
    let hour = hour.unwrap_or_else(|| hourscale_reconcile::current_hour(chrono::Utc::now()));
    let report = check::check_manifest(&content, hour)?;
    print!("{}", report.render());
    Ok(())
}
