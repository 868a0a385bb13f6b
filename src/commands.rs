//! CLI command handlers.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use asciinema_reconciler::{
    Dispatcher, FileStatusReporter, Reconciler, ServiceApplier, SnapshotSignalSource, collect,
    read_status_file, resolve,
};
use asciinema_snap::{SnapClient, SnapServiceManager};

use crate::cli::Commands;
use crate::config::OperatorConfig;

/// Execute a CLI command.
pub async fn execute_command(command: Commands, config: OperatorConfig) -> Result<()> {
    match command {
        Commands::Reconcile { trigger } => cmd_reconcile(&trigger, &config).await,
        Commands::Resolve => cmd_resolve(&config).await,
        Commands::Status => cmd_status(&config).await,
    }
}

/// Build the reconciler wired to snapd and the snapshot/status files.
fn build_dispatcher(config: &OperatorConfig) -> Result<Dispatcher> {
    let client = config
        .snap_bin
        .as_ref()
        .map_or_else(SnapClient::detect, SnapClient::new);
    let manager = Arc::new(SnapServiceManager::new(client, config.snap_name.clone()));
    let applier = Arc::new(ServiceApplier::new(manager, config.applier_config()));

    let reconciler = Reconciler::builder()
        .with_signals(Arc::new(SnapshotSignalSource::new(&config.signals_path)))
        .with_applier(applier)
        .with_reporter(Arc::new(FileStatusReporter::new(&config.status_path)))
        .with_config(config.reconciler_config())
        .build()
        .context("Failed to build reconciler")?;

    Ok(Dispatcher::new(Arc::new(reconciler)))
}

/// Run one reconcile pass.
async fn cmd_reconcile(trigger: &str, config: &OperatorConfig) -> Result<()> {
    let dispatcher = build_dispatcher(config)?;

    match dispatcher.dispatch(trigger).await? {
        Some(status) => {
            info!(trigger, %status, "Pass finished");
            println!("{status}");
        }
        None => warn!(trigger, "Event is not observed, nothing to do"),
    }
    Ok(())
}

/// Resolve the current signals and print the result as JSON.
async fn cmd_resolve(config: &OperatorConfig) -> Result<()> {
    let source = SnapshotSignalSource::new(&config.signals_path);
    let signals = collect(&source)
        .await
        .context("Failed to collect signals")?;

    if signals.database.is_none() {
        bail!("database relation is not established");
    }

    let desired = resolve(&signals, &config.app_name).context("Failed to resolve signals")?;
    println!("{}", serde_json::to_string_pretty(&desired)?);
    Ok(())
}

/// Print the last status written by a reconcile pass.
async fn cmd_status(config: &OperatorConfig) -> Result<()> {
    match read_status_file(&config.status_path)
        .await
        .context("Failed to read status file")?
    {
        Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        None => println!("unknown: no reconcile pass has run yet"),
    }
    Ok(())
}
