//! # asciinema-operator
//!
//! Entry point invoked by the host runtime once per lifecycle event.
//!
//! ## Pass Sequence
//!
//! 1. **Configuration** - Load the TOML file (if any) and `ASCIINEMA_OPERATOR_*` overrides
//! 2. **Signals** - Read the database, ingress and binding snapshot
//! 3. **Resolve** - Derive the desired asciinema-server configuration
//! 4. **Apply** - Install, connect, configure and restart the snap
//! 5. **Status** - Write the outcome to the status file
//!
//! ## Error Handling
//!
//! A failed pass exits non-zero after its `failed` status has been written.
//! Nothing is retried here; the next host event runs a fresh pass.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::config::OperatorConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let mut config = OperatorConfig::load(cli.config.as_deref())?;
    if let Some(signals) = cli.signals {
        config.signals_path = signals;
    }
    debug!(?config, "Loaded configuration");

    commands::execute_command(cli.command, config).await
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
