//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// asciinema-operator - keeps asciinema-server converged on its signals
#[derive(Parser, Debug)]
#[command(name = "asciinema-operator")]
#[command(version)]
#[command(about = "Reconcile asciinema-server configuration from relation signals")]
#[command(
    long_about = "Reads database, ingress and network-binding signals, derives the asciinema-server configuration and applies it through snapd. Meant to be invoked by the host runtime once per lifecycle event."
)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the signal snapshot path
    #[arg(long, global = true)]
    pub signals: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one reconcile pass for a host event
    Reconcile {
        /// Event that triggered the pass (e.g. database-created, config-changed)
        #[arg(short, long, default_value = "config-changed")]
        trigger: String,
    },

    /// Print the configuration the current signals resolve to, without applying it
    Resolve,

    /// Print the last reported status
    Status,
}
