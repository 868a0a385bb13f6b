//! Thin wrapper around the `snap` command line.
//!
//! Every call shells out to the local snapd client; no state is cached.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use asciinema_reconciler::{ConfigMap, ConfigValue};
use itertools::Itertools;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Stderr fragment snapd prints when `snap list <name>` finds nothing.
const NOT_INSTALLED: &str = "no matching snaps installed";

/// An installed snap as reported by `snap list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledSnap {
    /// Snap name.
    pub name: String,
    /// Upstream version.
    pub version: String,
    /// Store revision.
    pub revision: String,
    /// Tracked channel, `None` for locally installed snaps.
    pub tracking: Option<String>,
}

/// Client for the `snap` binary.
#[derive(Debug, Clone)]
pub struct SnapClient {
    bin: PathBuf,
}

impl Default for SnapClient {
    fn default() -> Self {
        Self::detect()
    }
}

impl SnapClient {
    /// Create a client using the given `snap` binary.
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    /// Locate `snap` on `PATH`, falling back to the bare name.
    #[must_use]
    pub fn detect() -> Self {
        let bin = which::which("snap").unwrap_or_else(|_| PathBuf::from("snap"));
        Self { bin }
    }

    /// Path of the `snap` binary.
    #[must_use]
    pub fn bin(&self) -> &Path {
        &self.bin
    }

    /// Look up an installed snap.
    ///
    /// # Errors
    ///
    /// Returns error if snap cannot be run or its output cannot be parsed.
    pub async fn list(&self, name: &str) -> Result<Option<InstalledSnap>> {
        match self.run("list", &["list", name]).await {
            Ok(stdout) => parse_snap_list(&stdout, name),
            Err(Error::CommandFailed { reason, .. }) if reason.contains(NOT_INSTALLED) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Install a snap from a channel.
    ///
    /// # Errors
    ///
    /// Returns error if the installation fails.
    pub async fn install(&self, name: &str, channel: &str) -> Result<()> {
        let channel_arg = format!("--channel={channel}");
        self.run("install", &["install", name, &channel_arg])
            .await
            .map(drop)
    }

    /// Switch an installed snap to another channel.
    ///
    /// # Errors
    ///
    /// Returns error if the refresh fails.
    pub async fn refresh(&self, name: &str, channel: &str) -> Result<()> {
        let channel_arg = format!("--channel={channel}");
        self.run("refresh", &["refresh", name, &channel_arg])
            .await
            .map(drop)
    }

    /// Connect a plug of the snap.
    ///
    /// # Errors
    ///
    /// Returns error if the connection fails.
    pub async fn connect(&self, name: &str, plug: &str) -> Result<()> {
        let target = format!("{name}:{plug}");
        self.run("connect", &["connect", &target]).await.map(drop)
    }

    /// Set and unset configuration keys in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns error if snapd rejects the change.
    pub async fn set(&self, name: &str, config: &ConfigMap) -> Result<()> {
        if config.is_empty() {
            return Ok(());
        }

        let assignments = config_args(config);
        let args = ["set", name]
            .into_iter()
            .chain(assignments.iter().map(String::as_str))
            .collect_vec();
        self.run("set", &args).await.map(drop)
    }

    /// Restart every service of the snap, starting stopped ones.
    ///
    /// # Errors
    ///
    /// Returns error if the restart fails.
    pub async fn restart(&self, name: &str) -> Result<()> {
        self.run("restart", &["restart", name]).await.map(drop)
    }

    /// Run `snap <args>` and return its stdout.
    async fn run(&self, operation: &str, args: &[&str]) -> Result<String> {
        debug!(bin = %self.bin.display(), ?args, "Running snap");

        let output = Command::new(&self.bin)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::CommandFailed {
                operation: operation.to_string(),
                reason: e.to_string(),
                is_not_found: e.kind() == ErrorKind::NotFound,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::command_failed(
                operation,
                format!("exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Render a config map as `snap set` arguments.
///
/// Unset keys use snapd's `key!` form.
#[must_use]
pub fn config_args(config: &ConfigMap) -> Vec<String> {
    config
        .iter()
        .map(|(key, value)| match value {
            ConfigValue::Set(value) => format!("{key}={value}"),
            ConfigValue::Unset => format!("{key}!"),
        })
        .collect_vec()
}

/// Parse `snap list` output and pick the row for `name`.
///
/// # Errors
///
/// Returns error if the header is missing or the row is truncated.
pub fn parse_snap_list(output: &str, name: &str) -> Result<Option<InstalledSnap>> {
    let mut lines = output.lines().filter(|line| !line.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| Error::parse_error("empty snap list output"))?;
    let columns = header.split_whitespace().collect_vec();
    let position = |column: &str| {
        columns
            .iter()
            .position(|c| *c == column)
            .ok_or_else(|| Error::parse_error(format!("missing '{column}' column in: {header}")))
    };
    let version_at = position("Version")?;
    let revision_at = position("Rev")?;
    let tracking_at = position("Tracking")?;

    let Some(row) = lines.find(|line| line.split_whitespace().next() == Some(name)) else {
        return Ok(None);
    };
    let fields = row.split_whitespace().collect_vec();
    let field = |at: usize| {
        fields
            .get(at)
            .map(ToString::to_string)
            .ok_or_else(|| Error::parse_error(format!("truncated snap list row: {row}")))
    };

    let tracking = field(tracking_at)?;
    Ok(Some(InstalledSnap {
        name: name.to_string(),
        version: field(version_at)?,
        revision: field(revision_at)?,
        tracking: (tracking != "-").then_some(tracking),
    }))
}
