//! Operator configuration.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use asciinema_reconciler::{ApplierConfig, ReconcilerConfig};

/// Prefix of the environment overrides.
pub const ENV_PREFIX: &str = "ASCIINEMA_OPERATOR_";

/// Configuration for the operator binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Name of the owning application, also the database name.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Name of the managed snap.
    #[serde(default = "default_snap_name")]
    pub snap_name: String,

    /// Channel the snap tracks.
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Snap plug connected so the service can reach its data.
    #[serde(default = "default_capability")]
    pub capability: String,

    /// Persistent data directory of the service.
    #[serde(default = "default_data_dir")]
    pub data_dir: Option<PathBuf>,

    /// Path of the `snap` binary; looked up on `PATH` when unset.
    #[serde(default)]
    pub snap_bin: Option<PathBuf>,

    /// Signal snapshot written by the host runtime.
    #[serde(default = "default_signals_path")]
    pub signals_path: PathBuf,

    /// Where the latest status is written.
    #[serde(default = "default_status_path")]
    pub status_path: PathBuf,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            snap_name: default_snap_name(),
            channel: default_channel(),
            capability: default_capability(),
            data_dir: default_data_dir(),
            snap_bin: None,
            signals_path: default_signals_path(),
            status_path: default_status_path(),
        }
    }
}

impl OperatorConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }

    /// Parse configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns error if the document is not valid.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from an optional file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns error if the file is invalid or the result fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `ASCIINEMA_OPERATOR_*` overrides read through `lookup`.
    #[must_use]
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(app_name) = var("APP_NAME") {
            self.app_name = app_name;
        }
        if let Some(snap_name) = var("SNAP_NAME") {
            self.snap_name = snap_name;
        }
        if let Some(channel) = var("CHANNEL") {
            self.channel = channel;
        }
        if let Some(capability) = var("CAPABILITY") {
            self.capability = capability;
        }
        if let Some(data_dir) = var("DATA_DIR") {
            self.data_dir = (!data_dir.is_empty()).then(|| PathBuf::from(data_dir));
        }
        if let Some(snap_bin) = var("SNAP_BIN") {
            self.snap_bin = Some(PathBuf::from(snap_bin));
        }
        if let Some(signals_path) = var("SIGNALS") {
            self.signals_path = PathBuf::from(signals_path);
        }
        if let Some(status_path) = var("STATUS") {
            self.status_path = PathBuf::from(status_path);
        }

        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.app_name.is_empty() {
            bail!("app_name cannot be empty");
        }

        if self.snap_name.is_empty() {
            bail!("snap_name cannot be empty");
        }

        if self.channel.is_empty() {
            bail!("channel cannot be empty");
        }

        if self.capability.is_empty() {
            bail!("capability cannot be empty");
        }

        if self.data_dir.as_deref().is_some_and(Path::is_relative) {
            bail!("data_dir must be an absolute path");
        }

        Ok(())
    }

    /// Settings for the reconciler.
    #[must_use]
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            database_name: self.app_name.clone(),
            ..ReconcilerConfig::default()
        }
    }

    /// Settings for the applier.
    #[must_use]
    pub fn applier_config(&self) -> ApplierConfig {
        ApplierConfig {
            service_name: self.snap_name.clone(),
            channel: self.channel.clone(),
            capability: self.capability.clone(),
            data_dir: self.data_dir.clone(),
        }
    }
}

fn default_app_name() -> String {
    "asciinema-server".to_string()
}

fn default_snap_name() -> String {
    "asciinema-server".to_string()
}

fn default_channel() -> String {
    "latest/stable".to_string()
}

fn default_capability() -> String {
    "home".to_string()
}

fn default_data_dir() -> Option<PathBuf> {
    Some(PathBuf::from("/var/snap/asciinema-server/common/uploads"))
}

fn default_signals_path() -> PathBuf {
    PathBuf::from("/run/asciinema-operator/signals.json")
}

fn default_status_path() -> PathBuf {
    PathBuf::from("/run/asciinema-operator/status.json")
}
