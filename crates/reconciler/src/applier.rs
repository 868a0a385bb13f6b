//! Convergence applier.
//!
//! Every step is safe to repeat: the applier always re-applies the full
//! configuration instead of diffing against what the service currently has.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{ConfigMap, DesiredConfig};

/// Mode of the persistent data directory.
pub const DATA_DIR_MODE: u32 = 0o700;

/// Local control interface of the service manager.
///
/// Implementations must make each operation idempotent.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Install `name` tracking `channel`, or move it to that channel.
    async fn ensure_installed(&self, name: &str, channel: &str) -> Result<()>;

    /// Grant the service a capability.
    async fn grant(&self, capability: &str) -> Result<()>;

    /// Replace the service's configuration keys.
    async fn set_config(&self, config: &ConfigMap) -> Result<()>;

    /// Start the service, restarting it if it already runs.
    async fn start(&self) -> Result<()>;
}

/// Applies a [`DesiredConfig`] to the managed service.
#[async_trait]
pub trait Applier: Send + Sync {
    /// Converge the service onto `desired`.
    async fn apply(&self, desired: &DesiredConfig) -> Result<()>;
}

/// Settings for [`ServiceApplier`].
#[derive(Debug, Clone)]
pub struct ApplierConfig {
    /// Package name of the managed service.
    pub service_name: String,
    /// Release channel to track.
    pub channel: String,
    /// Capability needed to reach the data directory.
    pub capability: String,
    /// Persistent data directory, created if absent.
    pub data_dir: Option<PathBuf>,
}

impl Default for ApplierConfig {
    fn default() -> Self {
        Self {
            service_name: "asciinema-server".to_string(),
            channel: "latest/stable".to_string(),
            capability: "home".to_string(),
            data_dir: None,
        }
    }
}

/// Applier driving a [`ServiceManager`].
pub struct ServiceApplier {
    manager: Arc<dyn ServiceManager>,
    config: ApplierConfig,
}

impl ServiceApplier {
    /// Create a new applier.
    pub fn new(manager: Arc<dyn ServiceManager>, config: ApplierConfig) -> Self {
        Self { manager, config }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ApplierConfig {
        &self.config
    }
}

#[async_trait]
impl Applier for ServiceApplier {
    async fn apply(&self, desired: &DesiredConfig) -> Result<()> {
        let name = &self.config.service_name;

        debug!(service = %name, channel = %self.config.channel, "Ensuring service is installed");
        self.manager
            .ensure_installed(name, &self.config.channel)
            .await?;

        debug!(service = %name, capability = %self.config.capability, "Granting capability");
        self.manager.grant(&self.config.capability).await?;

        if let Some(dir) = &self.config.data_dir {
            ensure_data_dir(dir).await?;
        }

        let config = desired.to_config_map();
        debug!(service = %name, keys = config.len(), "Writing configuration");
        self.manager.set_config(&config).await?;

        self.manager.start().await?;

        info!(service = %name, "Configuration applied");
        Ok(())
    }
}

/// Create the data directory with [`DATA_DIR_MODE`] if it does not exist.
///
/// An existing directory is left as is.
///
/// # Errors
///
/// Returns [`Error::ApplyFailed`] if the path exists but is not a directory
/// or cannot be created.
pub async fn ensure_data_dir(dir: &Path) -> Result<()> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => {
            return Err(Error::apply_failed(
                "create data directory",
                format!("'{}' exists and is not a directory", dir.display()),
            ));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(Error::apply_failed(
                "create data directory",
                format!("'{}': {e}", dir.display()),
            ));
        }
    }

    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DATA_DIR_MODE);

    builder.create(dir).await.map_err(|e| {
        Error::apply_failed("create data directory", format!("'{}': {e}", dir.display()))
    })?;

    info!(path = %dir.display(), "Created data directory");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use std::sync::Mutex;

    use super::*;
    use crate::error::ErrorKind;

    #[derive(Default)]
    struct RecordingManager {
        calls: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingManager {
        fn failing(op: &'static str) -> Self {
            Self {
                fail_on: Some(op),
                ..Self::default()
            }
        }

        fn record(&self, op: &'static str, call: String) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.fail_on == Some(op) {
                return Err(Error::apply_failed(op, "simulated"));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ServiceManager for RecordingManager {
        async fn ensure_installed(&self, name: &str, channel: &str) -> Result<()> {
            self.record("install", format!("install {name} {channel}"))
        }

        async fn grant(&self, capability: &str) -> Result<()> {
            self.record("grant", format!("grant {capability}"))
        }

        async fn set_config(&self, config: &ConfigMap) -> Result<()> {
            let rendered: Vec<String> = config.iter().map(|(k, v)| format!("{k}={v}")).collect();
            self.record("set", format!("set {}", rendered.join(" ")))
        }

        async fn start(&self) -> Result<()> {
            self.record("start", "start".to_string())
        }
    }

    #[tokio::test]
    async fn test_apply_runs_steps_in_order() {
        let manager = Arc::new(RecordingManager::default());
        let applier = ServiceApplier::new(manager.clone(), ApplierConfig::default());

        let desired = DesiredConfig {
            database_url: Some("postgresql://u:p@h:5432/asciinema".to_string()),
            host_url: None,
            host_port: None,
        };
        applier.apply(&desired).await.unwrap();

        assert_eq!(
            manager.calls(),
            vec![
                "install asciinema-server latest/stable".to_string(),
                "grant home".to_string(),
                "set database.url=postgresql://u:p@h:5432/asciinema host.port=<unset> host.url=<unset>"
                    .to_string(),
                "start".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_apply_twice_is_identical() {
        let manager = Arc::new(RecordingManager::default());
        let applier = ServiceApplier::new(manager.clone(), ApplierConfig::default());
        let desired = DesiredConfig {
            host_url: Some("a.example".to_string()),
            host_port: Some(443),
            ..DesiredConfig::default()
        };

        applier.apply(&desired).await.unwrap();
        let first = manager.calls();
        applier.apply(&desired).await.unwrap();
        let all = manager.calls();

        let second: Vec<String> = all.iter().skip(first.len()).cloned().collect();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_apply_stops_at_failed_step() {
        let manager = Arc::new(RecordingManager::failing("install"));
        let applier = ServiceApplier::new(manager.clone(), ApplierConfig::default());

        let err = applier.apply(&DesiredConfig::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApplyFailure);
        assert_eq!(manager.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_data_dir_created_with_mode() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("uploads").join("recordings");

        ensure_data_dir(&data).await.unwrap();
        ensure_data_dir(&data).await.unwrap();

        let meta = tokio::fs::metadata(&data).await.unwrap();
        assert!(meta.is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            assert_eq!(meta.permissions().mode() & 0o777, DATA_DIR_MODE);
        }
    }

    #[tokio::test]
    async fn test_data_dir_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("uploads");
        tokio::fs::write(&file, b"x").await.unwrap();

        let err = ensure_data_dir(&file).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ApplyFailure);
    }
}
