//! [`ServiceManager`] backed by snapd.

use async_trait::async_trait;
use tracing::{debug, info};

use asciinema_reconciler::{ConfigMap, ServiceManager};

use crate::client::{InstalledSnap, SnapClient};

/// Manages one snap through the local snapd client.
#[derive(Debug, Clone)]
pub struct SnapServiceManager {
    client: SnapClient,
    name: String,
}

impl SnapServiceManager {
    /// Create a manager for the snap `name`.
    pub fn new(client: SnapClient, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }

    /// Name of the managed snap.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl ServiceManager for SnapServiceManager {
    async fn ensure_installed(&self, name: &str, channel: &str) -> asciinema_reconciler::Result<()> {
        if name != self.name {
            return Err(asciinema_reconciler::Error::apply_failed(
                "snap install",
                format!("manager controls '{}', not '{name}'", self.name),
            ));
        }

        match self.client.list(&self.name).await? {
            None => {
                info!(snap = %self.name, channel, "Installing snap");
                self.client.install(&self.name, channel).await?;
            }
            Some(InstalledSnap { tracking: None, .. }) => {
                debug!(snap = %self.name, "Snap installed locally, leaving it in place");
            }
            Some(installed) if !channel_matches(installed.tracking.as_deref(), channel) => {
                info!(
                    snap = %self.name,
                    from = ?installed.tracking,
                    to = channel,
                    "Switching snap channel"
                );
                self.client.refresh(&self.name, channel).await?;
            }
            Some(_) => {}
        }
        Ok(())
    }

    async fn grant(&self, capability: &str) -> asciinema_reconciler::Result<()> {
        self.client.connect(&self.name, capability).await?;
        Ok(())
    }

    async fn set_config(&self, config: &ConfigMap) -> asciinema_reconciler::Result<()> {
        self.client.set(&self.name, config).await?;
        Ok(())
    }

    async fn start(&self) -> asciinema_reconciler::Result<()> {
        self.client.restart(&self.name).await?;
        Ok(())
    }
}

/// Compare a tracked channel with the wanted one.
///
/// A channel without a track (`stable`) means the `latest` track.
#[must_use]
pub fn channel_matches(tracking: Option<&str>, wanted: &str) -> bool {
    tracking.is_some_and(|tracking| normalize_channel(tracking) == normalize_channel(wanted))
}

fn normalize_channel(channel: &str) -> String {
    if channel.contains('/') {
        channel.to_string()
    } else {
        format!("latest/{channel}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_matches_implicit_track() {
        assert!(channel_matches(Some("latest/stable"), "stable"));
        assert!(channel_matches(Some("latest/stable"), "latest/stable"));
        assert!(!channel_matches(Some("latest/edge"), "latest/stable"));
        assert!(!channel_matches(Some("2.x/stable"), "stable"));
    }

    #[test]
    fn test_untracked_never_matches() {
        assert!(!channel_matches(None, "latest/stable"));
    }
}
