//! Reconcile status reporting.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::Result;

/// Externally visible status of the managed service.
///
/// `Maintenance` only exists inside a pass; a finished pass always leaves
/// one of the other three.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum ReconcileStatus {
    /// A required relation is missing.
    Blocked(String),
    /// Configuration is being applied.
    Maintenance(String),
    /// Last apply succeeded.
    Active,
    /// Last pass failed.
    Failed(String),
}

impl ReconcileStatus {
    /// Short lowercase name of the state.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Blocked(_) => "blocked",
            Self::Maintenance(_) => "maintenance",
            Self::Active => "active",
            Self::Failed(_) => "failed",
        }
    }

    /// Human-readable message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Blocked(msg) | Self::Maintenance(msg) | Self::Failed(msg) => Some(msg),
            Self::Active => None,
        }
    }

    /// Whether a pass may end in this state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Maintenance(_))
    }
}

impl fmt::Display for ReconcileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(msg) if !msg.is_empty() => write!(f, "{}: {msg}", self.name()),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// A status together with the trigger that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// The reported status.
    #[serde(flatten)]
    pub status: ReconcileStatus,
    /// Name of the trigger that started the pass.
    pub trigger: String,
    /// When the status was set.
    pub updated_at: DateTime<Utc>,
}

impl StatusReport {
    /// Create a report stamped with the current time.
    pub fn now(status: ReconcileStatus, trigger: impl Into<String>) -> Self {
        Self {
            status,
            trigger: trigger.into(),
            updated_at: Utc::now(),
        }
    }
}

/// Sink for status updates, read by the host runtime or operator tooling.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    /// Publish a status, replacing the previous one.
    async fn report(&self, report: &StatusReport) -> Result<()>;
}

/// Reporter that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatusReporter;

#[async_trait]
impl StatusReporter for LogStatusReporter {
    async fn report(&self, report: &StatusReport) -> Result<()> {
        let detail = report.status.message().unwrap_or_default();
        match &report.status {
            ReconcileStatus::Failed(_) => {
                error!(status = report.status.name(), trigger = %report.trigger, detail, "Status changed");
            }
            ReconcileStatus::Blocked(_) => {
                warn!(status = report.status.name(), trigger = %report.trigger, detail, "Status changed");
            }
            ReconcileStatus::Maintenance(_) | ReconcileStatus::Active => {
                info!(status = report.status.name(), trigger = %report.trigger, detail, "Status changed");
            }
        }
        Ok(())
    }
}

/// Reporter that keeps the latest status in a JSON file.
#[derive(Debug, Clone)]
pub struct FileStatusReporter {
    path: PathBuf,
}

impl FileStatusReporter {
    /// Create a reporter writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the status file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StatusReporter for FileStatusReporter {
    async fn report(&self, report: &StatusReport) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec_pretty(report)?;
        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, body).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

/// Read the last status written by a [`FileStatusReporter`].
///
/// Returns `Ok(None)` if no pass has written the file yet.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub async fn read_status_file(path: &Path) -> Result<Option<StatusReport>> {
    match tokio::fs::read(path).await {
        Ok(body) => Ok(Some(serde_json::from_slice(&body)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(
            ReconcileStatus::Blocked("Waiting for DB.".to_string()).to_string(),
            "blocked: Waiting for DB."
        );
        assert_eq!(ReconcileStatus::Active.to_string(), "active");
    }

    #[test]
    fn test_maintenance_is_not_terminal() {
        assert!(!ReconcileStatus::Maintenance(String::new()).is_terminal());
        assert!(ReconcileStatus::Active.is_terminal());
        assert!(ReconcileStatus::Failed("boom".to_string()).is_terminal());
    }

    #[test]
    fn test_report_serializes_flat() {
        let report = StatusReport::now(ReconcileStatus::Failed("boom".to_string()), "config-changed");
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["message"], "boom");
        assert_eq!(value["trigger"], "config-changed");
    }

    #[tokio::test]
    async fn test_file_reporter_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("status.json");
        let reporter = FileStatusReporter::new(&path);

        assert!(read_status_file(&path).await.unwrap().is_none());

        reporter
            .report(&StatusReport::now(
                ReconcileStatus::Blocked("Waiting for DB.".to_string()),
                "config-changed",
            ))
            .await
            .unwrap();
        reporter
            .report(&StatusReport::now(ReconcileStatus::Active, "database-created"))
            .await
            .unwrap();

        let last = read_status_file(&path).await.unwrap().unwrap();
        assert_eq!(last.status, ReconcileStatus::Active);
        assert_eq!(last.trigger, "database-created");
    }
}
