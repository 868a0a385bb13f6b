//! Signal collectors.
//!
//! A [`SignalSource`] is queried live on every pass; nothing it returns is
//! cached by the reconciler.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{DatabaseRelation, Signals};

/// Read-only access to the external signals, one method per signal.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Database relation data, `None` if the relation does not exist.
    async fn database(&self) -> Result<Option<DatabaseRelation>>;

    /// Externally reachable endpoints published by ingress.
    async fn ingress(&self) -> Result<Vec<String>>;

    /// Local bind address.
    async fn binding(&self) -> Result<Option<String>>;

    /// Read every signal for one pass.
    ///
    /// Sources backed by a single document override this so that one pass
    /// never mixes two versions of it.
    async fn read_all(&self) -> Result<Signals> {
        Ok(Signals {
            database: self.database().await?,
            ingress: self.ingress().await?,
            binding: self.binding().await?,
        })
    }
}

/// Query every collector of `source` once.
///
/// # Errors
///
/// Propagates the first collector error.
pub async fn collect(source: &dyn SignalSource) -> Result<Signals> {
    let signals = source.read_all().await?;

    debug!(
        database = signals.database.is_some(),
        ingress = signals.ingress.len(),
        binding = signals.binding.is_some(),
        "Collected signals"
    );

    Ok(signals)
}

/// Point-in-time copy of every signal, as written by the host runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    /// Database relation data.
    #[serde(default)]
    pub database: Option<DatabaseRelation>,
    /// Ingress endpoints.
    #[serde(default)]
    pub ingress: Vec<String>,
    /// Local bind address.
    #[serde(default)]
    pub binding: Option<String>,
}

impl SignalSnapshot {
    /// Parse a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignalUnavailable`] if the document does not parse.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| Error::signal_unavailable("snapshot", e.to_string()))
    }
}

#[async_trait]
impl SignalSource for SignalSnapshot {
    async fn database(&self) -> Result<Option<DatabaseRelation>> {
        Ok(self.database.clone())
    }

    async fn ingress(&self) -> Result<Vec<String>> {
        Ok(self.ingress.clone())
    }

    async fn binding(&self) -> Result<Option<String>> {
        Ok(self.binding.clone())
    }
}

/// Collector backed by a snapshot file.
///
/// The file is re-read on every call and read once per pass through
/// [`SignalSource::read_all`]. A missing file means no signal is available
/// yet.
#[derive(Debug, Clone)]
pub struct SnapshotSignalSource {
    path: PathBuf,
}

impl SnapshotSignalSource {
    /// Create a source reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<SignalSnapshot> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(body) => SignalSnapshot::from_json(&body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No signal snapshot yet");
                Ok(SignalSnapshot::default())
            }
            Err(e) => Err(Error::signal_unavailable(
                "snapshot",
                format!("failed to read '{}': {e}", self.path.display()),
            )),
        }
    }
}

#[async_trait]
impl SignalSource for SnapshotSignalSource {
    async fn database(&self) -> Result<Option<DatabaseRelation>> {
        Ok(self.load().await?.database)
    }

    async fn ingress(&self) -> Result<Vec<String>> {
        Ok(self.load().await?.ingress)
    }

    async fn binding(&self) -> Result<Option<String>> {
        Ok(self.load().await?.binding)
    }

    async fn read_all(&self) -> Result<Signals> {
        let snapshot = self.load().await?;
        Ok(Signals {
            database: snapshot.database,
            ingress: snapshot.ingress,
            binding: snapshot.binding,
        })
    }
}
