//! Reconciler implementation.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::applier::Applier;
use crate::error::{Error, ErrorKind, Result};
use crate::resolver::resolve;
use crate::signals::{SignalSource, collect};
use crate::status::{LogStatusReporter, ReconcileStatus, StatusReport, StatusReporter};
use crate::types::DatabaseRelation;

/// Message shown while the database relation is missing.
pub const WAITING_FOR_DB: &str = "Waiting for DB.";

/// Message shown while configuration is applied.
pub const APPLYING: &str = "Applying configuration";

/// Configuration for the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Name of the owning application, used as the database name.
    pub database_name: String,
    /// Name of the mandatory database relation.
    pub database_relation: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            database_name: "asciinema-server".to_string(),
            database_relation: "database".to_string(),
        }
    }
}

/// Collect, resolve and apply, one pass at a time.
///
/// The host runtime serializes calls to [`Reconciler::reconcile`]; the only
/// state kept between passes is the last reported status.
pub struct Reconciler {
    /// Signal collectors.
    signals: Arc<dyn SignalSource>,
    /// Convergence applier.
    applier: Arc<dyn Applier>,
    /// Status sink.
    reporter: Arc<dyn StatusReporter>,
    /// Configuration.
    config: ReconcilerConfig,
    /// Last reported status, `None` before the first pass.
    status: RwLock<Option<ReconcileStatus>>,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(
        signals: Arc<dyn SignalSource>,
        applier: Arc<dyn Applier>,
        reporter: Arc<dyn StatusReporter>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            signals,
            applier,
            reporter,
            config,
            status: RwLock::new(None),
        }
    }

    /// Create a builder.
    #[must_use]
    pub fn builder() -> ReconcilerBuilder {
        ReconcilerBuilder::new()
    }

    /// Run one reconcile pass.
    ///
    /// Returns the status the pass ended in. A missing database relation is
    /// not an error and yields [`ReconcileStatus::Blocked`].
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the pass after the status has been set
    /// to [`ReconcileStatus::Failed`]. Failing to publish `Blocked` or
    /// `Active` aborts the pass the same way.
    pub async fn reconcile(&self, trigger: &str) -> Result<ReconcileStatus> {
        info!(trigger, "Starting reconciliation");

        match self.run_pass(trigger).await {
            Ok(status) => {
                info!(trigger, status = status.name(), "Reconciliation complete");
                Ok(status)
            }
            Err(e) => {
                warn!(trigger, error = %e, "Reconciliation failed");
                if let Err(report_err) = self
                    .set_status(ReconcileStatus::Failed(e.to_string()), trigger)
                    .await
                {
                    warn!(error = %report_err, "Failed to publish failed status");
                }
                Err(e)
            }
        }
    }

    async fn run_pass(&self, trigger: &str) -> Result<ReconcileStatus> {
        let signals = collect(self.signals.as_ref()).await?;

        let relation = match self.require_relation(signals.database.as_ref()) {
            Ok(relation) => relation,
            Err(e) if e.kind() == ErrorKind::PreconditionMissing => {
                debug!(error = %e, "Precondition missing");
                let status = ReconcileStatus::Blocked(WAITING_FOR_DB.to_string());
                self.set_status(status.clone(), trigger).await?;
                return Ok(status);
            }
            Err(e) => return Err(e),
        };
        debug!(
            endpoints = relation.endpoints.is_some(),
            username = relation.username.is_some(),
            password = relation.password.is_some(),
            "Database relation present"
        );

        let desired = resolve(&signals, &self.config.database_name)?;
        debug!(
            database_url = desired.database_url.is_some(),
            host_url = ?desired.host_url,
            host_port = ?desired.host_port,
            "Resolved desired configuration"
        );

        self.set_status(ReconcileStatus::Maintenance(APPLYING.to_string()), trigger)
            .await?;

        self.applier.apply(&desired).await?;

        self.set_status(ReconcileStatus::Active, trigger).await?;
        Ok(ReconcileStatus::Active)
    }

    fn require_relation<'a>(
        &self,
        database: Option<&'a DatabaseRelation>,
    ) -> Result<&'a DatabaseRelation> {
        database.ok_or_else(|| Error::precondition_missing(&self.config.database_relation))
    }

    /// Replace the current status and publish it.
    ///
    /// A pass must not end on an unpublished status, so reporter failures
    /// are returned for terminal states and only logged for `Maintenance`.
    async fn set_status(&self, status: ReconcileStatus, trigger: &str) -> Result<()> {
        *self.status.write().await = Some(status.clone());

        let report = StatusReport::now(status, trigger);
        match self.reporter.report(&report).await {
            Ok(()) => Ok(()),
            Err(e) if report.status.is_terminal() => Err(e),
            Err(e) => {
                warn!(error = %e, status = report.status.name(), "Failed to publish status");
                Ok(())
            }
        }
    }

    /// Current status, `None` before the first pass.
    pub async fn status(&self) -> Option<ReconcileStatus> {
        self.status.read().await.clone()
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

/// Builder for Reconciler.
pub struct ReconcilerBuilder {
    signals: Option<Arc<dyn SignalSource>>,
    applier: Option<Arc<dyn Applier>>,
    reporter: Option<Arc<dyn StatusReporter>>,
    config: ReconcilerConfig,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            signals: None,
            applier: None,
            reporter: None,
            config: ReconcilerConfig::default(),
        }
    }

    /// Set the signal source.
    #[must_use]
    pub fn with_signals(mut self, signals: Arc<dyn SignalSource>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Set the applier.
    #[must_use]
    pub fn with_applier(mut self, applier: Arc<dyn Applier>) -> Self {
        self.applier = Some(applier);
        self
    }

    /// Set the status reporter. Defaults to [`LogStatusReporter`].
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the database name.
    #[must_use]
    pub fn database_name(mut self, name: impl Into<String>) -> Self {
        self.config.database_name = name.into();
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the signal source or applier is
    /// missing, or the database name is empty.
    pub fn build(self) -> Result<Reconciler> {
        let signals = self
            .signals
            .ok_or_else(|| Error::invalid_config("Signal source is required"))?;

        let applier = self
            .applier
            .ok_or_else(|| Error::invalid_config("Applier is required"))?;

        if self.config.database_name.is_empty() {
            return Err(Error::invalid_config("Database name cannot be empty"));
        }

        let reporter = self
            .reporter
            .unwrap_or_else(|| Arc::new(LogStatusReporter));

        Ok(Reconciler::new(signals, applier, reporter, self.config))
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
