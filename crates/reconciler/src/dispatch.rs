//! Maps host lifecycle events onto reconcile passes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::reconciler::Reconciler;
use crate::status::ReconcileStatus;

/// Host events that start a reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// The database relation was created and credentials were issued.
    DatabaseCreated,
    /// The database relation published new endpoints.
    DatabaseEndpointsChanged,
    /// Ingress published its external endpoints.
    IngressReady,
    /// Ingress went away.
    IngressRemoved,
    /// Local configuration changed.
    ConfigChanged,
    /// Periodic status refresh.
    UpdateStatus,
}

impl Trigger {
    /// Every recognised trigger.
    pub const ALL: [Self; 6] = [
        Self::DatabaseCreated,
        Self::DatabaseEndpointsChanged,
        Self::IngressReady,
        Self::IngressRemoved,
        Self::ConfigChanged,
        Self::UpdateStatus,
    ];

    /// Event name as sent by the host.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DatabaseCreated => "database-created",
            Self::DatabaseEndpointsChanged => "database-endpoints-changed",
            Self::IngressReady => "ingress-ready",
            Self::IngressRemoved => "ingress-removed",
            Self::ConfigChanged => "config-changed",
            Self::UpdateStatus => "update-status",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trigger {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|trigger| trigger.as_str() == normalized)
            .ok_or_else(|| Error::invalid_config(format!("unknown trigger '{s}'")))
    }
}

/// Routes named events to [`Reconciler::reconcile`].
pub struct Dispatcher {
    reconciler: Arc<Reconciler>,
}

impl Dispatcher {
    /// Create a dispatcher for `reconciler`.
    #[must_use]
    pub const fn new(reconciler: Arc<Reconciler>) -> Self {
        Self { reconciler }
    }

    /// Handle a named event.
    ///
    /// Events that do not map to a [`Trigger`] are ignored and return
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Propagates the error of a failed pass.
    pub async fn dispatch(&self, event: &str) -> Result<Option<ReconcileStatus>> {
        match event.parse::<Trigger>() {
            Ok(trigger) => self.fire(trigger).await.map(Some),
            Err(_) => {
                debug!(event, "Ignoring unobserved event");
                Ok(None)
            }
        }
    }

    /// Run a pass for `trigger`.
    ///
    /// # Errors
    ///
    /// Propagates the error of a failed pass.
    pub async fn fire(&self, trigger: Trigger) -> Result<ReconcileStatus> {
        self.reconciler.reconcile(trigger.as_str()).await
    }

    /// The reconciler behind this dispatcher.
    #[must_use]
    pub const fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use super::*;

    #[test]
    fn test_trigger_names_round_trip() {
        for trigger in Trigger::ALL {
            assert_eq!(trigger.as_str().parse::<Trigger>().unwrap(), trigger);
        }
    }

    #[test]
    fn test_trigger_accepts_underscores() {
        assert_eq!(
            "database_endpoints_changed".parse::<Trigger>().unwrap(),
            Trigger::DatabaseEndpointsChanged
        );
    }

    #[test]
    fn test_unknown_trigger() {
        assert!("leader-elected".parse::<Trigger>().is_err());
    }
}
