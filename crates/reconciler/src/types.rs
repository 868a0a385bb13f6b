//! Core types for the reconciler.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Port advertised when the service is reached through ingress.
pub const PUBLIC_TLS_PORT: u16 = 443;

/// Configuration key for the database connection string.
pub const DATABASE_URL_KEY: &str = "database.url";
/// Configuration key for the externally reachable address.
pub const HOST_URL_KEY: &str = "host.url";
/// Configuration key for the externally reachable port.
pub const HOST_PORT_KEY: &str = "host.port";

/// Data published on the database relation.
///
/// The relation can exist before the database side has filled in
/// credentials, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseRelation {
    /// `host:port` endpoint, possibly a comma-separated list.
    #[serde(default)]
    pub endpoints: Option<String>,
    /// Database user.
    #[serde(default)]
    pub username: Option<String>,
    /// Database password.
    #[serde(default)]
    pub password: Option<String>,
}

impl DatabaseRelation {
    /// Create a fully populated relation.
    pub fn new(
        endpoints: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoints: Some(endpoints.into()),
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }
}

/// All signals gathered at the start of a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signals {
    /// Database relation, `None` when the relation does not exist.
    pub database: Option<DatabaseRelation>,
    /// Externally reachable endpoints reported by ingress, in order.
    pub ingress: Vec<String>,
    /// Local bind address.
    pub binding: Option<String>,
}

/// Fully resolved configuration for the managed service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DesiredConfig {
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Externally reachable address.
    pub host_url: Option<String>,
    /// Externally reachable port, only set on the ingress path.
    pub host_port: Option<u16>,
}

impl DesiredConfig {
    /// Flatten into the key/value set written to the service.
    ///
    /// Unset fields map to [`ConfigValue::Unset`] so a value written by an
    /// earlier pass gets cleared.
    #[must_use]
    pub fn to_config_map(&self) -> ConfigMap {
        let mut map = ConfigMap::new();
        map.insert(
            DATABASE_URL_KEY.to_string(),
            ConfigValue::from(self.database_url.clone()),
        );
        map.insert(
            HOST_URL_KEY.to_string(),
            ConfigValue::from(self.host_url.clone()),
        );
        map.insert(
            HOST_PORT_KEY.to_string(),
            ConfigValue::from(self.host_port.map(|port| port.to_string())),
        );
        map
    }
}

/// A single configuration value, or an explicit "no value" marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigValue {
    /// Key carries this value.
    Set(String),
    /// Key must have no value.
    Unset,
}

impl ConfigValue {
    /// Get the value, if set.
    #[must_use]
    pub fn as_set(&self) -> Option<&str> {
        match self {
            Self::Set(value) => Some(value),
            Self::Unset => None,
        }
    }
}

impl From<Option<String>> for ConfigValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Unset, Self::Set)
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(value) => write!(f, "{value}"),
            Self::Unset => write!(f, "<unset>"),
        }
    }
}

/// Flat key/value configuration, ordered by key.
pub type ConfigMap = BTreeMap<String, ConfigValue>;
