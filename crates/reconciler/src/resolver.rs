//! Desired-state resolution.
//!
//! Pure functions from collected [`Signals`] to a [`DesiredConfig`]. Absent
//! signals never fail resolution, they only leave fields unset. Only a
//! present signal with a broken shape is an error.

use crate::error::{Error, Result};
use crate::types::{DatabaseRelation, DesiredConfig, PUBLIC_TLS_PORT, Signals};

/// Resolve the desired configuration.
///
/// `database_name` is the name of the owning application, used as the
/// target database.
///
/// # Errors
///
/// Returns [`Error::MalformedSignal`] when the database endpoint cannot be
/// split into host and port.
pub fn resolve(signals: &Signals, database_name: &str) -> Result<DesiredConfig> {
    let database_url = signals
        .database
        .as_ref()
        .map(|relation| database_url(relation, database_name))
        .transpose()?
        .flatten();

    let (host_url, host_port) = resolve_host(&signals.ingress, signals.binding.as_deref());

    Ok(DesiredConfig {
        database_url,
        host_url,
        host_port,
    })
}

/// Build the connection string from a database relation.
///
/// Returns `Ok(None)` until endpoint, credentials and database name are all
/// available. Credentials are inserted verbatim.
///
/// # Errors
///
/// Returns [`Error::MalformedSignal`] if the endpoint has no port separator.
pub fn database_url(relation: &DatabaseRelation, database_name: &str) -> Result<Option<String>> {
    let (Some(endpoints), Some(username), Some(password)) = (
        relation.endpoints.as_deref(),
        relation.username.as_deref(),
        relation.password.as_deref(),
    ) else {
        return Ok(None);
    };

    if database_name.is_empty() {
        return Ok(None);
    }

    let (host, port) = split_endpoint(endpoints)?;

    Ok(Some(format!(
        "postgresql://{username}:{password}@{host}:{port}/{database_name}"
    )))
}

/// Split a `host:port` endpoint on its first colon.
///
/// A comma-separated list resolves to its first entry.
///
/// # Errors
///
/// Returns [`Error::MalformedSignal`] when there is no colon or either side
/// of it is empty.
pub fn split_endpoint(endpoints: &str) -> Result<(&str, &str)> {
    let endpoint = endpoints.split(',').next().unwrap_or_default().trim();

    let (host, port) = endpoint.split_once(':').ok_or_else(|| {
        Error::malformed_signal(
            "database",
            format!("endpoint '{endpoint}' has no port separator"),
        )
    })?;

    if host.is_empty() || port.is_empty() {
        return Err(Error::malformed_signal(
            "database",
            format!("endpoint '{endpoint}' is missing a host or port"),
        ));
    }

    Ok((host, port))
}

/// Pick the externally reachable address.
///
/// Ingress wins over the local binding and pins the port to
/// [`PUBLIC_TLS_PORT`]; the binding path leaves the port unset.
#[must_use]
pub fn resolve_host(ingress: &[String], binding: Option<&str>) -> (Option<String>, Option<u16>) {
    match (ingress.first(), binding) {
        (Some(url), _) => (Some(url.clone()), Some(PUBLIC_TLS_PORT)),
        (None, Some(address)) => (Some(address.to_string()), None),
        (None, None) => (None, None),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use proptest::prelude::*;

    use super::*;
    use crate::error::ErrorKind;

    fn signals(
        database: Option<DatabaseRelation>,
        ingress: &[&str],
        binding: Option<&str>,
    ) -> Signals {
        Signals {
            database,
            ingress: ingress.iter().map(ToString::to_string).collect(),
            binding: binding.map(ToString::to_string),
        }
    }

    #[test]
    fn test_database_url_composition() {
        let relation = DatabaseRelation::new("h:p", "alice", "s3cret");
        let config = resolve(&signals(Some(relation), &[], None), "d").unwrap();
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgresql://alice:s3cret@h:p/d")
        );
    }

    #[test]
    fn test_incomplete_relation_leaves_url_unset() {
        let relation = DatabaseRelation {
            endpoints: Some("db:5432".to_string()),
            username: Some("alice".to_string()),
            password: None,
        };
        let config = resolve(&signals(Some(relation), &[], None), "asciinema").unwrap();
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn test_empty_database_name_leaves_url_unset() {
        let relation = DatabaseRelation::new("db:5432", "alice", "pw");
        assert_eq!(database_url(&relation, "").unwrap(), None);
    }

    #[test]
    fn test_endpoint_without_colon_is_malformed() {
        let relation = DatabaseRelation::new("noport", "alice", "pw");
        let err = resolve(&signals(Some(relation), &[], None), "d").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedSignal);
    }

    #[test]
    fn test_endpoint_with_empty_port_is_malformed() {
        assert!(split_endpoint("db:").is_err());
        assert!(split_endpoint(":5432").is_err());
    }

    #[test]
    fn test_endpoint_splits_on_first_colon() {
        assert_eq!(split_endpoint("db:5432:extra").unwrap(), ("db", "5432:extra"));
    }

    #[test]
    fn test_endpoint_list_uses_first_entry() {
        assert_eq!(
            split_endpoint("10.0.0.1:5432,10.0.0.2:5432").unwrap(),
            ("10.0.0.1", "5432")
        );
    }

    #[test]
    fn test_malformed_endpoint_ignored_while_credentials_missing() {
        let relation = DatabaseRelation {
            endpoints: Some("noport".to_string()),
            ..DatabaseRelation::default()
        };
        assert_eq!(database_url(&relation, "d").unwrap(), None);
    }

    #[test]
    fn test_ingress_takes_precedence() {
        let config = resolve(&signals(None, &["a.example"], Some("10.0.0.5")), "d").unwrap();
        assert_eq!(config.host_url.as_deref(), Some("a.example"));
        assert_eq!(config.host_port, Some(443));
    }

    #[test]
    fn test_first_ingress_endpoint_wins() {
        let config = resolve(&signals(None, &["a.example", "b.example"], None), "d").unwrap();
        assert_eq!(config.host_url.as_deref(), Some("a.example"));
    }

    #[test]
    fn test_binding_fallback() {
        let config = resolve(&signals(None, &[], Some("10.0.0.5")), "d").unwrap();
        assert_eq!(config.host_url.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.host_port, None);
    }

    #[test]
    fn test_no_host_signals() {
        let config = resolve(&signals(None, &[], None), "d").unwrap();
        assert_eq!(config, DesiredConfig::default());
    }

    proptest! {
        #[test]
        fn prop_resolve_is_deterministic(
            host in "[a-z][a-z0-9.-]{0,20}",
            port in 1u16..=u16::MAX,
            user in "[a-zA-Z0-9_]{1,12}",
            password in "[a-zA-Z0-9_]{1,12}",
            ingress in proptest::collection::vec("[a-z]{1,8}\\.example", 0..3),
            binding in proptest::option::of("10\\.0\\.0\\.[0-9]{1,3}"),
        ) {
            let relation = DatabaseRelation::new(format!("{host}:{port}"), user.clone(), password.clone());
            let input = Signals { database: Some(relation), ingress, binding };

            let first = resolve(&input, "asciinema").unwrap();
            let second = resolve(&input, "asciinema").unwrap();

            prop_assert_eq!(&first, &second);
            prop_assert_eq!(
                first.database_url,
                Some(format!("postgresql://{user}:{password}@{host}:{port}/asciinema"))
            );
        }
    }
}
