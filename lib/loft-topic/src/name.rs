use std::{fmt, str::FromStr};

use snafu::{ensure, Snafu};

/// A topic name parsing error.
#[derive(Debug, Eq, PartialEq, Snafu)]
#[snafu(context(suffix(false)))]
pub enum TopicNameError {
    /// Topic name had no `<domain>://` scheme.
    #[snafu(display("topic name '{topic}' is missing a '<domain>://' scheme"))]
    MissingDomain {
        /// The offending topic name.
        topic: String,
    },

    /// Topic domain was not a recognized value.
    #[snafu(display("topic domain '{domain}' is not one of 'persistent' or 'non_persistent'"))]
    InvalidDomain {
        /// The offending domain.
        domain: String,
    },

    /// Topic path did not have the expected `<tenant>/<namespace>/<topic>` shape.
    #[snafu(display("topic name '{topic}' must be of the form '<domain>://<tenant>/<namespace>/<topic>'"))]
    MalformedPath {
        /// The offending topic name.
        topic: String,
    },
}

/// The storage domain of a topic.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TopicDomain {
    /// Messages are persisted to the storage layer before acknowledgement.
    Persistent,

    /// Messages exist only in memory and are lost on broker restart.
    NonPersistent,
}

impl TopicDomain {
    /// Returns the string representation of the domain, as it appears in topic names.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Persistent => "persistent",
            Self::NonPersistent => "non_persistent",
        }
    }
}

impl fmt::Display for TopicDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-qualified topic name.
///
/// Topic names take the form `<domain>://<tenant>/<namespace>/<topic>`, such as
/// `persistent://acme/ingest/orders`. Parsing validates the shape once so that
/// downstream components can carry the pieces around without re-checking them.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TopicName {
    domain: TopicDomain,
    tenant: String,
    namespace: String,
    local: String,
}

impl TopicName {
    /// Parses a fully-qualified topic name.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheme is missing, the domain is unrecognized, or the
    /// path does not consist of exactly three non-empty segments.
    pub fn parse(raw: &str) -> Result<Self, TopicNameError> {
        let (domain, rest) = raw.split_once("://").ok_or_else(|| {
            MissingDomain { topic: raw }.build()
        })?;

        let domain = match domain {
            "persistent" => TopicDomain::Persistent,
            "non_persistent" => TopicDomain::NonPersistent,
            other => return InvalidDomain { domain: other }.fail(),
        };

        let mut segments = rest.split('/');
        let tenant = segments.next().unwrap_or_default();
        let namespace = segments.next().unwrap_or_default();
        let local = segments.next().unwrap_or_default();
        ensure!(
            !tenant.is_empty() && !namespace.is_empty() && !local.is_empty() && segments.next().is_none(),
            MalformedPath { topic: raw }
        );

        Ok(Self {
            domain,
            tenant: tenant.to_string(),
            namespace: format!("{tenant}/{namespace}"),
            local: local.to_string(),
        })
    }

    /// Returns the storage domain of the topic.
    pub fn domain(&self) -> TopicDomain {
        self.domain
    }

    /// Returns the tenant that owns the topic.
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Returns the namespace of the topic, in `<tenant>/<namespace>` form.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the local (unqualified) topic name.
    pub fn local_name(&self) -> &str {
        &self.local
    }
}

impl FromStr for TopicName {
    type Err = TopicNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.domain, self.namespace, self.local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_persistent() {
        let topic = TopicName::parse("persistent://acme/ingest/orders").unwrap();
        assert_eq!(topic.domain(), TopicDomain::Persistent);
        assert_eq!(topic.tenant(), "acme");
        assert_eq!(topic.namespace(), "acme/ingest");
        assert_eq!(topic.local_name(), "orders");
        assert_eq!(topic.to_string(), "persistent://acme/ingest/orders");
    }

    #[test]
    fn parse_non_persistent() {
        let topic = TopicName::parse("non_persistent://acme/ingest/orders").unwrap();
        assert_eq!(topic.domain(), TopicDomain::NonPersistent);
    }

    #[test]
    fn parse_round_trips_through_display() {
        let raw = "persistent://acme/ingest/orders";
        let reparsed = TopicName::parse(&TopicName::parse(raw).unwrap().to_string()).unwrap();
        assert_eq!(reparsed, TopicName::parse(raw).unwrap());
    }

    #[test]
    fn reject_missing_scheme() {
        let err = TopicName::parse("acme/ingest/orders").unwrap_err();
        assert!(matches!(err, TopicNameError::MissingDomain { .. }));
    }

    #[test]
    fn reject_unknown_domain() {
        let err = TopicName::parse("ephemeral://acme/ingest/orders").unwrap_err();
        assert!(matches!(err, TopicNameError::InvalidDomain { .. }));
    }

    #[test]
    fn reject_malformed_paths() {
        for raw in [
            "persistent://acme/orders",
            "persistent://acme/ingest/orders/extra",
            "persistent://acme//orders",
            "persistent://",
        ] {
            let err = TopicName::parse(raw).unwrap_err();
            assert!(matches!(err, TopicNameError::MalformedPath { .. }), "{raw}");
        }
    }
}
