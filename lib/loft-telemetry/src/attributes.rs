//! Dimensional attributes attached to exported consumer measurements.

use std::{net::SocketAddr, sync::Mutex};

use loft_common::{collections::FastHashMap, time::unix_timestamp};
use loft_topic::{SubscriptionType, TopicDomain};

use crate::lifecycle::ConsumerAttachment;

/// Attribute keys used on exported consumer measurements.
pub mod keys {
    /// Storage domain of the topic.
    pub const DOMAIN: &str = "loft.domain";

    /// Tenant that owns the topic.
    pub const TENANT: &str = "loft.tenant";

    /// Namespace of the topic, in `<tenant>/<namespace>` form.
    pub const NAMESPACE: &str = "loft.namespace";

    /// Fully-qualified topic name.
    pub const TOPIC: &str = "loft.topic";

    /// Subscription name.
    pub const SUBSCRIPTION_NAME: &str = "loft.subscription.name";

    /// Subscription type.
    pub const SUBSCRIPTION_TYPE: &str = "loft.subscription.type";

    /// Consumer name supplied by the client.
    pub const CONSUMER_NAME: &str = "loft.consumer.name";

    /// Numeric consumer id, unique within the subscription.
    pub const CONSUMER_ID: &str = "loft.consumer.id";

    /// Unix timestamp (whole seconds) of the consumer's attach.
    pub const CONSUMER_CONNECTED_SINCE: &str = "loft.consumer.connected_since";

    /// Remote socket address of the client connection.
    pub const CLIENT_ADDRESS: &str = "loft.client.address";

    /// Client library version string.
    pub const CLIENT_VERSION: &str = "loft.client.version";

    /// Client-supplied metadata, as ordered `key:value` strings.
    pub const CONSUMER_METADATA: &str = "loft.consumer.metadata";

    /// Whether the consumer is currently blocked. Only present on the
    /// unacknowledged-message measurement.
    pub const CONSUMER_BLOCKED: &str = "loft.consumer.blocked";
}

/// A typed attribute value.
///
/// Attributes carry their native type all the way to the export boundary instead of
/// being flattened to strings up front, so a boolean stays a boolean and a numeric id
/// stays numeric in whatever wire format the telemetry pipeline speaks.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    /// A string value.
    Str(String),

    /// A signed integer value.
    Int(i64),

    /// A boolean value.
    Bool(bool),

    /// An ordered list of strings.
    StrList(Vec<String>),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        Self::StrList(value)
    }
}

/// A single key/value attribute on a measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    key: &'static str,
    value: AttributeValue,
}

impl Attribute {
    /// Creates an attribute from one of the keys in [`keys`].
    pub fn new<V: Into<AttributeValue>>(key: &'static str, value: V) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    /// Returns the attribute key.
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Returns the attribute value.
    pub fn value(&self) -> &AttributeValue {
        &self.value
    }
}

/// An ordered set of attributes.
pub type AttributeSet = Vec<Attribute>;

/// The dimensional attribute tuple of one attached consumer.
///
/// Resolved exactly once, at attach time, and immutable afterwards: every measurement
/// exported for the consumer carries this same tuple until it detaches. The one
/// live-state exception, the blocked flag, is read from the counters at export time
/// and is not part of this type.
#[derive(Clone, Debug)]
pub struct ConsumerAttributes {
    domain: TopicDomain,
    tenant: String,
    namespace: String,
    topic: String,
    subscription_name: String,
    subscription_type: SubscriptionType,
    consumer_name: String,
    consumer_id: u64,
    connected_since: u64,
    client_address: SocketAddr,
    client_version: String,
    metadata: Vec<String>,
}

impl ConsumerAttributes {
    /// Returns the numeric consumer id, unique within the subscription.
    pub fn consumer_id(&self) -> u64 {
        self.consumer_id
    }

    /// Returns the consumer name supplied by the client.
    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }

    /// Returns the Unix timestamp (whole seconds) of the consumer's attach.
    pub fn connected_since(&self) -> u64 {
        self.connected_since
    }

    /// Renders the tuple as an ordered attribute set for export.
    pub fn attribute_set(&self) -> AttributeSet {
        vec![
            Attribute::new(keys::DOMAIN, self.domain.as_str()),
            Attribute::new(keys::TENANT, self.tenant.clone()),
            Attribute::new(keys::NAMESPACE, self.namespace.clone()),
            Attribute::new(keys::TOPIC, self.topic.clone()),
            Attribute::new(keys::SUBSCRIPTION_NAME, self.subscription_name.clone()),
            Attribute::new(keys::SUBSCRIPTION_TYPE, self.subscription_type.as_str()),
            Attribute::new(keys::CONSUMER_NAME, self.consumer_name.clone()),
            Attribute::new(keys::CONSUMER_ID, self.consumer_id as i64),
            Attribute::new(keys::CONSUMER_CONNECTED_SINCE, self.connected_since as i64),
            Attribute::new(keys::CLIENT_ADDRESS, self.client_address.to_string()),
            Attribute::new(keys::CLIENT_VERSION, self.client_version.clone()),
            Attribute::new(keys::CONSUMER_METADATA, self.metadata.clone()),
        ]
    }
}

/// Resolves the attribute tuple for a consumer at attach time.
///
/// Consumer ids are allocated monotonically per topic/subscription pair, so two
/// simultaneously-attached consumers of the same subscription never share an id. Ids
/// are not reused after detach.
pub struct AttributeResolver {
    next_consumer_id: Mutex<FastHashMap<(String, String), u64>>,
}

impl AttributeResolver {
    /// Creates a resolver with no allocated consumer ids.
    pub fn new() -> Self {
        Self {
            next_consumer_id: Mutex::new(FastHashMap::default()),
        }
    }

    /// Builds the full attribute tuple for the given attachment.
    pub fn resolve(&self, attachment: &ConsumerAttachment) -> ConsumerAttributes {
        let topic = &attachment.subscription.topic;
        let metadata = attachment
            .client
            .metadata
            .iter()
            .map(|(key, value)| format!("{key}:{value}"))
            .collect();

        ConsumerAttributes {
            domain: topic.domain(),
            tenant: topic.tenant().to_string(),
            namespace: topic.namespace().to_string(),
            topic: topic.to_string(),
            subscription_name: attachment.subscription.name.clone(),
            subscription_type: attachment.subscription.subscription_type,
            consumer_name: attachment.consumer_name.clone(),
            consumer_id: self.allocate_consumer_id(topic.to_string(), attachment.subscription.name.clone()),
            connected_since: unix_timestamp(),
            client_address: attachment.client.address,
            client_version: attachment.client.version.clone(),
            metadata,
        }
    }

    fn allocate_consumer_id(&self, topic: String, subscription: String) -> u64 {
        let mut next_ids = self.next_consumer_id.lock().unwrap();
        let next_id = next_ids.entry((topic, subscription)).or_insert(0);
        let consumer_id = *next_id;
        *next_id += 1;
        consumer_id
    }
}

impl Default for AttributeResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use loft_topic::{ClientInfo, SubscriptionDescriptor, TopicName};

    use super::*;
    use crate::registry::ConsumerToken;

    fn attachment(subscription_name: &str) -> ConsumerAttachment {
        let topic = TopicName::parse("persistent://acme/ingest/orders").unwrap();
        ConsumerAttachment {
            token: ConsumerToken::from_raw(1),
            consumer_name: "orders-consumer".to_string(),
            receiver_queue_size: 100,
            subscription: SubscriptionDescriptor::new(topic, subscription_name, SubscriptionType::Shared),
            client: ClientInfo::new("10.0.0.7:49152".parse().unwrap(), "loft-rs-2.3.0")
                .with_metadata("prop1", "value1")
                .with_metadata("prop2", "value2"),
        }
    }

    #[test]
    fn resolve_builds_full_tuple() {
        let resolver = AttributeResolver::new();
        let attributes = resolver.resolve(&attachment("orders-sub"));

        let expected = [
            Attribute::new(keys::DOMAIN, "persistent"),
            Attribute::new(keys::TENANT, "acme"),
            Attribute::new(keys::NAMESPACE, "acme/ingest"),
            Attribute::new(keys::TOPIC, "persistent://acme/ingest/orders"),
            Attribute::new(keys::SUBSCRIPTION_NAME, "orders-sub"),
            Attribute::new(keys::SUBSCRIPTION_TYPE, "Shared"),
            Attribute::new(keys::CONSUMER_NAME, "orders-consumer"),
            Attribute::new(keys::CONSUMER_ID, 0_i64),
            Attribute::new(keys::CONSUMER_CONNECTED_SINCE, attributes.connected_since() as i64),
            Attribute::new(keys::CLIENT_ADDRESS, "10.0.0.7:49152"),
            Attribute::new(keys::CLIENT_VERSION, "loft-rs-2.3.0"),
            Attribute::new(
                keys::CONSUMER_METADATA,
                vec!["prop1:value1".to_string(), "prop2:value2".to_string()],
            ),
        ];
        assert_eq!(attributes.attribute_set(), expected);
        assert!(attributes.connected_since() > 0);
    }

    #[test]
    fn consumer_ids_are_monotonic_per_subscription() {
        let resolver = AttributeResolver::new();

        let first = resolver.resolve(&attachment("orders-sub"));
        let second = resolver.resolve(&attachment("orders-sub"));
        let other_subscription = resolver.resolve(&attachment("audit-sub"));

        assert_eq!(first.consumer_id(), 0);
        assert_eq!(second.consumer_id(), 1);
        assert_eq!(other_subscription.consumer_id(), 0);
    }

    #[test]
    fn metadata_preserves_client_order() {
        let resolver = AttributeResolver::new();
        let attributes = resolver.resolve(&attachment("orders-sub"));
        let attribute_set = attributes.attribute_set();

        let metadata = attribute_set
            .iter()
            .find(|attribute| attribute.key() == keys::CONSUMER_METADATA)
            .unwrap();
        assert_eq!(
            metadata.value(),
            &AttributeValue::StrList(vec!["prop1:value1".to_string(), "prop2:value2".to_string()])
        );
    }
}
