use std::fmt;

use crate::TopicName;

/// How consumers attached to the same subscription share its messages.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SubscriptionType {
    /// A single consumer holds the subscription.
    Exclusive,

    /// Messages are distributed round-robin across all attached consumers.
    Shared,

    /// One consumer is active at a time; the rest stand by for failover.
    Failover,

    /// Messages with the same key are routed to the same consumer.
    KeyShared,
}

impl SubscriptionType {
    /// Returns the canonical string representation of the subscription type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exclusive => "Exclusive",
            Self::Shared => "Shared",
            Self::Failover => "Failover",
            Self::KeyShared => "KeyShared",
        }
    }
}

impl fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named consumption cursor over a topic.
#[derive(Clone, Debug)]
pub struct SubscriptionDescriptor {
    /// The topic the subscription consumes from.
    pub topic: TopicName,

    /// The subscription name, unique within the topic.
    pub name: String,

    /// How attached consumers share the subscription.
    pub subscription_type: SubscriptionType,
}

impl SubscriptionDescriptor {
    /// Creates a descriptor for a subscription on the given topic.
    pub fn new<S: Into<String>>(topic: TopicName, name: S, subscription_type: SubscriptionType) -> Self {
        Self {
            topic,
            name: name.into(),
            subscription_type,
        }
    }
}
