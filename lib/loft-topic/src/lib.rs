//! Topic, subscription, and client descriptors.
//!
//! These are the broker-side identities that other components hang state off of:
//! parsed topic names, subscription descriptors, and the connection-level details of a
//! consuming client.
#![deny(warnings)]
#![deny(missing_docs)]

mod client;
mod name;
mod subscription;

pub use self::client::ClientInfo;
pub use self::name::{TopicDomain, TopicName, TopicNameError};
pub use self::subscription::{SubscriptionDescriptor, SubscriptionType};
