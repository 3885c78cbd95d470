//! Consumer lifecycle events and the listeners that observe them.

use std::sync::Arc;

use loft_topic::{ClientInfo, SubscriptionDescriptor};
use tracing::error;

use crate::{
    attributes::AttributeResolver,
    counters::ConsumerInstrument,
    registry::{ConsumerMetricsRegistry, ConsumerToken, RegistryError},
};

/// Everything consumer management knows about a consumer at attach time.
#[derive(Clone, Debug)]
pub struct ConsumerAttachment {
    /// The consumer's identity for the lifetime of its connection.
    pub token: ConsumerToken,

    /// Consumer name supplied by the client.
    pub consumer_name: String,

    /// The consumer's configured receiver queue size, which bounds its flow-control
    /// credit.
    pub receiver_queue_size: u32,

    /// The subscription the consumer attached to.
    pub subscription: SubscriptionDescriptor,

    /// Connection-level details of the consuming client.
    pub client: ClientInfo,
}

/// An observer of consumer attach/detach events.
///
/// Consumer management invokes listeners synchronously, on the attach/detach path
/// itself, so implementations must be cheap and must not block.
pub trait ConsumerLifecycleListener: Send + Sync {
    /// Called after a consumer has successfully attached to its subscription.
    fn on_consumer_attached(&self, attachment: &ConsumerAttachment);

    /// Called after a consumer has detached, whether by explicit close, connection
    /// loss, or subscription removal.
    fn on_consumer_detached(&self, token: ConsumerToken);
}

/// An ordered chain of lifecycle listeners.
///
/// Listeners fire in registration order, each one synchronously, for every event. The
/// metrics subsystem registers [`ConsumerMetricsListener`] here; other broker
/// components can hang their own listeners off the same chain.
#[derive(Default)]
pub struct LifecycleDispatcher {
    listeners: Vec<Arc<dyn ConsumerLifecycleListener>>,
}

impl LifecycleDispatcher {
    /// Creates a dispatcher with no listeners.
    pub fn new() -> Self {
        Self { listeners: Vec::new() }
    }

    /// Appends a listener to the chain.
    pub fn add_listener(&mut self, listener: Arc<dyn ConsumerLifecycleListener>) {
        self.listeners.push(listener);
    }

    /// Notifies all listeners of a consumer attach.
    pub fn consumer_attached(&self, attachment: &ConsumerAttachment) {
        for listener in &self.listeners {
            listener.on_consumer_attached(attachment);
        }
    }

    /// Notifies all listeners of a consumer detach.
    pub fn consumer_detached(&self, token: ConsumerToken) {
        for listener in &self.listeners {
            listener.on_consumer_detached(token);
        }
    }
}

/// The metrics subsystem's lifecycle listener.
///
/// On attach, resolves the consumer's attribute tuple and registers its counter set;
/// on detach, removes the registration. Attach and registration happen in one step, so
/// an export cycle can never observe a consumer with attributes but no counters, or
/// the reverse.
pub struct ConsumerMetricsListener {
    registry: ConsumerMetricsRegistry,
    resolver: AttributeResolver,
}

impl ConsumerMetricsListener {
    /// Creates a listener feeding the given registry.
    pub fn new(registry: ConsumerMetricsRegistry) -> Self {
        Self {
            registry,
            resolver: AttributeResolver::new(),
        }
    }

    /// Resolves attributes for the attachment and registers the consumer.
    ///
    /// Consumer management can call this directly when it wants the instrument handle
    /// and the duplicate-attach error surfaced to it, rather than going through the
    /// listener chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the attachment's token is already registered.
    pub fn attach(&self, attachment: &ConsumerAttachment) -> Result<ConsumerInstrument, RegistryError> {
        let attributes = self.resolver.resolve(attachment);
        self.registry
            .register(attachment.token, attributes, attachment.receiver_queue_size)
    }
}

impl ConsumerLifecycleListener for ConsumerMetricsListener {
    fn on_consumer_attached(&self, attachment: &ConsumerAttachment) {
        if let Err(e) = self.attach(attachment) {
            // Listener callbacks have no error channel back to consumer management, so
            // the invariant violation is surfaced here.
            error!(consumer = %attachment.token, "Failed to register consumer: {}", e);
        }
    }

    fn on_consumer_detached(&self, token: ConsumerToken) {
        self.registry.unregister(token);
    }
}
