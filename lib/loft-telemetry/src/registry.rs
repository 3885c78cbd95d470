//! Registry of counter sets for currently-attached consumers.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use loft_common::collections::FastHashMap;
use metrics::{counter, gauge, Counter, Gauge};
use snafu::Snafu;
use tracing::debug;

use crate::{
    attributes::ConsumerAttributes,
    counters::{ConsumerCounters, ConsumerInstrument, CounterSnapshot},
};

/// Opaque identity of one attached consumer.
///
/// Allocated by consumer management when the consumer attaches, and stable until it
/// detaches. Tokens are never reused while the original holder is still attached.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ConsumerToken(u64);

impl ConsumerToken {
    /// Creates a token from its raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value of the token.
    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConsumerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A consumer registration error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum RegistryError {
    /// The consumer identity is already registered.
    ///
    /// Attaching the same identity twice is a logic error in the attach path, so it is
    /// surfaced rather than merged into the existing registration.
    #[snafu(display("consumer {token} is already registered"))]
    AlreadyRegistered {
        /// The identity that was registered twice.
        token: ConsumerToken,
    },
}

struct Telemetry {
    active_consumers: Gauge,
    consumers_attached: Counter,
    consumers_detached: Counter,
}

impl Telemetry {
    fn new() -> Self {
        Self {
            active_consumers: gauge!("consumer_metrics.active_consumers"),
            consumers_attached: counter!("consumer_metrics.consumers_attached"),
            consumers_detached: counter!("consumer_metrics.consumers_detached"),
        }
    }

    fn consumer_attached(&self) {
        self.consumers_attached.increment(1);
        self.active_consumers.increment(1.0);
    }

    fn consumer_detached(&self) {
        self.consumers_detached.increment(1);
        self.active_consumers.decrement(1.0);
    }
}

/// One registered consumer: its attribute tuple plus its counters.
#[derive(Clone)]
pub struct ConsumerEntry {
    token: ConsumerToken,
    attributes: Arc<ConsumerAttributes>,
    counters: Arc<ConsumerCounters>,
}

impl ConsumerEntry {
    /// Returns the consumer's identity.
    pub fn token(&self) -> ConsumerToken {
        self.token
    }

    /// Returns the consumer's attribute tuple.
    pub fn attributes(&self) -> &ConsumerAttributes {
        &self.attributes
    }

    /// Returns a point-in-time view of the consumer's counters.
    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }
}

/// A registry of counter sets, one per currently-attached consumer.
///
/// The registry is the single owner of exported-series cardinality: an entry exists
/// exactly while its consumer is attached, and detach removes the entry (and with it
/// the series) instead of zeroing it, so consumer churn cannot grow the exported set
/// without bound.
///
/// Registration and removal take a lock over the key space only; the counters inside
/// each entry are updated lock-free through [`ConsumerInstrument`] handles, and the
/// export path reads them without ever touching the hot path.
///
/// # Telemetry
///
/// The registry reports on itself through three metrics:
///
/// - `consumer_metrics.active_consumers`: currently-registered consumers (`gauge`)
/// - `consumer_metrics.consumers_attached`: total registrations (`counter`)
/// - `consumer_metrics.consumers_detached`: total removals (`counter`)
#[derive(Clone)]
pub struct ConsumerMetricsRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    consumers: Mutex<FastHashMap<ConsumerToken, ConsumerEntry>>,
    telemetry: Telemetry,
}

impl ConsumerMetricsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                consumers: Mutex::new(FastHashMap::default()),
                telemetry: Telemetry::new(),
            }),
        }
    }

    /// Registers a consumer, creating its counter set.
    ///
    /// The returned handle is the consumer's dispatch-path instrument; it can be cloned
    /// freely and also fetched later via [`instrument`][Self::instrument].
    ///
    /// # Errors
    ///
    /// If the token is already registered, an error is returned and the existing
    /// registration is left untouched.
    pub fn register(
        &self, token: ConsumerToken, attributes: ConsumerAttributes, receiver_queue_size: u32,
    ) -> Result<ConsumerInstrument, RegistryError> {
        let mut consumers = self.inner.consumers.lock().unwrap();
        if consumers.contains_key(&token) {
            return AlreadyRegistered { token }.fail();
        }

        let counters = Arc::new(ConsumerCounters::new(receiver_queue_size));
        consumers.insert(
            token,
            ConsumerEntry {
                token,
                attributes: Arc::new(attributes),
                counters: Arc::clone(&counters),
            },
        );
        drop(consumers);

        self.inner.telemetry.consumer_attached();
        debug!(consumer = %token, "Registered consumer.");

        Ok(ConsumerInstrument::from_counters(counters))
    }

    /// Removes a consumer's registration, dropping its series entirely.
    ///
    /// Removing an unknown (or already-removed) token is a no-op; it never disturbs
    /// other registrations and never resurrects stale data.
    pub fn unregister(&self, token: ConsumerToken) {
        let removed = self.inner.consumers.lock().unwrap().remove(&token);
        match removed {
            Some(_) => {
                self.inner.telemetry.consumer_detached();
                debug!(consumer = %token, "Unregistered consumer.");
            }
            None => debug!(consumer = %token, "Ignoring unregister for unknown consumer."),
        }
    }

    /// Returns the dispatch-path instrument for a registered consumer.
    pub fn instrument(&self, token: ConsumerToken) -> Option<ConsumerInstrument> {
        let consumers = self.inner.consumers.lock().unwrap();
        consumers
            .get(&token)
            .map(|entry| ConsumerInstrument::from_counters(Arc::clone(&entry.counters)))
    }

    /// Returns all consumers registered at the time of the call, ordered by token.
    ///
    /// Entries are complete or absent, never torn: a concurrent register or unregister
    /// either lands before the snapshot and is fully reflected, or lands after it and
    /// is fully excluded.
    pub fn snapshot(&self) -> Vec<ConsumerEntry> {
        let consumers = self.inner.consumers.lock().unwrap();
        let mut entries: Vec<_> = consumers.values().cloned().collect();
        drop(consumers);

        entries.sort_unstable_by_key(|entry| entry.token);
        entries
    }

    /// Returns the number of currently-registered consumers.
    pub fn len(&self) -> usize {
        self.inner.consumers.lock().unwrap().len()
    }

    /// Returns `true` if no consumers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConsumerMetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
