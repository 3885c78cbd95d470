//! Pull-based export of consumer measurements.

use loft_error::{generic_error, GenericError};
use tracing::error;

use crate::{
    attributes::{keys, Attribute, AttributeSet},
    registry::{ConsumerEntry, ConsumerMetricsRegistry},
};

/// Cumulative messages delivered to the consumer.
pub const MESSAGE_OUT_COUNTER: &str = "loft.broker.consumer.message.outgoing.count";

/// Cumulative payload bytes delivered to the consumer.
pub const BYTES_OUT_COUNTER: &str = "loft.broker.consumer.message.outgoing.size";

/// Cumulative messages acknowledged by the consumer.
pub const MESSAGE_ACK_COUNTER: &str = "loft.broker.consumer.message.ack.count";

/// Remaining flow-control credit for the consumer.
pub const MESSAGE_PERMITS_COUNTER: &str = "loft.broker.consumer.permit.count";

/// Messages delivered but not yet acknowledged. Carries the extra
/// [`keys::CONSUMER_BLOCKED`] attribute.
pub const MESSAGE_UNACK_COUNTER: &str = "loft.broker.consumer.message.unack.count";

/// Cumulative redelivery events for the consumer.
pub const MESSAGE_REDELIVER_COUNTER: &str = "loft.broker.consumer.message.redeliver.count";

/// A single labeled measurement.
///
/// Cumulative counters are reported as running totals since the consumer attached,
/// never as deltas; rate computation belongs to the telemetry backend.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    name: &'static str,
    value: i64,
    attributes: AttributeSet,
}

impl Measurement {
    fn new(name: &'static str, value: i64, attributes: AttributeSet) -> Self {
        Self {
            name,
            value,
            attributes,
        }
    }

    /// Returns the metric name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the measured value.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Returns the attributes labeling this measurement.
    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

/// Collects labeled measurements for every currently-attached consumer.
///
/// Driven by the telemetry pipeline on whatever cadence it chooses; each call to
/// [`collect`][Self::collect] is one collection cycle. Consumers absent from the
/// registry snapshot are never reported, and consumers present in it always are, even
/// when every counter is still zero.
#[derive(Clone)]
pub struct ConsumerStatsCollector {
    registry: ConsumerMetricsRegistry,
}

impl ConsumerStatsCollector {
    /// Creates a collector reading from the given registry.
    pub fn new(registry: ConsumerMetricsRegistry) -> Self {
        Self { registry }
    }

    /// Runs one collection cycle.
    ///
    /// A consumer whose measurements cannot be rendered is skipped, with an error
    /// logged, rather than aborting the rest of the cycle.
    pub fn collect(&self) -> Vec<Measurement> {
        let entries = self.registry.snapshot();

        let mut measurements = Vec::with_capacity(entries.len() * 6);
        for entry in entries {
            match consumer_measurements(&entry) {
                Ok(batch) => measurements.extend(batch),
                Err(e) => {
                    error!(consumer = %entry.token(), "Skipping consumer in collection cycle: {}", e);
                }
            }
        }

        measurements
    }
}

fn consumer_measurements(entry: &ConsumerEntry) -> Result<[Measurement; 6], GenericError> {
    let counters = entry.counters();
    let attributes = entry.attributes().attribute_set();

    let mut unack_attributes = attributes.clone();
    unack_attributes.push(Attribute::new(keys::CONSUMER_BLOCKED, counters.blocked));

    Ok([
        Measurement::new(MESSAGE_OUT_COUNTER, as_sum(counters.messages_out)?, attributes.clone()),
        Measurement::new(BYTES_OUT_COUNTER, as_sum(counters.bytes_out)?, attributes.clone()),
        Measurement::new(MESSAGE_ACK_COUNTER, as_sum(counters.messages_acked)?, attributes.clone()),
        Measurement::new(MESSAGE_PERMITS_COUNTER, counters.available_permits, attributes.clone()),
        Measurement::new(MESSAGE_UNACK_COUNTER, as_sum(counters.messages_unacked)?, unack_attributes),
        Measurement::new(MESSAGE_REDELIVER_COUNTER, as_sum(counters.messages_redelivered)?, attributes),
    ])
}

// Measurement values are signed on the wire; a counter that has outgrown i64 cannot be
// represented faithfully and fails the entry instead of wrapping.
fn as_sum(value: u64) -> Result<i64, GenericError> {
    i64::try_from(value).map_err(|_| generic_error!("counter value {} exceeds the representable range", value))
}
