//! Per-consumer metrics aggregation and export.
//!
//! Every consumer attached to a topic subscription gets a set of live counters
//! (messages and bytes delivered, acknowledgements, redeliveries, unacknowledged
//! count, flow-control permits) updated synchronously on the dispatch path, and a
//! dimensional attribute tuple resolved once at attach time. The
//! [`ConsumerMetricsRegistry`] bounds the exported series to currently-attached
//! consumers; the [`ConsumerStatsCollector`] turns a registry snapshot into labeled,
//! cumulative measurements on every collection cycle.
//!
//! Wiring into the broker is listener-based: consumer management drives a
//! [`LifecycleDispatcher`], and [`ConsumerMetricsListener`] creates and removes
//! registrations as consumers come and go. The dispatch path records events through
//! the [`ConsumerInstrument`] handle, which is lock-free and safe to share across the
//! delivery threads serving one consumer.

pub mod attributes;
pub mod collector;
pub mod config;
pub mod counters;
pub mod lifecycle;
pub mod registry;
pub mod reporter;

pub use self::attributes::{AttributeResolver, AttributeSet, AttributeValue, ConsumerAttributes};
pub use self::collector::{ConsumerStatsCollector, Measurement};
pub use self::config::{ConfigurationError, TelemetryConfiguration};
pub use self::counters::{ConsumerInstrument, CounterSnapshot};
pub use self::lifecycle::{
    ConsumerAttachment, ConsumerLifecycleListener, ConsumerMetricsListener, LifecycleDispatcher,
};
pub use self::registry::{ConsumerEntry, ConsumerMetricsRegistry, ConsumerToken, RegistryError};
pub use self::reporter::{MeasurementReceiver, TelemetryReporter};
