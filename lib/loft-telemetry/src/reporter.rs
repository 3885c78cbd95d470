//! Periodic collection driver for push-style telemetry pipelines.

use std::sync::{
    atomic::{AtomicBool, Ordering::SeqCst},
    Arc,
};
use std::time::Duration;

use loft_error::{generic_error, GenericError};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::debug;

use crate::{
    collector::{ConsumerStatsCollector, Measurement},
    config::TelemetryConfiguration,
};

/// Periodically runs collection cycles and broadcasts the results.
///
/// Layered on top of [`ConsumerStatsCollector`] for pipelines that want to be handed
/// measurements on a fixed cadence instead of pulling them; the pull surface stays
/// available either way. The reporter runs on its own tokio task and never touches
/// dispatch threads.
pub struct TelemetryReporter {
    collector: ConsumerStatsCollector,
    collection_interval: Duration,
    flush_tx: broadcast::Sender<Arc<Vec<Measurement>>>,
    spawned: AtomicBool,
}

impl TelemetryReporter {
    /// Creates a reporter driving the given collector.
    pub fn new(collector: ConsumerStatsCollector, config: &TelemetryConfiguration) -> Self {
        let (flush_tx, _) = broadcast::channel(config.channel_capacity());
        Self {
            collector,
            collection_interval: config.collection_interval(),
            flush_tx,
            spawned: AtomicBool::new(false),
        }
    }

    /// Subscribes to collection cycles.
    ///
    /// A subscriber that falls behind by more than the configured channel capacity
    /// loses its own backlog; other subscribers and the collection cadence are
    /// unaffected.
    pub fn subscribe(&self) -> MeasurementReceiver {
        MeasurementReceiver {
            flush_rx: self.flush_tx.subscribe(),
        }
    }

    /// Spawns the collection loop.
    ///
    /// # Errors
    ///
    /// If the reporter has already been spawned, an error is returned.
    pub fn spawn(&self) -> Result<JoinHandle<()>, GenericError> {
        if self.spawned.swap(true, SeqCst) {
            return Err(generic_error!("telemetry reporter already spawned"));
        }

        let collector = self.collector.clone();
        let flush_tx = self.flush_tx.clone();
        let collection_interval = self.collection_interval;
        Ok(tokio::spawn(run_collection_loop(collector, flush_tx, collection_interval)))
    }
}

async fn run_collection_loop(
    collector: ConsumerStatsCollector, flush_tx: broadcast::Sender<Arc<Vec<Measurement>>>,
    collection_interval: Duration,
) {
    let mut interval = tokio::time::interval(collection_interval);

    loop {
        interval.tick().await;

        // With nobody subscribed there is no point paying for a collection cycle.
        if flush_tx.receiver_count() == 0 {
            continue;
        }

        let measurements = collector.collect();
        debug!(measurement_count = measurements.len(), "Flushing consumer measurements.");
        let _ = flush_tx.send(Arc::new(measurements));
    }
}

/// A subscription to the reporter's collection cycles.
pub struct MeasurementReceiver {
    flush_rx: broadcast::Receiver<Arc<Vec<Measurement>>>,
}

impl MeasurementReceiver {
    /// Waits for the next collection cycle's measurements.
    pub async fn next(&mut self) -> Option<Arc<Vec<Measurement>>> {
        self.flush_rx.recv().await.ok()
    }
}

#[cfg(test)]
mod tests {
    use loft_topic::{ClientInfo, SubscriptionDescriptor, SubscriptionType, TopicName};

    use super::*;
    use crate::{
        attributes::AttributeResolver,
        collector::MESSAGE_OUT_COUNTER,
        lifecycle::ConsumerAttachment,
        registry::{ConsumerMetricsRegistry, ConsumerToken},
    };

    fn reporter_over(registry: &ConsumerMetricsRegistry) -> TelemetryReporter {
        let collector = ConsumerStatsCollector::new(registry.clone());
        TelemetryReporter::new(collector, &TelemetryConfiguration::default())
    }

    fn register(registry: &ConsumerMetricsRegistry, raw_token: u64) {
        let token = ConsumerToken::from_raw(raw_token);
        let topic = TopicName::parse("persistent://acme/ingest/orders").unwrap();
        let attachment = ConsumerAttachment {
            token,
            consumer_name: format!("consumer-{raw_token}"),
            receiver_queue_size: 100,
            subscription: SubscriptionDescriptor::new(topic, "orders-sub", SubscriptionType::Shared),
            client: ClientInfo::new("127.0.0.1:49152".parse().unwrap(), "loft-rs-2.3.0"),
        };
        let attributes = AttributeResolver::new().resolve(&attachment);
        registry.register(token, attributes, 100).unwrap();
    }

    #[tokio::test]
    async fn broadcasts_collection_cycles() {
        let registry = ConsumerMetricsRegistry::new();
        register(&registry, 1);

        let reporter = reporter_over(&registry);
        let mut receiver = reporter.subscribe();
        let handle = reporter.spawn().unwrap();

        let measurements = receiver.next().await.unwrap();
        assert_eq!(measurements.len(), 6);
        assert!(measurements.iter().any(|m| m.name() == MESSAGE_OUT_COUNTER));

        handle.abort();
    }

    #[tokio::test]
    async fn second_spawn_is_an_error() {
        let registry = ConsumerMetricsRegistry::new();
        let reporter = reporter_over(&registry);

        let handle = reporter.spawn().unwrap();
        assert!(reporter.spawn().is_err());

        handle.abort();
    }
}
