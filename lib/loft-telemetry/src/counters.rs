//! Per-consumer counters and the dispatch-path handle that updates them.

use std::sync::{
    atomic::{
        AtomicBool, AtomicI64, AtomicU64,
        Ordering::Relaxed,
    },
    Arc,
};

/// The counters tracked for one attached consumer.
///
/// All fields are updated with per-field atomics: dispatch threads serving the same
/// consumer may race on any of them, and the export path reads them without taking a
/// lock. Readers get per-field consistency only; there is no cross-field atomicity.
#[derive(Debug)]
pub(crate) struct ConsumerCounters {
    messages_out: AtomicU64,
    bytes_out: AtomicU64,
    messages_acked: AtomicU64,
    messages_unacked: AtomicU64,
    messages_redelivered: AtomicU64,
    available_permits: AtomicI64,
    receiver_queue_size: u32,
    blocked: AtomicBool,
}

impl ConsumerCounters {
    pub(crate) fn new(receiver_queue_size: u32) -> Self {
        Self {
            messages_out: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
            messages_acked: AtomicU64::new(0),
            messages_unacked: AtomicU64::new(0),
            messages_redelivered: AtomicU64::new(0),
            available_permits: AtomicI64::new(0),
            receiver_queue_size,
            blocked: AtomicBool::new(false),
        }
    }

    fn record_delivery(&self, payload_size: u64) {
        self.messages_out.fetch_add(1, Relaxed);
        self.bytes_out.fetch_add(payload_size, Relaxed);
        self.messages_unacked.fetch_add(1, Relaxed);

        // Permits floor at zero: delivery of a message the dispatcher pushed without
        // credit must not drive the reported value negative.
        let _ = self
            .available_permits
            .fetch_update(Relaxed, Relaxed, |permits| Some((permits - 1).max(0)));
    }

    fn record_ack(&self) {
        self.messages_acked.fetch_add(1, Relaxed);
        let _ = self
            .messages_unacked
            .fetch_update(Relaxed, Relaxed, |unacked| Some(unacked.saturating_sub(1)));
    }

    fn record_redelivery(&self) {
        self.messages_redelivered.fetch_add(1, Relaxed);
    }

    fn grant_permits(&self, granted: u32) {
        let ceiling = i64::from(self.receiver_queue_size);
        let _ = self
            .available_permits
            .fetch_update(Relaxed, Relaxed, |permits| {
                Some((permits + i64::from(granted)).min(ceiling))
            });
    }

    fn reconcile_unacked(&self, lost: u64) {
        let _ = self
            .messages_unacked
            .fetch_update(Relaxed, Relaxed, |unacked| Some(unacked.saturating_sub(lost)));
    }

    fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            messages_out: self.messages_out.load(Relaxed),
            bytes_out: self.bytes_out.load(Relaxed),
            messages_acked: self.messages_acked.load(Relaxed),
            messages_unacked: self.messages_unacked.load(Relaxed),
            messages_redelivered: self.messages_redelivered.load(Relaxed),
            available_permits: self.available_permits.load(Relaxed),
            blocked: self.blocked.load(Relaxed),
        }
    }
}

/// A point-in-time view of one consumer's counters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CounterSnapshot {
    /// Cumulative messages delivered to the consumer.
    pub messages_out: u64,

    /// Cumulative payload bytes delivered to the consumer.
    pub bytes_out: u64,

    /// Cumulative messages acknowledged by the consumer.
    pub messages_acked: u64,

    /// Messages delivered but not yet acknowledged.
    pub messages_unacked: u64,

    /// Cumulative redelivery events for the consumer.
    pub messages_redelivered: u64,

    /// Remaining flow-control credit.
    pub available_permits: i64,

    /// Whether the consumer is currently unable to receive more messages.
    pub blocked: bool,
}

/// A handle for recording dispatch-path events against one consumer.
///
/// Returned by [`ConsumerMetricsRegistry::register`][crate::registry::ConsumerMetricsRegistry::register]
/// and cheap to clone: every delivery thread serving the consumer can hold its own
/// copy. Each method applies its counter mutation synchronously at the call site, so
/// nothing is lost if the consumer's connection drops immediately afterwards.
#[derive(Clone, Debug)]
pub struct ConsumerInstrument {
    counters: Arc<ConsumerCounters>,
}

impl ConsumerInstrument {
    pub(crate) fn from_counters(counters: Arc<ConsumerCounters>) -> Self {
        Self { counters }
    }

    /// Records a message handed to the consumer for delivery.
    ///
    /// Bumps the delivered-message and delivered-byte counters, adds the message to the
    /// unacknowledged count, and consumes one flow-control permit (never below zero).
    pub fn record_delivery(&self, payload_size: u64) {
        self.counters.record_delivery(payload_size);
    }

    /// Records an acknowledgement from the consumer.
    pub fn record_ack(&self) {
        self.counters.record_ack();
    }

    /// Records a redelivery event, whether from ack-timeout expiry or an explicit
    /// redeliver request. A message redelivered more than once counts each time.
    pub fn record_redelivery(&self) {
        self.counters.record_redelivery();
    }

    /// Records a flow-control grant from the consumer.
    ///
    /// Credit is capped at the consumer's configured receiver queue size.
    pub fn grant_permits(&self, granted: u32) {
        self.counters.grant_permits(granted);
    }

    /// Removes `lost` messages from the unacknowledged count without acknowledgement.
    ///
    /// The dispatcher owns loss modes other than acknowledgement (TTL expiry,
    /// subscription removal) and reports them here, rather than this subsystem deriving
    /// the unacknowledged count from delivered minus acked.
    pub fn reconcile_unacked(&self, lost: u64) {
        self.counters.reconcile_unacked(lost);
    }

    /// Marks the consumer as unable to receive more messages.
    pub fn mark_blocked(&self) {
        self.counters.set_blocked(true);
    }

    /// Marks the consumer as able to receive messages again.
    pub fn mark_unblocked(&self) {
        self.counters.set_blocked(false);
    }

    /// Returns the consumer's configured receiver queue size.
    pub fn receiver_queue_size(&self) -> u32 {
        self.counters.receiver_queue_size
    }

    /// Returns a point-in-time view of the consumer's counters.
    pub fn snapshot(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn instrument(receiver_queue_size: u32) -> ConsumerInstrument {
        ConsumerInstrument::from_counters(Arc::new(ConsumerCounters::new(receiver_queue_size)))
    }

    #[test]
    fn delivery_and_ack_accounting() {
        let instrument = instrument(100);
        instrument.grant_permits(100);

        for _ in 0..5 {
            instrument.record_delivery(100);
        }
        for _ in 0..3 {
            instrument.record_ack();
        }

        let snapshot = instrument.snapshot();
        assert_eq!(snapshot.messages_out, 5);
        assert_eq!(snapshot.bytes_out, 500);
        assert_eq!(snapshot.messages_acked, 3);
        assert_eq!(snapshot.messages_unacked, 2);
        assert_eq!(snapshot.available_permits, 95);
        assert!(!snapshot.blocked);
    }

    #[test]
    fn permits_never_negative() {
        let instrument = instrument(10);

        // No credit granted yet, so deliveries cannot take permits below zero.
        for _ in 0..3 {
            instrument.record_delivery(1);
        }
        assert_eq!(instrument.snapshot().available_permits, 0);
    }

    #[test]
    fn permits_capped_at_receiver_queue_size() {
        let instrument = instrument(10);
        instrument.grant_permits(25);
        assert_eq!(instrument.snapshot().available_permits, 10);

        instrument.record_delivery(1);
        instrument.grant_permits(5);
        assert_eq!(instrument.snapshot().available_permits, 10);
    }

    #[test]
    fn unacked_saturates_at_zero() {
        let instrument = instrument(10);
        instrument.record_delivery(1);
        instrument.record_ack();
        instrument.record_ack();
        assert_eq!(instrument.snapshot().messages_unacked, 0);
        assert_eq!(instrument.snapshot().messages_acked, 2);
    }

    #[test]
    fn reconcile_unacked_applies_dispatcher_losses() {
        let instrument = instrument(10);
        for _ in 0..4 {
            instrument.record_delivery(1);
        }
        instrument.reconcile_unacked(3);
        assert_eq!(instrument.snapshot().messages_unacked, 1);

        instrument.reconcile_unacked(10);
        assert_eq!(instrument.snapshot().messages_unacked, 0);
    }

    #[test]
    fn redeliveries_accumulate_independently_of_acks() {
        let instrument = instrument(10);
        instrument.record_delivery(1);
        instrument.record_redelivery();
        instrument.record_redelivery();
        instrument.record_ack();

        let snapshot = instrument.snapshot();
        assert_eq!(snapshot.messages_redelivered, 2);
        assert_eq!(snapshot.messages_acked, 1);
    }

    #[test]
    fn blocked_flag_tracks_dispatch_state() {
        let instrument = instrument(10);
        assert!(!instrument.snapshot().blocked);

        instrument.mark_blocked();
        assert!(instrument.snapshot().blocked);

        instrument.mark_unblocked();
        assert!(!instrument.snapshot().blocked);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        const THREADS: usize = 8;
        const INCREMENTS_PER_THREAD: usize = 10_000;

        let instrument = instrument(u32::MAX);
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let instrument = instrument.clone();
                thread::spawn(move || {
                    for _ in 0..INCREMENTS_PER_THREAD {
                        instrument.record_delivery(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = instrument.snapshot();
        let expected = (THREADS * INCREMENTS_PER_THREAD) as u64;
        assert_eq!(snapshot.messages_out, expected);
        assert_eq!(snapshot.bytes_out, expected);
        assert_eq!(snapshot.messages_unacked, expected);
    }
}
