//! Aggregator subscription state.
//!
//! One [`AggregatorState`] instance exists per aggregator, guarded by the
//! aggregator's mutex. Each source occupies an owned-optional slot;
//! releasing a slot is a no-op if it is already empty, which is what makes
//! stop idempotent and concurrency-safe.

use crate::fix::SourceKind;
use crate::source::{SinkGate, SubscriptionHandle};

/// One live registration against an underlying source.
#[derive(Debug)]
pub(crate) struct SourceSubscription {
    kind: SourceKind,
    gate: SinkGate,
    handle: SubscriptionHandle,
}

impl SourceSubscription {
    pub(crate) fn new(kind: SourceKind, gate: SinkGate, handle: SubscriptionHandle) -> Self {
        Self { kind, gate, handle }
    }

    pub(crate) fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Close the sink gate, then run the platform teardown.
    ///
    /// The gate closes first so a platform callback already in flight
    /// cannot deliver a fix while the listener is being removed.
    pub(crate) fn release(&mut self) {
        self.gate.close();
        self.handle.release();
    }
}

impl Drop for SourceSubscription {
    fn drop(&mut self) {
        self.gate.close();
        // SubscriptionHandle releases itself on drop.
    }
}

/// The aggregator's only shared mutable state.
///
/// Invariants (holding the lock):
/// - `stream_open` implies the slots were populated by the most recent
///   start call; closed implies all slots are empty.
/// - No two live handles for the same source kind ever coexist.
/// - `generation` increments on every start, so a stale stream's teardown
///   can detect that the slots now belong to a newer start.
#[derive(Debug, Default)]
pub(crate) struct AggregatorState {
    network: Option<SourceSubscription>,
    satellite: Option<SourceSubscription>,
    fused: Option<SourceSubscription>,
    stream_open: bool,
    generation: u64,
}

impl AggregatorState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_stream_open(&self) -> bool {
        self.stream_open
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Begin a new start cycle: bump the generation and mark the stream
    /// open. The caller must have cleared any previous subscriptions.
    pub(crate) fn begin_start(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.stream_open = true;
        self.generation
    }

    fn slot_mut(&mut self, kind: SourceKind) -> &mut Option<SourceSubscription> {
        match kind {
            SourceKind::Network => &mut self.network,
            SourceKind::Satellite => &mut self.satellite,
            SourceKind::Fused => &mut self.fused,
        }
    }

    /// Store a subscription in its slot, releasing any previous occupant.
    pub(crate) fn insert(&mut self, subscription: SourceSubscription) {
        let slot = self.slot_mut(subscription.kind());
        if let Some(mut previous) = slot.replace(subscription) {
            previous.release();
        }
    }

    /// Source kinds with a live subscription, in fixed slot order.
    pub(crate) fn active_kinds(&self) -> Vec<SourceKind> {
        [&self.network, &self.satellite, &self.fused]
            .into_iter()
            .flatten()
            .map(SourceSubscription::kind)
            .collect()
    }

    /// Release every held subscription and close the stream.
    ///
    /// Returns the number of handles released. Safe to call when nothing
    /// is registered; empty slots are skipped.
    pub(crate) fn clear(&mut self) -> usize {
        let mut released = 0;
        for slot in [&mut self.network, &mut self.satellite, &mut self.fused] {
            if let Some(mut subscription) = slot.take() {
                subscription.release();
                released += 1;
            }
        }
        self.stream_open = false;
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counted_subscription(
        kind: SourceKind,
        releases: &Arc<AtomicUsize>,
    ) -> (SourceSubscription, SinkGate) {
        let gate = SinkGate::new();
        let counter = Arc::clone(releases);
        let handle = SubscriptionHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (SourceSubscription::new(kind, gate.clone(), handle), gate)
    }

    #[test]
    fn test_clear_releases_all_slots_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut state = AggregatorState::new();
        let (network, _) = counted_subscription(SourceKind::Network, &releases);
        let (fused, _) = counted_subscription(SourceKind::Fused, &releases);
        state.insert(network);
        state.insert(fused);
        state.begin_start();

        assert_eq!(state.clear(), 2);
        assert_eq!(releases.load(Ordering::SeqCst), 2);
        assert!(!state.is_stream_open());

        // Second clear finds empty slots.
        assert_eq!(state.clear(), 0);
        assert_eq!(releases.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_release_closes_gate_before_teardown() {
        let releases = Arc::new(AtomicUsize::new(0));
        let (mut subscription, gate) = counted_subscription(SourceKind::Satellite, &releases);

        assert!(gate.is_open());
        subscription.release();
        assert!(!gate.is_open());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_insert_replaces_and_releases_previous() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut state = AggregatorState::new();
        let (first, first_gate) = counted_subscription(SourceKind::Network, &releases);
        let (second, second_gate) = counted_subscription(SourceKind::Network, &releases);

        state.insert(first);
        state.insert(second);

        // Never two live handles for the same source.
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert!(!first_gate.is_open());
        assert!(second_gate.is_open());
        assert_eq!(state.active_kinds(), vec![SourceKind::Network]);
    }

    #[test]
    fn test_generation_increments_per_start() {
        let mut state = AggregatorState::new();
        let first = state.begin_start();
        let second = state.begin_start();
        assert_eq!(second, first + 1);
        assert_eq!(state.generation(), second);
    }

    #[test]
    fn test_active_kinds_in_slot_order() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut state = AggregatorState::new();
        let (fused, _) = counted_subscription(SourceKind::Fused, &releases);
        let (network, _) = counted_subscription(SourceKind::Network, &releases);
        state.insert(fused);
        state.insert(network);

        assert_eq!(
            state.active_kinds(),
            vec![SourceKind::Network, SourceKind::Fused]
        );
    }
}
