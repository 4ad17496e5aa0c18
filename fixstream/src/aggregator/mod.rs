//! Multi-source location aggregation.
//!
//! The [`LocationAggregator`] subscribes to the network, satellite, and
//! fused position sources simultaneously and merges their emissions into
//! one ordered [`FixStream`]. It owns the subscription lifecycle: starting
//! the stream registers up to three platform listeners, and tearing the
//! stream down (explicit [`stop`](LocationAggregator::stop) or dropping
//! the consumer side) releases every registration exactly once.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     LocationAggregator                       │
//! │                                                              │
//! │  start_stream ──► is_enabled? ──► register network listener  │
//! │                   is_enabled? ──► register satellite listener│
//! │                   (always)    ──► register fused listener    │
//! │                                                              │
//! │  each listener ──► FixSink ──► mpsc channel ──► FixStream    │
//! │                                                              │
//! │  stop / stream drop ──► release all handles (at most once)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Registration preconditions (access granted, at least one source
//! enabled) are the caller's responsibility, resolved up front through
//! [`crate::gate`]; a source that fails to register is skipped with a
//! warning, never surfaced as an error to the consumer.
//!
//! # Example
//!
//! ```ignore
//! use fixstream::{LocationAggregator, LocationRequestConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let aggregator = LocationAggregator::new(network, satellite, fused);
//!
//! let mut stream = aggregator.start_stream();
//! while let Some(fix) = stream.recv().await {
//!     println!("{fix}");
//! }
//!
//! // One-shot query, independent of the stream:
//! let fix = aggregator.current_position(CancellationToken::new()).await;
//! ```

mod state;
mod stream;

pub use stream::FixStream;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::LocationRequestConfig;
use crate::fix::{PositionFix, SourceKind};
use crate::source::{FixSink, FusedPositionSource, PositionSource, SinkGate, SourceError};

use state::{AggregatorState, SourceSubscription};

/// Default capacity of the merged fix channel.
///
/// Forwarding is fire-and-forget: when the consumer falls this far behind,
/// new fixes are dropped rather than blocking the delivering source.
pub const DEFAULT_FIX_CHANNEL_CAPACITY: usize = 64;

/// Merges fixes from all active sources into one stream and manages the
/// subscribe/unsubscribe lifecycle of the underlying registrations.
///
/// All methods take `&self`; the aggregator is safe to share behind an
/// [`Arc`] and call concurrently. The subscription state is the only
/// shared mutable resource and is guarded so concurrent start/stop calls
/// leave it either fully started or fully stopped.
pub struct LocationAggregator {
    network: Arc<dyn PositionSource>,
    satellite: Arc<dyn PositionSource>,
    fused: Arc<dyn FusedPositionSource>,
    config: LocationRequestConfig,
    channel_capacity: usize,
    state: Arc<Mutex<AggregatorState>>,
}

impl LocationAggregator {
    /// Create an aggregator over the three sources with default request
    /// configuration.
    pub fn new(
        network: Arc<dyn PositionSource>,
        satellite: Arc<dyn PositionSource>,
        fused: Arc<dyn FusedPositionSource>,
    ) -> Self {
        Self::with_config(network, satellite, fused, LocationRequestConfig::default())
    }

    /// Create an aggregator with a custom request configuration.
    pub fn with_config(
        network: Arc<dyn PositionSource>,
        satellite: Arc<dyn PositionSource>,
        fused: Arc<dyn FusedPositionSource>,
        config: LocationRequestConfig,
    ) -> Self {
        Self {
            network,
            satellite,
            fused,
            config,
            channel_capacity: DEFAULT_FIX_CHANNEL_CAPACITY,
            state: Arc::new(Mutex::new(AggregatorState::new())),
        }
    }

    /// Override the merged channel capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// The request configuration in use.
    pub fn config(&self) -> &LocationRequestConfig {
        &self.config
    }

    /// Whether a merged stream is currently open.
    pub fn is_streaming(&self) -> bool {
        self.state.lock().is_stream_open()
    }

    /// Source kinds with a live subscription.
    pub fn active_sources(&self) -> Vec<SourceKind> {
        self.state.lock().active_kinds()
    }

    /// Open the merged stream and register the underlying subscriptions.
    ///
    /// Each legacy source (network, satellite) is registered only if it
    /// reports itself enabled; the fused source is always registered and
    /// encapsulates its own fallback. A source that fails to register is
    /// logged and skipped without affecting the others.
    ///
    /// Every fix from any registered source is forwarded in arrival order;
    /// there is no cross-source reordering, deduplication, or fusion.
    /// Dropping the returned stream triggers the same teardown as
    /// [`stop`](Self::stop).
    ///
    /// If a stream is already open, its subscriptions are released first
    /// so no source ever holds two live registrations.
    pub fn start_stream(&self) -> FixStream {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let mut state = self.state.lock();

        if state.is_stream_open() {
            let released = state.clear();
            warn!(released, "stream already open, previous subscriptions released");
        }
        let generation = state.begin_start();

        for source in [&self.network, &self.satellite] {
            let kind = source.kind();
            if !source.is_enabled() {
                debug!(source = %kind, "legacy source disabled, skipping registration");
                continue;
            }
            Self::register_into(&mut state, source.as_ref(), &self.config, &tx);
        }

        // The fused source bypasses the enablement check: it is expected
        // to be always available and handles fallback internally.
        Self::register_into(&mut state, self.fused.as_ref(), &self.config, &tx);

        FixStream::new(rx, Arc::clone(&self.state), generation)
    }

    /// Release every currently-held subscription.
    ///
    /// Idempotent and safe to call concurrently: each handle is released
    /// at most once, and calling stop with nothing registered is a no-op.
    /// No further fixes are delivered after stop returns.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        let released = state.clear();
        if released > 0 {
            info!(released, "location updates stopped");
        } else {
            debug!("stop called with no active subscriptions");
        }
    }

    /// Request a single high-accuracy position from the fused source.
    ///
    /// Independent of the continuous stream: it neither requires the
    /// stream to be open nor affects any active subscription. Cancelling
    /// the token resolves the query to `None` without a late delivery.
    pub async fn current_position(&self, cancellation: CancellationToken) -> Option<PositionFix> {
        let request = self.fused.current_position(cancellation.child_token());

        tokio::select! {
            biased;

            _ = cancellation.cancelled() => {
                debug!("one-shot position request cancelled");
                None
            }

            fix = request => fix,
        }
    }

    /// Register one source and record the subscription, swallowing
    /// registration errors per the soft-failure policy.
    fn register_into<S>(
        state: &mut AggregatorState,
        source: &S,
        config: &LocationRequestConfig,
        tx: &mpsc::Sender<PositionFix>,
    ) where
        S: PositionSource + ?Sized,
    {
        let kind = source.kind();
        match Self::register(source, config, tx) {
            Ok(subscription) => {
                info!(source = %kind, "registered for location updates");
                state.insert(subscription);
            }
            Err(e) => {
                warn!(source = %kind, error = %e, "source registration failed, continuing without it");
            }
        }
    }

    fn register<S>(
        source: &S,
        config: &LocationRequestConfig,
        tx: &mpsc::Sender<PositionFix>,
    ) -> Result<SourceSubscription, SourceError>
    where
        S: PositionSource + ?Sized,
    {
        let gate = SinkGate::new();
        let sink = FixSink::new(tx.clone(), gate.clone());
        let handle = source.request_updates(config, sink)?;
        Ok(SourceSubscription::new(source.kind(), gate, handle))
    }
}

impl std::fmt::Debug for LocationAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationAggregator")
            .field("config", &self.config)
            .field("channel_capacity", &self.channel_capacity)
            .field("streaming", &self.is_streaming())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
