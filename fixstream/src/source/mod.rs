//! Capability traits for position sources.
//!
//! Each platform-specific listener/callback construct collapses into one
//! abstraction here: a [`PositionSource`] accepts a [`FixSink`] and returns
//! a cancelable [`SubscriptionHandle`]. Adapters push every fix they
//! receive into the sink; the aggregator releases the handle when the
//! merged stream is torn down.
//!
//! # Dyn Compatibility
//!
//! [`FusedPositionSource::current_position`] returns a [`BoxFuture`] so the
//! traits stay usable as trait objects (`Arc<dyn PositionSource>`), the
//! same technique the cache layer uses for its async trait methods.
//!
//! # Delivery Guarantees
//!
//! - [`FixSink::push`] is fire-and-forget: it never blocks the delivering
//!   source. If the consumer is not ready the fix is dropped.
//! - Once a subscription's [`SinkGate`] is closed, the sink delivers
//!   nothing, even from a callback that was already scheduled when the
//!   subscription was released.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::LocationRequestConfig;
use crate::fix::{PositionFix, SourceKind};

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors a source can report when registering for updates.
///
/// These are soft errors: the aggregator logs them and continues with the
/// remaining sources. They never abort the aggregate operation.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source is disabled on the device.
    #[error("source is disabled")]
    Disabled,

    /// The platform rejected the registration call.
    #[error("registration failed: {0}")]
    Registration(String),
}

/// Shared open/closed flag for a subscription's sink.
///
/// Closing the gate invalidates every [`FixSink`] clone that shares it, so
/// a released subscription can never deliver a late fix.
#[derive(Debug, Clone)]
pub struct SinkGate {
    open: Arc<AtomicBool>,
}

impl SinkGate {
    /// Create an open gate.
    pub fn new() -> Self {
        Self {
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Whether the gate is still open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Close the gate. Idempotent.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl Default for SinkGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Sink a source adapter pushes fixes through.
///
/// Cloneable so adapters can hand it to their platform callback. Delivery
/// is non-blocking; see the module docs for the drop policy.
#[derive(Debug, Clone)]
pub struct FixSink {
    tx: mpsc::Sender<PositionFix>,
    gate: SinkGate,
}

impl FixSink {
    pub(crate) fn new(tx: mpsc::Sender<PositionFix>, gate: SinkGate) -> Self {
        Self { tx, gate }
    }

    /// Forward a fix to the merged stream's consumer.
    ///
    /// Returns `true` if the fix was accepted. Fixes are dropped (and
    /// `false` returned) when the subscription has been released, the
    /// consumer is not keeping up, or the stream is gone.
    pub fn push(&self, fix: PositionFix) -> bool {
        if !self.gate.is_open() {
            debug!(source = %fix.source, "subscription released, dropping fix");
            return false;
        }

        match self.tx.try_send(fix) {
            Ok(()) => true,
            Err(TrySendError::Full(fix)) => {
                debug!(source = %fix.source, "consumer not ready, dropping fix");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Whether this sink can still deliver fixes.
    pub fn is_active(&self) -> bool {
        self.gate.is_open() && !self.tx.is_closed()
    }
}

/// Opaque cancellation handle for one registered subscription.
///
/// Wraps the adapter-supplied teardown (e.g. removing a platform listener).
/// The teardown runs at most once: via [`release`](Self::release) or, as a
/// safety net, on drop.
pub struct SubscriptionHandle {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    /// Wrap a teardown closure that unregisters the platform listener.
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A handle with no teardown, for sources that need none.
    pub fn noop() -> Self {
        Self { teardown: None }
    }

    /// Whether the teardown has not yet run.
    pub fn is_live(&self) -> bool {
        self.teardown.is_some()
    }

    /// Run the teardown. A second call is a no-op.
    pub fn release(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("live", &self.is_live())
            .finish()
    }
}

/// A continuous position source.
///
/// Implemented by platform adapters (one per underlying mechanism). All
/// implementations must be `Send + Sync`; callbacks may fire on any
/// thread.
pub trait PositionSource: Send + Sync + 'static {
    /// Which source this adapter represents.
    fn kind(&self) -> SourceKind;

    /// Whether this source is currently enabled on the device.
    ///
    /// Only consulted for the legacy sources; the fused source is
    /// registered unconditionally.
    fn is_enabled(&self) -> bool;

    /// Register for continuous updates, pushing every fix into `sink`.
    ///
    /// Legacy sources read only `update_interval` and
    /// `smallest_displacement_m` from the config; the fused source
    /// consumes the full set of fields.
    fn request_updates(
        &self,
        config: &LocationRequestConfig,
        sink: FixSink,
    ) -> Result<SubscriptionHandle, SourceError>;
}

/// The fused source additionally answers one-shot position queries.
pub trait FusedPositionSource: PositionSource {
    /// Request a single high-accuracy position.
    ///
    /// Resolves to `None` if no fix could be obtained or the token was
    /// cancelled first. Independent of any continuous subscription.
    fn current_position(&self, cancellation: CancellationToken) -> BoxFuture<'static, Option<PositionFix>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn test_fix() -> PositionFix {
        PositionFix::new(SourceKind::Network, 53.5, 10.0)
    }

    #[tokio::test]
    async fn test_sink_delivers_while_gate_open() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = FixSink::new(tx, SinkGate::new());

        assert!(sink.push(test_fix()));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.source, SourceKind::Network);
    }

    #[tokio::test]
    async fn test_sink_drops_after_gate_closed() {
        let (tx, mut rx) = mpsc::channel(4);
        let gate = SinkGate::new();
        let sink = FixSink::new(tx, gate.clone());

        gate.close();
        assert!(!sink.push(test_fix()));
        assert!(!sink.is_active());

        // Nothing must reach the consumer side.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_sink_drops_when_consumer_not_ready() {
        let (tx, _rx) = mpsc::channel(1);
        let sink = FixSink::new(tx, SinkGate::new());

        assert!(sink.push(test_fix()));
        // Channel full: fire-and-forget drops instead of blocking.
        assert!(!sink.push(test_fix()));
    }

    #[tokio::test]
    async fn test_sink_drops_when_stream_gone() {
        let (tx, rx) = mpsc::channel(4);
        let sink = FixSink::new(tx, SinkGate::new());

        drop(rx);
        assert!(!sink.push(test_fix()));
    }

    #[test]
    fn test_handle_release_runs_teardown_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&count);
        let mut handle = SubscriptionHandle::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        assert!(handle.is_live());
        handle.release();
        handle.release();
        assert!(!handle.is_live());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_drop_releases() {
        let count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&count);
        {
            let _handle = SubscriptionHandle::new(move || {
                counted.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_released_then_dropped_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&count);
        {
            let mut handle = SubscriptionHandle::new(move || {
                counted.fetch_add(1, Ordering::SeqCst);
            });
            handle.release();
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_noop_handle() {
        let mut handle = SubscriptionHandle::noop();
        assert!(!handle.is_live());
        handle.release();
    }
}
