//! The merged fix stream handed to the consumer.
//!
//! [`FixStream`] wraps the receiving end of the aggregation channel.
//! Dropping (or explicitly closing) the stream triggers the same teardown
//! as an explicit `stop()` call on the aggregator, guarded to run at most
//! once even when teardown races with concurrent stop calls.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use super::state::AggregatorState;
use crate::fix::PositionFix;

/// Continuous, unbounded, non-restartable sequence of position fixes.
///
/// Fixes from all registered sources arrive interleaved in arrival order.
/// The stream ends (yields `None`) once every subscription has been
/// released and in-flight fixes are drained.
pub struct FixStream {
    rx: mpsc::Receiver<PositionFix>,
    state: Arc<Mutex<AggregatorState>>,
    generation: u64,
    torn_down: AtomicBool,
}

impl FixStream {
    pub(crate) fn new(
        rx: mpsc::Receiver<PositionFix>,
        state: Arc<Mutex<AggregatorState>>,
        generation: u64,
    ) -> Self {
        Self {
            rx,
            state,
            generation,
            torn_down: AtomicBool::new(false),
        }
    }

    /// Receive the next fix, or `None` when the stream has ended.
    pub async fn recv(&mut self) -> Option<PositionFix> {
        self.rx.recv().await
    }

    /// Tear down the subscriptions and stop accepting new fixes.
    ///
    /// Already-delivered fixes remain receivable until drained.
    pub fn close(&mut self) {
        self.teardown();
        self.rx.close();
    }

    /// Release the aggregator's subscriptions, at most once per stream.
    ///
    /// The generation check keeps a stale stream (one superseded by a
    /// newer start call) from releasing subscriptions it no longer owns.
    fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut state = self.state.lock();
        if state.generation() != self.generation {
            debug!(
                stream_generation = self.generation,
                state_generation = state.generation(),
                "stale stream dropped, leaving newer subscriptions in place"
            );
            return;
        }

        let released = state.clear();
        if released > 0 {
            debug!(released, "consumer closed stream, subscriptions released");
        }
    }
}

impl Stream for FixStream {
    type Item = PositionFix;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for FixStream {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for FixStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixStream")
            .field("generation", &self.generation)
            .field("torn_down", &self.torn_down.load(Ordering::Relaxed))
            .finish()
    }
}
