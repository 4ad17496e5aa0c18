//! Fixstream - multi-source position fix aggregation.
//!
//! This library merges position fixes from several independent location
//! sources (network-based, satellite-based, and a platform-fused source)
//! into a single ordered stream, and manages the subscribe/unsubscribe
//! lifecycle of all underlying subscriptions atomically.
//!
//! # Architecture
//!
//! ```text
//! Network adapter ──┐
//! Satellite adapter ├──► FixSink (per source) ──► FixStream ──► consumer
//! Fused adapter ────┘         │
//!                             └── LocationAggregator owns the
//!                                 subscription handles and tears
//!                                 them down on stop / stream drop
//! ```
//!
//! Sources are registered through the [`source::PositionSource`] capability
//! trait; the [`aggregator::LocationAggregator`] forwards every fix in
//! arrival order without buffering, filtering, or cross-source reordering.
//! Access/enablement gating is resolved by the caller up front via the
//! [`gate`] module before the aggregator is invoked.

pub mod aggregator;
pub mod config;
pub mod fix;
pub mod gate;
pub mod source;

pub use aggregator::{FixStream, LocationAggregator, DEFAULT_FIX_CHANNEL_CAPACITY};
pub use config::{LocationRequestConfig, Priority};
pub use fix::{PositionFix, SourceKind};
pub use gate::{check_access_and_enablement, AccessDecision, AccessPolicy};
pub use source::{
    BoxFuture, FixSink, FusedPositionSource, PositionSource, SinkGate, SourceError,
    SubscriptionHandle,
};
