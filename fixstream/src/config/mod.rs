//! Location request configuration.
//!
//! [`LocationRequestConfig`] is supplied once when subscriptions are opened
//! and never mutated afterwards. The fused source consumes the full set of
//! fields; the legacy sources (network, satellite) read only the update
//! interval and displacement threshold.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default desired interval between active updates.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(30);

/// Default hard floor on delivery rate. Updates are never delivered more
/// frequently than this.
pub const DEFAULT_FASTEST_INTERVAL: Duration = Duration::from_secs(10);

/// Default maximum delay before batched updates are flushed.
pub const DEFAULT_MAX_BATCHING_WAIT: Duration = Duration::from_secs(60);

/// Default minimum movement in meters to trigger an update.
pub const DEFAULT_SMALLEST_DISPLACEMENT_M: f32 = 10.0;

/// Accuracy/power tier for a location request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    /// Most accurate fixes available, highest power cost.
    HighAccuracy,
    /// Block-level accuracy, reduced power use.
    BalancedPower,
    /// City-level accuracy, minimal power use.
    LowPower,
    /// No active power use; piggyback on other clients' requests.
    Passive,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::HighAccuracy
    }
}

/// Configuration for a continuous location subscription.
///
/// Defaults match the reference tuning (30 s interval, 10 s floor, 60 s
/// batching wait, 10 m displacement); all fields are tunable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRequestConfig {
    /// Desired interval between active updates. Inexact.
    pub update_interval: Duration,

    /// Hard floor on delivery rate; fused source only.
    pub fastest_interval: Duration,

    /// Maximum delay before batched updates are flushed; fused source only.
    pub max_batching_wait: Duration,

    /// Minimum movement in meters to trigger an update.
    pub smallest_displacement_m: f32,

    /// Accuracy/power tier; fused source only.
    pub priority: Priority,
}

impl Default for LocationRequestConfig {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL,
            fastest_interval: DEFAULT_FASTEST_INTERVAL,
            max_batching_wait: DEFAULT_MAX_BATCHING_WAIT,
            smallest_displacement_m: DEFAULT_SMALLEST_DISPLACEMENT_M,
            priority: Priority::default(),
        }
    }
}

impl LocationRequestConfig {
    /// Set the desired update interval.
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Set the fastest delivery interval.
    pub fn with_fastest_interval(mut self, interval: Duration) -> Self {
        self.fastest_interval = interval;
        self
    }

    /// Set the maximum batching wait.
    pub fn with_max_batching_wait(mut self, wait: Duration) -> Self {
        self.max_batching_wait = wait;
        self
    }

    /// Set the minimum displacement threshold in meters.
    pub fn with_smallest_displacement_m(mut self, meters: f32) -> Self {
        self.smallest_displacement_m = meters;
        self
    }

    /// Set the accuracy/power tier.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}
