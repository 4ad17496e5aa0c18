//! Position fix value types.
//!
//! A [`PositionFix`] is a single immutable position observation produced by
//! one of the underlying location sources. Fixes carry their originating
//! [`SourceKind`] so consumers can tell which source reported them; the
//! aggregator never rewrites or fuses fixes across sources.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the location source that produced a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Coarse network-based positioning (cell/wifi).
    Network,
    /// Satellite-based positioning (GNSS).
    Satellite,
    /// Platform-fused best-effort positioning.
    Fused,
}

impl SourceKind {
    /// The two legacy sources that are individually gated on enablement.
    ///
    /// The fused source is deliberately absent: it is always registered
    /// regardless of the legacy enablement checks and encapsulates its own
    /// fallback behavior.
    pub const LEGACY: [SourceKind; 2] = [SourceKind::Network, SourceKind::Satellite];

    /// Short lowercase name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Network => "network",
            SourceKind::Satellite => "satellite",
            SourceKind::Fused => "fused",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single reported position observation.
///
/// Immutable after creation. Coordinates are signed degrees (WGS84);
/// metadata fields are optional because not every source reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// Latitude in signed degrees.
    pub latitude: f64,
    /// Longitude in signed degrees.
    pub longitude: f64,
    /// Estimated horizontal accuracy radius in meters, if reported.
    pub accuracy_m: Option<f32>,
    /// Altitude above the WGS84 ellipsoid in meters, if reported.
    pub altitude_m: Option<f64>,
    /// Ground speed in meters per second, if reported.
    pub speed_mps: Option<f32>,
    /// Bearing in degrees (0 = North, 90 = East), if reported.
    pub bearing_deg: Option<f32>,
    /// When the fix was observed.
    pub timestamp: DateTime<Utc>,
    /// Which source produced this fix.
    pub source: SourceKind,
}

impl PositionFix {
    /// Create a fix with the current time and no optional metadata.
    pub fn new(source: SourceKind, latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m: None,
            altitude_m: None,
            speed_mps: None,
            bearing_deg: None,
            timestamp: Utc::now(),
            source,
        }
    }

    /// Set the horizontal accuracy estimate.
    pub fn with_accuracy_m(mut self, accuracy_m: f32) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }

    /// Set the altitude.
    pub fn with_altitude_m(mut self, altitude_m: f64) -> Self {
        self.altitude_m = Some(altitude_m);
        self
    }

    /// Set the ground speed.
    pub fn with_speed_mps(mut self, speed_mps: f32) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    /// Set the bearing.
    pub fn with_bearing_deg(mut self, bearing_deg: f32) -> Self {
        self.bearing_deg = Some(bearing_deg);
        self
    }

    /// Set an explicit observation timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl fmt::Display for PositionFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: ({:.6}, {:.6})",
            self.source, self.latitude, self.longitude
        )?;
        if let Some(acc) = self.accuracy_m {
            write!(f, " ±{:.0}m", acc)?;
        }
        Ok(())
    }
}
