//! Access and enablement gating.
//!
//! Application code resolves two questions before opening the aggregator's
//! stream: is location access granted, and is at least one physical
//! position source enabled on the device. This module combines both into
//! a single [`AccessDecision`]; the aggregator itself never re-checks
//! either condition.
//!
//! Only the legacy sources participate in the enablement check, matching
//! the platform behavior where the fused source is always available.

use tracing::debug;

use crate::source::PositionSource;

/// Outcome of the combined access/enablement check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Access granted and at least one source enabled; the aggregator may
    /// be started.
    Proceed,
    /// Access granted but no position source is enabled on the device.
    SourceNotEnabled,
    /// Location access has not been granted.
    AccessNotGranted,
}

/// Answers whether location access is currently granted.
///
/// Implemented by the embedding application (platform permission check,
/// policy engine, test stub).
pub trait AccessPolicy: Send + Sync {
    /// Whether the required location access is granted.
    fn is_access_granted(&self) -> bool;
}

/// Combined access-grant and source-enablement check.
///
/// Access is checked first; only when granted is enablement consulted.
/// `sources` should be the legacy sources — the fused source does not
/// gate on enablement.
pub fn check_access_and_enablement(
    policy: &dyn AccessPolicy,
    sources: &[&dyn PositionSource],
) -> AccessDecision {
    if !policy.is_access_granted() {
        debug!("location access not granted");
        return AccessDecision::AccessNotGranted;
    }

    if sources.iter().any(|source| source.is_enabled()) {
        AccessDecision::Proceed
    } else {
        debug!("no position source enabled");
        AccessDecision::SourceNotEnabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocationRequestConfig;
    use crate::fix::SourceKind;
    use crate::source::{FixSink, SourceError, SubscriptionHandle};

    struct StubPolicy {
        granted: bool,
    }

    impl AccessPolicy for StubPolicy {
        fn is_access_granted(&self) -> bool {
            self.granted
        }
    }

    struct StubSource {
        kind: SourceKind,
        enabled: bool,
    }

    impl PositionSource for StubSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn request_updates(
            &self,
            _config: &LocationRequestConfig,
            _sink: FixSink,
        ) -> Result<SubscriptionHandle, SourceError> {
            Ok(SubscriptionHandle::noop())
        }
    }

    fn stub(kind: SourceKind, enabled: bool) -> StubSource {
        StubSource { kind, enabled }
    }

    #[test]
    fn test_proceed_when_granted_and_any_source_enabled() {
        let policy = StubPolicy { granted: true };
        let network = stub(SourceKind::Network, false);
        let satellite = stub(SourceKind::Satellite, true);

        let decision = check_access_and_enablement(&policy, &[&network, &satellite]);
        assert_eq!(decision, AccessDecision::Proceed);
    }

    #[test]
    fn test_source_not_enabled_when_all_disabled() {
        let policy = StubPolicy { granted: true };
        let network = stub(SourceKind::Network, false);
        let satellite = stub(SourceKind::Satellite, false);

        let decision = check_access_and_enablement(&policy, &[&network, &satellite]);
        assert_eq!(decision, AccessDecision::SourceNotEnabled);
    }

    #[test]
    fn test_access_not_granted_checked_before_enablement() {
        let policy = StubPolicy { granted: false };
        let network = stub(SourceKind::Network, true);

        let decision = check_access_and_enablement(&policy, &[&network]);
        assert_eq!(decision, AccessDecision::AccessNotGranted);
    }

    #[test]
    fn test_no_sources_means_not_enabled() {
        let policy = StubPolicy { granted: true };
        let decision = check_access_and_enablement(&policy, &[]);
        assert_eq!(decision, AccessDecision::SourceNotEnabled);
    }
}
