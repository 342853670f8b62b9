//! Configuration types for the BillSwap engine.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::constants;

/// Deadline and cap configuration for the lifecycle engine.
///
/// Durations are stored as whole hours so the config serializes cleanly;
/// accessors convert to [`chrono::Duration`] for deadline arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hours a counterparty has to accept an open offer.
    pub accept_window_hours: i64,
    /// Hours both sides have to submit proof after the swap locks.
    pub proof_window_hours: i64,
    /// Hours a reviewer has before a pending proof is auto-accepted.
    pub review_window_hours: i64,
    /// Hours a terms version stays open before expiring.
    pub terms_expiry_hours: i64,
    /// Hours after a failure during which a dispute may be filed.
    pub dispute_window_hours: i64,
    /// Hours a counterparty has to answer an extension request.
    pub extension_response_hours: i64,
    /// Maximum extra hours one extension may add to the proof deadline.
    pub max_extension_hours: i64,
    /// Total terms versions allowed per swap.
    pub max_terms_versions: u8,
    /// Resubmissions allowed after a proof rejection.
    pub max_proof_resubmissions: u8,
    /// Default platform fee per side, in minor units.
    pub default_fee_minor: i64,
    /// Trust-delta idempotency cache size.
    pub delta_guard_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            accept_window_hours: constants::ACCEPT_WINDOW_HOURS,
            proof_window_hours: constants::PROOF_WINDOW_HOURS,
            review_window_hours: constants::REVIEW_WINDOW_HOURS,
            terms_expiry_hours: constants::TERMS_EXPIRY_HOURS,
            dispute_window_hours: constants::DISPUTE_WINDOW_HOURS,
            extension_response_hours: constants::EXTENSION_RESPONSE_HOURS,
            max_extension_hours: constants::MAX_EXTENSION_HOURS,
            max_terms_versions: constants::MAX_TERMS_VERSIONS,
            max_proof_resubmissions: constants::MAX_PROOF_RESUBMISSIONS,
            default_fee_minor: constants::DEFAULT_SWAP_FEE_MINOR,
            delta_guard_capacity: constants::DELTA_GUARD_CACHE_SIZE,
        }
    }
}

impl EngineConfig {
    /// Window a counterparty has to accept an open offer.
    #[must_use]
    pub fn accept_window(&self) -> Duration {
        Duration::hours(self.accept_window_hours)
    }

    /// Window both sides have to submit proof after the swap locks.
    #[must_use]
    pub fn proof_window(&self) -> Duration {
        Duration::hours(self.proof_window_hours)
    }

    /// Window a reviewer has before a pending proof is auto-accepted.
    #[must_use]
    pub fn review_window(&self) -> Duration {
        Duration::hours(self.review_window_hours)
    }

    /// Window a terms version stays open.
    #[must_use]
    pub fn terms_expiry(&self) -> Duration {
        Duration::hours(self.terms_expiry_hours)
    }

    /// Window after a failure during which a dispute may be filed.
    #[must_use]
    pub fn dispute_window(&self) -> Duration {
        Duration::hours(self.dispute_window_hours)
    }

    /// Window a counterparty has to answer an extension request.
    #[must_use]
    pub fn extension_response_window(&self) -> Duration {
        Duration::hours(self.extension_response_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.accept_window_hours, 24);
        assert_eq!(cfg.proof_window_hours, 72);
        assert_eq!(cfg.review_window_hours, 12);
        assert_eq!(cfg.dispute_window_hours, 48);
        assert_eq!(cfg.max_terms_versions, 3);
        assert_eq!(cfg.max_proof_resubmissions, 2);
    }

    #[test]
    fn duration_accessors() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.accept_window(), Duration::hours(24));
        assert_eq!(cfg.proof_window(), Duration::hours(72));
        assert_eq!(cfg.review_window(), Duration::hours(12));
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
