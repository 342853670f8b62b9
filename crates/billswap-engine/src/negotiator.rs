//! Terms negotiation policy.
//!
//! Propose → counter → accept/reject, capped at three total versions so
//! negotiation stays finite. The negotiator builds and validates terms
//! records; the engine persists them and fires the activation effects.

use chrono::{DateTime, Utc};

use billswap_types::{
    EngineConfig, FallbackPenalty, Result, Swap, SwapError, Terms, TermsId, TermsStatus, UserId,
    constants,
};

/// The negotiable fields of a terms proposal.
#[derive(Debug, Clone, Copy)]
pub struct TermsOffer {
    pub initiator_fee_minor: i64,
    pub counterparty_fee_minor: i64,
    pub proof_window_hours: i64,
    pub fallback_penalty: FallbackPenalty,
}

impl TermsOffer {
    /// The default offer attached to every new swap.
    #[must_use]
    pub fn default_for(config: &EngineConfig, swap: &Swap) -> Self {
        Self {
            initiator_fee_minor: config.default_fee_minor,
            // The helper side of an assist owes no fee.
            counterparty_fee_minor: match swap.swap_type {
                billswap_types::SwapType::TwoSided => config.default_fee_minor,
                billswap_types::SwapType::OneSidedAssist => 0,
            },
            proof_window_hours: config.proof_window_hours,
            fallback_penalty: FallbackPenalty::TrustPenalty,
        }
    }
}

/// Stateless negotiation policy: version caps, self-action rules, expiry.
pub struct TermsNegotiator {
    max_versions: u8,
    expiry_hours: i64,
}

impl TermsNegotiator {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_versions: config.max_terms_versions,
            expiry_hours: config.terms_expiry_hours,
        }
    }

    /// Build the initial (version 1) terms record for a fresh swap.
    #[must_use]
    pub fn initial(
        &self,
        swap: &Swap,
        proposer: UserId,
        offer: TermsOffer,
        now: DateTime<Utc>,
    ) -> Terms {
        self.build(swap.id, proposer, 1, offer, now)
    }

    /// Build a counter-offer superseding `current`.
    ///
    /// # Errors
    /// - `OwnTermsAction` when the proposer counters their own version
    /// - `TermsNotOpen` / `TermsExpired` when `current` is not actionable
    /// - `TermsVersionCapReached` at the version cap
    pub fn counter(
        &self,
        current: &Terms,
        by: UserId,
        version_count: u8,
        offer: TermsOffer,
        now: DateTime<Utc>,
    ) -> Result<Terms> {
        self.validate_actionable(current, by, now)?;
        if version_count >= self.max_versions {
            return Err(SwapError::TermsVersionCapReached {
                cap: self.max_versions,
            });
        }
        Ok(self.build(current.swap, by, current.version + 1, offer, now))
    }

    /// Validate that `actor` may accept or reject `terms` as of `now`.
    ///
    /// # Errors
    /// - `OwnTermsAction` when the actor proposed this version
    /// - `TermsNotOpen` when the version is not open
    /// - `TermsExpired` past the expiry instant
    pub fn validate_actionable(
        &self,
        terms: &Terms,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !terms.status.is_open() {
            return Err(SwapError::TermsNotOpen {
                terms: terms.id,
                actual: terms.status,
            });
        }
        if terms.is_expired(now) {
            return Err(SwapError::TermsExpired {
                terms: terms.id,
                expired_at: terms.expires_at,
            });
        }
        if terms.proposer == actor {
            return Err(SwapError::OwnTermsAction(terms.id));
        }
        Ok(())
    }

    fn build(
        &self,
        swap: billswap_types::SwapId,
        proposer: UserId,
        version: u8,
        offer: TermsOffer,
        now: DateTime<Utc>,
    ) -> Terms {
        Terms {
            id: TermsId::new(),
            swap,
            proposer,
            version,
            status: TermsStatus::Proposed,
            initiator_fee_minor: offer.initiator_fee_minor,
            counterparty_fee_minor: offer.counterparty_fee_minor,
            proof_window_hours: offer.proof_window_hours,
            fallback_penalty: offer.fallback_penalty,
            expires_at: now + chrono::Duration::hours(self.expiry_hours),
            created_at: now,
        }
    }
}

impl Default for TermsNegotiator {
    fn default() -> Self {
        Self {
            max_versions: constants::MAX_TERMS_VERSIONS,
            expiry_hours: constants::TERMS_EXPIRY_HOURS,
        }
    }
}
