//! Terms (deal) types for swap negotiation.
//!
//! A terms record is immutable once created — a counter-offer mints a new
//! record with the next version number. Total versions per swap are capped
//! (initial + 2 counters) to keep negotiation finite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{SwapId, TermsId, UserId};

/// The agreed consequence applied to a party that fails to complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FallbackPenalty {
    /// Locked trust points are forfeited on failure.
    TrustPenalty,
    /// Trust points are locked and an eligibility lock is applied on failure.
    EligibilityLock,
    /// Staked credits are forfeited on failure.
    CreditForfeit,
}

impl std::fmt::Display for FallbackPenalty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrustPenalty => write!(f, "TRUST_PENALTY"),
            Self::EligibilityLock => write!(f, "ELIGIBILITY_LOCK"),
            Self::CreditForfeit => write!(f, "CREDIT_FORFEIT"),
        }
    }
}

/// Lifecycle status of one terms version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermsStatus {
    /// Open for acceptance, rejection, or counter.
    Proposed,
    /// Superseded by a newer version.
    Countered,
    /// Accepted — the swap activates on this version.
    Accepted,
    /// Explicitly rejected by the non-proposer.
    Rejected,
    /// Expired unanswered.
    Expired,
}

impl TermsStatus {
    /// Whether this version can still be acted on.
    #[must_use]
    pub fn is_open(self) -> bool {
        self == Self::Proposed
    }
}

impl std::fmt::Display for TermsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proposed => write!(f, "PROPOSED"),
            Self::Countered => write!(f, "COUNTERED"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// One immutable version of a swap's negotiated terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Terms {
    pub id: TermsId,
    pub swap: SwapId,
    pub proposer: UserId,
    /// 1-based, strictly increasing per swap.
    pub version: u8,
    pub status: TermsStatus,
    /// Fee owed by the initiator, minor units.
    pub initiator_fee_minor: i64,
    /// Fee owed by the counterparty, minor units.
    pub counterparty_fee_minor: i64,
    /// Hours each side has to submit proof once the swap locks.
    pub proof_window_hours: i64,
    pub fallback_penalty: FallbackPenalty,
    /// The version expires unanswered at this instant.
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Terms {
    /// Whether this version has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Terms {
    pub fn dummy(swap: SwapId, proposer: UserId, version: u8) -> Self {
        let now = Utc::now();
        Self {
            id: TermsId::new(),
            swap,
            proposer,
            version,
            status: TermsStatus::Proposed,
            initiator_fee_minor: 99,
            counterparty_fee_minor: 99,
            proof_window_hours: 72,
            fallback_penalty: FallbackPenalty::TrustPenalty,
            expires_at: now + chrono::Duration::hours(24),
            created_at: now,
        }
    }
}
