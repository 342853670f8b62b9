//! Dispute types for contested swap outcomes.
//!
//! Filing a dispute freezes the swap; resolution is an administrative
//! action that assigns fault and terminates the swap, or a dismissal that
//! returns it to the proof phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DisputeId, SwapId, UserId};

/// Enumerated reasons a participant may file a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisputeReason {
    /// A valid proof was rejected without cause.
    ProofRejectedUnfairly,
    /// The counterparty claims payment that never arrived.
    PaymentNotReceived,
    /// The submitted evidence is fabricated.
    FakeProof,
    /// The counterparty went silent and never acted.
    NoShow,
    Other,
}

impl std::fmt::Display for DisputeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProofRejectedUnfairly => write!(f, "PROOF_REJECTED_UNFAIRLY"),
            Self::PaymentNotReceived => write!(f, "PAYMENT_NOT_RECEIVED"),
            Self::FakeProof => write!(f, "FAKE_PROOF"),
            Self::NoShow => write!(f, "NO_SHOW"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

/// Lifecycle status of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisputeStatus {
    /// Filed, not yet picked up by an arbiter.
    Open,
    /// Under administrative review.
    Investigating,
    /// Resolved with a fault assignment (or none); swap terminated.
    Resolved,
    /// Dismissed; swap returned to the proof phase.
    Dismissed,
}

impl DisputeStatus {
    /// Whether the dispute can still be acted on.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Open | Self::Investigating)
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Investigating => write!(f, "INVESTIGATING"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Dismissed => write!(f, "DISMISSED"),
        }
    }
}

/// A contested swap outcome under arbitration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub swap: SwapId,
    pub reporter: UserId,
    pub reported: UserId,
    pub reason: DisputeReason,
    pub status: DisputeStatus,
    /// Assigned at resolution. `None` on no-fault resolutions.
    pub at_fault: Option<UserId>,
    /// Arbiter's written resolution.
    pub resolution: Option<String>,
    pub filed_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Dispute {
    pub fn dummy(swap: SwapId, reporter: UserId, reported: UserId) -> Self {
        Self {
            id: DisputeId::new(),
            swap,
            reporter,
            reported,
            reason: DisputeReason::PaymentNotReceived,
            status: DisputeStatus::Open,
            at_fault: None,
            resolution: None,
            filed_at: Utc::now(),
            resolved_at: None,
        }
    }
}
