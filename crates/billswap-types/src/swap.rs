//! Swap types — the central record of the lifecycle engine.
//!
//! A swap is the unit of collateral and trust accounting: exactly one
//! collateral lock-set and one trust-delta application per participant per
//! terminal outcome. The `version` field carries the optimistic-concurrency
//! guard every mutating path commits through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BillId, SwapId, UserId};

/// Whether both sides bring a bill, or one side assists the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapType {
    /// Both participants bring a bill and pay each other's.
    TwoSided,
    /// The counterparty (helper) pays the initiator's bill; no second bill.
    OneSidedAssist,
}

impl std::fmt::Display for SwapType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TwoSided => write!(f, "TWO_SIDED"),
            Self::OneSidedAssist => write!(f, "ONE_SIDED_ASSIST"),
        }
    }
}

/// Lifecycle status of a swap. Terminal states: `Completed`, `Failed`,
/// `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapStatus {
    /// Offer open; waiting for a counterparty and accepted terms.
    Offered,
    /// Terms accepted; waiting for the required fee payments.
    AcceptedPendingFee,
    /// All fees paid; proof window running, no proof submitted yet.
    Locked,
    /// At least one proof submitted; waiting on submissions/reviews.
    AwaitingProof,
    /// All required proofs accepted. Terminal.
    Completed,
    /// Failed by dispute resolution or proof-deadline expiry. Terminal.
    Failed,
    /// Frozen by an open dispute; only arbiter transitions apply.
    Disputed,
    /// Cancelled or expired before the proof phase. Terminal.
    Cancelled,
}

impl SwapStatus {
    /// Whether this status is terminal (no further transitions).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether a participant may still cancel from this status.
    #[must_use]
    pub fn is_cancellable(self) -> bool {
        matches!(self, Self::Offered | Self::AcceptedPendingFee | Self::Locked)
    }

    /// Whether proofs may be submitted in this status.
    #[must_use]
    pub fn accepts_proofs(self) -> bool {
        matches!(self, Self::Locked | Self::AwaitingProof)
    }
}

impl std::fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offered => write!(f, "OFFERED"),
            Self::AcceptedPendingFee => write!(f, "ACCEPTED_PENDING_FEE"),
            Self::Locked => write!(f, "LOCKED"),
            Self::AwaitingProof => write!(f, "AWAITING_PROOF"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Disputed => write!(f, "DISPUTED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// The two sides of a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapSide {
    Initiator,
    Counterparty,
}

impl std::fmt::Display for SwapSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initiator => write!(f, "INITIATOR"),
            Self::Counterparty => write!(f, "COUNTERPARTY"),
        }
    }
}

/// Per-side fee state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeState {
    /// Fee owed by this side, in minor units. Zero means no fee required.
    pub amount_minor: i64,
    /// Whether the fee-paid signal has arrived for this side.
    pub paid: bool,
}

impl FeeState {
    #[must_use]
    pub fn unpaid(amount_minor: i64) -> Self {
        Self {
            amount_minor,
            paid: false,
        }
    }

    /// A side with no fee counts as settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.paid || self.amount_minor == 0
    }
}

/// The central swap record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swap {
    pub id: SwapId,
    pub swap_type: SwapType,
    pub status: SwapStatus,
    pub initiator: UserId,
    /// Unset until a counterparty accepts the offer.
    pub counterparty: Option<UserId>,
    pub initiator_bill: BillId,
    /// Present only on two-sided swaps, once the counterparty attaches one.
    pub counterparty_bill: Option<BillId>,
    pub initiator_fee: FeeState,
    pub counterparty_fee: FeeState,
    /// Offer must be accepted before this instant or the sweep expires it.
    pub accept_deadline: DateTime<Utc>,
    /// Set when the swap locks; proofs are due before this instant.
    pub proof_deadline: Option<DateTime<Utc>>,
    /// Set once, when a granted extension pushes the proof deadline out.
    pub deadline_extended: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency guard; bumped by every committed mutation.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Swap {
    /// Whether `user` is a participant of this swap.
    #[must_use]
    pub fn is_participant(&self, user: UserId) -> bool {
        self.initiator == user || self.counterparty == Some(user)
    }

    /// The other participant, if both sides are present.
    #[must_use]
    pub fn other_participant(&self, user: UserId) -> Option<UserId> {
        if self.initiator == user {
            self.counterparty
        } else if self.counterparty == Some(user) {
            Some(self.initiator)
        } else {
            None
        }
    }

    /// Which side `user` is on, if any.
    #[must_use]
    pub fn side_of(&self, user: UserId) -> Option<SwapSide> {
        if self.initiator == user {
            Some(SwapSide::Initiator)
        } else if self.counterparty == Some(user) {
            Some(SwapSide::Counterparty)
        } else {
            None
        }
    }

    /// Both participants, initiator first. Counterparty omitted when unset.
    #[must_use]
    pub fn participants(&self) -> Vec<UserId> {
        let mut out = vec![self.initiator];
        if let Some(cp) = self.counterparty {
            out.push(cp);
        }
        out
    }

    /// The bill(s) currently referenced by the swap.
    #[must_use]
    pub fn bills(&self) -> Vec<BillId> {
        let mut out = vec![self.initiator_bill];
        if let Some(bill) = self.counterparty_bill {
            out.push(bill);
        }
        out
    }

    /// Accepted proofs required for completion: two for a two-sided swap,
    /// one (from the helper) for an assist.
    #[must_use]
    pub fn required_proofs(&self) -> usize {
        match self.swap_type {
            SwapType::TwoSided => 2,
            SwapType::OneSidedAssist => 1,
        }
    }

    /// Whether every required fee has been settled.
    ///
    /// On a one-sided assist only the initiator (the assisted side) owes
    /// a fee; the helper's side is created with a zero fee.
    #[must_use]
    pub fn fees_settled(&self) -> bool {
        self.initiator_fee.is_settled() && self.counterparty_fee.is_settled()
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Swap {
    pub fn dummy(initiator: UserId, bill: BillId, swap_type: SwapType) -> Self {
        let now = Utc::now();
        Self {
            id: SwapId::new(),
            swap_type,
            status: SwapStatus::Offered,
            initiator,
            counterparty: None,
            initiator_bill: bill,
            counterparty_bill: None,
            initiator_fee: FeeState::unpaid(99),
            counterparty_fee: FeeState::unpaid(match swap_type {
                SwapType::TwoSided => 99,
                SwapType::OneSidedAssist => 0,
            }),
            accept_deadline: now + chrono::Duration::hours(24),
            proof_deadline: None,
            deadline_extended: false,
            completed_at: None,
            failed_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
