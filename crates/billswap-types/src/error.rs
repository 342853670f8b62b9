//! Error types for the BillSwap lifecycle engine.
//!
//! All errors use the `BS_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Bill errors
//! - 2xx: Swap / state machine errors
//! - 3xx: Terms negotiation errors
//! - 4xx: Proof errors
//! - 5xx: Dispute / extension errors
//! - 6xx: Trust / eligibility errors
//! - 7xx: Collateral errors
//! - 8xx: Matching errors
//! - 9xx: General / internal errors

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    BillId, BillStatus, DisputeId, DisputeStatus, ExtensionId, ProofId, ProofStatus, SwapId,
    SwapStatus, TermsId, TermsStatus, UserId,
};

/// Central error enum for all BillSwap operations.
#[derive(Debug, Error)]
pub enum SwapError {
    // =================================================================
    // Bill Errors (1xx)
    // =================================================================
    /// The requested bill was not found.
    #[error("BS_ERR_100: Bill not found: {0}")]
    BillNotFound(BillId),

    /// The caller does not own the bill.
    #[error("BS_ERR_101: Bill {bill} is not owned by {user}")]
    BillNotOwned { bill: BillId, user: UserId },

    /// The bill is not in the status the operation requires.
    #[error("BS_ERR_102: Bill {bill} is {actual}, expected {expected}")]
    BillNotInStatus {
        bill: BillId,
        expected: BillStatus,
        actual: BillStatus,
    },

    /// The bill failed validation (zero amount, missing provider, etc.).
    #[error("BS_ERR_103: Invalid bill: {reason}")]
    InvalidBill { reason: String },

    // =================================================================
    // Swap / State Machine Errors (2xx)
    // =================================================================
    /// The requested swap was not found.
    #[error("BS_ERR_200: Swap not found: {0}")]
    SwapNotFound(SwapId),

    /// The operation is not valid for the swap's current lifecycle state.
    #[error("BS_ERR_201: Invalid state for {operation}: swap is {actual}")]
    InvalidState {
        operation: &'static str,
        actual: SwapStatus,
    },

    /// The swap has already reached a terminal state.
    #[error("BS_ERR_202: Swap already terminal: {0}")]
    AlreadyTerminal(SwapStatus),

    /// The caller is not a participant of the swap.
    #[error("BS_ERR_203: User {user} is not a participant of swap {swap}")]
    NotParticipant { swap: SwapId, user: UserId },

    /// A user attempted to swap with themselves.
    #[error("BS_ERR_204: Self-swap blocked: initiator and counterparty are the same user")]
    SelfSwapBlocked,

    /// A concurrent mutation was detected (optimistic version mismatch).
    #[error("BS_ERR_205: Conflict on swap {swap}: expected version {expected}, found {actual}")]
    Conflict {
        swap: SwapId,
        expected: u64,
        actual: u64,
    },

    /// The offer's accept deadline has passed.
    #[error("BS_ERR_206: Offer expired at {deadline}")]
    OfferExpired { deadline: DateTime<Utc> },

    // =================================================================
    // Terms Errors (3xx)
    // =================================================================
    /// The requested terms record was not found.
    #[error("BS_ERR_300: Terms not found: {0}")]
    TermsNotFound(TermsId),

    /// The negotiation version cap was reached.
    #[error("BS_ERR_301: Terms version cap reached: {cap} versions")]
    TermsVersionCapReached { cap: u8 },

    /// A proposer attempted to accept or reject their own terms.
    #[error("BS_ERR_302: Proposer cannot act on their own terms {0}")]
    OwnTermsAction(TermsId),

    /// The terms record is not open for the attempted action.
    #[error("BS_ERR_303: Terms {terms} is {actual}, not open")]
    TermsNotOpen { terms: TermsId, actual: TermsStatus },

    /// The terms record has expired.
    #[error("BS_ERR_304: Terms {terms} expired at {expired_at}")]
    TermsExpired {
        terms: TermsId,
        expired_at: DateTime<Utc>,
    },

    // =================================================================
    // Proof Errors (4xx)
    // =================================================================
    /// The requested proof was not found.
    #[error("BS_ERR_400: Proof not found: {0}")]
    ProofNotFound(ProofId),

    /// The proof is not in a reviewable state.
    #[error("BS_ERR_401: Proof {proof} is {actual}, not pending review")]
    ProofNotReviewable { proof: ProofId, actual: ProofStatus },

    /// A submitter attempted to review their own proof.
    #[error("BS_ERR_402: Submitter cannot review their own proof {0}")]
    OwnProofReview(ProofId),

    /// The resubmission cap for rejected proofs was reached.
    #[error("BS_ERR_403: Proof resubmission cap reached: {cap}")]
    ResubmissionCapReached { cap: u8 },

    /// The submitter already has an open or accepted proof on this swap.
    #[error("BS_ERR_404: Duplicate proof: {user} already submitted for swap {swap}")]
    DuplicateProof { swap: SwapId, user: UserId },

    /// The proof window has closed; only the sweep may transition now.
    #[error("BS_ERR_405: Proof window closed at {deadline}")]
    ProofWindowClosed { deadline: DateTime<Utc> },

    // =================================================================
    // Dispute / Extension Errors (5xx)
    // =================================================================
    /// The requested dispute was not found.
    #[error("BS_ERR_500: Dispute not found: {0}")]
    DisputeNotFound(DisputeId),

    /// The dispute is not in a state that allows the attempted action.
    #[error("BS_ERR_501: Dispute {dispute} is {actual}")]
    DisputeNotOpen {
        dispute: DisputeId,
        actual: DisputeStatus,
    },

    /// The at-fault reference does not name a participant of the swap.
    #[error("BS_ERR_502: At-fault user {user} is not a participant of swap {swap}")]
    InvalidAtFault { swap: SwapId, user: UserId },

    /// The dispute filing window has closed.
    #[error("BS_ERR_503: Dispute window closed at {deadline}")]
    DisputeWindowClosed { deadline: DateTime<Utc> },

    /// The requested extension request was not found.
    #[error("BS_ERR_504: Extension request not found: {0}")]
    ExtensionNotFound(ExtensionId),

    /// The extension request is not pending.
    #[error("BS_ERR_505: Extension request {0} is not pending")]
    ExtensionNotPending(ExtensionId),

    /// The user already used their extension request on this swap.
    #[error("BS_ERR_506: User {user} already requested an extension for swap {swap}")]
    ExtensionAlreadyRequested { swap: SwapId, user: UserId },

    /// The requested extra time exceeds the maximum.
    #[error("BS_ERR_507: Requested extension of {requested_hours}h exceeds maximum {max_hours}h")]
    ExtensionTooLong {
        requested_hours: i64,
        max_hours: i64,
    },

    // =================================================================
    // Trust / Eligibility Errors (6xx)
    // =================================================================
    /// No trust profile exists for the user.
    #[error("BS_ERR_600: Trust profile not found for user {0}")]
    ProfileNotFound(UserId),

    /// The bill amount exceeds the user's tier cap.
    #[error("BS_ERR_601: Amount {amount_minor} exceeds tier cap {cap_minor}")]
    TierCapExceeded { amount_minor: i64, cap_minor: i64 },

    /// The user is at their concurrent active-swap limit.
    #[error("BS_ERR_602: Active swap limit reached: {active} of {cap}")]
    MaxActiveSwaps { active: u32, cap: u32 },

    /// The user's tier is below the minimum for one-sided assists.
    #[error("BS_ERR_603: Tier {tier} below assist minimum {required}")]
    AssistTierTooLow { tier: u8, required: u8 },

    /// The user is under an eligibility lock.
    #[error("BS_ERR_604: Eligibility locked until {until}")]
    EligibilityLocked { until: DateTime<Utc> },

    /// The amount is outside the allowed range.
    #[error("BS_ERR_605: Amount {amount_minor} outside allowed range [{min_minor}, {max_minor}]")]
    AmountOutOfRange {
        amount_minor: i64,
        min_minor: i64,
        max_minor: i64,
    },

    // =================================================================
    // Collateral Errors (7xx)
    // =================================================================
    /// Not enough unlocked trust points to place the lock.
    #[error("BS_ERR_700: Insufficient collateral: need {needed}, have {available}")]
    InsufficientCollateral { needed: i64, available: i64 },

    /// Not enough staked credits for the operation.
    #[error("BS_ERR_701: Insufficient staked credits: need {needed}, have {staked}")]
    InsufficientStake { needed: i64, staked: i64 },

    // =================================================================
    // Matching Errors (8xx)
    // =================================================================
    /// The matching run could not proceed.
    #[error("BS_ERR_800: Matching failed: {reason}")]
    MatchingFailed { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("BS_ERR_900: Internal error: {0}")]
    Internal(String),

    /// The caller is not authorized for the operation (admin-only, etc.).
    #[error("BS_ERR_901: Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Serialization / deserialization error.
    #[error("BS_ERR_902: Serialization error: {0}")]
    Serialization(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, SwapError>;

impl From<serde_json::Error> for SwapError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
