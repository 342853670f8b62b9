//! System-wide constants for the BillSwap lifecycle engine.
//!
//! All monetary values are integer minor-currency units (cents).

// ---------------------------------------------------------------------------
// Deadlines & windows
// ---------------------------------------------------------------------------

/// Hours a counterparty has to accept an open offer.
pub const ACCEPT_WINDOW_HOURS: i64 = 24;

/// Hours both sides have to submit proof after the swap locks.
pub const PROOF_WINDOW_HOURS: i64 = 72;

/// Hours a reviewer has before a pending proof is auto-accepted.
pub const REVIEW_WINDOW_HOURS: i64 = 12;

/// Hours a terms version stays open before expiring.
pub const TERMS_EXPIRY_HOURS: i64 = 24;

/// Hours after a swap fails during which a dispute may still be filed.
pub const DISPUTE_WINDOW_HOURS: i64 = 48;

/// Hours a counterparty has to answer an extension request.
pub const EXTENSION_RESPONSE_HOURS: i64 = 12;

/// Maximum extra hours a single extension may add to the proof deadline.
pub const MAX_EXTENSION_HOURS: i64 = 48;

// ---------------------------------------------------------------------------
// Negotiation & proof caps
// ---------------------------------------------------------------------------

/// Total terms versions allowed per swap (initial + 2 counters).
pub const MAX_TERMS_VERSIONS: u8 = 3;

/// Resubmissions allowed after a proof rejection.
pub const MAX_PROOF_RESUBMISSIONS: u8 = 2;

/// Default platform fee per side, in minor units.
pub const DEFAULT_SWAP_FEE_MINOR: i64 = 99;

/// Smallest bill amount accepted into a swap, in minor units.
pub const MIN_SWAP_AMOUNT_MINOR: i64 = 100;

// ---------------------------------------------------------------------------
// Match scoring (additive, capped at 100)
// ---------------------------------------------------------------------------

/// Bonus for an exact amount match.
pub const SCORE_AMOUNT_EXACT: u32 = 40;

/// Bonus when amounts are within [`AMOUNT_CLOSE_PCT`] of each other.
pub const SCORE_AMOUNT_CLOSE: u32 = 30;

/// Weight for partial amount credit: `(1 - |Δ|/max) × weight`.
pub const SCORE_AMOUNT_PARTIAL_WEIGHT: u32 = 20;

/// Amounts within this percentage count as "close".
pub const AMOUNT_CLOSE_PCT: i64 = 15;

/// Due dates within 3 days.
pub const SCORE_DUE_TIGHT: u32 = 30;

/// Due dates within 7 days.
pub const SCORE_DUE_NEAR: u32 = 20;

/// Due dates within 14 days.
pub const SCORE_DUE_LOOSE: u32 = 10;

/// Equal bill categories.
pub const SCORE_CATEGORY: u32 = 20;

/// Counterparty tier at or above [`TIER_HIGH_TRUST`].
pub const SCORE_TIER_HIGH: u32 = 10;

/// Counterparty tier at or above [`TIER_ESTABLISHED`].
pub const SCORE_TIER_ESTABLISHED: u32 = 5;

/// Counterparty success rate ≥ 90% with ≥ 5 completions.
pub const SCORE_RELIABILITY: u32 = 10;

/// Source bill due within 3 days.
pub const SCORE_URGENCY: u32 = 5;

/// Minimum score a candidate must exceed to be returned.
pub const MATCH_SCORE_FLOOR: u32 = 30;

/// Maximum candidates returned per match run.
pub const MATCH_TOP_N: usize = 10;

/// Minimum completions for the reliability bonus.
pub const RELIABILITY_MIN_COMPLETED: u32 = 5;

/// Minimum success rate (percent) for the reliability bonus.
pub const RELIABILITY_MIN_RATE_PCT: u32 = 90;

/// Progressive amount-tolerance bands for the 1:1 pool matcher (percent).
pub const TOLERANCE_BANDS_PCT: [i64; 3] = [5, 10, 15];

/// Symmetric due-date window for the 1:1 pool matcher (days).
pub const POOL_DUE_WINDOW_DAYS: i64 = 14;

// ---------------------------------------------------------------------------
// Trust scoring
// ---------------------------------------------------------------------------

/// Ceiling for the trust score.
pub const MAX_TRUST_SCORE: i64 = 1000;

/// Score granted to a freshly registered profile.
pub const STARTING_TRUST_SCORE: i64 = 100;

/// Base delta for a completed swap.
pub const DELTA_COMPLETED: i64 = 25;

/// Base delta for a failure where the user was at fault.
pub const DELTA_FAILED_AT_FAULT: i64 = -40;

/// Base delta for a no-show.
pub const DELTA_NO_SHOW: i64 = -60;

/// Completion deltas double at or above this amount.
pub const AMOUNT_SCALE_DOUBLE_MINOR: i64 = 10_000;

/// Completion deltas scale ×1.5 at or above this amount.
pub const AMOUNT_SCALE_HALF_EXTRA_MINOR: i64 = 5_000;

/// Streak milestones and their one-time bonus points.
pub const STREAK_MILESTONES: [(u32, i64); 4] = [(5, 10), (10, 25), (25, 75), (50, 200)];

/// One-time bonus for ID verification.
pub const BONUS_ID_VERIFIED: i64 = 30;

/// One-time bonus for linking a bank account.
pub const BONUS_BANK_LINKED: i64 = 20;

/// One-time bonus for verifying a work email.
pub const BONUS_WORK_EMAIL: i64 = 10;

/// Tier ordinal at or above which a counterparty counts as "established".
pub const TIER_ESTABLISHED: u8 = 3;

/// Tier ordinal at or above which a counterparty counts as "high trust".
pub const TIER_HIGH_TRUST: u8 = 4;

/// Minimum tier for participating in one-sided assists.
pub const ASSIST_MIN_TIER: u8 = 3;

/// Completions required to hold the top tier.
pub const TOP_TIER_MIN_COMPLETED: u32 = 25;

// ---------------------------------------------------------------------------
// Collateral
// ---------------------------------------------------------------------------

/// Trust points granted to a freshly registered collateral entry.
pub const STARTING_TRUST_POINTS: i64 = 100;

/// Minor units of bill amount per locked trust point.
pub const LOCK_POINTS_DIVISOR: i64 = 100;

/// Minimum points locked per swap regardless of amount.
pub const MIN_LOCK_POINTS: i64 = 10;

/// Percent bonus credited on collateral release after completion.
pub const COMPLETION_BONUS_PCT: i64 = 10;

/// Percent bonus returned on staked credits after completion.
pub const STAKE_BONUS_PCT: i64 = 5;

/// Divisor for the dispute refund: the non-faulty party receives
/// `forfeited / DISPUTE_REFUND_DIVISOR` of the at-fault party's points.
pub const DISPUTE_REFUND_DIVISOR: i64 = 2;

/// Hours an at-fault party stays eligibility-locked under the
/// eligibility-lock penalty mode.
pub const ELIGIBILITY_LOCK_HOURS: i64 = 168;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Trust-delta idempotency cache size (number of outcome markers to remember).
pub const DELTA_GUARD_CACHE_SIZE: usize = 100_000;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "BillSwap";
