//! Compatibility scoring between a source bill and one candidate.
//!
//! The score is additive over independent dimensions and capped at 100.
//! Every contributing dimension also emits a typed [`MatchReason`] so the
//! caller can render a human-readable explanation.
//!
//! Scoring is pure: the same inputs and the same `now` always produce the
//! same score. No clock reads, no store access.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billswap_types::{Bill, TrustProfile, constants};

/// Why a candidate earned (part of) its score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchReason {
    /// Amounts are identical.
    ExactAmount,
    /// Amounts within the close-match percentage band.
    CloseAmount,
    /// Amounts earn partial similarity credit.
    SimilarAmount,
    /// Due dates within 3 days of each other.
    DueDateTight,
    /// Due dates within 7 days of each other.
    DueDateNear,
    /// Due dates within 14 days of each other.
    DueDateLoose,
    /// Same bill category.
    SameCategory,
    /// Counterparty holds a high-trust tier.
    HighTrustCounterparty,
    /// Counterparty holds at least the established tier.
    EstablishedCounterparty,
    /// Counterparty has a strong completion record.
    ReliableCounterparty,
    /// The source bill is due soon.
    UrgentSource,
}

impl std::fmt::Display for MatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactAmount => write!(f, "amounts match exactly"),
            Self::CloseAmount => write!(f, "amounts within 15%"),
            Self::SimilarAmount => write!(f, "amounts are similar"),
            Self::DueDateTight => write!(f, "due dates within 3 days"),
            Self::DueDateNear => write!(f, "due dates within 7 days"),
            Self::DueDateLoose => write!(f, "due dates within 14 days"),
            Self::SameCategory => write!(f, "same bill category"),
            Self::HighTrustCounterparty => write!(f, "high-trust counterparty"),
            Self::EstablishedCounterparty => write!(f, "established counterparty"),
            Self::ReliableCounterparty => write!(f, "reliable counterparty"),
            Self::UrgentSource => write!(f, "your bill is due soon"),
        }
    }
}

/// The scored result for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchScore {
    /// Total score, capped at 100.
    pub total: u32,
    pub reasons: Vec<MatchReason>,
}

/// Score one candidate bill against the source bill.
#[must_use]
pub fn compatibility(
    source: &Bill,
    candidate: &Bill,
    candidate_profile: &TrustProfile,
    now: DateTime<Utc>,
) -> MatchScore {
    let mut total: u32 = 0;
    let mut reasons = Vec::new();

    // Amount similarity
    let (amount_score, amount_reason) = amount_similarity(source.amount_minor, candidate.amount_minor);
    if let Some(reason) = amount_reason {
        total += amount_score;
        reasons.push(reason);
    }

    // Due-date alignment (both bills must carry a due date)
    if let (Some(src_due), Some(cand_due)) = (source.due_date, candidate.due_date) {
        let diff_days = (src_due - cand_due).num_days().abs();
        let (due_score, due_reason) = match diff_days {
            0..=3 => (constants::SCORE_DUE_TIGHT, Some(MatchReason::DueDateTight)),
            4..=7 => (constants::SCORE_DUE_NEAR, Some(MatchReason::DueDateNear)),
            8..=14 => (constants::SCORE_DUE_LOOSE, Some(MatchReason::DueDateLoose)),
            _ => (0, None),
        };
        if let Some(reason) = due_reason {
            total += due_score;
            reasons.push(reason);
        }
    }

    // Category match
    if source.category == candidate.category {
        total += constants::SCORE_CATEGORY;
        reasons.push(MatchReason::SameCategory);
    }

    // Counterparty trust tier
    let tier = candidate_profile.tier.ordinal();
    if tier >= constants::TIER_HIGH_TRUST {
        total += constants::SCORE_TIER_HIGH;
        reasons.push(MatchReason::HighTrustCounterparty);
    } else if tier >= constants::TIER_ESTABLISHED {
        total += constants::SCORE_TIER_ESTABLISHED;
        reasons.push(MatchReason::EstablishedCounterparty);
    }

    // Counterparty reliability
    if candidate_profile.completed_swaps >= constants::RELIABILITY_MIN_COMPLETED
        && candidate_profile.success_rate_pct() >= constants::RELIABILITY_MIN_RATE_PCT
    {
        total += constants::SCORE_RELIABILITY;
        reasons.push(MatchReason::ReliableCounterparty);
    }

    // Urgency of the source bill
    if source.due_within(now, 3) {
        total += constants::SCORE_URGENCY;
        reasons.push(MatchReason::UrgentSource);
    }

    MatchScore {
        total: total.min(100),
        reasons,
    }
}

/// Amount similarity: exact → fixed bonus, within the close band → smaller
/// fixed bonus, otherwise linear partial credit `(1 − |Δ|/max) × weight`.
fn amount_similarity(source_minor: i64, candidate_minor: i64) -> (u32, Option<MatchReason>) {
    if source_minor == candidate_minor {
        return (constants::SCORE_AMOUNT_EXACT, Some(MatchReason::ExactAmount));
    }
    let delta = (source_minor - candidate_minor).abs();
    let max = source_minor.max(candidate_minor);
    if max <= 0 {
        return (0, None);
    }
    if delta * 100 <= max * constants::AMOUNT_CLOSE_PCT {
        return (constants::SCORE_AMOUNT_CLOSE, Some(MatchReason::CloseAmount));
    }
    // Integer partial credit: weight × (max − Δ) / max, floored.
    let weight = i64::from(constants::SCORE_AMOUNT_PARTIAL_WEIGHT);
    let partial = weight * (max - delta) / max;
    if partial > 0 {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        (partial as u32, Some(MatchReason::SimilarAmount))
    } else {
        (0, None)
    }
}
