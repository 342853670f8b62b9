//! Ranked matching over a candidate pool.
//!
//! The ranker is the **only** entry point callers need: it filters the
//! pool, scores every surviving candidate, and returns the top matches
//! above the floor, sorted deterministically.
//!
//! ## Determinism Contract
//!
//! Given the same source bill, pool, and `now`, the ranked output is
//! identical regardless of pool ordering. Ties on score break on the
//! candidate bill's UUIDv7 id, newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billswap_types::{Bill, BillId, BillStatus, TrustProfile, UserId, constants};

use crate::score::{MatchReason, compatibility};

/// One ranked match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub bill: BillId,
    pub owner: UserId,
    /// Compatibility score, 0–100.
    pub score: u32,
    pub reasons: Vec<MatchReason>,
}

/// Rank all compatible candidates for one source bill.
///
/// Filters out: the source user's own bills, non-`Active` candidates, and
/// candidates whose owner is under an eligibility lock. A source user
/// under an eligibility lock gets no matches at all.
#[must_use]
pub fn rank_matches(
    source: &Bill,
    source_profile: &TrustProfile,
    pool: &[(Bill, TrustProfile)],
    now: DateTime<Utc>,
) -> Vec<MatchCandidate> {
    if source_profile.is_locked(now) {
        tracing::debug!(user = %source.owner, "Match run skipped: source user under eligibility lock");
        return Vec::new();
    }

    let mut scored: Vec<MatchCandidate> = pool
        .iter()
        .filter(|(candidate, profile)| {
            candidate.owner != source.owner
                && candidate.status == BillStatus::Active
                && !profile.is_locked(now)
        })
        .map(|(candidate, profile)| {
            let score = compatibility(source, candidate, profile, now);
            MatchCandidate {
                bill: candidate.id,
                owner: candidate.owner,
                score: score.total,
                reasons: score.reasons,
            }
        })
        .filter(|candidate| candidate.score > constants::MATCH_SCORE_FLOOR)
        .collect();

    // Deterministic order: score descending, then newest candidate first.
    scored.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| b.bill.cmp(&a.bill)));
    scored.truncate(constants::MATCH_TOP_N);

    tracing::debug!(
        source = %source.id,
        pool = pool.len(),
        returned = scored.len(),
        "Match run complete"
    );

    scored
}

/// Run the ranker for every unmatched bill of one user, deduplicating by
/// candidate bill and keeping the highest score seen.
#[must_use]
pub fn bulk_matches(
    sources: &[Bill],
    source_profile: &TrustProfile,
    pool: &[(Bill, TrustProfile)],
    now: DateTime<Utc>,
) -> Vec<MatchCandidate> {
    let mut best: Vec<MatchCandidate> = Vec::new();

    for source in sources.iter().filter(|b| b.status == BillStatus::Active) {
        for candidate in rank_matches(source, source_profile, pool, now) {
            match best.iter_mut().find(|m| m.bill == candidate.bill) {
                Some(existing) if existing.score < candidate.score => *existing = candidate,
                Some(_) => {}
                None => best.push(candidate),
            }
        }
    }

    best.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| b.bill.cmp(&a.bill)));
    best.truncate(constants::MATCH_TOP_N);
    best
}

#[cfg(test)]
mod tests {
    use billswap_types::{BillCategory, TrustTier};
    use rand::seq::SliceRandom;

    use super::*;

    fn pooled(bill: Bill) -> (Bill, TrustProfile) {
        let profile = TrustProfile::dummy();
        (bill, profile)
    }

    #[test]
    fn own_bills_are_excluded() {
        let now = Utc::now();
        let owner = UserId::new();
        let source = Bill::dummy_for_owner(owner, 5_000, BillCategory::Electric);
        let own_candidate = Bill::dummy_for_owner(owner, 5_000, BillCategory::Electric);

        let pool = vec![pooled(own_candidate)];
        let matches = rank_matches(&source, &TrustProfile::dummy(), &pool, now);
        assert!(matches.is_empty());
    }

    #[test]
    fn inactive_candidates_are_excluded() {
        let now = Utc::now();
        let source = Bill::dummy(5_000, BillCategory::Electric);
        let mut locked = Bill::dummy(5_000, BillCategory::Electric);
        locked.status = BillStatus::LockedInSwap;

        let pool = vec![pooled(locked)];
        let matches = rank_matches(&source, &TrustProfile::dummy(), &pool, now);
        assert!(matches.is_empty());
    }

    #[test]
    fn locked_source_user_gets_no_matches() {
        let now = Utc::now();
        let source = Bill::dummy(5_000, BillCategory::Electric);
        let pool = vec![pooled(Bill::dummy(5_000, BillCategory::Electric))];

        let mut profile = TrustProfile::dummy();
        profile.locked_until = Some(now + chrono::Duration::hours(2));
        let matches = rank_matches(&source, &profile, &pool, now);
        assert!(matches.is_empty());
    }

    #[test]
    fn below_floor_candidates_are_dropped() {
        let now = Utc::now();
        let source = Bill::dummy(5_000, BillCategory::Electric);
        // Different category, wildly different amount, no due dates:
        // partial amount credit alone cannot clear the floor.
        let weak = Bill::dummy(50_000, BillCategory::Rent);

        let pool = vec![pooled(weak)];
        let matches = rank_matches(&source, &TrustProfile::dummy(), &pool, now);
        assert!(matches.is_empty());
    }

    #[test]
    fn results_sorted_by_score_descending() {
        let now = Utc::now();
        let source = Bill::dummy_due_in(5_000, BillCategory::Electric, 5);

        let strong = Bill::dummy_due_in(5_000, BillCategory::Electric, 5);
        let medium = Bill::dummy_due_in(5_400, BillCategory::Electric, 10);
        let weak = Bill::dummy(6_500, BillCategory::Electric);

        let pool = vec![
            pooled(weak.clone()),
            pooled(strong.clone()),
            pooled(medium.clone()),
        ];
        let matches = rank_matches(&source, &TrustProfile::dummy(), &pool, now);
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].bill, strong.id);
        assert_eq!(matches[1].bill, medium.id);
        assert_eq!(matches[2].bill, weak.id);
        assert!(matches[0].score > matches[1].score);
        assert!(matches[1].score > matches[2].score);
    }

    #[test]
    fn ranking_is_stable_under_pool_reordering() {
        let now = Utc::now();
        let source = Bill::dummy_due_in(5_000, BillCategory::Electric, 5);

        let mut pool: Vec<(Bill, TrustProfile)> = (0..20)
            .map(|i| {
                pooled(Bill::dummy_due_in(
                    4_500 + i * 100,
                    if i % 2 == 0 {
                        BillCategory::Electric
                    } else {
                        BillCategory::Water
                    },
                    (i % 14) + 1,
                ))
            })
            .collect();

        let baseline = rank_matches(&source, &TrustProfile::dummy(), &pool, now);

        let mut rng = rand::thread_rng();
        for _ in 0..10 {
            pool.shuffle(&mut rng);
            let shuffled = rank_matches(&source, &TrustProfile::dummy(), &pool, now);
            let ids: Vec<BillId> = shuffled.iter().map(|m| m.bill).collect();
            let baseline_ids: Vec<BillId> = baseline.iter().map(|m| m.bill).collect();
            assert_eq!(ids, baseline_ids, "ranking changed under reordering");
        }
    }

    #[test]
    fn ties_break_on_newest_candidate() {
        let now = Utc::now();
        let source = Bill::dummy(5_000, BillCategory::Electric);
        // Identical bills — identical scores; the newer UUIDv7 id wins.
        let older = Bill::dummy(5_000, BillCategory::Electric);
        let newer = Bill::dummy(5_000, BillCategory::Electric);
        assert!(older.id < newer.id);

        let pool = vec![pooled(older.clone()), pooled(newer.clone())];
        let matches = rank_matches(&source, &TrustProfile::dummy(), &pool, now);
        assert_eq!(matches[0].bill, newer.id);
        assert_eq!(matches[1].bill, older.id);
    }

    #[test]
    fn top_n_is_enforced() {
        let now = Utc::now();
        let source = Bill::dummy_due_in(5_000, BillCategory::Electric, 5);
        let pool: Vec<(Bill, TrustProfile)> = (0..25)
            .map(|_| pooled(Bill::dummy_due_in(5_000, BillCategory::Electric, 5)))
            .collect();

        let matches = rank_matches(&source, &TrustProfile::dummy(), &pool, now);
        assert_eq!(matches.len(), constants::MATCH_TOP_N);
    }

    #[test]
    fn high_tier_counterparty_outranks_equal_bill() {
        let now = Utc::now();
        let source = Bill::dummy_due_in(5_000, BillCategory::Electric, 5);

        let plain = Bill::dummy_due_in(5_000, BillCategory::Electric, 5);
        let trusted = Bill::dummy_due_in(5_000, BillCategory::Electric, 5);
        let trusted_profile = TrustProfile::dummy_with_tier(TrustTier::Trusted);

        let pool = vec![pooled(plain.clone()), (trusted.clone(), trusted_profile)];
        let matches = rank_matches(&source, &TrustProfile::dummy(), &pool, now);
        assert_eq!(matches[0].bill, trusted.id);
        assert!(matches[0].score > matches[1].score);
    }

    #[test]
    fn bulk_dedupes_keeping_highest_score() {
        let now = Utc::now();
        let owner = UserId::new();
        // Two source bills; the candidate matches the first far better.
        let close = Bill::dummy_for_owner(owner, 5_000, BillCategory::Electric);
        let distant = Bill::dummy_for_owner(owner, 9_000, BillCategory::Water);
        let candidate = Bill::dummy(5_000, BillCategory::Electric);

        let pool = vec![pooled(candidate.clone())];
        let profile = TrustProfile::dummy();
        let matches = bulk_matches(&[distant, close.clone()], &profile, &pool, now);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].bill, candidate.id);

        let single = rank_matches(&close, &profile, &pool, now);
        assert_eq!(
            matches[0].score, single[0].score,
            "bulk must keep the highest score seen"
        );
    }

    #[test]
    fn bulk_skips_non_active_sources() {
        let now = Utc::now();
        let owner = UserId::new();
        let mut draft = Bill::dummy_for_owner(owner, 5_000, BillCategory::Electric);
        draft.status = BillStatus::Draft;
        let candidate = Bill::dummy(5_000, BillCategory::Electric);

        let matches = bulk_matches(
            &[draft],
            &TrustProfile::dummy(),
            &[pooled(candidate)],
            now,
        );
        assert!(matches.is_empty());
    }
}
