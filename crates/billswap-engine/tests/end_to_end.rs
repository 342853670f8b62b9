//! End-to-end integration tests across the whole lifecycle.
//!
//! These exercise the full pipeline — offer, accept, terms, fees, proofs,
//! completion — plus the sweep, disputes, extensions, and cancellation,
//! verifying the cross-component invariants: bills never stay locked past
//! a terminal state, collateral locks settle exactly once, and trust
//! deltas never double-apply.

use chrono::{DateTime, Duration, Utc};

use billswap_engine::{LogChatGateway, LogFeeCollector, LogNotifier, SwapEngine};
use billswap_types::{
    BillCategory, BillId, BillStatus, CollateralEntry, DisputeReason, ProofKind, ProofStatus,
    SwapError, SwapId, SwapStatus, SwapType, TrustProfile, TrustTier, UserId,
};

/// Harness: an engine with logging ports and a manually advanced clock.
struct Harness {
    engine: SwapEngine<LogNotifier, LogChatGateway, LogFeeCollector>,
    now: DateTime<Utc>,
}

impl Harness {
    fn new() -> Self {
        Self {
            engine: SwapEngine::with_default_ports(billswap_types::EngineConfig::default()),
            now: Utc::now(),
        }
    }

    fn advance_hours(&mut self, hours: i64) {
        self.now += Duration::hours(hours);
    }

    /// Register a user seeded to the given tier with 1000 collateral points.
    fn user(&mut self, tier: TrustTier) -> UserId {
        let user = UserId::new();
        self.engine.register_user(user, self.now);
        let mut profile = TrustProfile::dummy_with_tier(tier);
        profile.user = user;
        self.engine.seed_trust(profile);
        self.engine.seed_collateral(
            user,
            CollateralEntry {
                balance: 1_000,
                locked: 0,
                staked: 0,
            },
        );
        user
    }

    /// Create and publish a bill.
    fn active_bill(
        &mut self,
        owner: UserId,
        amount_minor: i64,
        due_in_days: Option<i64>,
    ) -> BillId {
        let due = due_in_days.map(|d| self.now + Duration::days(d));
        let bill = self
            .engine
            .create_bill(owner, amount_minor, BillCategory::Electric, "City Power", due, self.now)
            .unwrap();
        self.engine.publish_bill(owner, bill.id, self.now).unwrap();
        bill.id
    }

    /// Offer + accept + terms: swap lands in `AcceptedPendingFee`.
    fn accepted_two_sided(
        &mut self,
        initiator: UserId,
        initiator_bill: BillId,
        counterparty: UserId,
        counterparty_bill: BillId,
    ) -> SwapId {
        let swap = self
            .engine
            .create_offer(initiator, initiator_bill, SwapType::TwoSided, self.now)
            .unwrap();
        self.engine
            .accept_offer(counterparty, swap.id, Some(counterparty_bill), self.now)
            .unwrap();
        self.engine
            .accept_terms(counterparty, swap.id, self.now)
            .unwrap();
        swap.id
    }

    /// Pay both fees: swap lands in `Locked` with a proof deadline.
    fn locked_two_sided(
        &mut self,
        initiator: UserId,
        initiator_bill: BillId,
        counterparty: UserId,
        counterparty_bill: BillId,
    ) -> SwapId {
        let swap = self.accepted_two_sided(initiator, initiator_bill, counterparty, counterparty_bill);
        self.engine.mark_fee_paid(initiator, swap, self.now).unwrap();
        self.engine.mark_fee_paid(counterparty, swap, self.now).unwrap();
        swap
    }
}

// ---------------------------------------------------------------------------
// Happy paths
// ---------------------------------------------------------------------------

#[test]
fn two_sided_swap_completes_end_to_end() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, Some(5));
    let bill_b = h.active_bill(bob, 5_200, Some(3));

    let score_before = h.engine.trust_profile(alice).unwrap().score;

    let swap = h.locked_two_sided(alice, bill_a, bob, bill_b);
    assert_eq!(h.engine.swap(swap).unwrap().status, SwapStatus::Locked);

    // Both sides prove payment of the other's bill.
    let proof_a = h
        .engine
        .submit_proof(alice, swap, ProofKind::Screenshot, "https://u/a.png", h.now)
        .unwrap();
    assert_eq!(
        h.engine.swap(swap).unwrap().status,
        SwapStatus::AwaitingProof
    );
    let proof_b = h
        .engine
        .submit_proof(bob, swap, ProofKind::Receipt, "https://u/b.png", h.now)
        .unwrap();

    // Cross review: each reviews the other's proof.
    h.engine.approve_proof(bob, proof_a.id, h.now).unwrap();
    let done = h.engine.approve_proof(alice, proof_b.id, h.now).unwrap();
    assert_eq!(done.status, SwapStatus::Completed);
    assert!(done.completed_at.is_some());

    // Bills confirm paid.
    assert_eq!(
        h.engine.bill(bill_a).unwrap().status,
        BillStatus::PaidConfirmed
    );
    assert_eq!(
        h.engine.bill(bill_b).unwrap().status,
        BillStatus::PaidConfirmed
    );

    // Trust delta applied, collateral released with bonus, counters clear.
    let profile = h.engine.trust_profile(alice).unwrap();
    assert!(profile.score > score_before);
    assert_eq!(profile.completed_swaps, 1);
    assert_eq!(profile.active_swaps, 0);

    let entry = h.engine.collateral_entry(alice);
    assert_eq!(entry.locked, 0);
    assert!(entry.balance > 1_000, "completion bonus credited");
}

#[test]
fn one_sided_assist_completes_with_single_proof() {
    let mut h = Harness::new();
    let assisted = h.user(TrustTier::Established);
    let helper = h.user(TrustTier::Established);
    let bill = h.active_bill(assisted, 5_000, Some(4));

    let swap = h
        .engine
        .create_offer(assisted, bill, SwapType::OneSidedAssist, h.now)
        .unwrap();
    h.engine.accept_offer(helper, swap.id, None, h.now).unwrap();
    h.engine.accept_terms(helper, swap.id, h.now).unwrap();

    // Only the assisted side owes a fee.
    let locked = h.engine.mark_fee_paid(assisted, swap.id, h.now).unwrap();
    assert_eq!(locked.status, SwapStatus::Locked);

    let proof = h
        .engine
        .submit_proof(helper, swap.id, ProofKind::Receipt, "https://u/p.png", h.now)
        .unwrap();
    let done = h.engine.approve_proof(assisted, proof.id, h.now).unwrap();

    assert_eq!(done.status, SwapStatus::Completed);
    assert_eq!(h.engine.bill(bill).unwrap().status, BillStatus::PaidConfirmed);
}

#[test]
fn assisted_side_cannot_submit_proof() {
    let mut h = Harness::new();
    let assisted = h.user(TrustTier::Established);
    let helper = h.user(TrustTier::Established);
    let bill = h.active_bill(assisted, 5_000, None);

    let swap = h
        .engine
        .create_offer(assisted, bill, SwapType::OneSidedAssist, h.now)
        .unwrap();
    h.engine.accept_offer(helper, swap.id, None, h.now).unwrap();
    h.engine.accept_terms(helper, swap.id, h.now).unwrap();
    h.engine.mark_fee_paid(assisted, swap.id, h.now).unwrap();

    let err = h
        .engine
        .submit_proof(assisted, swap.id, ProofKind::Receipt, "https://u/x.png", h.now)
        .unwrap_err();
    assert!(matches!(err, SwapError::Unauthorized { .. }));
}

// ---------------------------------------------------------------------------
// Fee gating
// ---------------------------------------------------------------------------

#[test]
fn proofs_blocked_until_both_fees_paid() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let swap = h.accepted_two_sided(alice, bill_a, bob, bill_b);

    let err = h
        .engine
        .submit_proof(alice, swap, ProofKind::Screenshot, "https://u/a.png", h.now)
        .unwrap_err();
    assert!(matches!(err, SwapError::InvalidState { .. }));

    // First fee does not lock; the second does, and starts the window.
    let after_one = h.engine.mark_fee_paid(alice, swap, h.now).unwrap();
    assert_eq!(after_one.status, SwapStatus::AcceptedPendingFee);
    assert!(after_one.proof_deadline.is_none());

    let after_two = h.engine.mark_fee_paid(bob, swap, h.now).unwrap();
    assert_eq!(after_two.status, SwapStatus::Locked);
    assert_eq!(
        after_two.proof_deadline,
        Some(h.now + Duration::hours(72))
    );
}

#[test]
fn duplicate_fee_signal_is_a_noop() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let swap = h.locked_two_sided(alice, bill_a, bob, bill_b);
    let before = h.engine.swap(swap).unwrap();

    // Re-delivered signal changes nothing.
    let after = h.engine.mark_fee_paid(alice, swap, h.now).unwrap();
    assert_eq!(after.status, before.status);
    assert_eq!(after.version, before.version);
}

// ---------------------------------------------------------------------------
// Idempotence of trust deltas
// ---------------------------------------------------------------------------

#[test]
fn trust_delta_applies_exactly_once_under_replay() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let swap = h.locked_two_sided(alice, bill_a, bob, bill_b);
    let proof_a = h
        .engine
        .submit_proof(alice, swap, ProofKind::Screenshot, "https://u/a.png", h.now)
        .unwrap();
    let proof_b = h
        .engine
        .submit_proof(bob, swap, ProofKind::Receipt, "https://u/b.png", h.now)
        .unwrap();
    h.engine.approve_proof(bob, proof_a.id, h.now).unwrap();
    h.engine.approve_proof(alice, proof_b.id, h.now).unwrap();

    let score_after = h.engine.trust_profile(alice).unwrap().score;
    let completed_after = h.engine.trust_profile(alice).unwrap().completed_swaps;

    // Replayed approvals are no-ops: no second delta, no second counter.
    h.engine.approve_proof(bob, proof_a.id, h.now).unwrap();
    h.engine.approve_proof(alice, proof_b.id, h.now).unwrap();

    let profile = h.engine.trust_profile(alice).unwrap();
    assert_eq!(profile.score, score_after);
    assert_eq!(profile.completed_swaps, completed_after);
}

// ---------------------------------------------------------------------------
// Scheduler sweeps
// ---------------------------------------------------------------------------

#[test]
fn unaccepted_offer_expires_and_bills_release() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bill = h.active_bill(alice, 5_000, None);

    let swap = h
        .engine
        .create_offer(alice, bill, SwapType::TwoSided, h.now)
        .unwrap();
    assert_eq!(h.engine.bill(bill).unwrap().status, BillStatus::LockedInSwap);

    // Within the window nothing happens.
    h.advance_hours(23);
    let report = h.engine.sweep(h.now);
    assert_eq!(report.offers_expired, 0);

    h.advance_hours(2);
    let report = h.engine.sweep(h.now);
    assert_eq!(report.offers_expired, 1);

    assert_eq!(h.engine.swap(swap.id).unwrap().status, SwapStatus::Cancelled);
    assert_eq!(h.engine.bill(bill).unwrap().status, BillStatus::Active);
    assert_eq!(h.engine.trust_profile(alice).unwrap().active_swaps, 0);
}

#[test]
fn unreviewed_proof_auto_accepts_and_completion_reevaluates() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let swap = h.locked_two_sided(alice, bill_a, bob, bill_b);
    h.engine
        .submit_proof(alice, swap, ProofKind::Screenshot, "https://u/a.png", h.now)
        .unwrap();
    h.engine
        .submit_proof(bob, swap, ProofKind::Receipt, "https://u/b.png", h.now)
        .unwrap();

    // 13 hours later both reviews are overdue; the sweep accepts both and
    // the completion check fires.
    h.advance_hours(13);
    let report = h.engine.sweep(h.now);
    assert_eq!(report.proofs_auto_accepted, 2);
    assert_eq!(report.swaps_completed, 1);

    assert_eq!(h.engine.swap(swap).unwrap().status, SwapStatus::Completed);
    assert_eq!(
        h.engine
            .timeline(swap)
            .iter()
            .filter(|e| matches!(
                e.payload,
                billswap_types::EventPayload::ProofAutoAccepted { .. }
            ))
            .count(),
        2
    );
}

#[test]
fn proof_deadline_expiry_fails_swap_with_no_shows() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let swap = h.locked_two_sided(alice, bill_a, bob, bill_b);
    let score_before = h.engine.trust_profile(alice).unwrap().score;

    // Nobody submits anything for 73 hours.
    h.advance_hours(73);
    let report = h.engine.sweep(h.now);
    assert_eq!(report.swaps_failed, 1);

    let failed = h.engine.swap(swap).unwrap();
    assert_eq!(failed.status, SwapStatus::Failed);
    assert!(failed.failed_at.is_some());

    // Bills return to the pool; both no-shows penalized, streaks reset.
    assert_eq!(h.engine.bill(bill_a).unwrap().status, BillStatus::Active);
    assert_eq!(h.engine.bill(bill_b).unwrap().status, BillStatus::Active);
    let profile = h.engine.trust_profile(alice).unwrap();
    assert_eq!(profile.score, score_before - 60);
    assert_eq!(profile.no_show_count, 1);
    assert_eq!(profile.streak, 0);
}

// ---------------------------------------------------------------------------
// Terms negotiation
// ---------------------------------------------------------------------------

#[test]
fn terms_versions_increase_and_cap_at_three() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let swap = h
        .engine
        .create_offer(alice, bill_a, SwapType::TwoSided, h.now)
        .unwrap();
    h.engine
        .accept_offer(bob, swap.id, Some(bill_b), h.now)
        .unwrap();

    let v1 = h.engine.current_terms(swap.id, h.now).unwrap();
    assert_eq!(v1.version, 1);

    let mut offer = billswap_engine::TermsOffer::default_for(
        &billswap_types::EngineConfig::default(),
        &h.engine.swap(swap.id).unwrap(),
    );
    offer.initiator_fee_minor = 150;

    let v2 = h.engine.counter_terms(bob, swap.id, offer, h.now).unwrap();
    assert_eq!(v2.version, 2);
    let v3 = h.engine.counter_terms(alice, swap.id, offer, h.now).unwrap();
    assert_eq!(v3.version, 3);

    let err = h
        .engine
        .counter_terms(bob, swap.id, offer, h.now)
        .unwrap_err();
    assert!(matches!(err, SwapError::TermsVersionCapReached { cap: 3 }));

    // The last version is still acceptable; fees come from it.
    let active = h.engine.accept_terms(bob, swap.id, h.now).unwrap();
    assert_eq!(active.status, SwapStatus::AcceptedPendingFee);
    assert_eq!(active.initiator_fee.amount_minor, 150);
}

#[test]
fn proposer_cannot_accept_own_terms() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let swap = h
        .engine
        .create_offer(alice, bill_a, SwapType::TwoSided, h.now)
        .unwrap();
    h.engine
        .accept_offer(bob, swap.id, Some(bill_b), h.now)
        .unwrap();

    let err = h.engine.accept_terms(alice, swap.id, h.now).unwrap_err();
    assert!(matches!(err, SwapError::OwnTermsAction(_)));
}

// ---------------------------------------------------------------------------
// Disputes
// ---------------------------------------------------------------------------

#[test]
fn dispute_resolved_against_initiator() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let swap = h.locked_two_sided(alice, bill_a, bob, bill_b);
    h.engine
        .submit_proof(bob, swap, ProofKind::Receipt, "https://u/b.png", h.now)
        .unwrap();

    let alice_score = h.engine.trust_profile(alice).unwrap().score;
    let bob_balance = h.engine.collateral_entry(bob).balance;

    let dispute = h
        .engine
        .raise_dispute(bob, swap, DisputeReason::PaymentNotReceived, h.now)
        .unwrap();
    assert_eq!(h.engine.swap(swap).unwrap().status, SwapStatus::Disputed);

    // Frozen: participant-driven transitions are refused.
    let err = h
        .engine
        .submit_proof(alice, swap, ProofKind::Screenshot, "https://u/a.png", h.now)
        .unwrap_err();
    assert!(matches!(err, SwapError::InvalidState { .. }));

    h.engine.begin_investigation(dispute.id, h.now).unwrap();
    let failed = h
        .engine
        .resolve_dispute(dispute.id, Some(alice), "initiator never paid", h.now)
        .unwrap();
    assert_eq!(failed.status, SwapStatus::Failed);

    // Initiator penalized: score down, locked points forfeited.
    let alice_profile = h.engine.trust_profile(alice).unwrap();
    assert!(alice_profile.score < alice_score);
    assert_eq!(alice_profile.disputed_swaps, 1);
    let alice_entry = h.engine.collateral_entry(alice);
    assert_eq!(alice_entry.locked, 0);
    assert!(alice_entry.balance < 1_000);

    // Counterparty refunded half the forfeiture on top of the release.
    let bob_entry = h.engine.collateral_entry(bob);
    assert_eq!(bob_entry.locked, 0);
    assert!(bob_entry.balance > bob_balance);

    // Bills are back in the pool.
    assert_eq!(h.engine.bill(bill_a).unwrap().status, BillStatus::Active);
    assert_eq!(h.engine.bill(bill_b).unwrap().status, BillStatus::Active);
}

#[test]
fn dismissed_dispute_returns_to_proof_phase() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let swap = h.locked_two_sided(alice, bill_a, bob, bill_b);
    h.engine
        .submit_proof(alice, swap, ProofKind::Screenshot, "https://u/a.png", h.now)
        .unwrap();

    let dispute = h
        .engine
        .raise_dispute(alice, swap, DisputeReason::ProofRejectedUnfairly, h.now)
        .unwrap();
    let back = h
        .engine
        .dismiss_dispute(dispute.id, "no violation found", h.now)
        .unwrap();
    assert_eq!(back.status, SwapStatus::AwaitingProof);

    // The flow continues normally afterwards.
    let proof_b = h
        .engine
        .submit_proof(bob, swap, ProofKind::Receipt, "https://u/b.png", h.now)
        .unwrap();
    assert_eq!(proof_b.status, ProofStatus::Pending);
}

#[test]
fn malformed_at_fault_keeps_dispute_investigating() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let outsider = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let swap = h.locked_two_sided(alice, bill_a, bob, bill_b);
    h.engine
        .submit_proof(alice, swap, ProofKind::Screenshot, "https://u/a.png", h.now)
        .unwrap();
    let dispute = h
        .engine
        .raise_dispute(bob, swap, DisputeReason::FakeProof, h.now)
        .unwrap();

    let err = h
        .engine
        .resolve_dispute(dispute.id, Some(outsider), "oops", h.now)
        .unwrap_err();
    assert!(matches!(err, SwapError::InvalidAtFault { .. }));

    // Not silently resolved: still frozen, still under investigation.
    assert_eq!(h.engine.swap(swap).unwrap().status, SwapStatus::Disputed);
    let resolved = h
        .engine
        .resolve_dispute(dispute.id, Some(bob), "reporter at fault", h.now)
        .unwrap();
    assert_eq!(resolved.status, SwapStatus::Failed);
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[test]
fn cancellation_releases_bills_collateral_and_counters() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let swap = h.accepted_two_sided(alice, bill_a, bob, bill_b);
    assert!(h.engine.collateral_entry(alice).locked > 0);

    let cancelled = h.engine.cancel_swap(bob, swap, h.now).unwrap();
    assert_eq!(cancelled.status, SwapStatus::Cancelled);

    assert_eq!(h.engine.bill(bill_a).unwrap().status, BillStatus::Active);
    assert_eq!(h.engine.bill(bill_b).unwrap().status, BillStatus::Active);
    // Locks reversed without bonus; counters decremented.
    assert_eq!(h.engine.collateral_entry(alice).locked, 0);
    assert_eq!(h.engine.collateral_entry(alice).balance, 1_000);
    assert_eq!(h.engine.trust_profile(alice).unwrap().active_swaps, 0);
    assert_eq!(h.engine.trust_profile(bob).unwrap().active_swaps, 0);
}

#[test]
fn cancellation_blocked_once_proofs_flow() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let swap = h.locked_two_sided(alice, bill_a, bob, bill_b);
    h.engine
        .submit_proof(alice, swap, ProofKind::Screenshot, "https://u/a.png", h.now)
        .unwrap();

    let err = h.engine.cancel_swap(alice, swap, h.now).unwrap_err();
    assert!(matches!(err, SwapError::InvalidState { .. }));
}

// ---------------------------------------------------------------------------
// Extensions
// ---------------------------------------------------------------------------

#[test]
fn granted_extension_pushes_proof_deadline_once() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let swap = h.locked_two_sided(alice, bill_a, bob, bill_b);
    let deadline = h.engine.swap(swap).unwrap().proof_deadline.unwrap();

    let request = h.engine.request_extension(alice, swap, 24, h.now).unwrap();
    h.engine
        .respond_extension(bob, request.id, true, h.now)
        .unwrap();

    let extended = h.engine.swap(swap).unwrap();
    assert_eq!(
        extended.proof_deadline,
        Some(deadline + Duration::hours(24))
    );
    assert!(extended.deadline_extended);

    // No second extension for anyone on this swap.
    let err = h
        .engine
        .request_extension(bob, swap, 12, h.now)
        .unwrap_err();
    assert!(matches!(err, SwapError::ExtensionAlreadyRequested { .. }));
}

#[test]
fn unanswered_extension_expires_in_sweep() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let swap = h.locked_two_sided(alice, bill_a, bob, bill_b);
    let request = h.engine.request_extension(alice, swap, 24, h.now).unwrap();

    h.advance_hours(13);
    let report = h.engine.sweep(h.now);
    assert_eq!(report.extensions_expired, 1);

    let err = h
        .engine
        .respond_extension(bob, request.id, true, h.now)
        .unwrap_err();
    assert!(matches!(err, SwapError::ExtensionNotPending(_)));
}

// ---------------------------------------------------------------------------
// Audit trail
// ---------------------------------------------------------------------------

#[test]
fn timeline_records_every_transition_with_valid_hashes() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let swap = h.locked_two_sided(alice, bill_a, bob, bill_b);
    let proof_a = h
        .engine
        .submit_proof(alice, swap, ProofKind::Screenshot, "https://u/a.png", h.now)
        .unwrap();
    let proof_b = h
        .engine
        .submit_proof(bob, swap, ProofKind::Receipt, "https://u/b.png", h.now)
        .unwrap();
    h.engine.approve_proof(bob, proof_a.id, h.now).unwrap();
    h.engine.approve_proof(alice, proof_b.id, h.now).unwrap();

    let timeline = h.engine.timeline(swap);
    let kinds: Vec<&str> = timeline.iter().map(|e| e.payload.kind()).collect();

    for expected in [
        "offer_created",
        "terms_proposed",
        "offer_accepted",
        "terms_accepted",
        "collateral_locked",
        "fee_paid",
        "swap_locked",
        "proof_submitted",
        "proof_accepted",
        "collateral_released",
        "trust_delta_applied",
        "swap_completed",
    ] {
        assert!(kinds.contains(&expected), "missing {expected}: {kinds:?}");
    }
    assert!(timeline.iter().all(|e| e.verify_hash()));
}

// ---------------------------------------------------------------------------
// Matching through the engine
// ---------------------------------------------------------------------------

#[test]
fn engine_matching_surfaces_compatible_bills() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let carol = h.user(TrustTier::Member);

    let mine = h.active_bill(alice, 5_000, Some(5));
    let close = h.active_bill(bob, 5_200, Some(3));
    h.active_bill(carol, 90_000, Some(40));

    let matches = h.engine.find_matches(alice, mine, h.now).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].bill, close);
    assert!(matches[0].score >= 80);
}

#[test]
fn collateral_invariant_holds_across_lifecycle() {
    let mut h = Harness::new();
    let alice = h.user(TrustTier::Member);
    let bob = h.user(TrustTier::Member);
    let bill_a = h.active_bill(alice, 5_000, None);
    let bill_b = h.active_bill(bob, 5_000, None);

    let check = |h: &Harness, user: UserId| {
        let entry = h.engine.collateral_entry(user);
        assert!(entry.locked <= entry.balance, "locked exceeds balance");
        assert!(entry.locked >= 0 && entry.balance >= 0 && entry.staked >= 0);
    };

    let swap = h.accepted_two_sided(alice, bill_a, bob, bill_b);
    check(&h, alice);
    check(&h, bob);

    h.engine.mark_fee_paid(alice, swap, h.now).unwrap();
    h.engine.mark_fee_paid(bob, swap, h.now).unwrap();
    check(&h, alice);

    h.engine.cancel_swap(alice, swap, h.now).unwrap();
    check(&h, alice);
    check(&h, bob);
}
