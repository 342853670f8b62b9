//! The swap state machine — central orchestrator of the lifecycle.
//!
//! Every mutating operation follows the same discipline: load, validate
//! *everything*, then mutate. The swap commit (optimistic version check)
//! is always the first mutation of the swap record on a terminalizing
//! path, so two racing paths can never both apply a terminal transition.
//! Secondary effects (notification, chat, fee requests) run after the
//! commit and never roll it back.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use billswap_match::MatchCandidate;
use billswap_trust::{CollateralLedger, EligibilityGate, TrustLedger, lock_points_for};
use billswap_types::{
    Actor, Bill, BillCategory, BillId, BillStatus, CollateralEntry, EngineConfig, EventPayload,
    ExtensionId, ExtensionRequest, ExtensionStatus, FallbackPenalty, FeeState, Proof, ProofId,
    ProofKind, ProofStatus, Result, Swap, SwapError, SwapEvent, SwapId, SwapSide, SwapStatus,
    SwapType, Terms, TermsStatus, TrustProfile, UserId, VerificationFlags, constants,
};

use crate::events::EventLog;
use crate::guard::{DeltaGuard, Outcome};
use crate::negotiator::{TermsNegotiator, TermsOffer};
use crate::ports::{ChatGateway, FeeCollector, LogChatGateway, LogFeeCollector, LogNotifier, Notifier};
use crate::store::{BillStore, DisputeStore, ExtensionStore, ProofStore, SwapStore, TermsStore};

/// One participant's collateral hold for one swap. Taken (removed) exactly
/// once, on release or forfeiture.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CollateralHold {
    pub user: UserId,
    pub points: i64,
    pub staked: i64,
}

/// The lifecycle engine. Construct one per deployment and route every
/// mutating call through it; caller authentication/authorization happens
/// at the API boundary above.
pub struct SwapEngine<N: Notifier, C: ChatGateway, F: FeeCollector> {
    pub(crate) config: EngineConfig,
    pub(crate) bills: BillStore,
    pub(crate) swaps: SwapStore,
    pub(crate) terms: TermsStore,
    pub(crate) proofs: ProofStore,
    pub(crate) disputes: DisputeStore,
    pub(crate) extensions: ExtensionStore,
    pub(crate) trust: TrustLedger,
    pub(crate) collateral: CollateralLedger,
    pub(crate) gate: EligibilityGate,
    pub(crate) negotiator: TermsNegotiator,
    pub(crate) guard: DeltaGuard,
    pub(crate) events: EventLog,
    /// Per-swap collateral holds, removed exactly once on settlement.
    pub(crate) holds: HashMap<SwapId, Vec<CollateralHold>>,
    pub(crate) notifier: N,
    pub(crate) chat: C,
    pub(crate) fees: F,
}

impl SwapEngine<LogNotifier, LogChatGateway, LogFeeCollector> {
    /// Engine with logging-only ports — tests and headless runs.
    #[must_use]
    pub fn with_default_ports(config: EngineConfig) -> Self {
        Self::new(config, LogNotifier, LogChatGateway, LogFeeCollector)
    }
}

impl<N: Notifier, C: ChatGateway, F: FeeCollector> SwapEngine<N, C, F> {
    /// Create an engine wired to the given collaborator ports.
    #[must_use]
    pub fn new(config: EngineConfig, notifier: N, chat: C, fees: F) -> Self {
        let guard_capacity = config.delta_guard_capacity;
        let negotiator = TermsNegotiator::new(&config);
        Self {
            config,
            bills: BillStore::new(),
            swaps: SwapStore::new(),
            terms: TermsStore::new(),
            proofs: ProofStore::new(),
            disputes: DisputeStore::new(),
            extensions: ExtensionStore::new(),
            trust: TrustLedger::new(),
            collateral: CollateralLedger::new(),
            gate: EligibilityGate::new(),
            negotiator,
            guard: DeltaGuard::new(guard_capacity),
            events: EventLog::new(),
            holds: HashMap::new(),
            notifier,
            chat,
            fees,
        }
    }

    // =======================================================================
    // Users & bills
    // =======================================================================

    /// Register a user in both ledgers. Idempotent.
    pub fn register_user(&mut self, user: UserId, now: DateTime<Utc>) {
        self.trust.register(user, now);
        self.collateral.register(user);
    }

    /// Push verification flags from the identity collaborator.
    ///
    /// # Errors
    /// Returns `ProfileNotFound` for unregistered users.
    pub fn set_verification(
        &mut self,
        user: UserId,
        flags: VerificationFlags,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.trust.set_verification(user, flags, now)?;
        Ok(())
    }

    /// Create a bill in `Draft` status.
    ///
    /// # Errors
    /// Returns `InvalidBill` on a non-positive amount or empty provider.
    pub fn create_bill(
        &mut self,
        owner: UserId,
        amount_minor: i64,
        category: BillCategory,
        provider: &str,
        due_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Bill> {
        if amount_minor <= 0 {
            return Err(SwapError::InvalidBill {
                reason: "amount must be positive".to_string(),
            });
        }
        if provider.trim().is_empty() {
            return Err(SwapError::InvalidBill {
                reason: "provider must not be empty".to_string(),
            });
        }
        self.trust.profile(owner)?;

        let bill = Bill {
            id: BillId::new(),
            owner,
            amount_minor,
            category,
            provider: provider.to_string(),
            due_date,
            status: BillStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        self.bills.insert(bill.clone());
        Ok(bill)
    }

    /// Publish a draft bill into the matching pool.
    ///
    /// # Errors
    /// Returns `BillNotOwned` or `BillNotInStatus`.
    pub fn publish_bill(&mut self, owner: UserId, bill: BillId, now: DateTime<Utc>) -> Result<Bill> {
        let stored = self.bills.get(bill)?;
        if stored.owner != owner {
            return Err(SwapError::BillNotOwned { bill, user: owner });
        }
        self.bills
            .transition(bill, BillStatus::Draft, BillStatus::Active, now)?;
        self.bills.get(bill)
    }

    // =======================================================================
    // Offer / accept
    // =======================================================================

    /// Open a swap offer over one of the caller's active bills. Locks the
    /// bill and creates the version-1 terms proposal.
    ///
    /// # Errors
    /// Eligibility, ownership, and bill-status violations reject the offer
    /// before any state changes.
    pub fn create_offer(
        &mut self,
        initiator: UserId,
        bill_id: BillId,
        swap_type: SwapType,
        now: DateTime<Utc>,
    ) -> Result<Swap> {
        let bill = self.bills.get(bill_id)?;
        if bill.owner != initiator {
            return Err(SwapError::BillNotOwned {
                bill: bill_id,
                user: initiator,
            });
        }
        if !bill.is_lockable() {
            return Err(SwapError::BillNotInStatus {
                bill: bill_id,
                expected: BillStatus::Active,
                actual: bill.status,
            });
        }
        let profile = self.trust.profile(initiator)?;
        self.gate
            .check_participation(profile, bill.amount_minor, now)?;
        if swap_type == SwapType::OneSidedAssist {
            self.gate.check_assist(profile)?;
        }

        // All checks passed — mutate.
        self.bills
            .transition(bill_id, BillStatus::Active, BillStatus::LockedInSwap, now)?;

        let swap = Swap {
            id: SwapId::new(),
            swap_type,
            status: SwapStatus::Offered,
            initiator,
            counterparty: None,
            initiator_bill: bill_id,
            counterparty_bill: None,
            initiator_fee: FeeState::unpaid(self.config.default_fee_minor),
            counterparty_fee: FeeState::unpaid(match swap_type {
                SwapType::TwoSided => self.config.default_fee_minor,
                SwapType::OneSidedAssist => 0,
            }),
            accept_deadline: now + self.config.accept_window(),
            proof_deadline: None,
            deadline_extended: false,
            completed_at: None,
            failed_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.swaps.insert(swap.clone());
        self.trust.inc_active(initiator, now)?;

        let offer = TermsOffer::default_for(&self.config, &swap);
        let terms = self.negotiator.initial(&swap, initiator, offer, now);
        let terms_id = terms.id;
        let terms_version = terms.version;
        self.terms.insert(terms);

        self.record(
            swap.id,
            Actor::Participant(initiator),
            EventPayload::OfferCreated {
                swap_type,
                bill: bill_id,
                amount_minor: bill.amount_minor,
            },
            now,
        );
        self.record(
            swap.id,
            Actor::Participant(initiator),
            EventPayload::TermsProposed {
                terms: terms_id,
                version: terms_version,
            },
            now,
        );
        tracing::info!(swap = %swap.id, initiator = %initiator, %swap_type, "Offer created");
        Ok(swap)
    }

    /// Accept an open offer, attaching a bill on two-sided swaps. Both
    /// bills are locked once this returns; terms still need acceptance.
    ///
    /// # Errors
    /// `OfferExpired` past the accept deadline; eligibility and bill
    /// violations reject before any state changes.
    pub fn accept_offer(
        &mut self,
        counterparty: UserId,
        swap_id: SwapId,
        counterparty_bill: Option<BillId>,
        now: DateTime<Utc>,
    ) -> Result<Swap> {
        let mut swap = self.swaps.get(swap_id)?;

        // Duplicate accept by the same user is a no-op.
        if swap.counterparty == Some(counterparty) {
            return Ok(swap);
        }
        if swap.status != SwapStatus::Offered || swap.counterparty.is_some() {
            return Err(SwapError::InvalidState {
                operation: "accept_offer",
                actual: swap.status,
            });
        }
        if counterparty == swap.initiator {
            return Err(SwapError::SelfSwapBlocked);
        }
        if now > swap.accept_deadline {
            return Err(SwapError::OfferExpired {
                deadline: swap.accept_deadline,
            });
        }

        let initiator_bill = self.bills.get(swap.initiator_bill)?;
        let profile = self.trust.profile(counterparty)?;
        self.gate
            .check_participation(profile, initiator_bill.amount_minor, now)?;

        let attached = match (swap.swap_type, counterparty_bill) {
            (SwapType::TwoSided, Some(bill_id)) => {
                let bill = self.bills.get(bill_id)?;
                if bill.owner != counterparty {
                    return Err(SwapError::BillNotOwned {
                        bill: bill_id,
                        user: counterparty,
                    });
                }
                if !bill.is_lockable() {
                    return Err(SwapError::BillNotInStatus {
                        bill: bill_id,
                        expected: BillStatus::Active,
                        actual: bill.status,
                    });
                }
                Some(bill_id)
            }
            (SwapType::TwoSided, None) => {
                return Err(SwapError::InvalidBill {
                    reason: "two-sided swap requires a counterparty bill".to_string(),
                });
            }
            (SwapType::OneSidedAssist, None) => {
                self.gate.check_assist(profile)?;
                None
            }
            (SwapType::OneSidedAssist, Some(_)) => {
                return Err(SwapError::InvalidBill {
                    reason: "one-sided assist carries no counterparty bill".to_string(),
                });
            }
        };

        // All checks passed — mutate.
        if let Some(bill_id) = attached {
            self.bills
                .transition(bill_id, BillStatus::Active, BillStatus::LockedInSwap, now)?;
        }
        swap.counterparty = Some(counterparty);
        swap.counterparty_bill = attached;
        let swap = self.swaps.commit(swap, now)?;
        self.trust.inc_active(counterparty, now)?;

        self.record(
            swap_id,
            Actor::Participant(counterparty),
            EventPayload::OfferAccepted {
                counterparty,
                counterparty_bill: attached,
            },
            now,
        );
        self.notify(swap.initiator, &EventPayload::OfferAccepted {
            counterparty,
            counterparty_bill: attached,
        });
        tracing::info!(swap = %swap_id, counterparty = %counterparty, "Offer accepted");
        Ok(swap)
    }

    // =======================================================================
    // Terms negotiation
    // =======================================================================

    /// The current (highest-version) terms for a swap, lazily flipping an
    /// expired open version to `Expired`.
    ///
    /// # Errors
    /// Returns `SwapNotFound` / `TermsNotFound`.
    pub fn current_terms(&mut self, swap_id: SwapId, now: DateTime<Utc>) -> Result<Terms> {
        self.swaps.get(swap_id)?;
        let mut terms = self
            .terms
            .current_for_swap(swap_id)
            .ok_or(SwapError::Internal(format!("swap {swap_id} has no terms")))?;
        if terms.status.is_open() && terms.is_expired(now) {
            terms.status = TermsStatus::Expired;
            self.terms.update(terms.clone());
            self.record(
                swap_id,
                Actor::System,
                EventPayload::TermsExpired {
                    terms: terms.id,
                    version: terms.version,
                },
                now,
            );
        }
        Ok(terms)
    }

    /// Counter the current terms with a new version.
    ///
    /// # Errors
    /// Version cap, self-counter, expiry, and state violations reject
    /// before any mutation.
    pub fn counter_terms(
        &mut self,
        user: UserId,
        swap_id: SwapId,
        offer: TermsOffer,
        now: DateTime<Utc>,
    ) -> Result<Terms> {
        let swap = self.swaps.get(swap_id)?;
        if swap.status != SwapStatus::Offered {
            return Err(SwapError::InvalidState {
                operation: "counter_terms",
                actual: swap.status,
            });
        }
        if !swap.is_participant(user) {
            return Err(SwapError::NotParticipant {
                swap: swap_id,
                user,
            });
        }
        let mut current = self.current_terms(swap_id, now)?;
        let version_count = self.terms.version_count(swap_id);
        let countered = self
            .negotiator
            .counter(&current, user, version_count, offer, now)?;

        current.status = TermsStatus::Countered;
        self.terms.update(current.clone());
        self.terms.insert(countered.clone());

        self.record(
            swap_id,
            Actor::Participant(user),
            EventPayload::TermsCountered {
                superseded: current.id,
                terms: countered.id,
                version: countered.version,
            },
            now,
        );
        if let Some(other) = swap.other_participant(user) {
            self.notify(other, &EventPayload::TermsCountered {
                superseded: current.id,
                terms: countered.id,
                version: countered.version,
            });
        }
        Ok(countered)
    }

    /// Accept the current terms. The single trigger that activates the
    /// swap: locks collateral per the agreed penalty mode, opens the chat
    /// conversation, and moves the swap to `AcceptedPendingFee`.
    ///
    /// Re-accepting already-accepted terms is a no-op.
    ///
    /// # Errors
    /// Rejects before any mutation on state, authorization, expiry, or
    /// insufficient collateral.
    pub fn accept_terms(&mut self, user: UserId, swap_id: SwapId, now: DateTime<Utc>) -> Result<Swap> {
        let mut swap = self.swaps.get(swap_id)?;
        let mut terms = self.current_terms(swap_id, now)?;

        // Idempotent retry of an already-applied accept.
        if terms.status == TermsStatus::Accepted
            && swap.status != SwapStatus::Offered
        {
            return Ok(swap);
        }
        if swap.status != SwapStatus::Offered {
            return Err(SwapError::InvalidState {
                operation: "accept_terms",
                actual: swap.status,
            });
        }
        if !swap.is_participant(user) {
            return Err(SwapError::NotParticipant {
                swap: swap_id,
                user,
            });
        }
        let Some(counterparty) = swap.counterparty else {
            return Err(SwapError::InvalidState {
                operation: "accept_terms",
                actual: swap.status,
            });
        };
        self.negotiator.validate_actionable(&terms, user, now)?;

        // Compute the lock-set: each paying side stakes against the bill
        // it is obligated to pay.
        let initiator_bill = self.bills.get(swap.initiator_bill)?;
        let mut hold_specs: Vec<(UserId, i64)> = Vec::new();
        match swap.swap_type {
            SwapType::TwoSided => {
                let counterparty_bill = self.bills.get(swap.counterparty_bill.ok_or(
                    SwapError::InvalidBill {
                        reason: "two-sided swap missing counterparty bill".to_string(),
                    },
                )?)?;
                hold_specs.push((swap.initiator, lock_points_for(counterparty_bill.amount_minor)));
                hold_specs.push((counterparty, lock_points_for(initiator_bill.amount_minor)));
            }
            SwapType::OneSidedAssist => {
                hold_specs.push((counterparty, lock_points_for(initiator_bill.amount_minor)));
            }
        }

        let use_stake = terms.fallback_penalty == FallbackPenalty::CreditForfeit;
        if !use_stake {
            // Validate every lock before placing any — all-or-nothing.
            for (holder, points) in &hold_specs {
                let available = self.collateral.entry(*holder).available();
                if available < *points {
                    return Err(SwapError::InsufficientCollateral {
                        needed: *points,
                        available,
                    });
                }
            }
        }

        // All checks passed — mutate.
        let mut holds = Vec::new();
        for (holder, amount) in hold_specs {
            if use_stake {
                self.collateral.stake(holder, amount);
                holds.push(CollateralHold {
                    user: holder,
                    points: 0,
                    staked: amount,
                });
            } else {
                self.collateral.lock(holder, amount)?;
                holds.push(CollateralHold {
                    user: holder,
                    points: amount,
                    staked: 0,
                });
            }
        }
        self.holds.insert(swap_id, holds.clone());

        terms.status = TermsStatus::Accepted;
        self.terms.update(terms.clone());

        swap.status = SwapStatus::AcceptedPendingFee;
        swap.initiator_fee = FeeState::unpaid(terms.initiator_fee_minor);
        swap.counterparty_fee = FeeState::unpaid(terms.counterparty_fee_minor);
        let swap = self.swaps.commit(swap, now)?;

        self.record(
            swap_id,
            Actor::Participant(user),
            EventPayload::TermsAccepted {
                terms: terms.id,
                version: terms.version,
            },
            now,
        );
        for hold in &holds {
            self.record(
                swap_id,
                Actor::System,
                EventPayload::CollateralLocked {
                    user: hold.user,
                    points: hold.points,
                    staked: hold.staked,
                },
                now,
            );
        }

        // Secondary effects — logged, never rolled back.
        if let Err(e) = self
            .chat
            .open_conversation(swap.initiator, counterparty, swap_id)
        {
            tracing::warn!(swap = %swap_id, error = %e, "Chat open failed");
        }
        for (payer, fee) in [
            (swap.initiator, swap.initiator_fee),
            (counterparty, swap.counterparty_fee),
        ] {
            if fee.amount_minor > 0 {
                if let Err(e) = self.fees.request_fee(swap_id, payer, fee.amount_minor) {
                    tracing::warn!(swap = %swap_id, user = %payer, error = %e, "Fee request failed");
                }
            }
        }
        if let Some(other) = swap.other_participant(user) {
            self.notify(other, &EventPayload::TermsAccepted {
                terms: terms.id,
                version: terms.version,
            });
        }
        tracing::info!(swap = %swap_id, by = %user, "Terms accepted, swap active");
        Ok(swap)
    }

    /// Reject the current terms. The swap stays `Offered`; the initiator
    /// may cancel or the offer expires.
    ///
    /// # Errors
    /// Self-reject, expiry, and state violations reject before mutation.
    pub fn reject_terms(&mut self, user: UserId, swap_id: SwapId, now: DateTime<Utc>) -> Result<Terms> {
        let swap = self.swaps.get(swap_id)?;
        if swap.status != SwapStatus::Offered {
            return Err(SwapError::InvalidState {
                operation: "reject_terms",
                actual: swap.status,
            });
        }
        if !swap.is_participant(user) {
            return Err(SwapError::NotParticipant {
                swap: swap_id,
                user,
            });
        }
        let mut terms = self.current_terms(swap_id, now)?;
        self.negotiator.validate_actionable(&terms, user, now)?;

        terms.status = TermsStatus::Rejected;
        self.terms.update(terms.clone());
        self.record(
            swap_id,
            Actor::Participant(user),
            EventPayload::TermsRejected {
                terms: terms.id,
                version: terms.version,
            },
            now,
        );
        self.notify(terms.proposer, &EventPayload::TermsRejected {
            terms: terms.id,
            version: terms.version,
        });
        Ok(terms)
    }

    // =======================================================================
    // Fees
    // =======================================================================

    /// React to the payment collaborator's fee-paid signal. The final
    /// required payment atomically locks the swap and starts the proof
    /// window. Re-delivery for an already-paid side is a no-op.
    ///
    /// # Errors
    /// `NotParticipant` / `InvalidState` violations reject before mutation.
    pub fn mark_fee_paid(&mut self, user: UserId, swap_id: SwapId, now: DateTime<Utc>) -> Result<Swap> {
        let mut swap = self.swaps.get(swap_id)?;
        let Some(side) = swap.side_of(user) else {
            return Err(SwapError::NotParticipant {
                swap: swap_id,
                user,
            });
        };

        let fee = match side {
            SwapSide::Initiator => &swap.initiator_fee,
            SwapSide::Counterparty => &swap.counterparty_fee,
        };
        if fee.paid {
            return Ok(swap); // duplicate signal
        }
        if swap.status != SwapStatus::AcceptedPendingFee {
            return Err(SwapError::InvalidState {
                operation: "mark_fee_paid",
                actual: swap.status,
            });
        }

        let amount = fee.amount_minor;
        match side {
            SwapSide::Initiator => swap.initiator_fee.paid = true,
            SwapSide::Counterparty => swap.counterparty_fee.paid = true,
        }

        let mut locked = false;
        if swap.fees_settled() {
            let window_hours = self
                .terms
                .current_for_swap(swap_id)
                .map_or(self.config.proof_window_hours, |t| t.proof_window_hours);
            swap.status = SwapStatus::Locked;
            swap.proof_deadline = Some(now + chrono::Duration::hours(window_hours));
            locked = true;
        }
        let swap = self.swaps.commit(swap, now)?;

        self.record(
            swap_id,
            Actor::Participant(user),
            EventPayload::FeePaid {
                user,
                amount_minor: amount,
            },
            now,
        );
        if locked {
            let deadline = swap.proof_deadline.unwrap_or(now);
            self.record(
                swap_id,
                Actor::System,
                EventPayload::SwapLocked {
                    proof_deadline: deadline,
                },
                now,
            );
            for participant in swap.participants() {
                self.notify(participant, &EventPayload::SwapLocked {
                    proof_deadline: deadline,
                });
            }
            tracing::info!(swap = %swap_id, %deadline, "All fees paid, swap locked");
        }
        Ok(swap)
    }

    // =======================================================================
    // Proofs
    // =======================================================================

    /// Submit proof of paying the counterparty's bill. The first proof
    /// moves the swap from `Locked` to `AwaitingProof`.
    ///
    /// # Errors
    /// Duplicate submissions, resubmission-cap, window, and state
    /// violations reject before mutation.
    pub fn submit_proof(
        &mut self,
        user: UserId,
        swap_id: SwapId,
        kind: ProofKind,
        url: &str,
        now: DateTime<Utc>,
    ) -> Result<Proof> {
        let mut swap = self.swaps.get(swap_id)?;
        if !swap.is_participant(user) {
            return Err(SwapError::NotParticipant {
                swap: swap_id,
                user,
            });
        }
        if !swap.status.accepts_proofs() {
            return Err(SwapError::InvalidState {
                operation: "submit_proof",
                actual: swap.status,
            });
        }
        if let Some(deadline) = swap.proof_deadline {
            if now > deadline {
                return Err(SwapError::ProofWindowClosed { deadline });
            }
        }
        if swap.swap_type == SwapType::OneSidedAssist && user == swap.initiator {
            return Err(SwapError::Unauthorized {
                reason: "the assisted side does not submit proof".to_string(),
            });
        }

        let existing = self.proofs.for_swap(swap_id);
        let mine: Vec<&Proof> = existing.iter().filter(|p| p.submitter == user).collect();
        if mine.iter().any(|p| p.status != ProofStatus::Rejected) {
            return Err(SwapError::DuplicateProof {
                swap: swap_id,
                user,
            });
        }
        let rejected_count = u8::try_from(mine.len()).unwrap_or(u8::MAX);
        if rejected_count > self.config.max_proof_resubmissions {
            return Err(SwapError::ResubmissionCapReached {
                cap: self.config.max_proof_resubmissions,
            });
        }

        let proof = Proof {
            id: ProofId::new(),
            swap: swap_id,
            submitter: user,
            kind,
            url: url.to_string(),
            status: ProofStatus::Pending,
            review_deadline: now + self.config.review_window(),
            resubmission_count: rejected_count,
            submitted_at: now,
            reviewed_at: None,
        };
        if swap.status == SwapStatus::Locked {
            swap.status = SwapStatus::AwaitingProof;
            self.swaps.commit(swap.clone(), now)?;
        }
        self.proofs.insert(proof.clone());

        self.record(
            swap_id,
            Actor::Participant(user),
            EventPayload::ProofSubmitted {
                proof: proof.id,
                submitter: user,
                kind,
            },
            now,
        );
        if let Some(other) = swap.other_participant(user) {
            self.notify(other, &EventPayload::ProofSubmitted {
                proof: proof.id,
                submitter: user,
                kind,
            });
        }
        Ok(proof)
    }

    /// Approve a pending proof. Approving an already-accepted proof is a
    /// no-op. Completion is re-evaluated afterwards.
    ///
    /// # Errors
    /// Self-review and state violations reject before mutation.
    pub fn approve_proof(
        &mut self,
        reviewer: UserId,
        proof_id: ProofId,
        now: DateTime<Utc>,
    ) -> Result<Swap> {
        let mut proof = self.proofs.get(proof_id)?;
        let swap = self.swaps.get(proof.swap)?;

        if proof.status.counts_as_accepted() {
            return Ok(swap); // duplicate approval
        }
        self.validate_review(&swap, &proof, reviewer)?;

        proof.status = ProofStatus::Accepted;
        proof.reviewed_at = Some(now);
        self.proofs.update(proof.clone());

        self.record(
            swap.id,
            Actor::Participant(reviewer),
            EventPayload::ProofAccepted {
                proof: proof_id,
                reviewer,
            },
            now,
        );
        self.notify(proof.submitter, &EventPayload::ProofAccepted {
            proof: proof_id,
            reviewer,
        });

        match self.check_completion(swap.id, now)? {
            Some(completed) => Ok(completed),
            None => self.swaps.get(swap.id),
        }
    }

    /// Reject a pending proof. The submitter may resubmit up to the cap.
    ///
    /// # Errors
    /// Self-review and state violations reject before mutation.
    pub fn reject_proof(
        &mut self,
        reviewer: UserId,
        proof_id: ProofId,
        now: DateTime<Utc>,
    ) -> Result<Proof> {
        let mut proof = self.proofs.get(proof_id)?;
        let swap = self.swaps.get(proof.swap)?;
        self.validate_review(&swap, &proof, reviewer)?;

        proof.status = ProofStatus::Rejected;
        proof.reviewed_at = Some(now);
        self.proofs.update(proof.clone());

        self.record(
            swap.id,
            Actor::Participant(reviewer),
            EventPayload::ProofRejected {
                proof: proof_id,
                reviewer,
            },
            now,
        );
        self.notify(proof.submitter, &EventPayload::ProofRejected {
            proof: proof_id,
            reviewer,
        });
        Ok(proof)
    }

    fn validate_review(&self, swap: &Swap, proof: &Proof, reviewer: UserId) -> Result<()> {
        if !swap.is_participant(reviewer) {
            return Err(SwapError::NotParticipant {
                swap: swap.id,
                user: reviewer,
            });
        }
        if proof.submitter == reviewer {
            return Err(SwapError::OwnProofReview(proof.id));
        }
        if proof.status != ProofStatus::Pending {
            return Err(SwapError::ProofNotReviewable {
                proof: proof.id,
                actual: proof.status,
            });
        }
        if swap.status != SwapStatus::AwaitingProof {
            return Err(SwapError::InvalidState {
                operation: "review_proof",
                actual: swap.status,
            });
        }
        Ok(())
    }

    // =======================================================================
    // Extensions
    // =======================================================================

    /// Request one extension of the proof deadline.
    ///
    /// # Errors
    /// One request per user per swap; bounded extra time; proof phase only.
    pub fn request_extension(
        &mut self,
        user: UserId,
        swap_id: SwapId,
        extra_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<ExtensionRequest> {
        let swap = self.swaps.get(swap_id)?;
        if !swap.is_participant(user) {
            return Err(SwapError::NotParticipant {
                swap: swap_id,
                user,
            });
        }
        if !swap.status.accepts_proofs() {
            return Err(SwapError::InvalidState {
                operation: "request_extension",
                actual: swap.status,
            });
        }
        if extra_hours <= 0 || extra_hours > self.config.max_extension_hours {
            return Err(SwapError::ExtensionTooLong {
                requested_hours: extra_hours,
                max_hours: self.config.max_extension_hours,
            });
        }
        if swap.deadline_extended || self.extensions.has_requested(swap_id, user) {
            return Err(SwapError::ExtensionAlreadyRequested {
                swap: swap_id,
                user,
            });
        }

        let request = ExtensionRequest {
            id: ExtensionId::new(),
            swap: swap_id,
            requester: user,
            extra_hours,
            status: ExtensionStatus::Pending,
            respond_by: now + self.config.extension_response_window(),
            requested_at: now,
            responded_at: None,
        };
        self.extensions.insert(request.clone());

        self.record(
            swap_id,
            Actor::Participant(user),
            EventPayload::ExtensionRequested {
                request: request.id,
                requester: user,
                extra_hours,
            },
            now,
        );
        if let Some(other) = swap.other_participant(user) {
            self.notify(other, &EventPayload::ExtensionRequested {
                request: request.id,
                requester: user,
                extra_hours,
            });
        }
        Ok(request)
    }

    /// Grant or decline a pending extension request. Granting pushes the
    /// proof deadline out, once per swap.
    ///
    /// # Errors
    /// Only the other participant may respond, and only while pending.
    pub fn respond_extension(
        &mut self,
        user: UserId,
        request_id: ExtensionId,
        grant: bool,
        now: DateTime<Utc>,
    ) -> Result<ExtensionRequest> {
        let mut request = self.extensions.get(request_id)?;
        let mut swap = self.swaps.get(request.swap)?;

        if !swap.is_participant(user) {
            return Err(SwapError::NotParticipant {
                swap: swap.id,
                user,
            });
        }
        if user == request.requester {
            return Err(SwapError::Unauthorized {
                reason: "requester cannot respond to their own extension request".to_string(),
            });
        }
        if request.status != ExtensionStatus::Pending || now > request.respond_by {
            return Err(SwapError::ExtensionNotPending(request_id));
        }

        if grant {
            let Some(deadline) = swap.proof_deadline else {
                return Err(SwapError::InvalidState {
                    operation: "respond_extension",
                    actual: swap.status,
                });
            };
            let new_deadline = deadline + chrono::Duration::hours(request.extra_hours);
            swap.proof_deadline = Some(new_deadline);
            swap.deadline_extended = true;
            self.swaps.commit(swap, now)?;

            request.status = ExtensionStatus::Granted;
            request.responded_at = Some(now);
            self.extensions.update(request.clone());

            self.record(
                request.swap,
                Actor::Participant(user),
                EventPayload::ExtensionGranted {
                    request: request_id,
                    new_deadline,
                },
                now,
            );
            self.notify(request.requester, &EventPayload::ExtensionGranted {
                request: request_id,
                new_deadline,
            });
        } else {
            request.status = ExtensionStatus::Declined;
            request.responded_at = Some(now);
            self.extensions.update(request.clone());

            self.record(
                request.swap,
                Actor::Participant(user),
                EventPayload::ExtensionDeclined {
                    request: request_id,
                },
                now,
            );
            self.notify(request.requester, &EventPayload::ExtensionDeclined {
                request: request_id,
            });
        }
        Ok(request)
    }

    // =======================================================================
    // Cancellation
    // =======================================================================

    /// Cancel a swap before the proof phase. Releases bills, reverses
    /// collateral locks, and decrements active-swap counters.
    ///
    /// # Errors
    /// `AlreadyTerminal` / `InvalidState` outside the cancellable window.
    pub fn cancel_swap(&mut self, user: UserId, swap_id: SwapId, now: DateTime<Utc>) -> Result<Swap> {
        let mut swap = self.swaps.get(swap_id)?;
        if !swap.is_participant(user) {
            return Err(SwapError::NotParticipant {
                swap: swap_id,
                user,
            });
        }
        if swap.status.is_terminal() {
            return Err(SwapError::AlreadyTerminal(swap.status));
        }
        if !swap.status.is_cancellable() {
            return Err(SwapError::InvalidState {
                operation: "cancel_swap",
                actual: swap.status,
            });
        }

        swap.status = SwapStatus::Cancelled;
        let swap = self.swaps.commit(swap, now)?;

        self.release_bills(&swap, BillStatus::Active, now);
        self.settle_holds(swap_id, None, false, now);
        for participant in swap.participants() {
            let _ = self.trust.dec_active(participant, now);
        }

        self.record(
            swap_id,
            Actor::Participant(user),
            EventPayload::SwapCancelled { by: user },
            now,
        );
        if let Some(other) = swap.other_participant(user) {
            self.notify(other, &EventPayload::SwapCancelled { by: user });
        }
        tracing::info!(swap = %swap_id, by = %user, "Swap cancelled");
        Ok(swap)
    }

    // =======================================================================
    // Queries
    // =======================================================================

    /// Fetch a swap.
    ///
    /// # Errors
    /// Returns `SwapNotFound` when absent.
    pub fn swap(&self, id: SwapId) -> Result<Swap> {
        self.swaps.get(id)
    }

    /// Fetch a bill.
    ///
    /// # Errors
    /// Returns `BillNotFound` when absent.
    pub fn bill(&self, id: BillId) -> Result<Bill> {
        self.bills.get(id)
    }

    /// Non-terminal swaps for a user, newest first.
    #[must_use]
    pub fn active_swaps(&self, user: UserId) -> Vec<Swap> {
        self.swaps.active_by_participant(user)
    }

    /// Terminal swaps for a user, newest first.
    #[must_use]
    pub fn swap_history(&self, user: UserId) -> Vec<Swap> {
        self.swaps.history_by_participant(user)
    }

    /// A user's trust profile.
    ///
    /// # Errors
    /// Returns `ProfileNotFound` for unregistered users.
    pub fn trust_profile(&self, user: UserId) -> Result<&TrustProfile> {
        self.trust.profile(user)
    }

    /// A user's collateral entry.
    #[must_use]
    pub fn collateral_entry(&self, user: UserId) -> CollateralEntry {
        self.collateral.entry(user)
    }

    /// The full event timeline for a swap.
    #[must_use]
    pub fn timeline(&self, swap: SwapId) -> Vec<&SwapEvent> {
        self.events.timeline(swap)
    }

    /// Ranked matches for one of the caller's bills.
    ///
    /// # Errors
    /// Returns ownership/lookup errors; the ranking itself cannot fail.
    pub fn find_matches(
        &self,
        user: UserId,
        bill_id: BillId,
        now: DateTime<Utc>,
    ) -> Result<Vec<MatchCandidate>> {
        let bill = self.bills.get(bill_id)?;
        if bill.owner != user {
            return Err(SwapError::BillNotOwned {
                bill: bill_id,
                user,
            });
        }
        let profile = self.trust.profile(user)?;
        let pool = self.candidate_pool(user);
        Ok(billswap_match::rank_matches(&bill, profile, &pool, now))
    }

    /// Ranked matches across every active bill of the user, deduplicated
    /// by candidate with the highest score kept.
    ///
    /// # Errors
    /// Returns `ProfileNotFound` for unregistered users.
    pub fn find_all_matches(&self, user: UserId, now: DateTime<Utc>) -> Result<Vec<MatchCandidate>> {
        let profile = self.trust.profile(user)?;
        let sources = self.bills.active_for_owner(user);
        let pool = self.candidate_pool(user);
        Ok(billswap_match::bulk_matches(&sources, profile, &pool, now))
    }

    /// Progressive-tolerance candidates for a simple 1:1 pool.
    ///
    /// # Errors
    /// Returns ownership/lookup errors.
    pub fn find_pool_matches(&self, user: UserId, bill_id: BillId) -> Result<Vec<Bill>> {
        let bill = self.bills.get(bill_id)?;
        if bill.owner != user {
            return Err(SwapError::BillNotOwned {
                bill: bill_id,
                user,
            });
        }
        let pool = self.bills.pool_excluding(user);
        Ok(billswap_match::pool_match(&bill, &pool)
            .into_iter()
            .cloned()
            .collect())
    }

    fn candidate_pool(&self, user: UserId) -> Vec<(Bill, TrustProfile)> {
        self.bills
            .pool_excluding(user)
            .into_iter()
            .filter_map(|bill| {
                let profile = self.trust.profile(bill.owner).ok()?.clone();
                Some((bill, profile))
            })
            .collect()
    }

    // =======================================================================
    // Internal transition helpers
    // =======================================================================

    /// Re-evaluate the completion requirement and complete the swap when
    /// satisfied. Called after every proof acceptance (participant or
    /// sweep). Returns the completed swap, or `None` when not yet done.
    pub(crate) fn check_completion(
        &mut self,
        swap_id: SwapId,
        now: DateTime<Utc>,
    ) -> Result<Option<Swap>> {
        let swap = self.swaps.get(swap_id)?;
        if !swap.status.accepts_proofs() {
            return Ok(None);
        }

        let accepted: HashSet<UserId> = self
            .proofs
            .for_swap(swap_id)
            .iter()
            .filter(|p| p.status.counts_as_accepted())
            .map(|p| p.submitter)
            .collect();

        let satisfied = match swap.swap_type {
            SwapType::TwoSided => accepted.len() >= 2,
            SwapType::OneSidedAssist => swap
                .counterparty
                .is_some_and(|helper| accepted.contains(&helper)),
        };
        if !satisfied {
            return Ok(None);
        }
        self.complete_swap(swap, now).map(Some)
    }

    /// Terminal completion path. The commit is the exactly-once gate: a
    /// concurrent completion attempt fails with `Conflict` before any
    /// side effect fires.
    fn complete_swap(&mut self, mut swap: Swap, now: DateTime<Utc>) -> Result<Swap> {
        swap.status = SwapStatus::Completed;
        swap.completed_at = Some(now);
        let swap = self.swaps.commit(swap, now)?;

        self.release_bills(&swap, BillStatus::PaidConfirmed, now);
        self.settle_holds(swap.id, None, true, now);

        let amount = self
            .bills
            .get(swap.initiator_bill)
            .map_or(0, |b| b.amount_minor);
        for participant in swap.participants() {
            if self.guard.mark(swap.id, participant, Outcome::Completed) {
                let award =
                    self.trust
                        .record_completion(participant, amount, swap.swap_type, now)?;
                self.record(
                    swap.id,
                    Actor::System,
                    EventPayload::TrustDeltaApplied {
                        user: participant,
                        delta: award.delta + award.milestone_bonus,
                        score_after: award.score_after,
                    },
                    now,
                );
            }
            let _ = self.trust.dec_active(participant, now);
        }

        self.record(swap.id, Actor::System, EventPayload::SwapCompleted, now);
        for participant in swap.participants() {
            self.notify(participant, &EventPayload::SwapCompleted);
        }
        tracing::info!(swap = %swap.id, "Swap completed");
        Ok(swap)
    }

    /// Terminal failure path, shared by dispute resolution and the sweep.
    /// Returns the committed swap and the points forfeited by the at-fault
    /// party (for the dispute refund).
    pub(crate) fn fail_swap(
        &mut self,
        mut swap: Swap,
        at_fault: Option<UserId>,
        no_shows: &[UserId],
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(Swap, i64)> {
        let first_failure = swap.failed_at.is_none();
        swap.status = SwapStatus::Failed;
        if first_failure {
            swap.failed_at = Some(now);
        }
        let swap = self.swaps.commit(swap, now)?;

        self.release_bills(&swap, BillStatus::Active, now);
        let forfeited = self.settle_holds(swap.id, at_fault, false, now);

        // Eligibility-lock penalty mode: the at-fault party is locked out.
        if let Some(fault) = at_fault {
            let penalty = self
                .terms
                .current_for_swap(swap.id)
                .map(|t| t.fallback_penalty);
            if penalty == Some(FallbackPenalty::EligibilityLock) {
                let until = now + chrono::Duration::hours(constants::ELIGIBILITY_LOCK_HOURS);
                let _ = self.trust.apply_eligibility_lock(fault, until, now);
            }
        }

        for participant in swap.participants() {
            let outcome = if no_shows.contains(&participant) {
                Outcome::NoShow
            } else if at_fault == Some(participant) {
                Outcome::FailedAtFault
            } else {
                Outcome::FailedNoFault
            };
            if self.guard.mark(swap.id, participant, outcome) {
                let applied = match outcome {
                    Outcome::NoShow => {
                        self.record(
                            swap.id,
                            Actor::System,
                            EventPayload::NoShowRecorded { user: participant },
                            now,
                        );
                        self.trust.record_no_show(participant, now)?
                    }
                    Outcome::FailedAtFault => self.trust.record_failure(participant, true, now)?,
                    _ => self.trust.record_failure(participant, false, now)?,
                };
                if applied.delta != 0 {
                    self.record(
                        swap.id,
                        Actor::System,
                        EventPayload::TrustDeltaApplied {
                            user: participant,
                            delta: applied.delta,
                            score_after: applied.score_after,
                        },
                        now,
                    );
                }
            }
            if first_failure {
                let _ = self.trust.dec_active(participant, now);
            }
        }

        self.record(
            swap.id,
            Actor::System,
            EventPayload::SwapFailed {
                reason: reason.to_string(),
            },
            now,
        );
        for participant in swap.participants() {
            self.notify(participant, &EventPayload::SwapFailed {
                reason: reason.to_string(),
            });
        }
        tracing::warn!(swap = %swap.id, reason, "Swap failed");
        Ok((swap, forfeited))
    }

    /// Move every still-locked bill of the swap to `to`. Bills already
    /// released by an earlier terminal pass are skipped.
    pub(crate) fn release_bills(&mut self, swap: &Swap, to: BillStatus, now: DateTime<Utc>) {
        for bill_id in swap.bills() {
            match self.bills.get(bill_id) {
                Ok(bill) if bill.status == BillStatus::LockedInSwap => {
                    if let Err(e) =
                        self.bills
                            .transition(bill_id, BillStatus::LockedInSwap, to, now)
                    {
                        tracing::error!(bill = %bill_id, error = %e, "Bill release failed");
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(bill = %bill_id, error = %e, "Bill lookup failed"),
            }
        }
    }

    /// Take the swap's collateral holds (exactly once) and settle them:
    /// the at-fault party forfeits, everyone else is released, with the
    /// completion bonus when `bonus` is set. Returns the points the
    /// at-fault party forfeited.
    pub(crate) fn settle_holds(
        &mut self,
        swap_id: SwapId,
        at_fault: Option<UserId>,
        bonus: bool,
        now: DateTime<Utc>,
    ) -> i64 {
        let Some(holds) = self.holds.remove(&swap_id) else {
            return 0;
        };
        let mut forfeited_points = 0;
        for hold in holds {
            if at_fault == Some(hold.user) {
                let points = self.collateral.forfeit(hold.user, hold.points);
                let staked = self.collateral.forfeit_stake(hold.user, hold.staked);
                forfeited_points += points;
                self.record(
                    swap_id,
                    Actor::System,
                    EventPayload::CollateralForfeited {
                        user: hold.user,
                        points,
                        staked,
                    },
                    now,
                );
            } else {
                let (points, points_bonus) = if bonus {
                    self.collateral.release_with_bonus(
                        hold.user,
                        hold.points,
                        constants::COMPLETION_BONUS_PCT,
                    )
                } else {
                    (self.collateral.release(hold.user, hold.points), 0)
                };
                let stake_pct = if bonus { constants::STAKE_BONUS_PCT } else { 0 };
                let staked = self.collateral.return_stake(hold.user, hold.staked, stake_pct);
                self.record(
                    swap_id,
                    Actor::System,
                    EventPayload::CollateralReleased {
                        user: hold.user,
                        points,
                        staked,
                        bonus: points_bonus,
                    },
                    now,
                );
            }
        }
        forfeited_points
    }

    /// Seed a trust profile directly (fixtures, data backfill).
    pub fn seed_trust(&mut self, profile: TrustProfile) {
        self.trust.seed(profile);
    }

    /// Seed a collateral entry directly (fixtures, data backfill).
    pub fn seed_collateral(&mut self, user: UserId, entry: CollateralEntry) {
        self.collateral.seed(user, entry);
    }

    /// Append to the event log; failures are logged, never propagated —
    /// a serialization failure must not wedge a committed transition.
    pub(crate) fn record(
        &mut self,
        swap: SwapId,
        actor: Actor,
        payload: EventPayload,
        now: DateTime<Utc>,
    ) {
        if let Err(e) = self.events.append(swap, actor, payload, now) {
            tracing::error!(swap = %swap, error = %e, "Event append failed");
        }
    }

    /// Fire-and-forget notification; failures are logged, never block.
    pub(crate) fn notify(&self, user: UserId, event: &EventPayload) {
        if let Err(e) = self.notifier.notify(user, event) {
            tracing::warn!(user = %user, error = %e, "Notification dispatch failed");
        }
    }
}
