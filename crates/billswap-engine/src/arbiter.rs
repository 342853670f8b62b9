//! Dispute arbitration.
//!
//! Filing freezes the swap; from `Disputed`, only the transitions in this
//! module apply. Resolution is administrative: it assigns fault (or none),
//! applies the asymmetric trust penalty, partially refunds the non-faulty
//! party out of the forfeited points, and always terminates the swap to
//! `Failed` — or dismissal returns it to where it was disputed from.

use chrono::{DateTime, Utc};

use billswap_types::{
    Actor, Dispute, DisputeId, DisputeReason, DisputeStatus, EventPayload, Result, Swap, SwapError,
    SwapId, SwapStatus, UserId, constants,
};

use crate::engine::SwapEngine;
use crate::guard::Outcome;
use crate::ports::{ChatGateway, FeeCollector, Notifier};

impl<N: Notifier, C: ChatGateway, F: FeeCollector> SwapEngine<N, C, F> {
    /// File a dispute. Eligible while the swap is `AwaitingProof`, or
    /// within the filing window after it failed.
    ///
    /// # Errors
    /// Participant-only; one active dispute per swap; window enforced.
    pub fn raise_dispute(
        &mut self,
        reporter: UserId,
        swap_id: SwapId,
        reason: DisputeReason,
        now: DateTime<Utc>,
    ) -> Result<Dispute> {
        let mut swap = self.swaps.get(swap_id)?;
        if !swap.is_participant(reporter) {
            return Err(SwapError::NotParticipant {
                swap: swap_id,
                user: reporter,
            });
        }
        let Some(reported) = swap.other_participant(reporter) else {
            return Err(SwapError::InvalidState {
                operation: "raise_dispute",
                actual: swap.status,
            });
        };
        match swap.status {
            SwapStatus::AwaitingProof => {}
            SwapStatus::Failed => {
                let deadline = swap
                    .failed_at
                    .map(|at| at + self.config.dispute_window())
                    .unwrap_or(now);
                if now > deadline {
                    return Err(SwapError::DisputeWindowClosed { deadline });
                }
            }
            other => {
                return Err(SwapError::InvalidState {
                    operation: "raise_dispute",
                    actual: other,
                });
            }
        }
        if self.disputes.active_for_swap(swap_id).is_some() {
            return Err(SwapError::InvalidState {
                operation: "raise_dispute",
                actual: SwapStatus::Disputed,
            });
        }

        // All checks passed — freeze the swap.
        swap.status = SwapStatus::Disputed;
        self.swaps.commit(swap, now)?;

        let dispute = Dispute {
            id: DisputeId::new(),
            swap: swap_id,
            reporter,
            reported,
            reason,
            status: DisputeStatus::Open,
            at_fault: None,
            resolution: None,
            filed_at: now,
            resolved_at: None,
        };
        self.disputes.insert(dispute.clone());

        self.record(
            swap_id,
            Actor::Participant(reporter),
            EventPayload::DisputeFiled {
                dispute: dispute.id,
                reporter,
                reason,
            },
            now,
        );
        self.notify(reported, &EventPayload::DisputeFiled {
            dispute: dispute.id,
            reporter,
            reason,
        });
        tracing::warn!(swap = %swap_id, dispute = %dispute.id, %reason, "Dispute filed");
        Ok(dispute)
    }

    /// Move an open dispute under administrative review.
    ///
    /// # Errors
    /// Returns `DisputeNotOpen` unless the dispute is `Open`.
    pub fn begin_investigation(
        &mut self,
        dispute_id: DisputeId,
        now: DateTime<Utc>,
    ) -> Result<Dispute> {
        let mut dispute = self.disputes.get(dispute_id)?;
        if dispute.status != DisputeStatus::Open {
            return Err(SwapError::DisputeNotOpen {
                dispute: dispute_id,
                actual: dispute.status,
            });
        }
        dispute.status = DisputeStatus::Investigating;
        self.disputes.update(dispute.clone());
        self.record(
            dispute.swap,
            Actor::System,
            EventPayload::DisputeInvestigating {
                dispute: dispute_id,
            },
            now,
        );
        Ok(dispute)
    }

    /// Resolve a dispute (administrative). Assigns fault or none, applies
    /// the asymmetric penalty, refunds the non-faulty side half of the
    /// forfeited points, and terminates the swap `Failed`.
    ///
    /// A malformed at-fault reference leaves the dispute `Investigating`
    /// and returns the error — it never silently resolves.
    ///
    /// # Errors
    /// `DisputeNotOpen` for settled disputes; `InvalidAtFault` when the
    /// referenced user is not a participant.
    pub fn resolve_dispute(
        &mut self,
        dispute_id: DisputeId,
        at_fault: Option<UserId>,
        resolution: &str,
        now: DateTime<Utc>,
    ) -> Result<Swap> {
        let mut dispute = self.disputes.get(dispute_id)?;
        if !dispute.status.is_active() {
            return Err(SwapError::DisputeNotOpen {
                dispute: dispute_id,
                actual: dispute.status,
            });
        }
        let swap = self.swaps.get(dispute.swap)?;
        if swap.status != SwapStatus::Disputed {
            return Err(SwapError::InvalidState {
                operation: "resolve_dispute",
                actual: swap.status,
            });
        }
        if let Some(fault) = at_fault {
            if !swap.is_participant(fault) {
                dispute.status = DisputeStatus::Investigating;
                self.disputes.update(dispute);
                tracing::error!(
                    dispute = %dispute_id,
                    user = %fault,
                    "Resolution rejected: at-fault user is not a participant"
                );
                return Err(SwapError::InvalidAtFault {
                    swap: swap.id,
                    user: fault,
                });
            }
        }

        for participant in swap.participants() {
            self.trust.record_dispute(participant, now)?;
        }

        let (swap, forfeited) =
            self.fail_swap(swap, at_fault, &[], "dispute resolved", now)?;

        // Partial refund of the non-faulty party's sunk points, paid out
        // of the forfeiture. At-most-once under replay.
        if let Some(fault) = at_fault {
            if let Some(winner) = swap.other_participant(fault) {
                let refund = forfeited / constants::DISPUTE_REFUND_DIVISOR;
                if refund > 0 && self.guard.mark(swap.id, winner, Outcome::DisputeRefund) {
                    self.collateral.credit(winner, refund);
                    self.record(
                        swap.id,
                        Actor::System,
                        EventPayload::DisputeRefunded {
                            user: winner,
                            points: refund,
                        },
                        now,
                    );
                }
            }
        }

        dispute.status = DisputeStatus::Resolved;
        dispute.at_fault = at_fault;
        dispute.resolution = Some(resolution.to_string());
        dispute.resolved_at = Some(now);
        self.disputes.update(dispute.clone());

        self.record(
            swap.id,
            Actor::System,
            EventPayload::DisputeResolved {
                dispute: dispute_id,
                at_fault,
            },
            now,
        );
        for participant in swap.participants() {
            self.notify(participant, &EventPayload::DisputeResolved {
                dispute: dispute_id,
                at_fault,
            });
        }
        tracing::info!(
            dispute = %dispute_id,
            at_fault = ?at_fault,
            "Dispute resolved"
        );
        Ok(swap)
    }

    /// Dismiss a dispute (administrative). The swap returns to the state
    /// it was disputed from: the proof phase, or `Failed` when it had
    /// already failed.
    ///
    /// # Errors
    /// Returns `DisputeNotOpen` for settled disputes.
    pub fn dismiss_dispute(
        &mut self,
        dispute_id: DisputeId,
        resolution: &str,
        now: DateTime<Utc>,
    ) -> Result<Swap> {
        let mut dispute = self.disputes.get(dispute_id)?;
        if !dispute.status.is_active() {
            return Err(SwapError::DisputeNotOpen {
                dispute: dispute_id,
                actual: dispute.status,
            });
        }
        let mut swap = self.swaps.get(dispute.swap)?;
        if swap.status != SwapStatus::Disputed {
            return Err(SwapError::InvalidState {
                operation: "dismiss_dispute",
                actual: swap.status,
            });
        }

        swap.status = if swap.failed_at.is_some() {
            SwapStatus::Failed
        } else {
            SwapStatus::AwaitingProof
        };
        let swap = self.swaps.commit(swap, now)?;

        dispute.status = DisputeStatus::Dismissed;
        dispute.resolution = Some(resolution.to_string());
        dispute.resolved_at = Some(now);
        self.disputes.update(dispute.clone());

        self.record(
            swap.id,
            Actor::System,
            EventPayload::DisputeDismissed {
                dispute: dispute_id,
            },
            now,
        );
        self.notify(dispute.reporter, &EventPayload::DisputeDismissed {
            dispute: dispute_id,
        });
        tracing::info!(dispute = %dispute_id, "Dispute dismissed");
        Ok(swap)
    }
}
