//! Deadline scheduler — the periodic sweep.
//!
//! The sweep is the system's only source of time-driven transitions:
//! expired offers, expired terms versions, overdue proof reviews, stale
//! extension requests, and lapsed proof windows. Every application is
//! logged as a `System`-attributed event, and every swap mutation goes
//! through the same optimistic-version commit as participant actions —
//! a sweep racing a participant on the same swap loses cleanly with a
//! `Conflict` and retries on the next tick.
//!
//! Failures on individual records are logged and skipped; one poisoned
//! record never stalls the rest of the sweep.

use chrono::{DateTime, Utc};
use serde::Serialize;

use billswap_types::{
    Actor, BillStatus, EventPayload, ExtensionStatus, ProofStatus, Result, Swap, SwapStatus,
    SwapType, TermsStatus,
};

use crate::engine::SwapEngine;
use crate::ports::{ChatGateway, FeeCollector, Notifier};

/// What one sweep pass applied.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Offers expired past the accept deadline.
    pub offers_expired: usize,
    /// Terms versions flipped to `Expired`.
    pub terms_expired: usize,
    /// Pending proofs auto-accepted past the review deadline.
    pub proofs_auto_accepted: usize,
    /// Extension requests expired unanswered.
    pub extensions_expired: usize,
    /// Swaps failed past the proof deadline.
    pub swaps_failed: usize,
    /// Swaps completed as a consequence of auto-accepted proofs.
    pub swaps_completed: usize,
}

impl<N: Notifier, C: ChatGateway, F: FeeCollector> SwapEngine<N, C, F> {
    /// Run one sweep pass as of `now`.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        self.sweep_offers(now, &mut report);
        self.sweep_terms(now, &mut report);
        self.sweep_proof_reviews(now, &mut report);
        self.sweep_extensions(now, &mut report);
        self.sweep_proof_deadlines(now, &mut report);

        if report != SweepReport::default() {
            tracing::info!(
                offers_expired = report.offers_expired,
                terms_expired = report.terms_expired,
                proofs_auto_accepted = report.proofs_auto_accepted,
                extensions_expired = report.extensions_expired,
                swaps_failed = report.swaps_failed,
                swaps_completed = report.swaps_completed,
                "Sweep applied transitions"
            );
        }
        report
    }

    /// Offers past the accept deadline expire to `Cancelled` with bills
    /// released and active counters decremented.
    fn sweep_offers(&mut self, now: DateTime<Utc>, report: &mut SweepReport) {
        for swap in self.swaps.in_status(SwapStatus::Offered) {
            if now <= swap.accept_deadline {
                continue;
            }
            if let Err(e) = self.expire_offer(swap, now) {
                tracing::warn!(error = %e, "Offer expiry skipped");
                continue;
            }
            report.offers_expired += 1;
        }
    }

    fn expire_offer(&mut self, mut swap: Swap, now: DateTime<Utc>) -> Result<()> {
        swap.status = SwapStatus::Cancelled;
        let swap = self.swaps.commit(swap, now)?;

        self.release_bills(&swap, BillStatus::Active, now);
        for participant in swap.participants() {
            let _ = self.trust.dec_active(participant, now);
        }
        self.record(swap.id, Actor::System, EventPayload::OfferExpired, now);
        self.notify(swap.initiator, &EventPayload::OfferExpired);
        Ok(())
    }

    /// Open terms versions past expiry flip to `Expired`.
    fn sweep_terms(&mut self, now: DateTime<Utc>, report: &mut SweepReport) {
        for mut terms in self.terms.open_terms() {
            if !terms.is_expired(now) {
                continue;
            }
            terms.status = TermsStatus::Expired;
            self.terms.update(terms.clone());
            self.record(
                terms.swap,
                Actor::System,
                EventPayload::TermsExpired {
                    terms: terms.id,
                    version: terms.version,
                },
                now,
            );
            report.terms_expired += 1;
        }
    }

    /// Pending proofs past the review deadline are auto-accepted, then
    /// completion is re-evaluated for their swaps.
    fn sweep_proof_reviews(&mut self, now: DateTime<Utc>, report: &mut SweepReport) {
        for mut proof in self.proofs.pending() {
            if !proof.review_overdue(now) {
                continue;
            }
            proof.status = ProofStatus::AutoAccepted;
            proof.reviewed_at = Some(now);
            self.proofs.update(proof.clone());
            self.record(
                proof.swap,
                Actor::System,
                EventPayload::ProofAutoAccepted { proof: proof.id },
                now,
            );
            report.proofs_auto_accepted += 1;

            match self.check_completion(proof.swap, now) {
                Ok(Some(_)) => report.swaps_completed += 1,
                Ok(None) => {}
                Err(e) => tracing::warn!(swap = %proof.swap, error = %e, "Completion check failed"),
            }
        }
    }

    /// Extension requests past the response window expire unanswered.
    fn sweep_extensions(&mut self, now: DateTime<Utc>, report: &mut SweepReport) {
        for mut request in self.extensions.pending() {
            if !request.response_overdue(now) {
                continue;
            }
            request.status = ExtensionStatus::Expired;
            self.extensions.update(request.clone());
            self.record(
                request.swap,
                Actor::System,
                EventPayload::ExtensionExpired {
                    request: request.id,
                },
                now,
            );
            self.notify(request.requester, &EventPayload::ExtensionExpired {
                request: request.id,
            });
            report.extensions_expired += 1;
        }
    }

    /// Swaps past the proof deadline without the required accepted proofs
    /// fail; participants who never submitted are recorded as no-shows.
    fn sweep_proof_deadlines(&mut self, now: DateTime<Utc>, report: &mut SweepReport) {
        let mut stale = self.swaps.in_status(SwapStatus::Locked);
        stale.extend(self.swaps.in_status(SwapStatus::AwaitingProof));

        for swap in stale {
            let Some(deadline) = swap.proof_deadline else {
                continue;
            };
            if now <= deadline {
                continue;
            }

            let submitters: Vec<_> = self
                .proofs
                .for_swap(swap.id)
                .iter()
                .map(|p| p.submitter)
                .collect();
            let required: Vec<_> = match swap.swap_type {
                SwapType::TwoSided => swap.participants(),
                SwapType::OneSidedAssist => swap.counterparty.into_iter().collect(),
            };
            let no_shows: Vec<_> = required
                .into_iter()
                .filter(|user| !submitters.contains(user))
                .collect();

            match self.fail_swap(swap, None, &no_shows, "proof deadline passed", now) {
                Ok(_) => report.swaps_failed += 1,
                Err(e) => tracing::warn!(error = %e, "Proof-deadline expiry skipped"),
            }
        }
    }
}
