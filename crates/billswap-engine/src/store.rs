//! In-memory repository stores.
//!
//! Persistence is an external collaborator; these stores model its
//! contract: CRUD plus *conditional* updates. Swap commits carry an
//! optimistic version check — a commit whose expected version no longer
//! matches the stored one fails with `Conflict` and applies nothing, so
//! two racing completion paths can never both land. Bill status changes
//! go through a from→to conditional transition for the same reason.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use billswap_types::{
    Bill, BillId, BillStatus, Dispute, DisputeId, ExtensionId, ExtensionRequest, ExtensionStatus,
    Proof, ProofId, ProofStatus, Result, Swap, SwapError, SwapId, SwapStatus, Terms, TermsId,
    UserId,
};

// ---------------------------------------------------------------------------
// BillStore
// ---------------------------------------------------------------------------

/// Bill repository with conditional status transitions.
#[derive(Default)]
pub struct BillStore {
    bills: HashMap<BillId, Bill>,
}

impl BillStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bill: Bill) {
        self.bills.insert(bill.id, bill);
    }

    /// Fetch a bill by id.
    ///
    /// # Errors
    /// Returns `BillNotFound` when absent.
    pub fn get(&self, id: BillId) -> Result<Bill> {
        self.bills
            .get(&id)
            .cloned()
            .ok_or(SwapError::BillNotFound(id))
    }

    /// Conditionally transition a bill's status: applies only when the
    /// stored status equals `from`.
    ///
    /// # Errors
    /// Returns `BillNotFound` or `BillNotInStatus`.
    pub fn transition(
        &mut self,
        id: BillId,
        from: BillStatus,
        to: BillStatus,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let bill = self.bills.get_mut(&id).ok_or(SwapError::BillNotFound(id))?;
        if bill.status != from {
            return Err(SwapError::BillNotInStatus {
                bill: id,
                expected: from,
                actual: bill.status,
            });
        }
        bill.status = to;
        bill.updated_at = now;
        Ok(())
    }

    /// All `Active` bills owned by `user`, newest first.
    #[must_use]
    pub fn active_for_owner(&self, user: UserId) -> Vec<Bill> {
        let mut bills: Vec<Bill> = self
            .bills
            .values()
            .filter(|b| b.owner == user && b.status == BillStatus::Active)
            .cloned()
            .collect();
        bills.sort_by(|a, b| b.id.cmp(&a.id));
        bills
    }

    /// All `Active` bills *not* owned by `user` — the candidate pool.
    #[must_use]
    pub fn pool_excluding(&self, user: UserId) -> Vec<Bill> {
        self.bills
            .values()
            .filter(|b| b.owner != user && b.status == BillStatus::Active)
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// SwapStore
// ---------------------------------------------------------------------------

/// Swap repository with optimistic-version commits.
#[derive(Default)]
pub struct SwapStore {
    swaps: HashMap<SwapId, Swap>,
}

impl SwapStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, swap: Swap) {
        self.swaps.insert(swap.id, swap);
    }

    /// Fetch a swap by id.
    ///
    /// # Errors
    /// Returns `SwapNotFound` when absent.
    pub fn get(&self, id: SwapId) -> Result<Swap> {
        self.swaps
            .get(&id)
            .cloned()
            .ok_or(SwapError::SwapNotFound(id))
    }

    /// Commit a mutated swap copy. Succeeds only when the stored version
    /// still equals the copy's version; the committed record gets its
    /// version bumped. Returns the stored copy.
    ///
    /// # Errors
    /// Returns `Conflict` on version mismatch, `SwapNotFound` when absent.
    pub fn commit(&mut self, mut swap: Swap, now: DateTime<Utc>) -> Result<Swap> {
        let stored = self
            .swaps
            .get_mut(&swap.id)
            .ok_or(SwapError::SwapNotFound(swap.id))?;
        if stored.version != swap.version {
            return Err(SwapError::Conflict {
                swap: swap.id,
                expected: swap.version,
                actual: stored.version,
            });
        }
        swap.version += 1;
        swap.updated_at = now;
        *stored = swap.clone();
        Ok(swap)
    }

    /// Every swap `user` participates in, newest first.
    #[must_use]
    pub fn by_participant(&self, user: UserId) -> Vec<Swap> {
        let mut swaps: Vec<Swap> = self
            .swaps
            .values()
            .filter(|s| s.is_participant(user))
            .cloned()
            .collect();
        swaps.sort_by(|a, b| b.id.cmp(&a.id));
        swaps
    }

    /// Non-terminal swaps for `user`, newest first.
    #[must_use]
    pub fn active_by_participant(&self, user: UserId) -> Vec<Swap> {
        self.by_participant(user)
            .into_iter()
            .filter(|s| !s.status.is_terminal())
            .collect()
    }

    /// Terminal swaps for `user`, newest first.
    #[must_use]
    pub fn history_by_participant(&self, user: UserId) -> Vec<Swap> {
        self.by_participant(user)
            .into_iter()
            .filter(|s| s.status.is_terminal())
            .collect()
    }

    /// All swaps currently in `status`.
    #[must_use]
    pub fn in_status(&self, status: SwapStatus) -> Vec<Swap> {
        self.swaps
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// TermsStore
// ---------------------------------------------------------------------------

/// Terms repository. Records are immutable apart from their status.
#[derive(Default)]
pub struct TermsStore {
    terms: HashMap<TermsId, Terms>,
    by_swap: HashMap<SwapId, Vec<TermsId>>,
}

impl TermsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, terms: Terms) {
        self.by_swap.entry(terms.swap).or_default().push(terms.id);
        self.terms.insert(terms.id, terms);
    }

    /// Fetch a terms record by id.
    ///
    /// # Errors
    /// Returns `TermsNotFound` when absent.
    pub fn get(&self, id: TermsId) -> Result<Terms> {
        self.terms
            .get(&id)
            .cloned()
            .ok_or(SwapError::TermsNotFound(id))
    }

    /// Overwrite a stored record (status flips only).
    pub fn update(&mut self, terms: Terms) {
        self.terms.insert(terms.id, terms);
    }

    /// The highest-version terms record for a swap.
    #[must_use]
    pub fn current_for_swap(&self, swap: SwapId) -> Option<Terms> {
        self.by_swap
            .get(&swap)?
            .iter()
            .filter_map(|id| self.terms.get(id))
            .max_by_key(|t| t.version)
            .cloned()
    }

    /// Number of versions recorded for a swap.
    #[must_use]
    pub fn version_count(&self, swap: SwapId) -> u8 {
        u8::try_from(self.by_swap.get(&swap).map_or(0, Vec::len)).unwrap_or(u8::MAX)
    }

    /// All open (proposed) terms, for the sweep.
    #[must_use]
    pub fn open_terms(&self) -> Vec<Terms> {
        self.terms
            .values()
            .filter(|t| t.status.is_open())
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ProofStore
// ---------------------------------------------------------------------------

/// Proof repository.
#[derive(Default)]
pub struct ProofStore {
    proofs: HashMap<ProofId, Proof>,
    by_swap: HashMap<SwapId, Vec<ProofId>>,
}

impl ProofStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, proof: Proof) {
        self.by_swap.entry(proof.swap).or_default().push(proof.id);
        self.proofs.insert(proof.id, proof);
    }

    /// Fetch a proof by id.
    ///
    /// # Errors
    /// Returns `ProofNotFound` when absent.
    pub fn get(&self, id: ProofId) -> Result<Proof> {
        self.proofs
            .get(&id)
            .cloned()
            .ok_or(SwapError::ProofNotFound(id))
    }

    pub fn update(&mut self, proof: Proof) {
        self.proofs.insert(proof.id, proof);
    }

    /// All proofs for a swap, submission order.
    #[must_use]
    pub fn for_swap(&self, swap: SwapId) -> Vec<Proof> {
        self.by_swap
            .get(&swap)
            .map(|ids| ids.iter().filter_map(|id| self.proofs.get(id)).cloned().collect())
            .unwrap_or_default()
    }

    /// Every pending proof, for the sweep.
    #[must_use]
    pub fn pending(&self) -> Vec<Proof> {
        self.proofs
            .values()
            .filter(|p| p.status == ProofStatus::Pending)
            .cloned()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// DisputeStore
// ---------------------------------------------------------------------------

/// Dispute repository.
#[derive(Default)]
pub struct DisputeStore {
    disputes: HashMap<DisputeId, Dispute>,
    by_swap: HashMap<SwapId, Vec<DisputeId>>,
}

impl DisputeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dispute: Dispute) {
        self.by_swap
            .entry(dispute.swap)
            .or_default()
            .push(dispute.id);
        self.disputes.insert(dispute.id, dispute);
    }

    /// Fetch a dispute by id.
    ///
    /// # Errors
    /// Returns `DisputeNotFound` when absent.
    pub fn get(&self, id: DisputeId) -> Result<Dispute> {
        self.disputes
            .get(&id)
            .cloned()
            .ok_or(SwapError::DisputeNotFound(id))
    }

    pub fn update(&mut self, dispute: Dispute) {
        self.disputes.insert(dispute.id, dispute);
    }

    /// The active (open/investigating) dispute on a swap, if any.
    #[must_use]
    pub fn active_for_swap(&self, swap: SwapId) -> Option<Dispute> {
        self.by_swap
            .get(&swap)?
            .iter()
            .filter_map(|id| self.disputes.get(id))
            .find(|d| d.status.is_active())
            .cloned()
    }
}

// ---------------------------------------------------------------------------
// ExtensionStore
// ---------------------------------------------------------------------------

/// Extension-request repository.
#[derive(Default)]
pub struct ExtensionStore {
    requests: HashMap<ExtensionId, ExtensionRequest>,
    by_swap: HashMap<SwapId, Vec<ExtensionId>>,
}

impl ExtensionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, request: ExtensionRequest) {
        self.by_swap
            .entry(request.swap)
            .or_default()
            .push(request.id);
        self.requests.insert(request.id, request);
    }

    /// Fetch a request by id.
    ///
    /// # Errors
    /// Returns `ExtensionNotFound` when absent.
    pub fn get(&self, id: ExtensionId) -> Result<ExtensionRequest> {
        self.requests
            .get(&id)
            .cloned()
            .ok_or(SwapError::ExtensionNotFound(id))
    }

    pub fn update(&mut self, request: ExtensionRequest) {
        self.requests.insert(request.id, request);
    }

    /// Whether `user` has ever requested an extension on this swap.
    #[must_use]
    pub fn has_requested(&self, swap: SwapId, user: UserId) -> bool {
        self.by_swap
            .get(&swap)
            .is_some_and(|ids| {
                ids.iter()
                    .filter_map(|id| self.requests.get(id))
                    .any(|r| r.requester == user)
            })
    }

    /// Every pending request, for the sweep.
    #[must_use]
    pub fn pending(&self) -> Vec<ExtensionRequest> {
        self.requests
            .values()
            .filter(|r| r.status == ExtensionStatus::Pending)
            .cloned()
            .collect()
    }
}
