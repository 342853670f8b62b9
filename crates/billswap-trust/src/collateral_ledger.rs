//! Collateral ledger — trust-point locks and credit stakes.
//!
//! The ledger is the source of truth for the point balance and the locked
//! portion. All mutations are atomic on the balance/locked pair: either
//! the full operation succeeds or the entry is unchanged. Release and
//! forfeit floor at zero, so duplicate delivery of the same release can
//! never drive an entry negative.

use std::collections::HashMap;

use billswap_types::{CollateralEntry, Result, SwapError, UserId, constants};

/// Manages per-user collateral entries.
pub struct CollateralLedger {
    entries: HashMap<UserId, CollateralEntry>,
}

impl CollateralLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a user, granting the starting point balance. Idempotent.
    pub fn register(&mut self, user: UserId) -> &CollateralEntry {
        self.entries.entry(user).or_insert_with(|| CollateralEntry {
            balance: constants::STARTING_TRUST_POINTS,
            locked: 0,
            staked: 0,
        })
    }

    /// Current entry for a user. Zero for unregistered users.
    #[must_use]
    pub fn entry(&self, user: UserId) -> CollateralEntry {
        self.entries.get(&user).copied().unwrap_or_default()
    }

    /// Credit points to a user's balance.
    pub fn credit(&mut self, user: UserId, points: i64) {
        let entry = self.entries.entry(user).or_default();
        entry.balance += points;
    }

    /// Lock points against active collateral.
    ///
    /// # Errors
    /// Returns `InsufficientCollateral` when `available < points`.
    pub fn lock(&mut self, user: UserId, points: i64) -> Result<()> {
        let entry = self.entries.entry(user).or_default();
        if entry.available() < points {
            return Err(SwapError::InsufficientCollateral {
                needed: points,
                available: entry.available(),
            });
        }
        entry.locked += points;
        Ok(())
    }

    /// Release locked points (floored at the locked amount) without
    /// touching the balance. Returns the points actually released.
    pub fn release(&mut self, user: UserId, points: i64) -> i64 {
        let entry = self.entries.entry(user).or_default();
        let released = points.min(entry.locked);
        entry.locked -= released;
        released
    }

    /// Release locked points and credit a completion bonus on top.
    /// Returns `(released, bonus)`.
    pub fn release_with_bonus(&mut self, user: UserId, points: i64, bonus_pct: i64) -> (i64, i64) {
        let released = self.release(user, points);
        let bonus = released * bonus_pct / 100;
        if bonus > 0 {
            self.credit(user, bonus);
        }
        (released, bonus)
    }

    /// Forfeit locked points: balance and locked both decrease by the same
    /// amount, floored at zero each. Returns the points forfeited.
    pub fn forfeit(&mut self, user: UserId, points: i64) -> i64 {
        let entry = self.entries.entry(user).or_default();
        let forfeited = points.min(entry.locked).min(entry.balance);
        entry.locked -= forfeited;
        entry.balance -= forfeited;
        tracing::info!(user = %user, forfeited, "Collateral forfeited");
        forfeited
    }

    /// Stake credits under the credit-forfeit penalty mode.
    pub fn stake(&mut self, user: UserId, credits: i64) {
        let entry = self.entries.entry(user).or_default();
        entry.staked += credits;
    }

    /// Return staked credits with a success bonus. Returns the credits
    /// handed back (stake + bonus), floored at the staked amount.
    pub fn return_stake(&mut self, user: UserId, credits: i64, bonus_pct: i64) -> i64 {
        let entry = self.entries.entry(user).or_default();
        let returned = credits.min(entry.staked);
        entry.staked -= returned;
        returned + returned * bonus_pct / 100
    }

    /// Forfeit staked credits entirely. Returns the credits forfeited.
    pub fn forfeit_stake(&mut self, user: UserId, credits: i64) -> i64 {
        let entry = self.entries.entry(user).or_default();
        let forfeited = credits.min(entry.staked);
        entry.staked -= forfeited;
        tracing::info!(user = %user, forfeited, "Stake forfeited");
        forfeited
    }

    /// Seed an entry directly, replacing any existing one. Used by test
    /// fixtures and data backfill; normal flows go through `register`.
    pub fn seed(&mut self, user: UserId, entry: CollateralEntry) {
        self.entries.insert(user, entry);
    }

    /// Total points across all users (balance sum) — invariant checks.
    #[must_use]
    pub fn total_points(&self) -> i64 {
        self.entries.values().map(|e| e.balance).sum()
    }

    /// Verify `locked ≤ balance` for every entry.
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        self.entries
            .values()
            .all(|e| e.locked >= 0 && e.balance >= 0 && e.staked >= 0 && e.locked <= e.balance)
    }
}

impl Default for CollateralLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Points to lock for a bill of the given amount.
#[must_use]
pub fn lock_points_for(amount_minor: i64) -> i64 {
    (amount_minor / constants::LOCK_POINTS_DIVISOR).max(constants::MIN_LOCK_POINTS)
}
