//! Collateral accounting types.
//!
//! Each user has a trust-point `balance`, a `locked` portion reserved by
//! active swaps, and separately tracked `staked` credits. All three are
//! invariantly non-negative, and `locked` never exceeds `balance`.

use serde::{Deserialize, Serialize};

/// A single user's collateral entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollateralEntry {
    /// Total trust points held.
    pub balance: i64,
    /// Points currently locked by active swaps.
    pub locked: i64,
    /// Credits staked under the credit-forfeit penalty mode.
    pub staked: i64,
}

impl CollateralEntry {
    /// A zero entry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            balance: 0,
            locked: 0,
            staked: 0,
        }
    }

    /// Points available for new locks.
    #[must_use]
    pub fn available(&self) -> i64 {
        self.balance - self.locked
    }

    /// Whether the entry holds nothing at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.balance == 0 && self.locked == 0 && self.staked == 0
    }
}

impl Default for CollateralEntry {
    fn default() -> Self {
        Self::new()
    }
}
