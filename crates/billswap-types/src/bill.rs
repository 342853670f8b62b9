//! Bill types for the BillSwap marketplace.
//!
//! A bill is owned exclusively by its creator until a swap locks it.
//! Amounts are integer minor-currency units (cents) — no floating point
//! money anywhere in the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BillId, UserId};

/// The utility/expense category of a bill. Category equality feeds the
/// match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum BillCategory {
    Electric,
    Water,
    Gas,
    Internet,
    Phone,
    Rent,
    Insurance,
    Other,
}

impl std::fmt::Display for BillCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Electric => write!(f, "ELECTRIC"),
            Self::Water => write!(f, "WATER"),
            Self::Gas => write!(f, "GAS"),
            Self::Internet => write!(f, "INTERNET"),
            Self::Phone => write!(f, "PHONE"),
            Self::Rent => write!(f, "RENT"),
            Self::Insurance => write!(f, "INSURANCE"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

/// Lifecycle status of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum BillStatus {
    /// Created but not yet visible to matching.
    Draft,
    /// Visible to matching and lockable by a swap.
    Active,
    /// Locked by an active swap; exclusively reserved until the swap exits.
    LockedInSwap,
    /// The counterparty's payment was confirmed by an accepted proof.
    PaidConfirmed,
}

impl std::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "DRAFT"),
            Self::Active => write!(f, "ACTIVE"),
            Self::LockedInSwap => write!(f, "LOCKED_IN_SWAP"),
            Self::PaidConfirmed => write!(f, "PAID_CONFIRMED"),
        }
    }
}

/// A bill offered into the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub owner: UserId,
    /// Amount in minor currency units (cents).
    pub amount_minor: i64,
    pub category: BillCategory,
    /// Provider name as entered by the owner (e.g. "City Power & Light").
    pub provider: String,
    /// Bills without a due date are always timeline-compatible in matching.
    pub due_date: Option<DateTime<Utc>>,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// Whether this bill can be locked by a new swap.
    #[must_use]
    pub fn is_lockable(&self) -> bool {
        self.status == BillStatus::Active
    }

    /// Days until the due date, negative if overdue. `None` when undated.
    #[must_use]
    pub fn days_until_due(&self, now: DateTime<Utc>) -> Option<i64> {
        self.due_date.map(|due| (due - now).num_days())
    }

    /// Whether the bill is due within `days` of `now`.
    #[must_use]
    pub fn due_within(&self, now: DateTime<Utc>, days: i64) -> bool {
        self.days_until_due(now)
            .is_some_and(|d| d >= 0 && d <= days)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Bill {
    pub fn dummy(amount_minor: i64, category: BillCategory) -> Self {
        let now = Utc::now();
        Self {
            id: BillId::new(),
            owner: UserId::new(),
            amount_minor,
            category,
            provider: "Test Provider".to_string(),
            due_date: None,
            status: BillStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn dummy_for_owner(owner: UserId, amount_minor: i64, category: BillCategory) -> Self {
        let mut bill = Self::dummy(amount_minor, category);
        bill.owner = owner;
        bill
    }

    pub fn dummy_due_in(amount_minor: i64, category: BillCategory, days: i64) -> Self {
        let mut bill = Self::dummy(amount_minor, category);
        bill.due_date = Some(Utc::now() + chrono::Duration::days(days));
        bill
    }
}
