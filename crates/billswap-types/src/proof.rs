//! Proof-of-payment types.
//!
//! Money moves off-platform; a proof is the submitted evidence that it did.
//! Reviews left pending past the review deadline are auto-accepted by the
//! scheduler sweep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProofId, SwapId, UserId};

/// The kind of evidence submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofKind {
    Screenshot,
    Receipt,
}

impl std::fmt::Display for ProofKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Screenshot => write!(f, "SCREENSHOT"),
            Self::Receipt => write!(f, "RECEIPT"),
        }
    }
}

/// Review status of a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofStatus {
    /// Awaiting counterparty review.
    Pending,
    /// Explicitly accepted by the reviewer.
    Accepted,
    /// Explicitly rejected; the submitter may resubmit up to the cap.
    Rejected,
    /// Accepted by the scheduler after the review window lapsed.
    AutoAccepted,
}

impl ProofStatus {
    /// Whether this proof counts toward swap completion.
    #[must_use]
    pub fn counts_as_accepted(self) -> bool {
        matches!(self, Self::Accepted | Self::AutoAccepted)
    }
}

impl std::fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::AutoAccepted => write!(f, "AUTO_ACCEPTED"),
        }
    }
}

/// Submitted evidence that the submitter paid the counterparty's bill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proof {
    pub id: ProofId,
    pub swap: SwapId,
    pub submitter: UserId,
    pub kind: ProofKind,
    /// Where the evidence artifact lives (upload URL).
    pub url: String,
    pub status: ProofStatus,
    /// Unreviewed proofs are auto-accepted after this instant.
    pub review_deadline: DateTime<Utc>,
    /// How many times the submitter has resubmitted after a rejection.
    pub resubmission_count: u8,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Proof {
    /// Whether the review window has lapsed as of `now`.
    #[must_use]
    pub fn review_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == ProofStatus::Pending && now > self.review_deadline
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Proof {
    pub fn dummy(swap: SwapId, submitter: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: ProofId::new(),
            swap,
            submitter,
            kind: ProofKind::Screenshot,
            url: "https://uploads.example/proof.png".to_string(),
            status: ProofStatus::Pending,
            review_deadline: now + chrono::Duration::hours(12),
            resubmission_count: 0,
            submitted_at: now,
            reviewed_at: None,
        }
    }
}
