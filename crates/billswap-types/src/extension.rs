//! Proof-deadline extension requests.
//!
//! A participant who cannot make the proof window may ask the other side
//! for more time, once per swap. Unanswered requests are expired by the
//! scheduler sweep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ExtensionId, SwapId, UserId};

/// Lifecycle status of an extension request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtensionStatus {
    Pending,
    Granted,
    Declined,
    /// The response window lapsed unanswered.
    Expired,
}

impl std::fmt::Display for ExtensionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Granted => write!(f, "GRANTED"),
            Self::Declined => write!(f, "DECLINED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// A request to extend the swap's proof deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionRequest {
    pub id: ExtensionId,
    pub swap: SwapId,
    pub requester: UserId,
    /// Extra hours requested on top of the current proof deadline.
    pub extra_hours: i64,
    pub status: ExtensionStatus,
    /// The counterparty must respond before this instant.
    pub respond_by: DateTime<Utc>,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl ExtensionRequest {
    /// Whether the response window has lapsed as of `now`.
    #[must_use]
    pub fn response_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == ExtensionStatus::Pending && now > self.respond_by
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl ExtensionRequest {
    pub fn dummy(swap: SwapId, requester: UserId, extra_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            id: ExtensionId::new(),
            swap,
            requester,
            extra_hours,
            status: ExtensionStatus::Pending,
            respond_by: now + chrono::Duration::hours(12),
            requested_at: now,
            responded_at: None,
        }
    }
}
