//! Audit-trail event types.
//!
//! Every lifecycle transition appends one [`SwapEvent`] with a closed,
//! typed payload variant and a SHA-256 hash of the serialized payload.
//! The log is the dispute evidence trail and the client timeline source;
//! it never drives decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    BillId, DisputeId, DisputeReason, EventId, ExtensionId, ProofId, ProofKind, Result, SwapId,
    SwapType, TermsId, UserId,
};

/// Who triggered a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user", rename_all = "snake_case")]
pub enum Actor {
    /// A participant-driven action.
    Participant(UserId),
    /// A scheduler- or arbiter-driven action.
    System,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Participant(user) => write!(f, "user:{user}"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Closed set of typed event payloads. The `type` discriminant is stable;
/// consumers decode exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    OfferCreated {
        swap_type: SwapType,
        bill: BillId,
        amount_minor: i64,
    },
    OfferAccepted {
        counterparty: UserId,
        counterparty_bill: Option<BillId>,
    },
    OfferExpired,
    TermsProposed {
        terms: TermsId,
        version: u8,
    },
    TermsCountered {
        superseded: TermsId,
        terms: TermsId,
        version: u8,
    },
    TermsAccepted {
        terms: TermsId,
        version: u8,
    },
    TermsRejected {
        terms: TermsId,
        version: u8,
    },
    TermsExpired {
        terms: TermsId,
        version: u8,
    },
    CollateralLocked {
        user: UserId,
        points: i64,
        staked: i64,
    },
    CollateralReleased {
        user: UserId,
        points: i64,
        staked: i64,
        bonus: i64,
    },
    CollateralForfeited {
        user: UserId,
        points: i64,
        staked: i64,
    },
    FeePaid {
        user: UserId,
        amount_minor: i64,
    },
    SwapLocked {
        proof_deadline: DateTime<Utc>,
    },
    ProofSubmitted {
        proof: ProofId,
        submitter: UserId,
        kind: ProofKind,
    },
    ProofAccepted {
        proof: ProofId,
        reviewer: UserId,
    },
    ProofAutoAccepted {
        proof: ProofId,
    },
    ProofRejected {
        proof: ProofId,
        reviewer: UserId,
    },
    ExtensionRequested {
        request: ExtensionId,
        requester: UserId,
        extra_hours: i64,
    },
    ExtensionGranted {
        request: ExtensionId,
        new_deadline: DateTime<Utc>,
    },
    ExtensionDeclined {
        request: ExtensionId,
    },
    ExtensionExpired {
        request: ExtensionId,
    },
    TrustDeltaApplied {
        user: UserId,
        delta: i64,
        score_after: i64,
    },
    NoShowRecorded {
        user: UserId,
    },
    SwapCompleted,
    SwapFailed {
        reason: String,
    },
    SwapCancelled {
        by: UserId,
    },
    DisputeFiled {
        dispute: DisputeId,
        reporter: UserId,
        reason: DisputeReason,
    },
    DisputeInvestigating {
        dispute: DisputeId,
    },
    DisputeResolved {
        dispute: DisputeId,
        at_fault: Option<UserId>,
    },
    DisputeRefunded {
        user: UserId,
        points: i64,
    },
    DisputeDismissed {
        dispute: DisputeId,
    },
}

impl EventPayload {
    /// Stable discriminant name for logs and filtering.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OfferCreated { .. } => "offer_created",
            Self::OfferAccepted { .. } => "offer_accepted",
            Self::OfferExpired => "offer_expired",
            Self::TermsProposed { .. } => "terms_proposed",
            Self::TermsCountered { .. } => "terms_countered",
            Self::TermsAccepted { .. } => "terms_accepted",
            Self::TermsRejected { .. } => "terms_rejected",
            Self::TermsExpired { .. } => "terms_expired",
            Self::CollateralLocked { .. } => "collateral_locked",
            Self::CollateralReleased { .. } => "collateral_released",
            Self::CollateralForfeited { .. } => "collateral_forfeited",
            Self::FeePaid { .. } => "fee_paid",
            Self::SwapLocked { .. } => "swap_locked",
            Self::ProofSubmitted { .. } => "proof_submitted",
            Self::ProofAccepted { .. } => "proof_accepted",
            Self::ProofAutoAccepted { .. } => "proof_auto_accepted",
            Self::ProofRejected { .. } => "proof_rejected",
            Self::ExtensionRequested { .. } => "extension_requested",
            Self::ExtensionGranted { .. } => "extension_granted",
            Self::ExtensionDeclined { .. } => "extension_declined",
            Self::ExtensionExpired { .. } => "extension_expired",
            Self::TrustDeltaApplied { .. } => "trust_delta_applied",
            Self::NoShowRecorded { .. } => "no_show_recorded",
            Self::SwapCompleted => "swap_completed",
            Self::SwapFailed { .. } => "swap_failed",
            Self::SwapCancelled { .. } => "swap_cancelled",
            Self::DisputeFiled { .. } => "dispute_filed",
            Self::DisputeInvestigating { .. } => "dispute_investigating",
            Self::DisputeResolved { .. } => "dispute_resolved",
            Self::DisputeRefunded { .. } => "dispute_refunded",
            Self::DisputeDismissed { .. } => "dispute_dismissed",
        }
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapEvent {
    pub id: EventId,
    pub swap: SwapId,
    pub actor: Actor,
    pub payload: EventPayload,
    /// SHA-256 over the canonical JSON serialization of `payload`.
    pub payload_hash: [u8; 32],
    pub recorded_at: DateTime<Utc>,
}

impl SwapEvent {
    /// Build an event, computing the payload hash.
    pub fn record(
        swap: SwapId,
        actor: Actor,
        payload: EventPayload,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let bytes = serde_json::to_vec(&payload)?;
        let mut hasher = Sha256::new();
        hasher.update(b"billswap:event:v1:");
        hasher.update(&bytes);
        Ok(Self {
            id: EventId::new(),
            swap,
            actor,
            payload,
            payload_hash: hasher.finalize().into(),
            recorded_at: now,
        })
    }

    /// Hex rendering of the payload hash for logs and timelines.
    #[must_use]
    pub fn payload_hash_hex(&self) -> String {
        hex::encode(self.payload_hash)
    }

    /// Recompute the hash and compare against the stored one.
    #[must_use]
    pub fn verify_hash(&self) -> bool {
        let Ok(bytes) = serde_json::to_vec(&self.payload) else {
            return false;
        };
        let mut hasher = Sha256::new();
        hasher.update(b"billswap:event:v1:");
        hasher.update(&bytes);
        let hash: [u8; 32] = hasher.finalize().into();
        hash == self.payload_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_hash_verifies() {
        let event = SwapEvent::record(
            SwapId::new(),
            Actor::System,
            EventPayload::SwapCompleted,
            Utc::now(),
        )
        .unwrap();
        assert!(event.verify_hash());
        assert_eq!(event.payload_hash_hex().len(), 64);
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let mut event = SwapEvent::record(
            SwapId::new(),
            Actor::System,
            EventPayload::SwapFailed {
                reason: "proof deadline passed".to_string(),
            },
            Utc::now(),
        )
        .unwrap();
        event.payload = EventPayload::SwapCompleted;
        assert!(!event.verify_hash());
    }

    #[test]
    fn payload_tag_is_stable() {
        let payload = EventPayload::FeePaid {
            user: UserId::new(),
            amount_minor: 99,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"type\":\"fee_paid\""), "Got: {json}");
        assert_eq!(payload.kind(), "fee_paid");
    }

    #[test]
    fn payload_decodes_exhaustively() {
        let payload = EventPayload::DisputeResolved {
            dispute: DisputeId::new(),
            at_fault: Some(UserId::new()),
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: EventPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, back);
    }

    #[test]
    fn actor_display() {
        assert_eq!(format!("{}", Actor::System), "system");
        let user = UserId::new();
        assert!(format!("{}", Actor::Participant(user)).starts_with("user:"));
    }

    #[test]
    fn event_serde_roundtrip() {
        let event = SwapEvent::record(
            SwapId::new(),
            Actor::Participant(UserId::new()),
            EventPayload::OfferExpired,
            Utc::now(),
        )
        .unwrap();
        let json = serde_json::to_string(&event).unwrap();
        let back: SwapEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event.id, back.id);
        assert_eq!(event.payload_hash, back.payload_hash);
        assert!(back.verify_hash());
    }
}
