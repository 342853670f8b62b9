//! Trust profile and tier types.
//!
//! The tier is never stored authoritatively — it is re-derived from the
//! profile after every mutation via [`TrustProfile::derive_tier`], a pure
//! function, so recomputation is always safe. Score *deltas* are not pure
//! and are guarded elsewhere (see the engine's idempotency guard).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{UserId, constants};

/// Boolean verification signals consumed from the identity collaborator.
/// Never computed internally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFlags {
    pub id_verified: bool,
    pub bank_linked: bool,
    pub work_email_verified: bool,
}

/// Ordinal trust tier. Gates swap size, concurrency, and assist access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum TrustTier {
    Restricted = 0,
    Newcomer = 1,
    Member = 2,
    Established = 3,
    Trusted = 4,
    Elite = 5,
}

impl TrustTier {
    /// The tier's ordinal rank.
    #[must_use]
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_ordinal(ordinal: u8) -> Self {
        match ordinal {
            0 => Self::Restricted,
            1 => Self::Newcomer,
            2 => Self::Member,
            3 => Self::Established,
            4 => Self::Trusted,
            _ => Self::Elite,
        }
    }

    /// Per-tier activity limits.
    #[must_use]
    pub fn limits(self) -> TierLimits {
        match self {
            Self::Restricted => TierLimits {
                max_amount_minor: 2_500,
                max_active_swaps: 1,
                assist_eligible: false,
            },
            Self::Newcomer => TierLimits {
                max_amount_minor: 7_500,
                max_active_swaps: 2,
                assist_eligible: false,
            },
            Self::Member => TierLimits {
                max_amount_minor: 15_000,
                max_active_swaps: 3,
                assist_eligible: false,
            },
            Self::Established => TierLimits {
                max_amount_minor: 30_000,
                max_active_swaps: 5,
                assist_eligible: true,
            },
            Self::Trusted => TierLimits {
                max_amount_minor: 60_000,
                max_active_swaps: 8,
                assist_eligible: true,
            },
            Self::Elite => TierLimits {
                max_amount_minor: 100_000,
                max_active_swaps: 12,
                assist_eligible: true,
            },
        }
    }
}

impl std::fmt::Display for TrustTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restricted => write!(f, "RESTRICTED"),
            Self::Newcomer => write!(f, "NEWCOMER"),
            Self::Member => write!(f, "MEMBER"),
            Self::Established => write!(f, "ESTABLISHED"),
            Self::Trusted => write!(f, "TRUSTED"),
            Self::Elite => write!(f, "ELITE"),
        }
    }
}

/// Activity limits unlocked (or imposed) by a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Maximum bill amount per swap, minor units.
    pub max_amount_minor: i64,
    /// Maximum concurrent active swaps.
    pub max_active_swaps: u32,
    /// Whether the user may participate in one-sided assists.
    pub assist_eligible: bool,
}

/// Per-user trust state: score, tier, counters, streaks, verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustProfile {
    pub user: UserId,
    /// Bounded to `[0, MAX_TRUST_SCORE]`.
    pub score: i64,
    pub tier: TrustTier,
    pub completed_swaps: u32,
    pub failed_swaps: u32,
    pub disputed_swaps: u32,
    pub no_show_count: u32,
    /// Consecutive completions since the last failure or no-show.
    pub streak: u32,
    /// Highest streak milestone already awarded; guards double-award.
    pub last_milestone: u32,
    pub active_swaps: u32,
    pub verification: VerificationFlags,
    /// While set and in the future, the user cannot open new swaps.
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrustProfile {
    /// A fresh profile with the starting score.
    #[must_use]
    pub fn new(user: UserId, now: DateTime<Utc>) -> Self {
        let mut profile = Self {
            user,
            score: constants::STARTING_TRUST_SCORE,
            tier: TrustTier::Restricted,
            completed_swaps: 0,
            failed_swaps: 0,
            disputed_swaps: 0,
            no_show_count: 0,
            streak: 0,
            last_milestone: 0,
            active_swaps: 0,
            verification: VerificationFlags::default(),
            locked_until: None,
            created_at: now,
            updated_at: now,
        };
        profile.tier = profile.derive_tier();
        profile
    }

    /// Pure tier derivation from score, verification, and history.
    ///
    /// Score bands set the base tier; ID verification is required above
    /// `Member`, and `Elite` additionally requires a completion record.
    #[must_use]
    pub fn derive_tier(&self) -> TrustTier {
        let base = match self.score {
            s if s < 100 => 0,
            s if s < 250 => 1,
            s if s < 450 => 2,
            s if s < 650 => 3,
            s if s < 850 => 4,
            _ => 5,
        };
        let mut ordinal = base;
        if ordinal > 2 && !self.verification.id_verified {
            ordinal = 2;
        }
        if ordinal == 5 && self.completed_swaps < constants::TOP_TIER_MIN_COMPLETED {
            ordinal = 4;
        }
        TrustTier::from_ordinal(ordinal)
    }

    /// Completed / (completed + failed + no-show), in percent. 100 for a
    /// blank history.
    #[must_use]
    pub fn success_rate_pct(&self) -> u32 {
        let total = self.completed_swaps + self.failed_swaps + self.no_show_count;
        if total == 0 {
            return 100;
        }
        self.completed_swaps * 100 / total
    }

    /// Whether the user is under an eligibility lock as of `now`.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl TrustProfile {
    pub fn dummy() -> Self {
        Self::new(UserId::new(), Utc::now())
    }

    /// A profile shaped to reach the given tier.
    pub fn dummy_with_tier(tier: TrustTier) -> Self {
        let mut profile = Self::dummy();
        profile.score = match tier {
            TrustTier::Restricted => 50,
            TrustTier::Newcomer => 150,
            TrustTier::Member => 300,
            TrustTier::Established => 500,
            TrustTier::Trusted => 700,
            TrustTier::Elite => 900,
        };
        profile.verification.id_verified = tier.ordinal() > 2;
        profile.completed_swaps = if tier == TrustTier::Elite { 30 } else { 0 };
        profile.tier = profile.derive_tier();
        profile
    }
}
