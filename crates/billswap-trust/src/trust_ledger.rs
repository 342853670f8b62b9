//! Trust ledger — score, streak, and counter accounting.
//!
//! The ledger is the source of truth for every user's trust state. All
//! mutations are atomic read-modify-write on the profile: either the full
//! operation applies or the profile is unchanged. The tier is re-derived
//! after every mutation (pure, freely repeatable); score *deltas* are not
//! repeatable and the engine guards their delivery (see the delta guard).

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use billswap_types::{
    Result, SwapError, SwapType, TrustProfile, TrustTier, UserId, VerificationFlags, constants,
};

/// The outcome of applying a completion to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionAward {
    /// Scaled base delta applied to the score.
    pub delta: i64,
    /// One-time streak milestone bonus, zero when no milestone crossed.
    pub milestone_bonus: i64,
    /// Score after clamping.
    pub score_after: i64,
    /// Streak after the completion.
    pub streak: u32,
}

/// The outcome of applying a penalty to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyApplied {
    /// Negative delta applied to the score (zero when no fault).
    pub delta: i64,
    /// Score after clamping.
    pub score_after: i64,
}

/// Manages trust profiles with score/tier/streak accounting.
pub struct TrustLedger {
    profiles: HashMap<UserId, TrustProfile>,
}

impl TrustLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    /// Register a user, granting the starting score. Idempotent — an
    /// existing profile is left untouched.
    pub fn register(&mut self, user: UserId, now: DateTime<Utc>) -> &TrustProfile {
        self.profiles
            .entry(user)
            .or_insert_with(|| TrustProfile::new(user, now))
    }

    /// Look up a user's profile.
    ///
    /// # Errors
    /// Returns `ProfileNotFound` for unregistered users.
    pub fn profile(&self, user: UserId) -> Result<&TrustProfile> {
        self.profiles
            .get(&user)
            .ok_or(SwapError::ProfileNotFound(user))
    }

    /// Apply a completed swap: scaled positive delta, streak advance, and
    /// at most one milestone bonus per milestone crossing.
    ///
    /// # Errors
    /// Returns `ProfileNotFound` for unregistered users.
    pub fn record_completion(
        &mut self,
        user: UserId,
        amount_minor: i64,
        swap_type: SwapType,
        now: DateTime<Utc>,
    ) -> Result<CompletionAward> {
        let delta = completion_delta(amount_minor, swap_type);
        let profile = self.profile_mut(user)?;

        profile.completed_swaps += 1;
        profile.streak += 1;

        // Milestones award exactly once: `last_milestone` remembers the
        // highest one already paid out.
        let mut milestone_bonus = 0;
        for (milestone, bonus) in constants::STREAK_MILESTONES {
            if profile.streak >= milestone && profile.last_milestone < milestone {
                milestone_bonus += bonus;
                profile.last_milestone = milestone;
            }
        }

        profile.score = clamp_score(profile.score + delta + milestone_bonus);
        profile.tier = profile.derive_tier();
        profile.updated_at = now;

        let award = CompletionAward {
            delta,
            milestone_bonus,
            score_after: profile.score,
            streak: profile.streak,
        };
        tracing::debug!(
            user = %user,
            delta,
            milestone_bonus,
            score = profile.score,
            tier = %profile.tier,
            "Completion recorded"
        );
        Ok(award)
    }

    /// Apply a failed swap. The score penalty lands only on the at-fault
    /// side; the streak resets for both.
    ///
    /// # Errors
    /// Returns `ProfileNotFound` for unregistered users.
    pub fn record_failure(
        &mut self,
        user: UserId,
        at_fault: bool,
        now: DateTime<Utc>,
    ) -> Result<PenaltyApplied> {
        let profile = self.profile_mut(user)?;
        profile.failed_swaps += 1;
        profile.streak = 0;

        let delta = if at_fault {
            constants::DELTA_FAILED_AT_FAULT
        } else {
            0
        };
        profile.score = clamp_score(profile.score + delta);
        profile.tier = profile.derive_tier();
        profile.updated_at = now;

        Ok(PenaltyApplied {
            delta,
            score_after: profile.score,
        })
    }

    /// Apply a no-show: streak reset, counter increment, and the no-show
    /// penalty — prior score is not forgiven.
    ///
    /// # Errors
    /// Returns `ProfileNotFound` for unregistered users.
    pub fn record_no_show(&mut self, user: UserId, now: DateTime<Utc>) -> Result<PenaltyApplied> {
        let profile = self.profile_mut(user)?;
        profile.no_show_count += 1;
        profile.streak = 0;
        profile.score = clamp_score(profile.score + constants::DELTA_NO_SHOW);
        profile.tier = profile.derive_tier();
        profile.updated_at = now;

        Ok(PenaltyApplied {
            delta: constants::DELTA_NO_SHOW,
            score_after: profile.score,
        })
    }

    /// Count a dispute against both parties' records.
    ///
    /// # Errors
    /// Returns `ProfileNotFound` for unregistered users.
    pub fn record_dispute(&mut self, user: UserId, now: DateTime<Utc>) -> Result<()> {
        let profile = self.profile_mut(user)?;
        profile.disputed_swaps += 1;
        profile.updated_at = now;
        Ok(())
    }

    /// Push fresh verification flags, granting each one-time bonus when a
    /// flag flips on. Flags never flip back off through this path.
    ///
    /// # Errors
    /// Returns `ProfileNotFound` for unregistered users.
    pub fn set_verification(
        &mut self,
        user: UserId,
        flags: VerificationFlags,
        now: DateTime<Utc>,
    ) -> Result<TrustTier> {
        let profile = self.profile_mut(user)?;
        let mut bonus = 0;
        if flags.id_verified && !profile.verification.id_verified {
            profile.verification.id_verified = true;
            bonus += constants::BONUS_ID_VERIFIED;
        }
        if flags.bank_linked && !profile.verification.bank_linked {
            profile.verification.bank_linked = true;
            bonus += constants::BONUS_BANK_LINKED;
        }
        if flags.work_email_verified && !profile.verification.work_email_verified {
            profile.verification.work_email_verified = true;
            bonus += constants::BONUS_WORK_EMAIL;
        }
        profile.score = clamp_score(profile.score + bonus);
        profile.tier = profile.derive_tier();
        profile.updated_at = now;
        Ok(profile.tier)
    }

    /// Increment the active-swap count.
    ///
    /// # Errors
    /// Returns `ProfileNotFound` for unregistered users.
    pub fn inc_active(&mut self, user: UserId, now: DateTime<Utc>) -> Result<u32> {
        let profile = self.profile_mut(user)?;
        profile.active_swaps += 1;
        profile.updated_at = now;
        Ok(profile.active_swaps)
    }

    /// Decrement the active-swap count, floored at zero.
    ///
    /// # Errors
    /// Returns `ProfileNotFound` for unregistered users.
    pub fn dec_active(&mut self, user: UserId, now: DateTime<Utc>) -> Result<u32> {
        let profile = self.profile_mut(user)?;
        profile.active_swaps = profile.active_swaps.saturating_sub(1);
        profile.updated_at = now;
        Ok(profile.active_swaps)
    }

    /// Apply an eligibility lock until the given instant.
    ///
    /// # Errors
    /// Returns `ProfileNotFound` for unregistered users.
    pub fn apply_eligibility_lock(
        &mut self,
        user: UserId,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let profile = self.profile_mut(user)?;
        profile.locked_until = Some(until);
        profile.updated_at = now;
        tracing::info!(user = %user, until = %until, "Eligibility lock applied");
        Ok(())
    }

    /// Seed a profile directly, replacing any existing one. Used by test
    /// fixtures and data backfill; normal flows go through `register`.
    pub fn seed(&mut self, profile: TrustProfile) {
        self.profiles.insert(profile.user, profile);
    }

    /// Number of registered profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether no profiles are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    fn profile_mut(&mut self, user: UserId) -> Result<&mut TrustProfile> {
        self.profiles
            .get_mut(&user)
            .ok_or(SwapError::ProfileNotFound(user))
    }
}

impl Default for TrustLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Scaled completion delta: base, amount multiplier, assist halving.
#[must_use]
pub fn completion_delta(amount_minor: i64, swap_type: SwapType) -> i64 {
    let mut delta = constants::DELTA_COMPLETED;
    if amount_minor >= constants::AMOUNT_SCALE_DOUBLE_MINOR {
        delta *= 2;
    } else if amount_minor >= constants::AMOUNT_SCALE_HALF_EXTRA_MINOR {
        delta = delta * 3 / 2;
    }
    if swap_type == SwapType::OneSidedAssist {
        delta /= 2;
    }
    delta
}

fn clamp_score(score: i64) -> i64 {
    score.clamp(0, constants::MAX_TRUST_SCORE)
}
