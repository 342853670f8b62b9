//! Eligibility gate — hard gate for swap participation.
//!
//! The gate validates every offer and accept before any state is touched.
//!
//! ## Design Principles
//!
//! - **Fail-closed**: if any check fails, the operation is rejected
//! - **No bypass**: every offer/accept path goes through the gate
//! - **Pure**: the gate reads the profile and the clock value it is given,
//!   nothing else

use chrono::{DateTime, Utc};

use billswap_types::{Result, SwapError, TrustProfile, constants};

/// Hard gate that validates participation against tier limits.
pub struct EligibilityGate {
    /// Smallest bill amount accepted into a swap.
    min_amount_minor: i64,
    /// Minimum tier ordinal for one-sided assists.
    assist_min_tier: u8,
}

impl EligibilityGate {
    /// Create a gate with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_amount_minor: constants::MIN_SWAP_AMOUNT_MINOR,
            assist_min_tier: constants::ASSIST_MIN_TIER,
        }
    }

    /// Create a gate with custom limits.
    #[must_use]
    pub fn with_limits(min_amount_minor: i64, assist_min_tier: u8) -> Self {
        Self {
            min_amount_minor,
            assist_min_tier,
        }
    }

    /// Validate a user opening or joining a swap over `amount_minor`.
    ///
    /// Checks, in order: eligibility lock, amount range against the tier
    /// cap, and the concurrent active-swap limit.
    ///
    /// # Errors
    /// Returns the specific error for the first check that fails.
    pub fn check_participation(
        &self,
        profile: &TrustProfile,
        amount_minor: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(until) = profile.locked_until {
            if until > now {
                return Err(SwapError::EligibilityLocked { until });
            }
        }

        let limits = profile.tier.limits();
        if amount_minor < self.min_amount_minor {
            return Err(SwapError::AmountOutOfRange {
                amount_minor,
                min_minor: self.min_amount_minor,
                max_minor: limits.max_amount_minor,
            });
        }
        if amount_minor > limits.max_amount_minor {
            return Err(SwapError::TierCapExceeded {
                amount_minor,
                cap_minor: limits.max_amount_minor,
            });
        }
        if profile.active_swaps >= limits.max_active_swaps {
            return Err(SwapError::MaxActiveSwaps {
                active: profile.active_swaps,
                cap: limits.max_active_swaps,
            });
        }
        Ok(())
    }

    /// Validate a user participating in a one-sided assist.
    ///
    /// # Errors
    /// Returns `AssistTierTooLow` below the minimum tier.
    pub fn check_assist(&self, profile: &TrustProfile) -> Result<()> {
        let tier = profile.tier.ordinal();
        if tier < self.assist_min_tier || !profile.tier.limits().assist_eligible {
            return Err(SwapError::AssistTierTooLow {
                tier,
                required: self.assist_min_tier,
            });
        }
        Ok(())
    }
}

impl Default for EligibilityGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use billswap_types::TrustTier;
    use chrono::Duration;

    use super::*;

    #[test]
    fn in_range_participation_passes() {
        let gate = EligibilityGate::new();
        let profile = TrustProfile::dummy_with_tier(TrustTier::Member);
        assert!(
            gate.check_participation(&profile, 10_000, Utc::now())
                .is_ok()
        );
    }

    #[test]
    fn tier_cap_rejects_large_amounts() {
        let gate = EligibilityGate::new();
        let profile = TrustProfile::dummy_with_tier(TrustTier::Newcomer);
        // Newcomer cap is $75.00.
        let err = gate
            .check_participation(&profile, 10_000, Utc::now())
            .unwrap_err();
        assert!(matches!(err, SwapError::TierCapExceeded { .. }));
    }

    #[test]
    fn tiny_amounts_rejected() {
        let gate = EligibilityGate::new();
        let profile = TrustProfile::dummy_with_tier(TrustTier::Member);
        let err = gate
            .check_participation(&profile, 50, Utc::now())
            .unwrap_err();
        assert!(matches!(err, SwapError::AmountOutOfRange { .. }));
    }

    #[test]
    fn active_swap_limit_enforced() {
        let gate = EligibilityGate::new();
        let mut profile = TrustProfile::dummy_with_tier(TrustTier::Newcomer);
        profile.active_swaps = profile.tier.limits().max_active_swaps;
        let err = gate
            .check_participation(&profile, 2_000, Utc::now())
            .unwrap_err();
        assert!(matches!(err, SwapError::MaxActiveSwaps { .. }));
    }

    #[test]
    fn eligibility_lock_blocks_everything() {
        let gate = EligibilityGate::new();
        let now = Utc::now();
        let mut profile = TrustProfile::dummy_with_tier(TrustTier::Trusted);
        profile.locked_until = Some(now + Duration::hours(6));

        let err = gate.check_participation(&profile, 2_000, now).unwrap_err();
        assert!(matches!(err, SwapError::EligibilityLocked { .. }));

        // Expired locks no longer block.
        profile.locked_until = Some(now - Duration::hours(1));
        assert!(gate.check_participation(&profile, 2_000, now).is_ok());
    }

    #[test]
    fn assist_requires_established_tier() {
        let gate = EligibilityGate::new();
        let low = TrustProfile::dummy_with_tier(TrustTier::Member);
        let err = gate.check_assist(&low).unwrap_err();
        assert!(matches!(
            err,
            SwapError::AssistTierTooLow {
                tier: 2,
                required: 3,
            }
        ));

        let established = TrustProfile::dummy_with_tier(TrustTier::Established);
        assert!(gate.check_assist(&established).is_ok());
    }

    #[test]
    fn custom_limits_respected() {
        let gate = EligibilityGate::with_limits(1_000, 5);
        let profile = TrustProfile::dummy_with_tier(TrustTier::Trusted);
        let err = gate
            .check_participation(&profile, 500, Utc::now())
            .unwrap_err();
        assert!(matches!(err, SwapError::AmountOutOfRange { .. }));
        assert!(gate.check_assist(&profile).is_err());
    }
}
