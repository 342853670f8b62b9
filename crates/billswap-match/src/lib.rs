//! # billswap-match
//!
//! **Pure matching engine**: compatibility scoring, ranked matching, and
//! progressive-tolerance pool matching for bills. Zero side effects — no
//! store access, no clock reads (callers pass `now`), fully deterministic
//! given the same inputs.
//!
//! ```text
//! rank_matches(source, profile, pool, now) -> Vec<MatchCandidate>
//! ```
//!
//! The ranked engine filters, scores, and returns the top candidates above
//! the floor; the tolerance matcher serves simple 1:1 pools with widening
//! amount bands.

pub mod matcher;
pub mod score;
pub mod tolerance;

pub use matcher::{MatchCandidate, bulk_matches, rank_matches};
pub use score::{MatchReason, MatchScore, compatibility};
pub use tolerance::{candidates_at_band, pool_match};
