//! Progressive-tolerance matching for 1:1 bill pools.
//!
//! A simpler matcher than the ranked engine: amount-tolerance bands widen
//! progressively (±5%, ±10%, ±15%) and the walk stops at the first band
//! that yields at least one candidate. When both bills carry due dates a
//! symmetric ±14 day window also applies; a bill without a due date is
//! always timeline-compatible.
//!
//! Property: a wider band can never return fewer candidates than a
//! narrower one over the same pool — each band's predicate is a strict
//! relaxation of the previous band's.

use billswap_types::{Bill, BillStatus, constants};

/// Find candidates for `source` at the narrowest non-empty tolerance band.
///
/// Returns an empty vector when every band comes up empty.
#[must_use]
pub fn pool_match<'a>(source: &Bill, pool: &'a [Bill]) -> Vec<&'a Bill> {
    for band_pct in constants::TOLERANCE_BANDS_PCT {
        let hits = candidates_at_band(source, pool, band_pct);
        if !hits.is_empty() {
            tracing::debug!(
                source = %source.id,
                band_pct,
                hits = hits.len(),
                "Pool match found at tolerance band"
            );
            return hits;
        }
    }
    Vec::new()
}

/// All candidates within one amount band, due-window filtered.
#[must_use]
pub fn candidates_at_band<'a>(source: &Bill, pool: &'a [Bill], band_pct: i64) -> Vec<&'a Bill> {
    pool.iter()
        .filter(|candidate| {
            candidate.owner != source.owner
                && candidate.status == BillStatus::Active
                && within_amount_band(source.amount_minor, candidate.amount_minor, band_pct)
                && timeline_compatible(source, candidate)
        })
        .collect()
}

fn within_amount_band(source_minor: i64, candidate_minor: i64, band_pct: i64) -> bool {
    let delta = (source_minor - candidate_minor).abs();
    // Δ ≤ source × band% , evaluated in integer math.
    delta * 100 <= source_minor * band_pct
}

/// Bills without a due date are always timeline-compatible.
fn timeline_compatible(source: &Bill, candidate: &Bill) -> bool {
    match (source.due_date, candidate.due_date) {
        (Some(a), Some(b)) => (a - b).num_days().abs() <= constants::POOL_DUE_WINDOW_DAYS,
        _ => true,
    }
}
