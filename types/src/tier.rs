//! Tap-tier derivation.
//!
//! The tier is a pure function of score. It is recomputed and persisted
//! after every score mutation anywhere in the system; `tap_level` is
//! derived state and must never drift from `tier_of(score)`.

use crate::constants::{BASE_TIER, TIER_TABLE};

/// Derive the tap level for a score from the fixed tier table.
pub fn tier_of(score: u64) -> u8 {
    for (threshold, level) in TIER_TABLE {
        if score >= threshold {
            return level;
        }
    }
    BASE_TIER
}
