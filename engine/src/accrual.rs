//! Passive score accrual.
//!
//! A user farms `farming_rate` points per hour of wall-clock time. The
//! accrued value is display-only until an explicit claim folds it into
//! `score` and restarts the accrual window. Sub-point progress below the
//! truncation boundary is lost at each claim; a zero-value claim is a
//! no-op precisely so that unlucky timing does not reset the window.

use tapfarm_types::constants::SECS_PER_HOUR;
use tapfarm_types::UserLedger;

/// Points accrued since `last_claim_time`, floored to whole points.
/// Clock skew (now before the last claim) reads as zero.
pub fn claimable_rewards(farming_rate: u64, last_claim_time: u64, now: u64) -> u64 {
    let elapsed = now.saturating_sub(last_claim_time);
    elapsed.saturating_mul(farming_rate) / SECS_PER_HOUR
}

/// Fold pending accrual into the ledger. Returns the amount claimed; on a
/// zero claim the ledger (including `last_claim_time`) is untouched.
pub fn fold_claim(user: &mut UserLedger, now: u64) -> u64 {
    let claimable = claimable_rewards(user.farming_rate, user.last_claim_time, now);
    if claimable == 0 {
        return 0;
    }
    user.add_score(claimable);
    user.last_claim_time = now;
    claimable
}
