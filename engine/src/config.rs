use tapfarm_types::constants::{
    DEFAULT_FARMING_RATE, LEADERBOARD_SIZE, MAX_SESSIONS, MAX_TAPS_PER_SYNC, REFERRAL_BONUS,
    SESSION_RECHARGE_SECS,
};

/// Immutable engine constants, fixed at construction.
///
/// Production uses [`EngineConfig::default`]; tests may substitute
/// alternate values to exercise the math deterministically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_sessions: u32,
    pub session_recharge_secs: u64,
    pub default_farming_rate: u64,
    pub referral_bonus: u64,
    pub max_taps_per_sync: u32,
    pub leaderboard_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_sessions: MAX_SESSIONS,
            session_recharge_secs: SESSION_RECHARGE_SECS,
            default_farming_rate: DEFAULT_FARMING_RATE,
            referral_bonus: REFERRAL_BONUS,
            max_taps_per_sync: MAX_TAPS_PER_SYNC,
            leaderboard_size: LEADERBOARD_SIZE,
        }
    }
}
