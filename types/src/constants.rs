/// Maximum game sessions a user can hold.
pub const MAX_SESSIONS: u32 = 10;

/// Seconds to recharge one game session.
pub const SESSION_RECHARGE_SECS: u64 = 600;

/// Default passive farming rate in points per hour.
pub const DEFAULT_FARMING_RATE: u64 = 100;

/// Seconds per hour, the farming-rate denominator.
pub const SECS_PER_HOUR: u64 = 3_600;

/// One-time bonus credited to a referrer when a new account links to them.
pub const REFERRAL_BONUS: u64 = 10_000;

/// Upper bound on taps accepted in a single batched sync.
pub const MAX_TAPS_PER_SYNC: u32 = 10_000;

/// Wallet address length bounds (placeholder format check only).
pub const WALLET_ADDRESS_MIN_LEN: usize = 32;
pub const WALLET_ADDRESS_MAX_LEN: usize = 44;

/// Number of entries returned by the leaderboard.
pub const LEADERBOARD_SIZE: usize = 10;

/// Tap-tier table: score thresholds paired with the level they unlock,
/// highest first. Every tier lookup goes through this table; no call site
/// may set a level directly.
pub const TIER_TABLE: [(u64, u8); 4] = [(5_000, 10), (1_000, 5), (300, 3), (100, 2)];

/// Level held below the lowest threshold.
pub const BASE_TIER: u8 = 1;
