use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use uuid::Uuid;

use crate::constants::{
    DEFAULT_FARMING_RATE, MAX_SESSIONS, WALLET_ADDRESS_MAX_LEN, WALLET_ADDRESS_MIN_LEN,
};
use crate::tier::tier_of;

/// Stable identifier supplied by the identity provider (Telegram user id).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum LedgerInvariantError {
    #[error("game_sessions above cap (got={got}, max={max})")]
    SessionsAboveCap { got: u32, max: u32 },
    #[error("tap_level drifted from score (level={level}, derived={derived})")]
    TierDrift { level: u8, derived: u8 },
    #[error("wallet_address length out of range (len={len})")]
    WalletLengthOutOfRange { len: usize },
}

/// One mutable counter row per external identity.
///
/// `tap_level` is derived from `score`; all score mutations go through
/// [`UserLedger::add_score`] so the two can never diverge. Timestamps are
/// unix seconds, UTC.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLedger {
    pub id: UserId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub score: u64,
    pub wallet_address: Option<String>,
    pub game_sessions: u32,
    pub last_session_recharge: u64,
    pub tap_level: u8,
    pub farming_rate: u64,
    pub last_claim_time: u64,
    pub referral_code: String,
    pub referred_by_id: Option<UserId>,
}

impl UserLedger {
    /// Fresh ledger for a first-contact user: zero score, full sessions,
    /// both accrual clocks started at `now`.
    pub fn new(id: UserId, first_name: String, now: u64) -> Self {
        Self {
            id,
            first_name,
            last_name: None,
            username: None,
            score: 0,
            wallet_address: None,
            game_sessions: MAX_SESSIONS,
            last_session_recharge: now,
            tap_level: tier_of(0),
            farming_rate: DEFAULT_FARMING_RATE,
            last_claim_time: now,
            referral_code: Uuid::new_v4().to_string(),
            referred_by_id: None,
        }
    }

    /// Add points and recompute the derived tier in the same step.
    pub fn add_score(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
        self.tap_level = tier_of(self.score);
    }

    /// Spend one game session if any remain. Returns whether a session
    /// was consumed.
    pub fn try_spend_session(&mut self) -> bool {
        if self.game_sessions == 0 {
            return false;
        }
        self.game_sessions -= 1;
        true
    }

    pub fn validate_invariants(&self) -> Result<(), LedgerInvariantError> {
        if self.game_sessions > MAX_SESSIONS {
            return Err(LedgerInvariantError::SessionsAboveCap {
                got: self.game_sessions,
                max: MAX_SESSIONS,
            });
        }
        let derived = tier_of(self.score);
        if self.tap_level != derived {
            return Err(LedgerInvariantError::TierDrift {
                level: self.tap_level,
                derived,
            });
        }
        if let Some(wallet) = &self.wallet_address {
            if wallet.len() < WALLET_ADDRESS_MIN_LEN || wallet.len() > WALLET_ADDRESS_MAX_LEN {
                return Err(LedgerInvariantError::WalletLengthOutOfRange { len: wallet.len() });
            }
        }
        Ok(())
    }

    /// Name shown on leaderboards and friend lists: username when set,
    /// first name otherwise.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.first_name)
    }
}
