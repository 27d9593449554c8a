//! JSON payloads exchanged with the mini-app client.
//!
//! Field names (including the lone camelCase `walletAddress`) match the
//! wire format the existing frontend already consumes.

use serde::{Deserialize, Serialize};

use crate::ledger::{UserId, UserLedger};
use crate::task::{TaskDefinition, TaskId};

/// Full per-user state returned by most player endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDataResponse {
    pub score: u64,
    #[serde(rename = "walletAddress")]
    pub wallet_address: Option<String>,
    pub game_sessions: u32,
    pub max_sessions: u32,
    pub tap_level: u8,
    pub username: Option<String>,
    pub claimable_rewards: u64,
    pub referral_code: String,
}

impl UserDataResponse {
    /// Snapshot a ledger, reporting `claimable` as display-only state.
    pub fn from_ledger(user: &UserLedger, max_sessions: u32, claimable: u64) -> Self {
        Self {
            score: user.score,
            wallet_address: user.wallet_address.clone(),
            game_sessions: user.game_sessions,
            max_sessions,
            tap_level: user.tap_level,
            username: user.username.clone(),
            claimable_rewards: claimable,
            referral_code: user.referral_code.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub taps: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResultRequest {
    pub points_earned: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResultResponse {
    pub status: String,
    pub new_score: u64,
    pub sessions_left: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSaveRequest {
    pub wallet_address: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub username: Option<String>,
    pub score: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub top_users: Vec<LeaderboardEntry>,
    pub current_user_rank: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    pub points: u64,
    pub link: String,
    pub icon: String,
    pub completed: bool,
}

impl TaskResponse {
    pub fn from_task(task: &TaskDefinition, completed: bool) -> Self {
        Self {
            id: task.id,
            name: task.name.clone(),
            description: task.description.clone(),
            points: task.points,
            link: task.link.clone(),
            icon: task.icon.clone(),
            completed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendResponse {
    pub username: Option<String>,
    pub score: u64,
}

/// Admin view of a user row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUserRow {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: String,
    pub score: u64,
    pub tap_level: u8,
    pub game_sessions: u32,
    pub referred_by_id: Option<UserId>,
}

impl AdminUserRow {
    pub fn from_ledger(user: &UserLedger) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            score: user.score,
            tap_level: user.tap_level,
            game_sessions: user.game_sessions,
            referred_by_id: user.referred_by_id,
        }
    }
}
