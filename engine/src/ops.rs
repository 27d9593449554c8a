//! Engine operations.
//!
//! Each operation is a single atomic read-modify-write against one user's
//! ledger row: read current state with its version, compute new state with
//! the pure accrual/recharge/tier functions, commit the guarded batch. The
//! math itself never retries; this layer retries the whole read-modify-
//! write exactly once when a concurrent writer raced the row, then
//! surfaces `Conflict`.

use tracing::{debug, info, warn};

use tapfarm_types::constants::{WALLET_ADDRESS_MAX_LEN, WALLET_ADDRESS_MIN_LEN};
use tapfarm_types::{NewTask, TaskDefinition, TaskId, TelegramIdentity, UserId, UserLedger};

use crate::accrual::{claimable_rewards, fold_claim};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::recharge::recharge_sessions;
use crate::store::{Mutation, Store, Versioned};

/// A ledger plus the display-only pending accrual.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserSnapshot {
    pub user: UserLedger,
    pub claimable_rewards: u64,
}

/// Result of spending a session on the strict single-session path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameOutcome {
    pub new_score: u64,
    pub sessions_left: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaderboard {
    pub top: Vec<UserLedger>,
    /// Caller's competition rank; `None` both when unranked and when the
    /// rank query failed (the failure is logged, not swallowed silently).
    pub caller_rank: Option<u32>,
}

/// Re-run a read-modify-write once when a concurrent writer raced it.
macro_rules! retry_on_conflict {
    ($op:expr) => {{
        match $op {
            Err(EngineError::Conflict) => {
                warn!("ledger conflict, retrying read-modify-write");
                $op
            }
            other => other,
        }
    }};
}

pub struct Engine<S, C> {
    store: S,
    clock: C,
    cfg: EngineConfig,
}

impl<S: Store, C: Clock> Engine<S, C> {
    pub fn new(store: S, clock: C, cfg: EngineConfig) -> Self {
        Self { store, clock, cfg }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Authenticated contact: lazily create the ledger (resolving any
    /// referral token exactly once, inside the creation commit), or
    /// refresh profile fields and apply session recharge. Pending accrual
    /// is reported without being folded.
    pub async fn touch_user(
        &self,
        identity: &TelegramIdentity,
    ) -> Result<UserSnapshot, EngineError> {
        retry_on_conflict!(self.try_touch_user(identity).await)
    }

    async fn try_touch_user(
        &self,
        identity: &TelegramIdentity,
    ) -> Result<UserSnapshot, EngineError> {
        let now = self.clock.now();
        let user = match self.store.get_user(identity.id).await? {
            None => self.create_user(identity, now).await?,
            Some(Versioned { row, version }) => {
                let mut user = row;
                let before = user.clone();
                if user.username != identity.username {
                    user.username = identity.username.clone();
                }
                if user.first_name != identity.first_name {
                    user.first_name = identity.first_name.clone();
                }
                if user.last_name != identity.last_name {
                    user.last_name = identity.last_name.clone();
                }
                recharge_sessions(&mut user, &self.cfg, now);
                if user != before {
                    self.store
                        .commit(vec![Mutation::UpdateUser {
                            user: user.clone(),
                            expected: version,
                        }])
                        .await?;
                }
                user
            }
        };
        let claimable = claimable_rewards(user.farming_rate, user.last_claim_time, now);
        Ok(UserSnapshot {
            user,
            claimable_rewards: claimable,
        })
    }

    /// First-contact creation. The referral token is resolved here and
    /// only here; the referrer credit and the new row land in the same
    /// commit, so a crash can never create an account whose referral was
    /// left half-applied.
    async fn create_user(
        &self,
        identity: &TelegramIdentity,
        now: u64,
    ) -> Result<UserLedger, EngineError> {
        let mut user = UserLedger::new(identity.id, identity.first_name.clone(), now);
        user.last_name = identity.last_name.clone();
        user.username = identity.username.clone();
        user.game_sessions = self.cfg.max_sessions;
        user.farming_rate = self.cfg.default_farming_rate;

        let mut mutations = Vec::new();
        if let Some(token) = &identity.referral_token {
            match self.store.get_user_by_referral_code(token).await? {
                Some(Versioned { row, version }) => {
                    user.referred_by_id = Some(row.id);
                    let mut referrer = row;
                    referrer.add_score(self.cfg.referral_bonus);
                    info!(
                        referrer = %referrer.id,
                        new_user = %user.id,
                        bonus = self.cfg.referral_bonus,
                        "referral bonus awarded"
                    );
                    mutations.push(Mutation::UpdateUser {
                        user: referrer,
                        expected: version,
                    });
                }
                None => {
                    debug!(new_user = %user.id, "referral token did not resolve");
                }
            }
        }
        mutations.push(Mutation::InsertUser(user.clone()));
        self.store.commit(mutations).await?;
        info!(user = %user.id, "created ledger on first contact");
        Ok(user)
    }

    /// Fold pending accrual into the score. A zero-value claim commits
    /// nothing and leaves the accrual window untouched.
    pub async fn claim_rewards(&self, id: UserId) -> Result<UserSnapshot, EngineError> {
        retry_on_conflict!(self.try_claim_rewards(id).await)
    }

    async fn try_claim_rewards(&self, id: UserId) -> Result<UserSnapshot, EngineError> {
        let now = self.clock.now();
        let Versioned { row, version } = self.load_user(id).await?;
        let mut user = row;
        let claimed = fold_claim(&mut user, now);
        if claimed > 0 {
            self.store
                .commit(vec![Mutation::UpdateUser {
                    user: user.clone(),
                    expected: version,
                }])
                .await?;
            debug!(user = %id, claimed, "folded passive accrual");
        }
        Ok(UserSnapshot {
            user,
            claimable_rewards: 0,
        })
    }

    /// Batched tap sync. One session is consumed when available, but an
    /// empty session pool only skips the decrement; the score award is
    /// never blocked on this path.
    pub async fn sync_taps(&self, id: UserId, taps: u32) -> Result<UserSnapshot, EngineError> {
        if taps == 0 {
            return Err(EngineError::InvalidInput("tap count must be positive".into()));
        }
        if taps > self.cfg.max_taps_per_sync {
            return Err(EngineError::InvalidInput(format!(
                "tap count {taps} exceeds per-sync bound {}",
                self.cfg.max_taps_per_sync
            )));
        }
        retry_on_conflict!(self.try_sync_taps(id, taps).await)
    }

    async fn try_sync_taps(&self, id: UserId, taps: u32) -> Result<UserSnapshot, EngineError> {
        let Versioned { row, version } = self.load_user(id).await?;
        let mut user = row;
        user.try_spend_session();
        user.add_score(u64::from(taps));
        self.store
            .commit(vec![Mutation::UpdateUser {
                user: user.clone(),
                expected: version,
            }])
            .await?;
        Ok(UserSnapshot {
            user,
            claimable_rewards: 0,
        })
    }

    /// Single-session game result. Unlike the batched path, this one
    /// enforces the spending rule strictly: no session, no award.
    pub async fn submit_game_result(
        &self,
        id: UserId,
        points: u32,
    ) -> Result<GameOutcome, EngineError> {
        retry_on_conflict!(self.try_submit_game_result(id, points).await)
    }

    async fn try_submit_game_result(
        &self,
        id: UserId,
        points: u32,
    ) -> Result<GameOutcome, EngineError> {
        let Versioned { row, version } = self.load_user(id).await?;
        let mut user = row;
        if !user.try_spend_session() {
            return Err(EngineError::InsufficientSessions);
        }
        user.add_score(u64::from(points));
        self.store
            .commit(vec![Mutation::UpdateUser {
                user: user.clone(),
                expected: version,
            }])
            .await?;
        Ok(GameOutcome {
            new_score: user.score,
            sessions_left: user.game_sessions,
        })
    }

    /// Store a wallet address after the placeholder length check.
    pub async fn save_wallet(&self, id: UserId, address: &str) -> Result<UserSnapshot, EngineError> {
        let len = address.len();
        if !(WALLET_ADDRESS_MIN_LEN..=WALLET_ADDRESS_MAX_LEN).contains(&len) {
            return Err(EngineError::InvalidInput(format!(
                "wallet address length {len} outside {WALLET_ADDRESS_MIN_LEN}..={WALLET_ADDRESS_MAX_LEN}"
            )));
        }
        retry_on_conflict!(self.try_save_wallet(id, address).await)
    }

    async fn try_save_wallet(&self, id: UserId, address: &str) -> Result<UserSnapshot, EngineError> {
        let Versioned { row, version } = self.load_user(id).await?;
        let mut user = row;
        user.wallet_address = Some(address.to_string());
        self.store
            .commit(vec![Mutation::UpdateUser {
                user: user.clone(),
                expected: version,
            }])
            .await?;
        Ok(UserSnapshot {
            user,
            claimable_rewards: 0,
        })
    }

    /// Claim a one-time task reward. The completion insert and the score
    /// credit land in one commit; the store's uniqueness constraint on the
    /// pair decides the winner of a duplicate race.
    pub async fn claim_task(
        &self,
        id: UserId,
        task_id: TaskId,
    ) -> Result<TaskDefinition, EngineError> {
        retry_on_conflict!(self.try_claim_task(id, task_id).await)
    }

    async fn try_claim_task(
        &self,
        id: UserId,
        task_id: TaskId,
    ) -> Result<TaskDefinition, EngineError> {
        let Some(task) = self.store.get_task(task_id).await? else {
            return Err(EngineError::TaskNotFound);
        };
        let Versioned { row, version } = self.load_user(id).await?;
        let mut user = row;
        user.add_score(task.points);
        self.store
            .commit(vec![
                Mutation::InsertCompletion {
                    user: id,
                    task: task_id,
                },
                Mutation::UpdateUser {
                    user,
                    expected: version,
                },
            ])
            .await?;
        info!(user = %id, task = %task_id, points = task.points, "task claimed");
        Ok(task)
    }

    /// Every task paired with whether this user has claimed it.
    pub async fn tasks_for(
        &self,
        id: UserId,
    ) -> Result<Vec<(TaskDefinition, bool)>, EngineError> {
        let tasks = self.store.list_tasks().await?;
        let completed = self.store.completions_for(id).await?;
        Ok(tasks
            .into_iter()
            .map(|task| {
                let done = completed.contains(&task.id);
                (task, done)
            })
            .collect())
    }

    /// Users referred by this user.
    pub async fn friends(&self, id: UserId) -> Result<Vec<UserLedger>, EngineError> {
        Ok(self.store.referrals_of(id).await?)
    }

    /// Top users by score plus the caller's competition rank. A failed
    /// rank query degrades to `None` with a warning; it never fails the
    /// whole leaderboard.
    pub async fn leaderboard(&self, id: UserId) -> Result<Leaderboard, EngineError> {
        let top = self.store.top_users(self.cfg.leaderboard_size).await?;
        let caller_rank = match self.store.rank_of(id).await {
            Ok(rank) => rank,
            Err(err) => {
                warn!(user = %id, error = %err, "rank unavailable, omitting from response");
                None
            }
        };
        Ok(Leaderboard { top, caller_rank })
    }

    // Admin surface.

    pub async fn list_users(&self) -> Result<Vec<UserLedger>, EngineError> {
        Ok(self.store.list_users().await?)
    }

    pub async fn tasks_catalog(&self) -> Result<Vec<TaskDefinition>, EngineError> {
        Ok(self.store.list_tasks().await?)
    }

    pub async fn add_task(&self, task: NewTask) -> Result<TaskDefinition, EngineError> {
        let created = self
            .store
            .insert_task(task.name, task.description, task.points, task.link, task.icon)
            .await?;
        info!(task = %created.id, "task created");
        Ok(created)
    }

    pub async fn edit_task(
        &self,
        id: TaskId,
        fields: NewTask,
    ) -> Result<TaskDefinition, EngineError> {
        match self.store.update_task(fields.into_task(id)).await? {
            Some(task) => Ok(task),
            None => Err(EngineError::TaskNotFound),
        }
    }

    pub async fn remove_task(&self, id: TaskId) -> Result<(), EngineError> {
        if self.store.delete_task(id).await? {
            info!(task = %id, "task deleted");
            Ok(())
        } else {
            Err(EngineError::TaskNotFound)
        }
    }

    async fn load_user(&self, id: UserId) -> Result<Versioned<UserLedger>, EngineError> {
        self.store
            .get_user(id)
            .await?
            .ok_or(EngineError::UserNotFound)
    }
}
