//! Test doubles for exercising the orchestration layer.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::anyhow;

use tapfarm_types::{TaskDefinition, TaskId, TelegramIdentity, UserId, UserLedger};

use crate::store::{MemoryStore, Mutation, Store, StoreError, Versioned};

/// Identity fixture with no referral token.
pub fn identity(id: i64, first_name: &str) -> TelegramIdentity {
    TelegramIdentity::new(UserId(id), first_name)
}

/// Store that simulates a concurrent same-user writer: before each of the
/// first `conflicts` commits, it bumps the target row's version so the
/// caller's guard goes stale.
pub struct ConflictingStore {
    inner: MemoryStore,
    target: UserId,
    remaining: AtomicU32,
}

impl ConflictingStore {
    pub fn new(inner: MemoryStore, target: UserId, conflicts: u32) -> Self {
        Self {
            inner,
            target,
            remaining: AtomicU32::new(conflicts),
        }
    }

    async fn interfere(&self) -> Result<(), StoreError> {
        let armed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !armed {
            return Ok(());
        }
        if let Some(Versioned { row, version }) = self.inner.get_user(self.target).await? {
            self.inner
                .commit(vec![Mutation::UpdateUser {
                    user: row,
                    expected: version,
                }])
                .await?;
        }
        Ok(())
    }
}

impl Store for ConflictingStore {
    async fn get_user(&self, id: UserId) -> Result<Option<Versioned<UserLedger>>, StoreError> {
        self.inner.get_user(id).await
    }

    async fn get_user_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<Versioned<UserLedger>>, StoreError> {
        self.inner.get_user_by_referral_code(code).await
    }

    async fn commit(&self, mutations: Vec<Mutation>) -> Result<(), StoreError> {
        self.interfere().await?;
        self.inner.commit(mutations).await
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<TaskDefinition>, StoreError> {
        self.inner.get_task(id).await
    }

    async fn list_tasks(&self) -> Result<Vec<TaskDefinition>, StoreError> {
        self.inner.list_tasks().await
    }

    async fn insert_task(
        &self,
        name: String,
        description: String,
        points: u64,
        link: String,
        icon: String,
    ) -> Result<TaskDefinition, StoreError> {
        self.inner
            .insert_task(name, description, points, link, icon)
            .await
    }

    async fn update_task(
        &self,
        task: TaskDefinition,
    ) -> Result<Option<TaskDefinition>, StoreError> {
        self.inner.update_task(task).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<bool, StoreError> {
        self.inner.delete_task(id).await
    }

    async fn completions_for(&self, user: UserId) -> Result<BTreeSet<TaskId>, StoreError> {
        self.inner.completions_for(user).await
    }

    async fn top_users(&self, limit: usize) -> Result<Vec<UserLedger>, StoreError> {
        self.inner.top_users(limit).await
    }

    async fn rank_of(&self, id: UserId) -> Result<Option<u32>, StoreError> {
        self.inner.rank_of(id).await
    }

    async fn referrals_of(&self, id: UserId) -> Result<Vec<UserLedger>, StoreError> {
        self.inner.referrals_of(id).await
    }

    async fn list_users(&self) -> Result<Vec<UserLedger>, StoreError> {
        self.inner.list_users().await
    }
}

/// Store whose rank query always fails, for the degradation path.
pub struct FlakyRankStore(pub MemoryStore);

impl Store for FlakyRankStore {
    async fn get_user(&self, id: UserId) -> Result<Option<Versioned<UserLedger>>, StoreError> {
        self.0.get_user(id).await
    }

    async fn get_user_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<Versioned<UserLedger>>, StoreError> {
        self.0.get_user_by_referral_code(code).await
    }

    async fn commit(&self, mutations: Vec<Mutation>) -> Result<(), StoreError> {
        self.0.commit(mutations).await
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<TaskDefinition>, StoreError> {
        self.0.get_task(id).await
    }

    async fn list_tasks(&self) -> Result<Vec<TaskDefinition>, StoreError> {
        self.0.list_tasks().await
    }

    async fn insert_task(
        &self,
        name: String,
        description: String,
        points: u64,
        link: String,
        icon: String,
    ) -> Result<TaskDefinition, StoreError> {
        self.0.insert_task(name, description, points, link, icon).await
    }

    async fn update_task(
        &self,
        task: TaskDefinition,
    ) -> Result<Option<TaskDefinition>, StoreError> {
        self.0.update_task(task).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<bool, StoreError> {
        self.0.delete_task(id).await
    }

    async fn completions_for(&self, user: UserId) -> Result<BTreeSet<TaskId>, StoreError> {
        self.0.completions_for(user).await
    }

    async fn top_users(&self, limit: usize) -> Result<Vec<UserLedger>, StoreError> {
        self.0.top_users(limit).await
    }

    async fn rank_of(&self, _id: UserId) -> Result<Option<u32>, StoreError> {
        Err(StoreError::Unavailable(anyhow!("rank query failed")))
    }

    async fn referrals_of(&self, id: UserId) -> Result<Vec<UserLedger>, StoreError> {
        self.0.referrals_of(id).await
    }

    async fn list_users(&self) -> Result<Vec<UserLedger>, StoreError> {
        self.0.list_users().await
    }
}
