//! Ledger store access contract.
//!
//! Every mutation of user state goes through [`Store::commit`]: the engine
//! reads rows (receiving a per-row version), computes new state, then
//! commits a batch of guarded mutations. The store applies the batch
//! all-or-nothing and rejects it with [`StoreError::Conflict`] when any
//! version guard fails, which is how a lost update from a concurrent
//! same-user request is turned into a retryable failure. The
//! `(user, task)` completion table enforces uniqueness itself, closing the
//! check-then-insert race on task claims.
//!
//! [`MemoryStore`] is the bundled implementation: a mutex-guarded map with
//! per-row version counters. A relational backend would satisfy the same
//! contract with row-level transactions and a composite primary key on
//! `user_task(user_id, task_id)`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::Mutex;

use anyhow::anyhow;
use thiserror::Error as ThisError;

use tapfarm_types::{TaskDefinition, TaskId, UserId, UserLedger};

#[derive(Debug, ThisError)]
pub enum StoreError {
    /// A concurrent writer raced this row; the whole read-modify-write may
    /// be retried.
    #[error("concurrent writer raced the mutation batch")]
    Conflict,
    /// The `(user, task)` completion pair already exists.
    #[error("completion already recorded")]
    DuplicateCompletion,
    /// Fatal for the request; no partial state was committed.
    #[error("store unavailable")]
    Unavailable(#[source] anyhow::Error),
}

/// Opaque optimistic-concurrency token, bumped on every committed write of
/// the row it was read with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Version(pub u64);

/// A row together with the version guard to commit against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Versioned<T> {
    pub row: T,
    pub version: Version,
}

/// One guarded change inside a commit batch.
#[derive(Clone, Debug)]
pub enum Mutation {
    /// Insert a fresh user row; conflicts if the id already exists.
    InsertUser(UserLedger),
    /// Replace a user row iff its stored version still matches.
    UpdateUser {
        user: UserLedger,
        expected: Version,
    },
    /// Record a `(user, task)` completion; fails `DuplicateCompletion` if
    /// the pair exists.
    InsertCompletion { user: UserId, task: TaskId },
}

pub trait Store: Send + Sync + 'static {
    fn get_user(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<Versioned<UserLedger>>, StoreError>> + Send;

    fn get_user_by_referral_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<Versioned<UserLedger>>, StoreError>> + Send;

    /// Apply a batch of guarded mutations as one atomic unit.
    fn commit(
        &self,
        mutations: Vec<Mutation>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_task(
        &self,
        id: TaskId,
    ) -> impl Future<Output = Result<Option<TaskDefinition>, StoreError>> + Send;

    fn list_tasks(&self) -> impl Future<Output = Result<Vec<TaskDefinition>, StoreError>> + Send;

    /// Insert a task under a store-assigned id.
    fn insert_task(
        &self,
        name: String,
        description: String,
        points: u64,
        link: String,
        icon: String,
    ) -> impl Future<Output = Result<TaskDefinition, StoreError>> + Send;

    /// Replace an existing task's fields; `Ok(None)` when the id is unknown.
    fn update_task(
        &self,
        task: TaskDefinition,
    ) -> impl Future<Output = Result<Option<TaskDefinition>, StoreError>> + Send;

    /// Remove a task; `Ok(false)` when the id is unknown.
    fn delete_task(&self, id: TaskId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn completions_for(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<BTreeSet<TaskId>, StoreError>> + Send;

    /// Users ordered by descending score, capped at `limit`.
    fn top_users(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<UserLedger>, StoreError>> + Send;

    /// Competition rank of a user (1 + number of strictly higher scores).
    /// `Ok(None)` means the user is not ranked; a store failure is a
    /// distinct `Err`, never silently folded into `None`.
    fn rank_of(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<u32>, StoreError>> + Send;

    /// All users referred by `id`.
    fn referrals_of(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Vec<UserLedger>, StoreError>> + Send;

    /// Every user row, ordered by descending score (admin view).
    fn list_users(&self) -> impl Future<Output = Result<Vec<UserLedger>, StoreError>> + Send;
}

impl<S: Store> Store for std::sync::Arc<S> {
    fn get_user(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<Versioned<UserLedger>>, StoreError>> + Send {
        self.as_ref().get_user(id)
    }

    fn get_user_by_referral_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<Versioned<UserLedger>>, StoreError>> + Send {
        self.as_ref().get_user_by_referral_code(code)
    }

    fn commit(
        &self,
        mutations: Vec<Mutation>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.as_ref().commit(mutations)
    }

    fn get_task(
        &self,
        id: TaskId,
    ) -> impl Future<Output = Result<Option<TaskDefinition>, StoreError>> + Send {
        self.as_ref().get_task(id)
    }

    fn list_tasks(&self) -> impl Future<Output = Result<Vec<TaskDefinition>, StoreError>> + Send {
        self.as_ref().list_tasks()
    }

    fn insert_task(
        &self,
        name: String,
        description: String,
        points: u64,
        link: String,
        icon: String,
    ) -> impl Future<Output = Result<TaskDefinition, StoreError>> + Send {
        self.as_ref().insert_task(name, description, points, link, icon)
    }

    fn update_task(
        &self,
        task: TaskDefinition,
    ) -> impl Future<Output = Result<Option<TaskDefinition>, StoreError>> + Send {
        self.as_ref().update_task(task)
    }

    fn delete_task(&self, id: TaskId) -> impl Future<Output = Result<bool, StoreError>> + Send {
        self.as_ref().delete_task(id)
    }

    fn completions_for(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<BTreeSet<TaskId>, StoreError>> + Send {
        self.as_ref().completions_for(user)
    }

    fn top_users(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<UserLedger>, StoreError>> + Send {
        self.as_ref().top_users(limit)
    }

    fn rank_of(&self, id: UserId) -> impl Future<Output = Result<Option<u32>, StoreError>> + Send {
        self.as_ref().rank_of(id)
    }

    fn referrals_of(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Vec<UserLedger>, StoreError>> + Send {
        self.as_ref().referrals_of(id)
    }

    fn list_users(&self) -> impl Future<Output = Result<Vec<UserLedger>, StoreError>> + Send {
        self.as_ref().list_users()
    }
}

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, Versioned<UserLedger>>,
    tasks: BTreeMap<TaskId, TaskDefinition>,
    completions: BTreeSet<(UserId, TaskId)>,
    next_task_id: u64,
}

/// In-process store with per-row optimistic versioning.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable(anyhow!("store mutex poisoned")))
    }
}

impl Inner {
    /// Validate every guard in the batch before touching anything, so a
    /// failed batch commits no partial state.
    fn check(&self, mutations: &[Mutation]) -> Result<(), StoreError> {
        for mutation in mutations {
            match mutation {
                Mutation::InsertUser(user) => {
                    if self.users.contains_key(&user.id) {
                        return Err(StoreError::Conflict);
                    }
                }
                Mutation::UpdateUser { user, expected } => {
                    match self.users.get(&user.id) {
                        Some(current) if current.version == *expected => {}
                        _ => return Err(StoreError::Conflict),
                    }
                }
                Mutation::InsertCompletion { user, task } => {
                    if self.completions.contains(&(*user, *task)) {
                        return Err(StoreError::DuplicateCompletion);
                    }
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, mutations: Vec<Mutation>) {
        for mutation in mutations {
            match mutation {
                Mutation::InsertUser(user) => {
                    self.users.insert(
                        user.id,
                        Versioned {
                            row: user,
                            version: Version(0),
                        },
                    );
                }
                Mutation::UpdateUser { user, expected } => {
                    self.users.insert(
                        user.id,
                        Versioned {
                            row: user,
                            version: Version(expected.0 + 1),
                        },
                    );
                }
                Mutation::InsertCompletion { user, task } => {
                    self.completions.insert((user, task));
                }
            }
        }
    }

    fn users_by_score(&self) -> Vec<UserLedger> {
        let mut users: Vec<UserLedger> =
            self.users.values().map(|entry| entry.row.clone()).collect();
        users.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        users
    }
}

impl Store for MemoryStore {
    async fn get_user(&self, id: UserId) -> Result<Option<Versioned<UserLedger>>, StoreError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn get_user_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<Versioned<UserLedger>>, StoreError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|entry| entry.row.referral_code == code)
            .cloned())
    }

    async fn commit(&self, mutations: Vec<Mutation>) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.check(&mutations)?;
        inner.apply(mutations);
        Ok(())
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<TaskDefinition>, StoreError> {
        Ok(self.lock()?.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self) -> Result<Vec<TaskDefinition>, StoreError> {
        Ok(self.lock()?.tasks.values().cloned().collect())
    }

    async fn insert_task(
        &self,
        name: String,
        description: String,
        points: u64,
        link: String,
        icon: String,
    ) -> Result<TaskDefinition, StoreError> {
        let mut inner = self.lock()?;
        inner.next_task_id += 1;
        let task = TaskDefinition {
            id: TaskId(inner.next_task_id),
            name,
            description,
            points,
            link,
            icon,
        };
        inner.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        task: TaskDefinition,
    ) -> Result<Option<TaskDefinition>, StoreError> {
        let mut inner = self.lock()?;
        if !inner.tasks.contains_key(&task.id) {
            return Ok(None);
        }
        inner.tasks.insert(task.id, task.clone());
        Ok(Some(task))
    }

    async fn delete_task(&self, id: TaskId) -> Result<bool, StoreError> {
        Ok(self.lock()?.tasks.remove(&id).is_some())
    }

    async fn completions_for(&self, user: UserId) -> Result<BTreeSet<TaskId>, StoreError> {
        Ok(self
            .lock()?
            .completions
            .iter()
            .filter(|(owner, _)| *owner == user)
            .map(|(_, task)| *task)
            .collect())
    }

    async fn top_users(&self, limit: usize) -> Result<Vec<UserLedger>, StoreError> {
        let mut users = self.lock()?.users_by_score();
        users.truncate(limit);
        Ok(users)
    }

    async fn rank_of(&self, id: UserId) -> Result<Option<u32>, StoreError> {
        let inner = self.lock()?;
        let Some(me) = inner.users.get(&id) else {
            return Ok(None);
        };
        let higher = inner
            .users
            .values()
            .filter(|entry| entry.row.score > me.row.score)
            .count();
        Ok(Some(higher as u32 + 1))
    }

    async fn referrals_of(&self, id: UserId) -> Result<Vec<UserLedger>, StoreError> {
        Ok(self
            .lock()?
            .users
            .values()
            .filter(|entry| entry.row.referred_by_id == Some(id))
            .map(|entry| entry.row.clone())
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<UserLedger>, StoreError> {
        Ok(self.lock()?.users_by_score())
    }
}
