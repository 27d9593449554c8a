//! End-to-end engine scenarios against the in-memory store.
//!
//! These cover the cross-module behavior the unit tests in `accrual`,
//! `recharge`, and `store` cannot: lazy creation with referral linkage,
//! the soft/hard session-gating asymmetry between the two submission
//! paths, exactly-once task claims, and conflict-retry orchestration.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::clock::ManualClock;
    use crate::config::EngineConfig;
    use crate::error::EngineError;
    use crate::mocks::{identity, ConflictingStore, FlakyRankStore};
    use crate::ops::Engine;
    use crate::store::{MemoryStore, Mutation, Store};
    use tapfarm_types::{TaskId, UserId, UserLedger};

    type TestEngine = Engine<Arc<MemoryStore>, Arc<ManualClock>>;

    fn engine_at(now: u64) -> (TestEngine, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(now));
        let engine = Engine::new(store.clone(), clock.clone(), EngineConfig::default());
        (engine, store, clock)
    }

    async fn drain_sessions(engine: &TestEngine, id: UserId) {
        for _ in 0..10 {
            engine.submit_game_result(id, 0).await.unwrap();
        }
    }

    #[tokio::test]
    async fn first_contact_creates_full_ledger() {
        let (engine, _, _) = engine_at(1_000);
        let snapshot = engine.touch_user(&identity(1, "Ann")).await.unwrap();
        assert_eq!(snapshot.user.score, 0);
        assert_eq!(snapshot.user.game_sessions, 10);
        assert_eq!(snapshot.user.tap_level, 1);
        assert_eq!(snapshot.claimable_rewards, 0);
        assert!(snapshot.user.referred_by_id.is_none());
        snapshot.user.validate_invariants().unwrap();
    }

    #[tokio::test]
    async fn claim_after_an_hour_crosses_tier_boundary() {
        let (engine, _, clock) = engine_at(0);
        let user = identity(1, "Ann");
        engine.touch_user(&user).await.unwrap();
        engine.sync_taps(UserId(1), 95).await.unwrap();

        clock.set(3_600);
        let snapshot = engine.claim_rewards(UserId(1)).await.unwrap();
        // 3600 s at the default 100/hour accrues exactly 100 points.
        assert_eq!(snapshot.user.score, 195);
        assert_eq!(snapshot.user.tap_level, 2);
        assert_eq!(snapshot.user.last_claim_time, 3_600);
        assert_eq!(snapshot.claimable_rewards, 0);
    }

    #[tokio::test]
    async fn immediate_second_claim_changes_nothing() {
        let (engine, _, clock) = engine_at(0);
        engine.touch_user(&identity(1, "Ann")).await.unwrap();

        clock.set(3_600);
        let first = engine.claim_rewards(UserId(1)).await.unwrap();
        assert_eq!(first.user.score, 100);
        let second = engine.claim_rewards(UserId(1)).await.unwrap();
        assert_eq!(second.user.score, 100);
        assert_eq!(second.user.last_claim_time, 3_600);
    }

    #[tokio::test]
    async fn touch_reports_accrual_without_folding_it() {
        let (engine, _, clock) = engine_at(0);
        let user = identity(1, "Ann");
        engine.touch_user(&user).await.unwrap();

        clock.set(7_200);
        let snapshot = engine.touch_user(&user).await.unwrap();
        assert_eq!(snapshot.claimable_rewards, 200);
        assert_eq!(snapshot.user.score, 0);
        assert_eq!(snapshot.user.last_claim_time, 0);
    }

    #[tokio::test]
    async fn strict_path_rejects_without_sessions() {
        let (engine, _, _) = engine_at(0);
        engine.touch_user(&identity(1, "Ann")).await.unwrap();
        drain_sessions(&engine, UserId(1)).await;

        let err = engine.submit_game_result(UserId(1), 500).await.unwrap_err();
        assert!(matches!(err, EngineError::InsufficientSessions));
        let snapshot = engine.touch_user(&identity(1, "Ann")).await.unwrap();
        assert_eq!(snapshot.user.score, 0);
        assert_eq!(snapshot.user.game_sessions, 0);
    }

    #[tokio::test]
    async fn strict_path_spends_exactly_one_session() {
        let (engine, _, _) = engine_at(0);
        engine.touch_user(&identity(1, "Ann")).await.unwrap();
        let outcome = engine.submit_game_result(UserId(1), 350).await.unwrap();
        assert_eq!(outcome.new_score, 350);
        assert_eq!(outcome.sessions_left, 9);
        // Tier was recomputed inside the same commit.
        let snapshot = engine.touch_user(&identity(1, "Ann")).await.unwrap();
        assert_eq!(snapshot.user.tap_level, 3);
    }

    #[tokio::test]
    async fn batched_sync_awards_even_at_zero_sessions() {
        let (engine, _, _) = engine_at(0);
        engine.touch_user(&identity(1, "Ann")).await.unwrap();
        drain_sessions(&engine, UserId(1)).await;

        let snapshot = engine.sync_taps(UserId(1), 50).await.unwrap();
        assert_eq!(snapshot.user.score, 50);
        assert_eq!(snapshot.user.game_sessions, 0);
        assert_eq!(snapshot.user.tap_level, 1);
    }

    #[tokio::test]
    async fn batched_sync_spends_a_session_when_available() {
        let (engine, _, _) = engine_at(0);
        engine.touch_user(&identity(1, "Ann")).await.unwrap();
        let snapshot = engine.sync_taps(UserId(1), 120).await.unwrap();
        assert_eq!(snapshot.user.game_sessions, 9);
        assert_eq!(snapshot.user.tap_level, 2);
    }

    #[tokio::test]
    async fn sync_rejects_malformed_tap_counts_before_mutation() {
        let (engine, _, _) = engine_at(0);
        engine.touch_user(&identity(1, "Ann")).await.unwrap();

        for taps in [0, 10_001] {
            let err = engine.sync_taps(UserId(1), taps).await.unwrap_err();
            assert!(matches!(err, EngineError::InvalidInput(_)), "taps={taps}");
        }
        let snapshot = engine.touch_user(&identity(1, "Ann")).await.unwrap();
        assert_eq!(snapshot.user.score, 0);
        assert_eq!(snapshot.user.game_sessions, 10);
    }

    #[tokio::test]
    async fn touch_applies_session_recharge() {
        let (engine, _, clock) = engine_at(0);
        let user = identity(1, "Ann");
        engine.touch_user(&user).await.unwrap();
        drain_sessions(&engine, UserId(1)).await;

        clock.set(1_250);
        let snapshot = engine.touch_user(&user).await.unwrap();
        assert_eq!(snapshot.user.game_sessions, 2);
        // Partial progress toward the third session survives.
        assert_eq!(snapshot.user.last_session_recharge, 1_200);
    }

    #[tokio::test]
    async fn touch_refreshes_changed_profile_fields() {
        let (engine, _, _) = engine_at(0);
        engine.touch_user(&identity(1, "Ann")).await.unwrap();

        let mut renamed = identity(1, "Anna");
        renamed.username = Some("anna".to_string());
        let snapshot = engine.touch_user(&renamed).await.unwrap();
        assert_eq!(snapshot.user.first_name, "Anna");
        assert_eq!(snapshot.user.username.as_deref(), Some("anna"));
    }

    #[tokio::test]
    async fn referral_bonus_is_awarded_once_at_creation() {
        let (engine, _, _) = engine_at(0);
        let referrer = engine.touch_user(&identity(1, "Ann")).await.unwrap();

        let mut referred = identity(2, "Bob");
        referred.referral_token = Some(referrer.user.referral_code.clone());
        let snapshot = engine.touch_user(&referred).await.unwrap();
        assert_eq!(snapshot.user.referred_by_id, Some(UserId(1)));

        let credited = engine.touch_user(&identity(1, "Ann")).await.unwrap();
        assert_eq!(credited.user.score, 10_000);
        assert_eq!(credited.user.tap_level, 10);

        // Later contacts from the referred user never re-award.
        engine.touch_user(&referred).await.unwrap();
        let again = engine.touch_user(&identity(1, "Ann")).await.unwrap();
        assert_eq!(again.user.score, 10_000);
    }

    #[tokio::test]
    async fn unresolvable_referral_token_creates_unlinked_account() {
        let (engine, _, _) = engine_at(0);
        let mut referred = identity(2, "Bob");
        referred.referral_token = Some("no-such-code".to_string());
        let snapshot = engine.touch_user(&referred).await.unwrap();
        assert!(snapshot.user.referred_by_id.is_none());
        assert_eq!(snapshot.user.score, 0);
    }

    #[tokio::test]
    async fn friends_lists_referred_accounts() {
        let (engine, _, _) = engine_at(0);
        let referrer = engine.touch_user(&identity(1, "Ann")).await.unwrap();
        for (id, name) in [(2, "Bob"), (3, "Cal")] {
            let mut referred = identity(id, name);
            referred.referral_token = Some(referrer.user.referral_code.clone());
            engine.touch_user(&referred).await.unwrap();
        }
        engine.touch_user(&identity(4, "Dee")).await.unwrap();

        let friends = engine.friends(UserId(1)).await.unwrap();
        let mut names: Vec<&str> = friends.iter().map(|f| f.display_name()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Bob", "Cal"]);
    }

    #[tokio::test]
    async fn task_claim_pays_exactly_once() {
        let (engine, store, _) = engine_at(0);
        engine.touch_user(&identity(1, "Ann")).await.unwrap();
        let task = store
            .insert_task(
                "Join Telegram".into(),
                "Join our community channel".into(),
                5_000,
                "https://t.me/example".into(),
                "telegram".into(),
            )
            .await
            .unwrap();

        let claimed = engine.claim_task(UserId(1), task.id).await.unwrap();
        assert_eq!(claimed.points, 5_000);
        let err = engine.claim_task(UserId(1), task.id).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyClaimed));

        let snapshot = engine.touch_user(&identity(1, "Ann")).await.unwrap();
        assert_eq!(snapshot.user.score, 5_000);
        assert_eq!(snapshot.user.tap_level, 10);
    }

    #[tokio::test]
    async fn duplicate_claims_racing_on_the_same_read_pay_once() {
        let (engine, store, _) = engine_at(0);
        engine.touch_user(&identity(1, "Ann")).await.unwrap();
        let task = store
            .insert_task(
                "Follow on X".into(),
                "Follow our official account".into(),
                3_000,
                "https://x.com/example".into(),
                "twitter".into(),
            )
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            engine.claim_task(UserId(1), task.id),
            engine.claim_task(UserId(1), task.id)
        );
        let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(matches!(
            [a, b].into_iter().find(|r| r.is_err()).unwrap().unwrap_err(),
            EngineError::AlreadyClaimed
        ));

        let snapshot = engine.touch_user(&identity(1, "Ann")).await.unwrap();
        assert_eq!(snapshot.user.score, 3_000);
        assert_eq!(
            store.completions_for(UserId(1)).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn claim_task_not_found_variants() {
        let (engine, store, _) = engine_at(0);
        let err = engine.claim_task(UserId(1), TaskId(9)).await.unwrap_err();
        assert!(matches!(err, EngineError::TaskNotFound));

        let task = store
            .insert_task("t".into(), "d".into(), 10, "l".into(), "i".into())
            .await
            .unwrap();
        let err = engine.claim_task(UserId(1), task.id).await.unwrap_err();
        assert!(matches!(err, EngineError::UserNotFound));
    }

    #[tokio::test]
    async fn tasks_listing_flags_completed_entries() {
        let (engine, store, _) = engine_at(0);
        engine.touch_user(&identity(1, "Ann")).await.unwrap();
        let done = store
            .insert_task("a".into(), "d".into(), 10, "l".into(), "i".into())
            .await
            .unwrap();
        store
            .insert_task("b".into(), "d".into(), 20, "l".into(), "i".into())
            .await
            .unwrap();
        engine.claim_task(UserId(1), done.id).await.unwrap();

        let tasks = engine.tasks_for(UserId(1)).await.unwrap();
        assert_eq!(tasks.len(), 2);
        for (task, completed) in tasks {
            assert_eq!(completed, task.id == done.id);
        }
    }

    #[tokio::test]
    async fn wallet_save_validates_length_first() {
        let (engine, _, _) = engine_at(0);
        engine.touch_user(&identity(1, "Ann")).await.unwrap();

        let too_short = "x".repeat(31);
        let too_long = "x".repeat(45);
        for bad in ["x", too_short.as_str(), too_long.as_str()] {
            let err = engine.save_wallet(UserId(1), bad).await.unwrap_err();
            assert!(matches!(err, EngineError::InvalidInput(_)));
        }
        let wallet = "w".repeat(44);
        let snapshot = engine.save_wallet(UserId(1), &wallet).await.unwrap();
        assert_eq!(snapshot.user.wallet_address.as_deref(), Some(wallet.as_str()));
        // Validation runs before the user lookup.
        let err = engine.save_wallet(UserId(9), "short").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        let err = engine
            .save_wallet(UserId(9), &"w".repeat(32))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UserNotFound));
    }

    #[tokio::test]
    async fn leaderboard_ranks_and_caps() {
        let (engine, _, _) = engine_at(0);
        for id in 1..=12 {
            engine
                .touch_user(&identity(id, &format!("user{id}")))
                .await
                .unwrap();
            engine
                .sync_taps(UserId(id), (id as u32) * 10)
                .await
                .unwrap();
        }

        let board = engine.leaderboard(UserId(1)).await.unwrap();
        assert_eq!(board.top.len(), 10);
        assert_eq!(board.top[0].id, UserId(12));
        assert_eq!(board.caller_rank, Some(12));
    }

    #[tokio::test]
    async fn leaderboard_survives_a_failed_rank_query() {
        let store = FlakyRankStore(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let engine = Engine::new(store, clock, EngineConfig::default());
        engine.touch_user(&identity(1, "Ann")).await.unwrap();

        let board = engine.leaderboard(UserId(1)).await.unwrap();
        assert_eq!(board.top.len(), 1);
        assert_eq!(board.caller_rank, None);
    }

    #[tokio::test]
    async fn one_conflict_is_absorbed_by_the_retry() {
        let seed = MemoryStore::new();
        seed.commit(vec![Mutation::InsertUser(UserLedger::new(
            UserId(1),
            "Ann".to_string(),
            0,
        ))])
        .await
        .unwrap();
        let store = ConflictingStore::new(seed, UserId(1), 1);
        let clock = Arc::new(ManualClock::new(0));
        let engine = Engine::new(store, clock, EngineConfig::default());

        let snapshot = engine.sync_taps(UserId(1), 5).await.unwrap();
        assert_eq!(snapshot.user.score, 5);
    }

    #[tokio::test]
    async fn back_to_back_conflicts_surface_after_one_retry() {
        let seed = MemoryStore::new();
        seed.commit(vec![Mutation::InsertUser(UserLedger::new(
            UserId(1),
            "Ann".to_string(),
            0,
        ))])
        .await
        .unwrap();
        let store = ConflictingStore::new(seed, UserId(1), 2);
        let clock = Arc::new(ManualClock::new(0));
        let engine = Engine::new(store, clock, EngineConfig::default());

        let err = engine.sync_taps(UserId(1), 5).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn admin_task_crud_round_trip() {
        let (engine, _, _) = engine_at(0);
        let task = engine
            .add_task(tapfarm_types::NewTask {
                name: "Subscribe".into(),
                description: "Subscribe to the channel".into(),
                points: 3_000,
                link: "https://youtube.com/example".into(),
                icon: "youtube".into(),
            })
            .await
            .unwrap();

        let edited = engine
            .edit_task(
                task.id,
                tapfarm_types::NewTask {
                    name: "Subscribe".into(),
                    description: "Subscribe to the channel".into(),
                    points: 4_000,
                    link: "https://youtube.com/example".into(),
                    icon: "youtube".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.points, 4_000);

        engine.remove_task(task.id).await.unwrap();
        let err = engine.remove_task(task.id).await.unwrap_err();
        assert!(matches!(err, EngineError::TaskNotFound));
        assert!(engine.tasks_catalog().await.unwrap().is_empty());
    }
}
