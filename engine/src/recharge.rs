//! Game-session recharge.
//!
//! Sessions refill at one per fixed interval, capped at the configured
//! maximum. The recharge basis (`last_session_recharge`) advances by the
//! intervals actually consumed rather than jumping to "now", so partial
//! progress toward the next session survives a recharge; once the cap is
//! reached the basis resets to "now", since holding a stale basis at the
//! cap would mint sessions instantly after the next spend.

use tapfarm_types::UserLedger;

use crate::config::EngineConfig;

/// Apply any recharge due at `now`. Returns the number of sessions added.
pub fn recharge_sessions(user: &mut UserLedger, cfg: &EngineConfig, now: u64) -> u32 {
    let elapsed = now.saturating_sub(user.last_session_recharge);
    let intervals = elapsed / cfg.session_recharge_secs;
    if intervals == 0 {
        return 0;
    }

    let before = user.game_sessions;
    let capped = intervals.min(u64::from(cfg.max_sessions));
    user.game_sessions = (user.game_sessions + capped as u32).min(cfg.max_sessions);

    if user.game_sessions == cfg.max_sessions {
        user.last_session_recharge = now;
    } else {
        user.last_session_recharge += intervals * cfg.session_recharge_secs;
    }
    user.game_sessions - before
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapfarm_types::UserId;

    fn drained_user(now: u64) -> UserLedger {
        let mut user = UserLedger::new(UserId(1), "Ann".to_string(), now);
        user.game_sessions = 0;
        user
    }

    #[test]
    fn nothing_due_before_one_interval() {
        let cfg = EngineConfig::default();
        let mut user = drained_user(1_000);
        assert_eq!(recharge_sessions(&mut user, &cfg, 1_000 + 599), 0);
        assert_eq!(user.game_sessions, 0);
        assert_eq!(user.last_session_recharge, 1_000);
    }

    #[test]
    fn one_session_per_interval() {
        let cfg = EngineConfig::default();
        let mut user = drained_user(0);
        assert_eq!(recharge_sessions(&mut user, &cfg, 1_250), 2);
        assert_eq!(user.game_sessions, 2);
    }

    #[test]
    fn capped_regardless_of_elapsed_time() {
        let cfg = EngineConfig::default();
        let mut user = drained_user(0);
        // 100 days elapsed recharges to the cap, not to a huge number.
        let now = 100 * 24 * 3_600;
        assert_eq!(recharge_sessions(&mut user, &cfg, now), cfg.max_sessions);
        assert_eq!(user.game_sessions, cfg.max_sessions);
        assert_eq!(user.last_session_recharge, now);
    }

    #[test]
    fn partial_interval_progress_is_preserved() {
        let cfg = EngineConfig::default();
        let mut user = drained_user(0);
        // 1 250 s is two full intervals plus 50 s toward the third. The
        // basis lands at 1 200, not 1 250.
        recharge_sessions(&mut user, &cfg, 1_250);
        assert_eq!(user.last_session_recharge, 1_200);
        // 550 more seconds completes the third interval.
        assert_eq!(recharge_sessions(&mut user, &cfg, 1_800), 1);
        assert_eq!(user.game_sessions, 3);
        assert_eq!(user.last_session_recharge, 1_800);
    }

    #[test]
    fn already_full_user_keeps_cap_and_resets_basis() {
        let cfg = EngineConfig::default();
        let mut user = UserLedger::new(UserId(1), "Ann".to_string(), 0);
        assert_eq!(user.game_sessions, cfg.max_sessions);
        assert_eq!(recharge_sessions(&mut user, &cfg, 5_000), 0);
        assert_eq!(user.game_sessions, cfg.max_sessions);
        assert_eq!(user.last_session_recharge, 5_000);
    }

    #[test]
    fn alternate_constants_are_honored() {
        let cfg = EngineConfig {
            max_sessions: 3,
            session_recharge_secs: 60,
            ..EngineConfig::default()
        };
        let mut user = drained_user(0);
        user.game_sessions = 0;
        assert_eq!(recharge_sessions(&mut user, &cfg, 125), 2);
        assert_eq!(user.last_session_recharge, 120);
        assert_eq!(recharge_sessions(&mut user, &cfg, 10_000), 1);
        assert_eq!(user.game_sessions, 3);
        assert_eq!(user.last_session_recharge, 10_000);
    }
}
