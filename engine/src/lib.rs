//! Tapfarm score-accrual and session-recharge engine.
//!
//! The engine owns the rules for how a user's score, game-session
//! allowance, and tap tier evolve over wall-clock time and through
//! discrete actions (taps, claims, task completion, referral signups).
//!
//! ## Determinism requirements
//! - No wall-clock reads inside the math; "now" always comes from the
//!   injected [`Clock`].
//! - `tap_level` is derived state: every score mutation goes through
//!   `UserLedger::add_score`, which recomputes it from the tier table.
//!
//! ## Concurrency model
//! Requests for different users share nothing. Requests for the same user
//! may race; every mutation is a read-modify-write committed through
//! [`Store::commit`] with per-row version guards, and the orchestration in
//! [`Engine`] retries a conflicted commit exactly once before surfacing
//! [`EngineError::Conflict`].

pub mod accrual;
pub mod clock;
pub mod config;
pub mod error;
pub mod ops;
pub mod recharge;
pub mod store;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

#[cfg(test)]
mod scenario_tests;

pub use clock::{Clock, SystemClock};
pub use config::EngineConfig;
pub use error::EngineError;
pub use ops::{Engine, GameOutcome, Leaderboard, UserSnapshot};
pub use store::{MemoryStore, Mutation, Store, StoreError, Version, Versioned};
