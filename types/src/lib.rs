//! Common types used throughout tapfarm.
//!
//! Domain state (ledger, tasks), the typed identity record produced at the
//! auth boundary, the fixed tier table, and the JSON payloads of the
//! player/admin API. No I/O lives here.

pub mod api;
pub mod constants;
pub mod identity;
pub mod ledger;
pub mod task;
pub mod tier;

pub use identity::TelegramIdentity;
pub use ledger::{LedgerInvariantError, UserId, UserLedger};
pub use task::{NewTask, TaskDefinition, TaskId};
pub use tier::tier_of;
