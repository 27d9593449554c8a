use serde::{Deserialize, Serialize};

use crate::ledger::UserId;

/// Authenticated identity produced once at the boundary.
///
/// Handlers and the engine only ever see this record; raw Telegram
/// initData never crosses the auth layer. `referral_token` carries the
/// `start_param` and is only consulted during lazy account creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramIdentity {
    pub id: UserId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub referral_token: Option<String>,
}

impl TelegramIdentity {
    pub fn new(id: UserId, first_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: None,
            username: None,
            referral_token: None,
        }
    }
}
