//! Telegram Mini App authentication boundary.
//!
//! Verifies the `telegram-data` header (Bot API `initData`) and produces
//! the typed [`TelegramIdentity`] consumed by every handler; raw query
//! strings never travel past this module. Verification follows the Bot
//! API scheme: the data-check string is every decoded `key=value` pair
//! except `hash`, sorted by key and joined with newlines, authenticated
//! with HMAC-SHA256 under `HMAC("WebAppData", bot_token)`.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error as ThisError;
use tracing::debug;

use tapfarm_types::{TelegramIdentity, UserId};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub bot_token: Option<String>,
    /// Bypass verification and return a fixed mock identity.
    pub dev_mode: bool,
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum AuthError {
    #[error("telegram-data header is missing")]
    MissingHeader,
    #[error("bot token not configured")]
    BotTokenMissing,
    #[error("signature mismatch")]
    InvalidSignature,
    #[error("malformed init data: {0}")]
    Malformed(String),
}

/// `user` payload embedded in initData.
#[derive(Debug, Deserialize)]
struct InitDataUser {
    id: i64,
    first_name: String,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

pub fn authenticate(cfg: &AuthConfig, header: Option<&str>) -> Result<TelegramIdentity, AuthError> {
    if cfg.dev_mode {
        debug!("dev mode: bypassing telegram authentication");
        let mut identity = TelegramIdentity::new(UserId(999_999), "Dev");
        identity.last_name = Some("User".to_string());
        identity.username = Some("dev_user".to_string());
        identity.referral_token = Some("dev_referral_code".to_string());
        return Ok(identity);
    }

    let init_data = header.ok_or(AuthError::MissingHeader)?;
    let bot_token = cfg.bot_token.as_deref().ok_or(AuthError::BotTokenMissing)?;
    verify_init_data(bot_token, init_data)
}

fn verify_init_data(bot_token: &str, init_data: &str) -> Result<TelegramIdentity, AuthError> {
    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(init_data.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let hash_index = pairs
        .iter()
        .position(|(key, _)| key == "hash")
        .ok_or_else(|| AuthError::Malformed("hash field absent".to_string()))?;
    let (_, provided_hash) = pairs.remove(hash_index);
    let provided = hex::decode(&provided_hash).map_err(|_| AuthError::InvalidSignature)?;

    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let data_check_string = pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n");

    secret_key_mac(bot_token, &data_check_string)
        .verify_slice(&provided)
        .map_err(|_| AuthError::InvalidSignature)?;

    let user_json = pairs
        .iter()
        .find(|(key, _)| key == "user")
        .map(|(_, value)| value.as_str())
        .ok_or_else(|| AuthError::Malformed("user field absent".to_string()))?;
    let user: InitDataUser = serde_json::from_str(user_json)
        .map_err(|err| AuthError::Malformed(format!("user payload: {err}")))?;

    let referral_token = pairs
        .iter()
        .find(|(key, _)| key == "start_param")
        .map(|(_, value)| value.clone())
        .filter(|value| !value.is_empty());

    Ok(TelegramIdentity {
        id: UserId(user.id),
        first_name: user.first_name,
        last_name: user.last_name,
        username: user.username,
        referral_token,
    })
}

/// HMAC over `data` keyed by `HMAC("WebAppData", bot_token)`.
fn secret_key_mac(bot_token: &str, data: &str) -> HmacSha256 {
    let mut secret = HmacSha256::new_from_slice(b"WebAppData")
        .expect("hmac accepts any key length");
    secret.update(bot_token.as_bytes());
    let secret_key = secret.finalize().into_bytes();

    let mut mac =
        HmacSha256::new_from_slice(&secret_key).expect("hmac accepts any key length");
    mac.update(data.as_bytes());
    mac
}
