use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Service settings, loadable from a YAML file with env overrides for the
/// secrets (`BOT_TOKEN`, `ADMIN_PASSWORD`).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub admin_password: String,
    pub bot_token: Option<String>,
    pub dev_mode: bool,
    /// Bound on any single request's store work; elapsed deadlines map to
    /// a 503, never to partially committed state.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            admin_password: "supersecret".to_string(),
            bot_token: None,
            dev_mode: false,
            request_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("read config {}", path.display()))?;
                serde_yaml::from_str(&raw)
                    .with_context(|| format!("parse config {}", path.display()))?
            }
            None => Self::default(),
        };
        if let Ok(token) = std::env::var("BOT_TOKEN") {
            if !token.is_empty() {
                cfg.bot_token = Some(token);
            }
        }
        if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
            if !password.is_empty() {
                cfg.admin_password = password;
            }
        }
        Ok(cfg)
    }
}
