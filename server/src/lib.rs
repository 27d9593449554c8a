//! HTTP service for the tapfarm mini-app.
//!
//! Wires the accrual engine to axum: a Telegram-authenticated player API,
//! a password-guarded admin API, and startup seeding of the default task
//! catalog. All game rules live in `tapfarm-engine`; this crate only
//! authenticates, dispatches, and maps errors to status codes.

pub mod admin;
pub mod auth;
pub mod config;
pub mod routes;


use tracing::info;

use tapfarm_engine::{Clock, Engine, EngineError, Store};
use tapfarm_types::NewTask;

pub use auth::{AuthConfig, AuthError};
pub use config::ServerConfig;
pub use routes::{build_router, ApiError, AppState};

/// Create the default task catalog when none exists yet.
pub async fn seed_default_tasks<S: Store, C: Clock>(
    engine: &Engine<S, C>,
) -> Result<(), EngineError> {
    if !engine.tasks_catalog().await?.is_empty() {
        return Ok(());
    }
    info!("no tasks found, creating default tasks");
    let defaults = [
        NewTask {
            name: "Follow on X".to_string(),
            description: "Follow our official X account".to_string(),
            points: 5_000,
            link: "https://x.com/uniquesale_fin".to_string(),
            icon: "twitter".to_string(),
        },
        NewTask {
            name: "Join Telegram".to_string(),
            description: "Join our community Telegram channel".to_string(),
            points: 5_000,
            link: "https://t.me/uniquesalefinance".to_string(),
            icon: "telegram".to_string(),
        },
        NewTask {
            name: "Subscribe to YouTube".to_string(),
            description: "Subscribe to our YouTube channel".to_string(),
            points: 3_000,
            link: "https://youtube.com/your_channel".to_string(),
            icon: "youtube".to_string(),
        },
    ];
    for task in defaults {
        engine.add_task(task).await?;
    }
    Ok(())
}
