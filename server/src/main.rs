use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use tracing::{info, warn, Level};

use tapfarm_engine::{Engine, EngineConfig, MemoryStore, SystemClock};
use tapfarm_server::{
    build_router, seed_default_tasks, AppState, AuthConfig, ServerConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("tapfarm-server")
        .about("Backend for the tapfarm Telegram mini-app")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("YAML config file"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .value_name("PORT")
                .value_parser(clap::value_parser!(u16))
                .help("Override the configured listen port"),
        )
        .arg(
            Arg::new("dev-mode")
                .long("dev-mode")
                .action(ArgAction::SetTrue)
                .help("Bypass Telegram authentication with a mock identity"),
        )
        .get_matches();

    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let mut config = ServerConfig::load(config_path.as_deref()).context("load config")?;
    if let Some(port) = matches.get_one::<u16>("port") {
        config.port = *port;
    }
    if matches.get_flag("dev-mode") {
        config.dev_mode = true;
    }
    if config.bot_token.is_none() && !config.dev_mode {
        warn!("no bot token configured; player requests will be rejected");
    }

    let engine = Engine::new(MemoryStore::new(), SystemClock, EngineConfig::default());
    seed_default_tasks(&engine).await.context("seed tasks")?;

    let state = Arc::new(AppState {
        engine,
        auth: AuthConfig {
            bot_token: config.bot_token.clone(),
            dev_mode: config.dev_mode,
        },
        admin_password: config.admin_password.clone(),
        request_timeout: Duration::from_secs(config.request_timeout_secs),
    });
    let router = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(%addr, dev_mode = config.dev_mode, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to install shutdown handler");
    }
}
