//! Player-facing JSON routes.
//!
//! Route paths and payload shapes match what the mini-app frontend
//! already speaks. Handlers are thin: authenticate, invoke one engine
//! operation under the request deadline, map the result.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::error;

use tapfarm_engine::{Clock, Engine, EngineError, Store};
use tapfarm_types::api::{
    FriendResponse, GameResultRequest, GameResultResponse, LeaderboardEntry, LeaderboardResponse,
    SyncRequest, TaskResponse, UserDataResponse, WalletSaveRequest,
};
use tapfarm_types::{TaskId, TelegramIdentity};

use crate::admin;
use crate::auth::{authenticate, AuthConfig, AuthError};

pub struct AppState<S, C> {
    pub engine: Engine<S, C>,
    pub auth: AuthConfig,
    pub admin_password: String,
    pub request_timeout: Duration,
}

impl<S: Store, C: Clock> AppState<S, C> {
    pub fn identity(&self, headers: &HeaderMap) -> Result<TelegramIdentity, ApiError> {
        let header = headers
            .get("telegram-data")
            .and_then(|value| value.to_str().ok());
        Ok(authenticate(&self.auth, header)?)
    }
}

/// Error payload in the `{"detail": ...}` shape the frontend expects.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, detail = %self.detail, "request failed");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match &err {
            EngineError::UserNotFound | EngineError::TaskNotFound => StatusCode::NOT_FOUND,
            EngineError::AlreadyClaimed | EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            EngineError::InsufficientSessions => StatusCode::FORBIDDEN,
            EngineError::Conflict => StatusCode::CONFLICT,
            EngineError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = match err {
            AuthError::BotTokenMissing => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

/// Run an engine operation under the request deadline; an elapsed
/// deadline surfaces as 503 with no partial state committed.
pub async fn bounded<T>(
    deadline: Duration,
    op: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, ApiError> {
    match tokio::time::timeout(deadline, op).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ApiError::from(EngineError::Unavailable(anyhow!(
            "request deadline elapsed"
        )))),
    }
}

pub fn build_router<S: Store, C: Clock + 'static>(state: Arc<AppState<S, C>>) -> Router {
    Router::new()
        .route("/get_user_data", get(get_user_data::<S, C>))
        .route("/claim_rewards", post(claim_rewards::<S, C>))
        .route("/sync_score", post(sync_score::<S, C>))
        .route("/submit_game_score", post(submit_game_score::<S, C>))
        .route("/save_wallet", post(save_wallet::<S, C>))
        .route("/leaderboard", get(leaderboard::<S, C>))
        .route("/tasks", get(tasks::<S, C>))
        .route("/claim_task/:task_id", post(claim_task::<S, C>))
        .route("/friends", get(friends::<S, C>))
        .nest("/admin", admin::router::<S, C>())
        .with_state(state)
}

fn user_response<S: Store, C: Clock>(
    state: &AppState<S, C>,
    snapshot: &tapfarm_engine::UserSnapshot,
) -> UserDataResponse {
    UserDataResponse::from_ledger(
        &snapshot.user,
        state.engine.config().max_sessions,
        snapshot.claimable_rewards,
    )
}

async fn get_user_data<S: Store, C: Clock>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
) -> Result<Json<UserDataResponse>, ApiError> {
    let identity = state.identity(&headers)?;
    let snapshot = bounded(state.request_timeout, state.engine.touch_user(&identity)).await?;
    Ok(Json(user_response(&state, &snapshot)))
}

async fn claim_rewards<S: Store, C: Clock>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
) -> Result<Json<UserDataResponse>, ApiError> {
    let identity = state.identity(&headers)?;
    let snapshot = bounded(
        state.request_timeout,
        state.engine.claim_rewards(identity.id),
    )
    .await?;
    Ok(Json(user_response(&state, &snapshot)))
}

async fn sync_score<S: Store, C: Clock>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
    Json(request): Json<SyncRequest>,
) -> Result<Json<UserDataResponse>, ApiError> {
    let identity = state.identity(&headers)?;
    let snapshot = bounded(
        state.request_timeout,
        state.engine.sync_taps(identity.id, request.taps),
    )
    .await?;
    Ok(Json(user_response(&state, &snapshot)))
}

async fn submit_game_score<S: Store, C: Clock>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
    Json(request): Json<GameResultRequest>,
) -> Result<Json<GameResultResponse>, ApiError> {
    let identity = state.identity(&headers)?;
    let outcome = bounded(
        state.request_timeout,
        state
            .engine
            .submit_game_result(identity.id, request.points_earned),
    )
    .await?;
    Ok(Json(GameResultResponse {
        status: "success".to_string(),
        new_score: outcome.new_score,
        sessions_left: outcome.sessions_left,
    }))
}

async fn save_wallet<S: Store, C: Clock>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
    Json(request): Json<WalletSaveRequest>,
) -> Result<Json<UserDataResponse>, ApiError> {
    let identity = state.identity(&headers)?;
    let snapshot = bounded(
        state.request_timeout,
        state
            .engine
            .save_wallet(identity.id, &request.wallet_address),
    )
    .await?;
    Ok(Json(user_response(&state, &snapshot)))
}

async fn leaderboard<S: Store, C: Clock>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let identity = state.identity(&headers)?;
    let board = bounded(state.request_timeout, state.engine.leaderboard(identity.id)).await?;
    let top_users = board
        .top
        .iter()
        .enumerate()
        .map(|(index, user)| LeaderboardEntry {
            rank: index as u32 + 1,
            username: Some(user.display_name().to_string()),
            score: user.score,
        })
        .collect();
    Ok(Json(LeaderboardResponse {
        top_users,
        current_user_rank: board.caller_rank,
    }))
}

async fn tasks<S: Store, C: Clock>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let identity = state.identity(&headers)?;
    let tasks = bounded(state.request_timeout, state.engine.tasks_for(identity.id)).await?;
    Ok(Json(
        tasks
            .iter()
            .map(|(task, completed)| TaskResponse::from_task(task, *completed))
            .collect(),
    ))
}

async fn claim_task<S: Store, C: Clock>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
    Path(task_id): Path<u64>,
) -> Result<Json<TaskResponse>, ApiError> {
    let identity = state.identity(&headers)?;
    let task = bounded(
        state.request_timeout,
        state.engine.claim_task(identity.id, TaskId(task_id)),
    )
    .await?;
    Ok(Json(TaskResponse::from_task(&task, true)))
}

async fn friends<S: Store, C: Clock>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<FriendResponse>>, ApiError> {
    let identity = state.identity(&headers)?;
    let friends = bounded(state.request_timeout, state.engine.friends(identity.id)).await?;
    Ok(Json(
        friends
            .iter()
            .map(|friend| FriendResponse {
                username: Some(friend.display_name().to_string()),
                score: friend.score,
            })
            .collect(),
    ))
}
