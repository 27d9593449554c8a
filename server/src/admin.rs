//! Admin task catalog, guarded by a shared password header.
//!
//! JSON endpoints under `/admin`, authenticated with the
//! `x-admin-token` header.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};

use tapfarm_engine::{Clock, Store};
use tapfarm_types::api::AdminUserRow;
use tapfarm_types::{NewTask, TaskDefinition, TaskId};

use crate::routes::{bounded, ApiError, AppState};

pub fn router<S: Store, C: Clock + 'static>() -> Router<Arc<AppState<S, C>>> {
    Router::new()
        .route("/users", get(list_users::<S, C>))
        .route("/tasks", get(list_tasks::<S, C>))
        .route("/tasks", post(add_task::<S, C>))
        .route("/tasks/:task_id", put(edit_task::<S, C>))
        .route("/tasks/:task_id", delete(delete_task::<S, C>))
}

fn require_admin<S, C>(state: &AppState<S, C>, headers: &HeaderMap) -> Result<(), ApiError> {
    let supplied = headers
        .get("x-admin-token")
        .and_then(|value| value.to_str().ok());
    if supplied == Some(state.admin_password.as_str()) {
        Ok(())
    } else {
        Err(ApiError {
            status: StatusCode::UNAUTHORIZED,
            detail: "not authenticated".to_string(),
        })
    }
}

async fn list_users<S: Store, C: Clock>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<AdminUserRow>>, ApiError> {
    require_admin(&state, &headers)?;
    let users = bounded(state.request_timeout, state.engine.list_users()).await?;
    Ok(Json(users.iter().map(AdminUserRow::from_ledger).collect()))
}

async fn list_tasks<S: Store, C: Clock>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<TaskDefinition>>, ApiError> {
    require_admin(&state, &headers)?;
    let tasks = bounded(state.request_timeout, state.engine.tasks_catalog()).await?;
    Ok(Json(tasks))
}

async fn add_task<S: Store, C: Clock>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
    Json(task): Json<NewTask>,
) -> Result<Json<TaskDefinition>, ApiError> {
    require_admin(&state, &headers)?;
    let created = bounded(state.request_timeout, state.engine.add_task(task)).await?;
    Ok(Json(created))
}

async fn edit_task<S: Store, C: Clock>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
    Path(task_id): Path<u64>,
    Json(fields): Json<NewTask>,
) -> Result<Json<TaskDefinition>, ApiError> {
    require_admin(&state, &headers)?;
    let edited = bounded(
        state.request_timeout,
        state.engine.edit_task(TaskId(task_id), fields),
    )
    .await?;
    Ok(Json(edited))
}

async fn delete_task<S: Store, C: Clock>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
    Path(task_id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers)?;
    bounded(state.request_timeout, state.engine.remove_task(TaskId(task_id))).await?;
    Ok(StatusCode::NO_CONTENT)
}
