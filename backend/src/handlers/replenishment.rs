//! HTTP handlers for replenishment configs, suggestions and tasks

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{ReplenishmentConfig, ReplenishmentSuggestion, ReplenishmentTask};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentIdentity;
use crate::services::replenishment::{
    AutoCheckResult, CreateConfigInput, CreateTaskInput, MaterializeInput, ReplenishmentService,
    TaskQuery, UpdateConfigInput, UpdateTaskInput,
};
use crate::AppState;

// ============================================================================
// Configs
// ============================================================================

pub async fn create_replenishment_config(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(input): Json<CreateConfigInput>,
) -> AppResult<Json<ReplenishmentConfig>> {
    let service = ReplenishmentService::new(state.store);
    let config = service.create_config(&identity, input).await?;
    Ok(Json(config))
}

pub async fn update_replenishment_config(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(config_id): Path<Uuid>,
    Json(input): Json<UpdateConfigInput>,
) -> AppResult<Json<ReplenishmentConfig>> {
    let service = ReplenishmentService::new(state.store);
    let config = service.update_config(&identity, config_id, input).await?;
    Ok(Json(config))
}

pub async fn delete_replenishment_config(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(config_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = ReplenishmentService::new(state.store);
    service.delete_config(&identity, config_id).await?;
    Ok(Json(()))
}

pub async fn get_replenishment_config(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(config_id): Path<Uuid>,
) -> AppResult<Json<ReplenishmentConfig>> {
    let service = ReplenishmentService::new(state.store);
    let config = service.get_config(&identity, config_id).await?;
    Ok(Json(config))
}

pub async fn list_replenishment_configs(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> AppResult<Json<Vec<ReplenishmentConfig>>> {
    let service = ReplenishmentService::new(state.store);
    let configs = service.list_configs(&identity).await?;
    Ok(Json(configs))
}

// ============================================================================
// Evaluation
// ============================================================================

/// Products currently below their reorder point
pub async fn evaluate_replenishment(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> AppResult<Json<Vec<ReplenishmentSuggestion>>> {
    let service = ReplenishmentService::new(state.store);
    let suggestions = service.evaluate(&identity).await?;
    Ok(Json(suggestions))
}

pub async fn materialize_replenishment(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(input): Json<MaterializeInput>,
) -> AppResult<Json<Vec<ReplenishmentTask>>> {
    let service = ReplenishmentService::new(state.store);
    let tasks = service.materialize(&identity, input).await?;
    Ok(Json(tasks))
}

pub async fn run_replenishment_check(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> AppResult<Json<AutoCheckResult>> {
    let service = ReplenishmentService::new(state.store);
    let result = service.run_auto_check(&identity).await?;
    Ok(Json(result))
}

// ============================================================================
// Tasks
// ============================================================================

pub async fn create_replenishment_task(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(input): Json<CreateTaskInput>,
) -> AppResult<Json<ReplenishmentTask>> {
    let service = ReplenishmentService::new(state.store);
    let task = service.create_task(&identity, input).await?;
    Ok(Json(task))
}

pub async fn update_replenishment_task(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(task_id): Path<Uuid>,
    Json(input): Json<UpdateTaskInput>,
) -> AppResult<Json<ReplenishmentTask>> {
    let service = ReplenishmentService::new(state.store);
    let task = service.update_task(&identity, task_id, input).await?;
    Ok(Json(task))
}

pub async fn start_replenishment_task(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<ReplenishmentTask>> {
    let service = ReplenishmentService::new(state.store);
    let task = service.start_task(&identity, task_id).await?;
    Ok(Json(task))
}

pub async fn cancel_replenishment_task(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<ReplenishmentTask>> {
    let service = ReplenishmentService::new(state.store);
    let task = service.cancel_task(&identity, task_id).await?;
    Ok(Json(task))
}

/// Perform the transfer and complete the task
pub async fn complete_replenishment_task(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<ReplenishmentTask>> {
    let service = ReplenishmentService::new(state.store);
    let task = service.complete_task(&identity, task_id).await?;
    Ok(Json(task))
}

pub async fn list_replenishment_tasks(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Query(query): Query<TaskQuery>,
) -> AppResult<Json<Vec<ReplenishmentTask>>> {
    let service = ReplenishmentService::new(state.store);
    let tasks = service.list_tasks(&identity, query).await?;
    Ok(Json(tasks))
}

pub async fn get_replenishment_task(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<ReplenishmentTask>> {
    let service = ReplenishmentService::new(state.store);
    let task = service.get_task(&identity, task_id).await?;
    Ok(Json(task))
}
