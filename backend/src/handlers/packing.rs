//! HTTP handlers for packing tasks

use axum::{
    extract::{Path, State},
    Json,
};
use shared::PackingTask;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentIdentity;
use crate::services::packing::{PackingResult, PackingService};
use crate::services::picking::AssignInput;
use crate::AppState;

pub async fn list_packing_tasks(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> AppResult<Json<Vec<PackingTask>>> {
    let service = PackingService::new(state.store);
    let tasks = service.list_packing_tasks(&identity).await?;
    Ok(Json(tasks))
}

pub async fn get_packing_task(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<PackingTask>> {
    let service = PackingService::new(state.store);
    let task = service.get_packing_task(&identity, task_id).await?;
    Ok(Json(task))
}

pub async fn assign_packer(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(task_id): Path<Uuid>,
    Json(input): Json<AssignInput>,
) -> AppResult<Json<PackingTask>> {
    let service = PackingService::new(state.store);
    let task = service.assign_packer(&identity, task_id, input).await?;
    Ok(Json(task))
}

pub async fn start_packing(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<PackingTask>> {
    let service = PackingService::new(state.store);
    let task = service.start_packing(&identity, task_id).await?;
    Ok(Json(task))
}

pub async fn hold_packing(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<PackingTask>> {
    let service = PackingService::new(state.store);
    let task = service.hold_packing(&identity, task_id).await?;
    Ok(Json(task))
}

pub async fn resume_packing(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<PackingTask>> {
    let service = PackingService::new(state.store);
    let task = service.resume_packing(&identity, task_id).await?;
    Ok(Json(task))
}

/// Complete packing; the response carries the order's shipment
pub async fn complete_packing(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<PackingResult>> {
    let service = PackingService::new(state.store);
    let result = service.complete_packing(&identity, task_id).await?;
    Ok(Json(result))
}

pub async fn reject_packing_assignment(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<PackingTask>> {
    let service = PackingService::new(state.store);
    let task = service.reject_packing_assignment(&identity, task_id).await?;
    Ok(Json(task))
}
