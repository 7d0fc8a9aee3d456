//! HTTP handlers for cycle counts

use axum::{
    extract::{Path, State},
    Json,
};
use shared::CycleCount;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentIdentity;
use crate::services::cycle_count::{
    CompleteCycleCountInput, CreateCycleCountInput, CycleCountDetail, CycleCountService,
};
use crate::AppState;

pub async fn create_cycle_count(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(input): Json<CreateCycleCountInput>,
) -> AppResult<Json<CycleCount>> {
    let service = CycleCountService::new(state.store);
    let count = service.create_cycle_count(&identity, input).await?;
    Ok(Json(count))
}

pub async fn start_cycle_count(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(count_id): Path<Uuid>,
) -> AppResult<Json<CycleCount>> {
    let service = CycleCountService::new(state.store);
    let count = service.start_cycle_count(&identity, count_id).await?;
    Ok(Json(count))
}

/// Record counted quantities and reconcile the ledger
pub async fn complete_cycle_count(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(count_id): Path<Uuid>,
    Json(input): Json<CompleteCycleCountInput>,
) -> AppResult<Json<CycleCountDetail>> {
    let service = CycleCountService::new(state.store);
    let detail = service
        .complete_cycle_count(&identity, count_id, input)
        .await?;
    Ok(Json(detail))
}

pub async fn list_cycle_counts(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> AppResult<Json<Vec<CycleCount>>> {
    let service = CycleCountService::new(state.store);
    let counts = service.list_cycle_counts(&identity).await?;
    Ok(Json(counts))
}

pub async fn get_cycle_count(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(count_id): Path<Uuid>,
) -> AppResult<Json<CycleCountDetail>> {
    let service = CycleCountService::new(state.store);
    let detail = service.get_cycle_count(&identity, count_id).await?;
    Ok(Json(detail))
}
