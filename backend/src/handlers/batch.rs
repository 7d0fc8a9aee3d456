//! HTTP handlers for batch tracking

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentIdentity;
use crate::services::batch::{BatchService, BatchView, CreateBatchInput, UpdateBatchInput};
use crate::store::BatchFilter;
use crate::AppState;

/// Receive a new batch into stock
pub async fn create_batch(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(input): Json<CreateBatchInput>,
) -> AppResult<Json<BatchView>> {
    let service = BatchService::new(state.store);
    let batch = service.create_batch(&identity, input).await?;
    Ok(Json(batch))
}

pub async fn update_batch(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<UpdateBatchInput>,
) -> AppResult<Json<BatchView>> {
    let service = BatchService::new(state.store);
    let batch = service.update_batch(&identity, batch_id, input).await?;
    Ok(Json(batch))
}

pub async fn list_batches(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Query(filter): Query<BatchFilter>,
) -> AppResult<Json<Vec<BatchView>>> {
    let service = BatchService::new(state.store);
    let batches = service.list_batches(&identity, filter).await?;
    Ok(Json(batches))
}

pub async fn get_batch(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<BatchView>> {
    let service = BatchService::new(state.store);
    let batch = service.get_batch(&identity, batch_id).await?;
    Ok(Json(batch))
}
