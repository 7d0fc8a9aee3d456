//! HTTP handlers for inventory adjustments

use axum::{
    extract::{Path, State},
    Json,
};
use shared::InventoryAdjustment;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentIdentity;
use crate::services::adjustment::{AdjustmentService, CreateAdjustmentInput};
use crate::AppState;

pub async fn create_adjustment(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(input): Json<CreateAdjustmentInput>,
) -> AppResult<Json<InventoryAdjustment>> {
    let service = AdjustmentService::new(state.store);
    let adjustment = service.create_adjustment(&identity, input).await?;
    Ok(Json(adjustment))
}

pub async fn list_adjustments(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> AppResult<Json<Vec<InventoryAdjustment>>> {
    let service = AdjustmentService::new(state.store);
    let adjustments = service.list_adjustments(&identity).await?;
    Ok(Json(adjustments))
}

pub async fn get_adjustment(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(adjustment_id): Path<Uuid>,
) -> AppResult<Json<InventoryAdjustment>> {
    let service = AdjustmentService::new(state.store);
    let adjustment = service.get_adjustment(&identity, adjustment_id).await?;
    Ok(Json(adjustment))
}
