//! HTTP handlers for pick lists

use axum::{
    extract::{Path, State},
    Json,
};
use shared::PickList;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentIdentity;
use crate::services::picking::{AssignInput, PickListDetail, PickedQuantityInput, PickingService};
use crate::AppState;

/// List pick lists; floor workers only get their own
pub async fn list_pick_lists(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> AppResult<Json<Vec<PickList>>> {
    let service = PickingService::new(state.store);
    let pick_lists = service.list_pick_lists(&identity).await?;
    Ok(Json(pick_lists))
}

pub async fn get_pick_list(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(pick_list_id): Path<Uuid>,
) -> AppResult<Json<PickListDetail>> {
    let service = PickingService::new(state.store);
    let pick_list = service.get_pick_list(&identity, pick_list_id).await?;
    Ok(Json(pick_list))
}

pub async fn assign_picker(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(pick_list_id): Path<Uuid>,
    Json(input): Json<AssignInput>,
) -> AppResult<Json<PickListDetail>> {
    let service = PickingService::new(state.store);
    let pick_list = service.assign_picker(&identity, pick_list_id, input).await?;
    Ok(Json(pick_list))
}

pub async fn start_picking(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(pick_list_id): Path<Uuid>,
) -> AppResult<Json<PickListDetail>> {
    let service = PickingService::new(state.store);
    let pick_list = service.start_picking(&identity, pick_list_id).await?;
    Ok(Json(pick_list))
}

pub async fn update_picked_quantity(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path((pick_list_id, item_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<PickedQuantityInput>,
) -> AppResult<Json<PickListDetail>> {
    let service = PickingService::new(state.store);
    let pick_list = service
        .update_picked_quantity(&identity, pick_list_id, item_id, input)
        .await?;
    Ok(Json(pick_list))
}

pub async fn complete_picking(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(pick_list_id): Path<Uuid>,
) -> AppResult<Json<PickListDetail>> {
    let service = PickingService::new(state.store);
    let pick_list = service.complete_picking(&identity, pick_list_id).await?;
    Ok(Json(pick_list))
}

pub async fn reject_pick_assignment(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(pick_list_id): Path<Uuid>,
) -> AppResult<Json<PickListDetail>> {
    let service = PickingService::new(state.store);
    let pick_list = service.reject_assignment(&identity, pick_list_id).await?;
    Ok(Json(pick_list))
}
