//! HTTP handlers for returns (RMAs)

use axum::{
    extract::{Path, State},
    Json,
};
use shared::ReturnRequest;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentIdentity;
use crate::services::returns::{CreateReturnInput, InspectInput, RefundInput, ReturnService};
use crate::AppState;

pub async fn create_return(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(input): Json<CreateReturnInput>,
) -> AppResult<Json<ReturnRequest>> {
    let service = ReturnService::new(state.store);
    let rma = service.create_return(&identity, input).await?;
    Ok(Json(rma))
}

pub async fn mark_awaiting_return(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(rma_id): Path<Uuid>,
) -> AppResult<Json<ReturnRequest>> {
    let service = ReturnService::new(state.store);
    let rma = service.mark_awaiting_return(&identity, rma_id).await?;
    Ok(Json(rma))
}

pub async fn receive_return(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(rma_id): Path<Uuid>,
) -> AppResult<Json<ReturnRequest>> {
    let service = ReturnService::new(state.store);
    let rma = service.receive_return(&identity, rma_id).await?;
    Ok(Json(rma))
}

pub async fn start_return_inspection(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(rma_id): Path<Uuid>,
) -> AppResult<Json<ReturnRequest>> {
    let service = ReturnService::new(state.store);
    let rma = service.start_inspection(&identity, rma_id).await?;
    Ok(Json(rma))
}

pub async fn inspect_return(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(rma_id): Path<Uuid>,
    Json(input): Json<InspectInput>,
) -> AppResult<Json<ReturnRequest>> {
    let service = ReturnService::new(state.store);
    let rma = service.inspect_return(&identity, rma_id, input).await?;
    Ok(Json(rma))
}

pub async fn refund_return(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(rma_id): Path<Uuid>,
    Json(input): Json<RefundInput>,
) -> AppResult<Json<ReturnRequest>> {
    let service = ReturnService::new(state.store);
    let rma = service.refund_return(&identity, rma_id, input).await?;
    Ok(Json(rma))
}

pub async fn close_return(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(rma_id): Path<Uuid>,
) -> AppResult<Json<ReturnRequest>> {
    let service = ReturnService::new(state.store);
    let rma = service.close_return(&identity, rma_id).await?;
    Ok(Json(rma))
}

pub async fn list_returns(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> AppResult<Json<Vec<ReturnRequest>>> {
    let service = ReturnService::new(state.store);
    let returns = service.list_returns(&identity).await?;
    Ok(Json(returns))
}

pub async fn get_return(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(rma_id): Path<Uuid>,
) -> AppResult<Json<ReturnRequest>> {
    let service = ReturnService::new(state.store);
    let rma = service.get_return(&identity, rma_id).await?;
    Ok(Json(rma))
}
