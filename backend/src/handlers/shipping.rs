//! HTTP handlers for shipments

use axum::{
    extract::{Path, State},
    Json,
};
use shared::Shipment;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentIdentity;
use crate::services::shipping::{
    CreateShipmentInput, DeductionReport, ShipmentService, ShipmentUpdate, UpdateShipmentInput,
};
use crate::AppState;

pub async fn create_shipment(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(input): Json<CreateShipmentInput>,
) -> AppResult<Json<Shipment>> {
    let service = ShipmentService::new(state.store);
    let shipment = service.create_shipment(&identity, input).await?;
    Ok(Json(shipment))
}

/// Update carrier details or delivery status. The first dispatch
/// deducts the order's stock.
pub async fn update_shipment(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(shipment_id): Path<Uuid>,
    Json(input): Json<UpdateShipmentInput>,
) -> AppResult<Json<ShipmentUpdate>> {
    let service = ShipmentService::new(state.store);
    let update = service.update_shipment(&identity, shipment_id, input).await?;
    Ok(Json(update))
}

pub async fn deduct_shipment_stock(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(shipment_id): Path<Uuid>,
) -> AppResult<Json<DeductionReport>> {
    let service = ShipmentService::new(state.store);
    let report = service
        .deduct_stock_for_shipment(&identity, shipment_id)
        .await?;
    Ok(Json(report))
}

pub async fn list_shipments(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> AppResult<Json<Vec<Shipment>>> {
    let service = ShipmentService::new(state.store);
    let shipments = service.list_shipments(&identity).await?;
    Ok(Json(shipments))
}

pub async fn get_shipment(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(shipment_id): Path<Uuid>,
) -> AppResult<Json<Shipment>> {
    let service = ShipmentService::new(state.store);
    let shipment = service.get_shipment(&identity, shipment_id).await?;
    Ok(Json(shipment))
}
