//! HTTP handlers for purchase orders

use axum::{
    extract::{Path, State},
    Json,
};
use shared::PurchaseOrder;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentIdentity;
use crate::services::purchasing::{
    CreatePurchaseOrderInput, PurchaseOrderDetail, PurchaseOrderService,
    UpdatePurchaseOrderInput,
};
use crate::AppState;

pub async fn create_purchase_order(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(input): Json<CreatePurchaseOrderInput>,
) -> AppResult<Json<PurchaseOrderDetail>> {
    let service = PurchaseOrderService::new(state.store);
    let order = service.create_purchase_order(&identity, input).await?;
    Ok(Json(order))
}

pub async fn update_purchase_order(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(po_id): Path<Uuid>,
    Json(input): Json<UpdatePurchaseOrderInput>,
) -> AppResult<Json<PurchaseOrderDetail>> {
    let service = PurchaseOrderService::new(state.store);
    let order = service.update_purchase_order(&identity, po_id, input).await?;
    Ok(Json(order))
}

pub async fn approve_purchase_order(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(po_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    let service = PurchaseOrderService::new(state.store);
    let order = service.approve_purchase_order(&identity, po_id).await?;
    Ok(Json(order))
}

pub async fn reject_purchase_order(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(po_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    let service = PurchaseOrderService::new(state.store);
    let order = service.reject_purchase_order(&identity, po_id).await?;
    Ok(Json(order))
}

pub async fn delete_purchase_order(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(po_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = PurchaseOrderService::new(state.store);
    service.delete_purchase_order(&identity, po_id).await?;
    Ok(Json(()))
}

pub async fn list_purchase_orders(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> AppResult<Json<Vec<PurchaseOrder>>> {
    let service = PurchaseOrderService::new(state.store);
    let orders = service.list_purchase_orders(&identity).await?;
    Ok(Json(orders))
}

pub async fn get_purchase_order(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(po_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrderDetail>> {
    let service = PurchaseOrderService::new(state.store);
    let order = service.get_purchase_order(&identity, po_id).await?;
    Ok(Json(order))
}
