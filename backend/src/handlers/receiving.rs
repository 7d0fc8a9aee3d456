//! HTTP handlers for goods receipts

use axum::{
    extract::{Path, State},
    Json,
};
use shared::GoodsReceipt;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentIdentity;
use crate::services::receiving::{
    CreateReceiptInput, GoodsReceiptDetail, GoodsReceiptService, ReceiveInput,
};
use crate::AppState;

pub async fn create_goods_receipt(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(input): Json<CreateReceiptInput>,
) -> AppResult<Json<GoodsReceiptDetail>> {
    let service = GoodsReceiptService::new(state.store);
    let receipt = service.create_receipt(&identity, input).await?;
    Ok(Json(receipt))
}

/// Report received quantities for some or all lines
pub async fn receive_goods(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(receipt_id): Path<Uuid>,
    Json(input): Json<ReceiveInput>,
) -> AppResult<Json<GoodsReceiptDetail>> {
    let service = GoodsReceiptService::new(state.store);
    let receipt = service.receive(&identity, receipt_id, input).await?;
    Ok(Json(receipt))
}

pub async fn delete_goods_receipt(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(receipt_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = GoodsReceiptService::new(state.store);
    service.delete_receipt(&identity, receipt_id).await?;
    Ok(Json(()))
}

pub async fn list_goods_receipts(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> AppResult<Json<Vec<GoodsReceipt>>> {
    let service = GoodsReceiptService::new(state.store);
    let receipts = service.list_receipts(&identity).await?;
    Ok(Json(receipts))
}

pub async fn get_goods_receipt(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(receipt_id): Path<Uuid>,
) -> AppResult<Json<GoodsReceiptDetail>> {
    let service = GoodsReceiptService::new(state.store);
    let receipt = service.get_receipt(&identity, receipt_id).await?;
    Ok(Json(receipt))
}
