//! HTTP handlers for stock records and movements

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{Movement, StockRecord};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentIdentity;
use crate::services::stock::{
    CreateMovementInput, QuantityInput, StockService, StockTotal, TotalQuery,
};
use crate::store::{MovementFilter, StockFilter};
use crate::AppState;

/// List stock records, optionally filtered by product, warehouse or location
pub async fn list_stock(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Query(filter): Query<StockFilter>,
) -> AppResult<Json<Vec<StockRecord>>> {
    let service = StockService::new(state.store);
    let records = service.list_stock(&identity, filter).await?;
    Ok(Json(records))
}

pub async fn get_stock(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(stock_id): Path<Uuid>,
) -> AppResult<Json<StockRecord>> {
    let service = StockService::new(state.store);
    let record = service.get_stock(&identity, stock_id).await?;
    Ok(Json(record))
}

/// Available quantity of a product across the tenant or one warehouse
pub async fn get_stock_total(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Query(query): Query<TotalQuery>,
) -> AppResult<Json<StockTotal>> {
    let service = StockService::new(state.store);
    let total = service
        .total_available(&identity, query.product_id, query.warehouse_id.map(|w| vec![w]))
        .await?;
    Ok(Json(total))
}

pub async fn reserve_stock(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(stock_id): Path<Uuid>,
    Json(input): Json<QuantityInput>,
) -> AppResult<Json<StockRecord>> {
    let service = StockService::new(state.store);
    let record = service.reserve(&identity, stock_id, input).await?;
    Ok(Json(record))
}

pub async fn release_stock(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(stock_id): Path<Uuid>,
    Json(input): Json<QuantityInput>,
) -> AppResult<Json<StockRecord>> {
    let service = StockService::new(state.store);
    let record = service.release(&identity, stock_id, input).await?;
    Ok(Json(record))
}

/// Record a manual movement
pub async fn create_movement(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(input): Json<CreateMovementInput>,
) -> AppResult<Json<Movement>> {
    let service = StockService::new(state.store);
    let movement = service.create_movement(&identity, input).await?;
    Ok(Json(movement))
}

pub async fn list_movements(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Query(filter): Query<MovementFilter>,
) -> AppResult<Json<Vec<Movement>>> {
    let service = StockService::new(state.store);
    let movements = service.list_movements(&identity, filter).await?;
    Ok(Json(movements))
}

pub async fn get_movement(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<Movement>> {
    let service = StockService::new(state.store);
    let movement = service.get_movement(&identity, movement_id).await?;
    Ok(Json(movement))
}
