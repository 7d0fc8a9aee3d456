//! HTTP handlers for sales orders

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::SalesOrder;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentIdentity;
use crate::services::orders::{
    CreateOrderInput, OrderDetail, OrderQuery, OrderService, UpdateOrderInput,
};
use crate::AppState;

pub async fn create_order(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<Json<OrderDetail>> {
    let service = OrderService::new(state.store);
    let order = service.create_order(&identity, input).await?;
    Ok(Json(order))
}

pub async fn update_order(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateOrderInput>,
) -> AppResult<Json<OrderDetail>> {
    let service = OrderService::new(state.store);
    let order = service.update_order(&identity, order_id, input).await?;
    Ok(Json(order))
}

pub async fn confirm_order(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    let service = OrderService::new(state.store);
    let order = service.confirm_order(&identity, order_id).await?;
    Ok(Json(order))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<SalesOrder>> {
    let service = OrderService::new(state.store);
    let order = service.cancel_order(&identity, order_id).await?;
    Ok(Json(order))
}

pub async fn list_orders(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Query(query): Query<OrderQuery>,
) -> AppResult<Json<Vec<SalesOrder>>> {
    let service = OrderService::new(state.store);
    let orders = service.list_orders(&identity, query).await?;
    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    let service = OrderService::new(state.store);
    let order = service.get_order(&identity, order_id).await?;
    Ok(Json(order))
}
