//! Sales orders, the entry point of the fulfillment pipeline
//!
//! A confirmed order owns exactly one pick list and one packing task.
//! Order status moves forward as the floor work completes; the helpers
//! here are shared by the picking, packing and shipping services.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    order_total, validate_quantity, Action, Identity, Lifecycle, OrderItem, OrderStatus,
    PackingStatus, PackingTask, PickList, PickListItem, PickListStatus, Priority, SalesOrder,
    SequenceKind,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::ledger::{self, Placement};
use super::{authorize, field_error, next_number};
use crate::error::{AppError, AppResult};
use crate::store::{Store, UnitOfWork};

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i64,
    #[serde(default)]
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub customer_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub priority: Option<Priority>,
    pub order_date: Option<NaiveDate>,
    pub required_date: Option<NaiveDate>,
    pub sales_channel: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrderInput {
    pub customer_id: Option<Uuid>,
    pub priority: Option<Priority>,
    pub required_date: Option<NaiveDate>,
    pub sales_channel: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub items: Option<Vec<OrderItemInput>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
}

/// An order with its items and the ids of its downstream work
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: SalesOrder,
    pub items: Vec<OrderItem>,
    pub pick_list_id: Option<Uuid>,
    pub packing_task_id: Option<Uuid>,
    pub shipment_id: Option<Uuid>,
}

/// Moves the order to `next` when its current status is one of `when`;
/// otherwise leaves it alone
pub(crate) async fn advance_order(
    uow: &mut dyn UnitOfWork,
    tenant_id: Uuid,
    order_id: Uuid,
    when: &[OrderStatus],
    next: OrderStatus,
) -> AppResult<SalesOrder> {
    let mut order = uow
        .sales_order(tenant_id, order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    if when.contains(&order.status) {
        order.status = order.status.transition(next)?;
        order.updated_at = Utc::now();
        uow.save_sales_order(&order).await?;
        debug!(order = %order.order_number, status = %order.status, "Order advanced");
    }
    Ok(order)
}

async fn build_items(
    uow: &mut dyn UnitOfWork,
    tenant_id: Uuid,
    order_id: Uuid,
    items: &[OrderItemInput],
) -> AppResult<Vec<OrderItem>> {
    let mut built = Vec::with_capacity(items.len());
    for item in items {
        validate_quantity(item.quantity).map_err(field_error("quantity"))?;
        if item.unit_price < Decimal::ZERO {
            return Err(AppError::validation("unit_price", "Unit price cannot be negative"));
        }
        uow.product(tenant_id, item.product_id)
            .await?
            .ok_or_else(|| AppError::validation("items", "Unknown product on order item"))?;

        built.push(OrderItem::new(
            order_id,
            item.product_id,
            item.quantity,
            item.unit_price,
        ));
    }
    Ok(built)
}

/// Explicit warehouse, else the caller's assigned one, else the tenant's
/// first. `None` when the tenant has no warehouse at all.
async fn fulfillment_warehouse(
    uow: &mut dyn UnitOfWork,
    identity: &Identity,
    requested: Option<Uuid>,
) -> AppResult<Option<Uuid>> {
    let warehouses = uow.warehouses(identity.tenant_id).await?;

    if let Some(id) = requested {
        return if warehouses.iter().any(|w| w.id == id) {
            Ok(Some(id))
        } else {
            Err(AppError::not_found("Warehouse"))
        };
    }

    let assigned = identity
        .warehouse_id
        .filter(|id| warehouses.iter().any(|w| w.id == *id));

    Ok(assigned.or_else(|| warehouses.first().map(|w| w.id)))
}

/// Pick list items mirroring the order items, each pointing at the first
/// stocked location in the warehouse when there is one
async fn pick_items(
    uow: &mut dyn UnitOfWork,
    pick_list: &PickList,
    items: &[OrderItem],
) -> AppResult<Vec<PickListItem>> {
    let mut built = Vec::with_capacity(items.len());
    for item in items {
        let source = ledger::resolve_source(
            uow,
            pick_list.tenant_id,
            item.product_id,
            Placement::warehouse(pick_list.warehouse_id),
            None,
        )
        .await?;

        built.push(PickListItem {
            id: Uuid::new_v4(),
            pick_list_id: pick_list.id,
            product_id: item.product_id,
            location_id: source.and_then(|r| r.location_id),
            quantity_required: item.quantity,
            quantity_picked: 0,
        });
    }
    Ok(built)
}

/// Creates the pick list and packing task for a newly confirmed order
async fn spawn_work(
    uow: &mut dyn UnitOfWork,
    order: &SalesOrder,
    warehouse_id: Uuid,
    items: &[OrderItem],
) -> AppResult<(PickList, PackingTask)> {
    let now = Utc::now();
    let pick_list = PickList {
        id: Uuid::new_v4(),
        tenant_id: order.tenant_id,
        order_id: order.id,
        warehouse_id,
        status: PickListStatus::NotStarted,
        assigned_to: None,
        started_at: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };
    uow.save_pick_list(&pick_list).await?;

    let lines = pick_items(uow, &pick_list, items).await?;
    uow.replace_pick_list_items(pick_list.id, &lines).await?;

    let packing_task = new_packing_task(order, &pick_list);
    uow.save_packing_task(&packing_task).await?;

    Ok((pick_list, packing_task))
}

pub(crate) fn new_packing_task(order: &SalesOrder, pick_list: &PickList) -> PackingTask {
    let now = Utc::now();
    PackingTask {
        id: Uuid::new_v4(),
        tenant_id: order.tenant_id,
        order_id: order.id,
        pick_list_id: pick_list.id,
        status: PackingStatus::NotStarted,
        assigned_to: None,
        notes: None,
        started_at: None,
        completed_at: None,
        created_at: now,
        updated_at: now,
    }
}

async fn load_detail(uow: &mut dyn UnitOfWork, order: SalesOrder) -> AppResult<OrderDetail> {
    let items = uow.order_items(order.id).await?;
    let pick_list = uow.pick_list_for_order(order.tenant_id, order.id).await?;
    let packing_task = match &pick_list {
        Some(pick_list) => {
            uow.packing_task_for_pick_list(order.tenant_id, pick_list.id)
                .await?
        }
        None => None,
    };
    let shipment = uow.shipment_for_order(order.tenant_id, order.id).await?;

    Ok(OrderDetail {
        order,
        items,
        pick_list_id: pick_list.map(|p| p.id),
        packing_task_id: packing_task.map(|t| t.id),
        shipment_id: shipment.map(|s| s.id),
    })
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates the order. With at least one item and a warehouse to pick
    /// from it is confirmed straight away and its floor work is spawned;
    /// otherwise it stays DRAFT.
    pub async fn create_order(
        &self,
        identity: &Identity,
        input: CreateOrderInput,
    ) -> AppResult<OrderDetail> {
        authorize(identity, Action::CreateOrder)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;

        let id = Uuid::new_v4();
        let items = build_items(uow.as_mut(), tenant_id, id, &input.items).await?;
        let warehouse_id =
            fulfillment_warehouse(uow.as_mut(), identity, input.warehouse_id).await?;

        let now = Utc::now();
        let mut order = SalesOrder {
            id,
            tenant_id,
            order_number: next_number(uow.as_mut(), tenant_id, SequenceKind::SalesOrder).await?,
            customer_id: input.customer_id,
            warehouse_id,
            status: OrderStatus::Draft,
            priority: input.priority.unwrap_or_default(),
            order_date: input.order_date.unwrap_or_else(|| now.date_naive()),
            required_date: input.required_date,
            sales_channel: input.sales_channel,
            reference: input.reference,
            notes: input.notes,
            total_amount: order_total(&items),
            created_by: identity.user_id,
            created_at: now,
            updated_at: now,
        };

        let confirm_in = warehouse_id.filter(|_| !items.is_empty());
        if confirm_in.is_some() {
            order.status = order.status.transition(OrderStatus::Confirmed)?;
        }

        uow.save_sales_order(&order).await?;
        uow.replace_order_items(order.id, &items).await?;

        let (pick_list_id, packing_task_id) = match confirm_in {
            Some(warehouse_id) => {
                let (pick_list, task) =
                    spawn_work(uow.as_mut(), &order, warehouse_id, &items).await?;
                (Some(pick_list.id), Some(task.id))
            }
            None => (None, None),
        };
        uow.commit().await?;

        info!(
            tenant_id = %tenant_id,
            order = %order.order_number,
            status = %order.status,
            items = items.len(),
            "Order created"
        );
        Ok(OrderDetail {
            order,
            items,
            pick_list_id,
            packing_task_id,
            shipment_id: None,
        })
    }

    /// Edits a DRAFT or CONFIRMED order. Replacing the items of a
    /// confirmed order rebuilds its pick list.
    pub async fn update_order(
        &self,
        identity: &Identity,
        id: Uuid,
        input: UpdateOrderInput,
    ) -> AppResult<OrderDetail> {
        authorize(identity, Action::ManageOrders)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut order = uow
            .sales_order(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;

        if !order.status.is_editable() {
            return Err(AppError::InvalidTransition(format!(
                "order {} cannot be edited while {}",
                order.order_number, order.status
            )));
        }

        if let Some(items) = input.items {
            let items = build_items(uow.as_mut(), tenant_id, order.id, &items).await?;
            if items.is_empty() && order.status == OrderStatus::Confirmed {
                return Err(AppError::validation(
                    "items",
                    "A confirmed order needs at least one item",
                ));
            }
            uow.replace_order_items(order.id, &items).await?;
            order.total_amount = order_total(&items);

            if let Some(pick_list) = uow.pick_list_for_order(tenant_id, order.id).await? {
                let rebuilt = pick_items(uow.as_mut(), &pick_list, &items).await?;
                uow.replace_pick_list_items(pick_list.id, &rebuilt).await?;
            }
        }

        if input.customer_id.is_some() {
            order.customer_id = input.customer_id;
        }
        order.priority = input.priority.unwrap_or(order.priority);
        if input.required_date.is_some() {
            order.required_date = input.required_date;
        }
        if input.sales_channel.is_some() {
            order.sales_channel = input.sales_channel;
        }
        if input.reference.is_some() {
            order.reference = input.reference;
        }
        if input.notes.is_some() {
            order.notes = input.notes;
        }
        order.updated_at = Utc::now();
        uow.save_sales_order(&order).await?;

        let detail = load_detail(uow.as_mut(), order).await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, order = %detail.order.order_number, "Order updated");
        Ok(detail)
    }

    pub async fn confirm_order(&self, identity: &Identity, id: Uuid) -> AppResult<OrderDetail> {
        authorize(identity, Action::ManageOrders)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut order = uow
            .sales_order(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;

        order.status = order.status.transition(OrderStatus::Confirmed)?;

        let items = uow.order_items(order.id).await?;
        if items.is_empty() {
            return Err(AppError::validation(
                "items",
                "An order needs at least one item to be confirmed",
            ));
        }
        let warehouse_id = fulfillment_warehouse(uow.as_mut(), identity, order.warehouse_id)
            .await?
            .ok_or_else(|| AppError::validation("warehouse_id", "No warehouse is available"))?;

        order.warehouse_id = Some(warehouse_id);
        order.updated_at = Utc::now();
        uow.save_sales_order(&order).await?;
        spawn_work(uow.as_mut(), &order, warehouse_id, &items).await?;

        let detail = load_detail(uow.as_mut(), order).await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, order = %detail.order.order_number, "Order confirmed");
        Ok(detail)
    }

    /// Cancels a DRAFT or CONFIRMED order and removes its floor work
    pub async fn cancel_order(&self, identity: &Identity, id: Uuid) -> AppResult<SalesOrder> {
        authorize(identity, Action::ManageOrders)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut order = uow
            .sales_order(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;

        order.status = order.status.transition(OrderStatus::Cancelled)?;

        if let Some(pick_list) = uow.pick_list_for_order(tenant_id, order.id).await? {
            if let Some(task) = uow.packing_task_for_pick_list(tenant_id, pick_list.id).await? {
                uow.delete_packing_task(tenant_id, task.id).await?;
            }
            uow.delete_pick_list(tenant_id, pick_list.id).await?;
        }

        order.updated_at = Utc::now();
        uow.save_sales_order(&order).await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, order = %order.order_number, "Order cancelled");
        Ok(order)
    }

    pub async fn list_orders(
        &self,
        identity: &Identity,
        query: OrderQuery,
    ) -> AppResult<Vec<SalesOrder>> {
        authorize(identity, Action::ViewOperations)?;

        let mut uow = self.store.begin().await?;
        uow.sales_orders(identity.tenant_id, query.status).await
    }

    pub async fn get_order(&self, identity: &Identity, id: Uuid) -> AppResult<OrderDetail> {
        authorize(identity, Action::ViewOperations)?;

        let mut uow = self.store.begin().await?;
        let order = uow
            .sales_order(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;

        load_detail(uow.as_mut(), order).await
    }
}
