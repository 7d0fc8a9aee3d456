//! Shipments and the one-time stock deduction
//!
//! Stock leaves the ledger exactly once per shipment: when its delivery
//! status first crosses from a pre-ship status into SHIPPED, IN_TRANSIT or
//! DELIVERED. The `stock_deducted` flag makes later crossings no-ops.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    Action, DeliveryStatus, Identity, Lifecycle, Movement, MovementType, OrderStatus, Shipment,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{authorize, ledger};
use crate::error::{AppError, AppResult};
use crate::store::{Store, UnitOfWork};

#[derive(Clone)]
pub struct ShipmentService {
    store: Arc<dyn Store>,
}

#[derive(Debug, Deserialize)]
pub struct CreateShipmentInput {
    pub order_id: Uuid,
    pub courier: Option<String>,
    pub tracking_number: Option<String>,
    pub weight: Option<Decimal>,
    pub dispatch_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateShipmentInput {
    pub courier: Option<String>,
    pub tracking_number: Option<String>,
    pub weight: Option<Decimal>,
    pub dispatch_date: Option<NaiveDate>,
    pub delivery_status: Option<DeliveryStatus>,
}

/// A product that could not be fully deducted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortfall {
    pub product_id: Uuid,
    pub requested: i64,
    pub deducted: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeductionReport {
    pub shipment_id: Uuid,
    pub deducted: i64,
    pub shortfall: Vec<Shortfall>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShipmentUpdate {
    #[serde(flatten)]
    pub shipment: Shipment,
    pub deduction: Option<DeductionReport>,
}

/// Debits every order item once. Records in the pick list's warehouse are
/// drawn first, then the rest of the tenant's stock. Missing stock is
/// reported and logged; it does not fail the deduction.
async fn deduct(
    uow: &mut dyn UnitOfWork,
    identity: &Identity,
    shipment: &mut Shipment,
) -> AppResult<DeductionReport> {
    let tenant_id = shipment.tenant_id;
    let preferred = uow
        .pick_list_for_order(tenant_id, shipment.order_id)
        .await?
        .map(|p| p.warehouse_id);

    let mut deducted = 0;
    let mut shortfall = Vec::new();

    // product order keeps row locks in a stable sequence across shipments
    let mut items = uow.order_items(shipment.order_id).await?;
    items.sort_by_key(|i| i.product_id);

    for item in items {
        let mut records = uow
            .stock_for_product(tenant_id, item.product_id, None)
            .await?;
        // stable: keeps ledger order inside each group
        records.sort_by_key(|r| Some(r.warehouse_id) != preferred);

        let mut remaining = item.quantity;
        for mut record in records {
            if remaining == 0 {
                break;
            }
            let taken = record.consume_up_to(remaining);
            if taken == 0 {
                continue;
            }
            ledger::persist(uow, &record).await?;

            let movement = Movement::new(
                tenant_id,
                MovementType::Pick,
                item.product_id,
                taken,
                identity.user_id,
            )
            .from(record.location_id)
            .reason("Shipment dispatch")
            .reference("shipment", shipment.id);
            uow.insert_movement(&movement).await?;

            remaining -= taken;
            deducted += taken;
        }

        if remaining > 0 {
            warn!(
                tenant_id = %tenant_id,
                shipment_id = %shipment.id,
                product_id = %item.product_id,
                requested = item.quantity,
                missing = remaining,
                "Shipment deducted less than ordered"
            );
            shortfall.push(Shortfall {
                product_id: item.product_id,
                requested: item.quantity,
                deducted: item.quantity - remaining,
            });
        }
    }

    shipment.stock_deducted = true;
    shipment.updated_at = Utc::now();
    uow.save_shipment(shipment).await?;

    info!(
        tenant_id = %tenant_id,
        shipment_id = %shipment.id,
        deducted,
        short = shortfall.len(),
        "Shipment stock deducted"
    );
    Ok(DeductionReport {
        shipment_id: shipment.id,
        deducted,
        shortfall,
    })
}

impl ShipmentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Opens the shipment for a PACKED order; an order has at most one
    pub async fn create_shipment(
        &self,
        identity: &Identity,
        input: CreateShipmentInput,
    ) -> AppResult<Shipment> {
        authorize(identity, Action::ManageShipments)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let order = uow
            .sales_order(tenant_id, input.order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;

        if order.status != OrderStatus::Packed {
            return Err(AppError::InvalidTransition(format!(
                "a shipment needs a PACKED order, {} is {}",
                order.order_number, order.status
            )));
        }
        if uow.shipment_for_order(tenant_id, order.id).await?.is_some() {
            return Err(AppError::conflict(
                "shipment",
                "This order already has a shipment; update it instead",
            ));
        }

        let packing_task_id = match uow.pick_list_for_order(tenant_id, order.id).await? {
            Some(pick_list) => uow
                .packing_task_for_pick_list(tenant_id, pick_list.id)
                .await?
                .map(|t| t.id),
            None => None,
        };

        let now = Utc::now();
        let shipment = Shipment {
            id: Uuid::new_v4(),
            tenant_id,
            order_id: order.id,
            packing_task_id,
            courier: input.courier,
            tracking_number: input.tracking_number,
            weight: input.weight,
            dispatch_date: input.dispatch_date,
            delivery_status: DeliveryStatus::ReadyToShip,
            stock_deducted: false,
            created_by: identity.user_id,
            created_at: now,
            updated_at: now,
        };
        uow.save_shipment(&shipment).await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, shipment_id = %shipment.id, order = %order.order_number, "Shipment created");
        Ok(shipment)
    }

    /// Updates carrier details and moves the delivery status. The first
    /// move into a post-ship status deducts the order's stock in the same
    /// scope; the order follows the shipment where its table allows.
    pub async fn update_shipment(
        &self,
        identity: &Identity,
        id: Uuid,
        input: UpdateShipmentInput,
    ) -> AppResult<ShipmentUpdate> {
        authorize(identity, Action::ManageShipments)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut shipment = uow
            .shipment(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Shipment"))?;

        if input.courier.is_some() {
            shipment.courier = input.courier;
        }
        if input.tracking_number.is_some() {
            shipment.tracking_number = input.tracking_number;
        }
        if input.weight.is_some() {
            shipment.weight = input.weight;
        }
        if input.dispatch_date.is_some() {
            shipment.dispatch_date = input.dispatch_date;
        }

        let previous = shipment.delivery_status;
        if let Some(next) = input.delivery_status.filter(|s| *s != previous) {
            shipment.delivery_status = previous.transition(next)?;
        }
        shipment.updated_at = Utc::now();
        uow.save_shipment(&shipment).await?;

        let current = shipment.delivery_status;
        let deduction = if DeliveryStatus::crosses_into_post_ship(previous, current)
            && !shipment.stock_deducted
        {
            Some(deduct(uow.as_mut(), identity, &mut shipment).await?)
        } else {
            None
        };

        if let Some(order_status) = current.order_status() {
            let mut order = uow
                .sales_order(tenant_id, shipment.order_id)
                .await?
                .ok_or_else(|| AppError::not_found("Order"))?;
            if order.status != order_status && order.status.can_become(order_status) {
                order.status = order_status;
                order.updated_at = Utc::now();
                uow.save_sales_order(&order).await?;
            }
        }
        uow.commit().await?;

        info!(
            tenant_id = %tenant_id,
            shipment_id = %id,
            from = %previous,
            to = %current,
            "Shipment updated"
        );
        Ok(ShipmentUpdate {
            shipment,
            deduction,
        })
    }

    /// Explicit deduction for a shipment already past dispatch. A shipment
    /// that was already deducted reports zero.
    pub async fn deduct_stock_for_shipment(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> AppResult<DeductionReport> {
        authorize(identity, Action::ManageShipments)?;

        let mut uow = self.store.begin().await?;
        let mut shipment = uow
            .shipment(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Shipment"))?;

        if !shipment.delivery_status.is_post_ship() {
            return Err(AppError::InvalidTransition(format!(
                "stock is deducted once a shipment has left, this one is {}",
                shipment.delivery_status
            )));
        }
        if shipment.stock_deducted {
            return Ok(DeductionReport {
                shipment_id: shipment.id,
                deducted: 0,
                shortfall: Vec::new(),
            });
        }

        let report = deduct(uow.as_mut(), identity, &mut shipment).await?;
        uow.commit().await?;

        Ok(report)
    }

    pub async fn list_shipments(&self, identity: &Identity) -> AppResult<Vec<Shipment>> {
        authorize(identity, Action::ViewOperations)?;

        let mut uow = self.store.begin().await?;
        uow.shipments(identity.tenant_id).await
    }

    pub async fn get_shipment(&self, identity: &Identity, id: Uuid) -> AppResult<Shipment> {
        authorize(identity, Action::ViewOperations)?;

        let mut uow = self.store.begin().await?;
        uow.shipment(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Shipment"))
    }
}
