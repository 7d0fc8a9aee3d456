//! Purchase orders

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    validate_quantity, Action, Identity, Lifecycle, PurchaseOrder, PurchaseOrderLine,
    PurchaseOrderStatus, SequenceKind,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{authorize, field_error, next_number};
use crate::error::{AppError, AppResult};
use crate::store::{Store, UnitOfWork};

#[derive(Clone)]
pub struct PurchaseOrderService {
    store: Arc<dyn Store>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineInput {
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_price: Decimal,
}

/// Input for creating a purchase order
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Uuid,
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub lines: Vec<LineInput>,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Submit straight to `pending` instead of saving a draft
    #[serde(default)]
    pub submit: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePurchaseOrderInput {
    pub supplier_id: Option<Uuid>,
    pub lines: Option<Vec<LineInput>>,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub lines: Vec<PurchaseOrderLine>,
}

/// Checks every line and prices it
async fn build_lines(
    uow: &mut dyn UnitOfWork,
    tenant_id: Uuid,
    purchase_order_id: Uuid,
    lines: &[LineInput],
) -> AppResult<Vec<PurchaseOrderLine>> {
    if lines.is_empty() {
        return Err(AppError::validation("lines", "At least one line is required"));
    }

    let mut built = Vec::with_capacity(lines.len());
    for line in lines {
        validate_quantity(line.quantity).map_err(field_error("quantity"))?;
        if line.unit_price < Decimal::ZERO {
            return Err(AppError::validation("unit_price", "Unit price cannot be negative"));
        }
        uow.product(tenant_id, line.product_id)
            .await?
            .ok_or_else(|| AppError::validation("lines", "Unknown product on line"))?;

        built.push(PurchaseOrderLine {
            id: Uuid::new_v4(),
            purchase_order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.unit_price * Decimal::from(line.quantity),
        });
    }
    Ok(built)
}

fn total(lines: &[PurchaseOrderLine]) -> Decimal {
    lines.iter().map(|l| l.line_total).sum()
}

fn ensure_editable(order: &PurchaseOrder, action: &str) -> AppResult<()> {
    if order.status.is_editable() {
        Ok(())
    } else {
        Err(AppError::InvalidTransition(format!(
            "purchase order {} cannot be {} while {}",
            order.po_number, action, order.status
        )))
    }
}

impl PurchaseOrderService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_purchase_order(
        &self,
        identity: &Identity,
        input: CreatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrderDetail> {
        authorize(identity, Action::ManagePurchasing)?;
        input.validate()?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;

        let id = Uuid::new_v4();
        let lines = build_lines(uow.as_mut(), tenant_id, id, &input.lines).await?;

        let now = Utc::now();
        let order = PurchaseOrder {
            id,
            tenant_id,
            po_number: next_number(uow.as_mut(), tenant_id, SequenceKind::PurchaseOrder).await?,
            supplier_id: input.supplier_id,
            status: if input.submit {
                PurchaseOrderStatus::Pending
            } else {
                PurchaseOrderStatus::Draft
            },
            total_amount: total(&lines),
            expected_delivery: input.expected_delivery,
            notes: input.notes,
            created_by: identity.user_id,
            approved_by: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        };
        uow.save_purchase_order(&order).await?;
        uow.replace_purchase_order_lines(order.id, &lines).await?;
        uow.commit().await?;

        info!(
            tenant_id = %tenant_id,
            po_number = %order.po_number,
            status = %order.status,
            "Purchase order created"
        );
        Ok(PurchaseOrderDetail { order, lines })
    }

    pub async fn update_purchase_order(
        &self,
        identity: &Identity,
        id: Uuid,
        input: UpdatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrderDetail> {
        authorize(identity, Action::ManagePurchasing)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut order = uow
            .purchase_order(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase order"))?;
        ensure_editable(&order, "edited")?;

        let lines = match input.lines {
            Some(lines) => {
                let lines = build_lines(uow.as_mut(), tenant_id, order.id, &lines).await?;
                uow.replace_purchase_order_lines(order.id, &lines).await?;
                order.total_amount = total(&lines);
                lines
            }
            None => uow.purchase_order_lines(order.id).await?,
        };

        order.supplier_id = input.supplier_id.unwrap_or(order.supplier_id);
        if input.expected_delivery.is_some() {
            order.expected_delivery = input.expected_delivery;
        }
        if input.notes.is_some() {
            order.notes = input.notes;
        }
        order.updated_at = Utc::now();
        uow.save_purchase_order(&order).await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, po_number = %order.po_number, "Purchase order updated");
        Ok(PurchaseOrderDetail { order, lines })
    }

    pub async fn approve_purchase_order(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> AppResult<PurchaseOrder> {
        authorize(identity, Action::ManagePurchasing)?;

        let mut uow = self.store.begin().await?;
        let mut order = uow
            .purchase_order(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase order"))?;

        order.status = order.status.transition(PurchaseOrderStatus::Approved)?;
        let now = Utc::now();
        order.approved_by = Some(identity.user_id);
        order.approved_at = Some(now);
        order.updated_at = now;
        uow.save_purchase_order(&order).await?;
        uow.commit().await?;

        info!(tenant_id = %identity.tenant_id, po_number = %order.po_number, "Purchase order approved");
        Ok(order)
    }

    pub async fn reject_purchase_order(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> AppResult<PurchaseOrder> {
        authorize(identity, Action::ManagePurchasing)?;

        let mut uow = self.store.begin().await?;
        let mut order = uow
            .purchase_order(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase order"))?;

        order.status = order.status.transition(PurchaseOrderStatus::Rejected)?;
        order.updated_at = Utc::now();
        uow.save_purchase_order(&order).await?;
        uow.commit().await?;

        info!(tenant_id = %identity.tenant_id, po_number = %order.po_number, "Purchase order rejected");
        Ok(order)
    }

    pub async fn delete_purchase_order(&self, identity: &Identity, id: Uuid) -> AppResult<()> {
        authorize(identity, Action::ManagePurchasing)?;

        let mut uow = self.store.begin().await?;
        let order = uow
            .purchase_order(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase order"))?;
        ensure_editable(&order, "deleted")?;

        uow.delete_purchase_order(identity.tenant_id, id).await?;
        uow.commit().await?;

        info!(tenant_id = %identity.tenant_id, po_number = %order.po_number, "Purchase order deleted");
        Ok(())
    }

    pub async fn list_purchase_orders(&self, identity: &Identity) -> AppResult<Vec<PurchaseOrder>> {
        authorize(identity, Action::ManagePurchasing)?;

        let mut uow = self.store.begin().await?;
        uow.purchase_orders(identity.tenant_id).await
    }

    pub async fn get_purchase_order(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> AppResult<PurchaseOrderDetail> {
        authorize(identity, Action::ManagePurchasing)?;

        let mut uow = self.store.begin().await?;
        let order = uow
            .purchase_order(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase order"))?;
        let lines = uow.purchase_order_lines(order.id).await?;

        Ok(PurchaseOrderDetail { order, lines })
    }
}
