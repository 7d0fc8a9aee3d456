//! Goods receipts against approved purchase orders
//!
//! Receiving is partial-tolerant. Each call reports the running received
//! quantity per line; only the increase over the previous report is
//! credited, and only for lines in GOOD condition.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::{
    receipt_status, validate_received_quantity, Action, GoodsReceipt, GoodsReceiptLine, Identity,
    Lifecycle, Movement, MovementType, PurchaseOrderStatus, QualityStatus, ReceiptStatus,
    SequenceKind,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::ledger::{self, Placement};
use super::{authorize, field_error, next_number};
use crate::error::{AppError, AppResult};
use crate::store::Store;

#[derive(Clone)]
pub struct GoodsReceiptService {
    store: Arc<dyn Store>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReceiptInput {
    pub purchase_order_id: Uuid,
    pub notes: Option<String>,
}

/// One reported line; matched by line id, else by product
#[derive(Debug, Deserialize)]
pub struct ReceivedLineInput {
    pub line_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub received_quantity: i64,
    #[serde(default)]
    pub quality_status: QualityStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveInput {
    pub lines: Vec<ReceivedLineInput>,
    pub warehouse_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoodsReceiptDetail {
    #[serde(flatten)]
    pub receipt: GoodsReceipt,
    pub lines: Vec<GoodsReceiptLine>,
}

impl GoodsReceiptService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Opens a receipt whose lines snapshot the PO lines
    pub async fn create_receipt(
        &self,
        identity: &Identity,
        input: CreateReceiptInput,
    ) -> AppResult<GoodsReceiptDetail> {
        authorize(identity, Action::ReceiveGoods)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;

        let order = uow
            .purchase_order(tenant_id, input.purchase_order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase order"))?;
        if order.status != PurchaseOrderStatus::Approved {
            return Err(AppError::InvalidTransition(format!(
                "goods can only be received against an approved purchase order, {} is {}",
                order.po_number, order.status
            )));
        }

        let id = Uuid::new_v4();
        let lines: Vec<GoodsReceiptLine> = uow
            .purchase_order_lines(order.id)
            .await?
            .into_iter()
            .map(|line| GoodsReceiptLine {
                id: Uuid::new_v4(),
                goods_receipt_id: id,
                product_id: line.product_id,
                expected_quantity: line.quantity,
                received_quantity: 0,
                quality_status: QualityStatus::Good,
                notes: None,
            })
            .collect();

        let now = Utc::now();
        let receipt = GoodsReceipt {
            id,
            tenant_id,
            grn_number: next_number(uow.as_mut(), tenant_id, SequenceKind::GoodsReceipt).await?,
            purchase_order_id: order.id,
            status: ReceiptStatus::Pending,
            total_expected: lines.iter().map(|l| l.expected_quantity).sum(),
            total_received: 0,
            notes: input.notes,
            received_by: None,
            created_by: identity.user_id,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        uow.save_goods_receipt(&receipt).await?;
        for line in &lines {
            uow.save_goods_receipt_line(line).await?;
        }
        uow.commit().await?;

        info!(
            tenant_id = %tenant_id,
            grn = %receipt.grn_number,
            po_number = %order.po_number,
            "Goods receipt created"
        );
        Ok(GoodsReceiptDetail { receipt, lines })
    }

    pub async fn receive(
        &self,
        identity: &Identity,
        id: Uuid,
        input: ReceiveInput,
    ) -> AppResult<GoodsReceiptDetail> {
        authorize(identity, Action::ReceiveGoods)?;
        if input.lines.is_empty() {
            return Err(AppError::validation("lines", "At least one line is required"));
        }

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut receipt = uow
            .goods_receipt(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Goods receipt"))?;

        if receipt.status == ReceiptStatus::Completed {
            return Err(AppError::InvalidTransition(format!(
                "goods receipt {} is already completed",
                receipt.grn_number
            )));
        }

        let mut lines = uow.goods_receipt_lines(receipt.id).await?;
        let placement = Placement {
            warehouse_id: input.warehouse_id,
            location_id: input.location_id,
        };

        for reported in input.lines {
            let line = lines
                .iter_mut()
                .find(|l| match (reported.line_id, reported.product_id) {
                    (Some(line_id), _) => l.id == line_id,
                    (None, Some(product_id)) => l.product_id == product_id,
                    (None, None) => false,
                })
                .ok_or_else(|| AppError::validation("lines", "Line is not on this receipt"))?;

            validate_received_quantity(reported.received_quantity, line.received_quantity)
                .map_err(field_error("received_quantity"))?;

            let delta = reported.received_quantity - line.received_quantity;
            line.received_quantity = reported.received_quantity;
            line.quality_status = reported.quality_status;
            if reported.notes.is_some() {
                line.notes = reported.notes;
            }

            if delta > 0 && line.quality_status == QualityStatus::Good {
                let key = ledger::resolve_destination(
                    uow.as_mut(),
                    tenant_id,
                    line.product_id,
                    placement,
                    None,
                )
                .await?;
                ledger::credit(uow.as_mut(), &key, delta).await?;

                let movement = Movement::new(
                    tenant_id,
                    MovementType::Receive,
                    line.product_id,
                    delta,
                    identity.user_id,
                )
                .to(key.location_id)
                .reason(format!("Goods receipt {}", receipt.grn_number))
                .reference("goods_receipt", receipt.id);
                uow.insert_movement(&movement).await?;
            }

            uow.save_goods_receipt_line(line).await?;
        }

        let now = Utc::now();
        receipt.status = receipt_status(&lines);
        receipt.total_received = lines.iter().map(|l| l.received_quantity).sum();
        receipt.received_by = Some(identity.user_id);
        if input.notes.is_some() {
            receipt.notes = input.notes;
        }
        receipt.updated_at = now;

        if receipt.status == ReceiptStatus::Completed {
            receipt.completed_at = Some(now);

            let mut order = uow
                .purchase_order(tenant_id, receipt.purchase_order_id)
                .await?
                .ok_or_else(|| AppError::not_found("Purchase order"))?;
            if order.status != PurchaseOrderStatus::Received {
                order.status = order.status.transition(PurchaseOrderStatus::Received)?;
                order.updated_at = now;
                uow.save_purchase_order(&order).await?;
            }
        }

        uow.save_goods_receipt(&receipt).await?;
        uow.commit().await?;

        info!(
            tenant_id = %tenant_id,
            grn = %receipt.grn_number,
            status = %receipt.status,
            received = receipt.total_received,
            expected = receipt.total_expected,
            "Goods received"
        );
        Ok(GoodsReceiptDetail { receipt, lines })
    }

    pub async fn delete_receipt(&self, identity: &Identity, id: Uuid) -> AppResult<()> {
        authorize(identity, Action::ReceiveGoods)?;

        let mut uow = self.store.begin().await?;
        let receipt = uow
            .goods_receipt(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Goods receipt"))?;

        if receipt.status != ReceiptStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "goods receipt {} can only be deleted while pending",
                receipt.grn_number
            )));
        }

        uow.delete_goods_receipt(identity.tenant_id, id).await?;
        uow.commit().await?;

        info!(tenant_id = %identity.tenant_id, grn = %receipt.grn_number, "Goods receipt deleted");
        Ok(())
    }

    pub async fn list_receipts(&self, identity: &Identity) -> AppResult<Vec<GoodsReceipt>> {
        authorize(identity, Action::ReceiveGoods)?;

        let mut uow = self.store.begin().await?;
        uow.goods_receipts(identity.tenant_id).await
    }

    pub async fn get_receipt(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> AppResult<GoodsReceiptDetail> {
        authorize(identity, Action::ReceiveGoods)?;

        let mut uow = self.store.begin().await?;
        let receipt = uow
            .goods_receipt(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Goods receipt"))?;
        let lines = uow.goods_receipt_lines(receipt.id).await?;

        Ok(GoodsReceiptDetail { receipt, lines })
    }
}
