//! Return merchandise authorizations
//!
//! An RMA may only be opened once goods have left: the shipment is in a
//! post-ship status or the order is DELIVERED. Approval does not put
//! stock back on the ledger.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    validate_required_text, Action, Identity, InspectionOutcome, Lifecycle, OrderStatus,
    ReturnRequest, ReturnStatus, ReturnType, SequenceKind,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{authorize, field_error, next_number};
use crate::error::{AppError, AppResult};
use crate::store::{Store, UnitOfWork};

#[derive(Clone)]
pub struct ReturnService {
    store: Arc<dyn Store>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReturnInput {
    pub order_id: Uuid,
    pub shipment_id: Option<Uuid>,
    pub return_type: Option<ReturnType>,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InspectInput {
    pub outcome: InspectionOutcome,
    pub recovery_value: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefundInput {
    pub amount: Decimal,
}

async fn load(uow: &mut dyn UnitOfWork, tenant_id: Uuid, id: Uuid) -> AppResult<ReturnRequest> {
    uow.return_request(tenant_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Return"))
}

impl ReturnService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_return(
        &self,
        identity: &Identity,
        input: CreateReturnInput,
    ) -> AppResult<ReturnRequest> {
        authorize(identity, Action::ManageReturns)?;
        validate_required_text(&input.reason).map_err(field_error("reason"))?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let order = uow
            .sales_order(tenant_id, input.order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order"))?;

        let shipment = match input.shipment_id {
            Some(shipment_id) => {
                let shipment = uow
                    .shipment(tenant_id, shipment_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Shipment"))?;
                if shipment.order_id != order.id {
                    return Err(AppError::validation(
                        "shipment_id",
                        "Shipment belongs to a different order",
                    ));
                }
                Some(shipment)
            }
            None => uow.shipment_for_order(tenant_id, order.id).await?,
        };

        let shipped = shipment
            .as_ref()
            .is_some_and(|s| s.delivery_status.is_post_ship());
        if !shipped && order.status != OrderStatus::Delivered {
            return Err(AppError::InvalidTransition(format!(
                "order {} has not shipped; a return needs a SHIPPED, IN_TRANSIT or DELIVERED shipment",
                order.order_number
            )));
        }

        let now = Utc::now();
        let rma = ReturnRequest {
            id: Uuid::new_v4(),
            tenant_id,
            rma_number: next_number(uow.as_mut(), tenant_id, SequenceKind::Return).await?,
            order_id: order.id,
            shipment_id: shipment.map(|s| s.id),
            return_type: input.return_type.unwrap_or(ReturnType::Refund),
            status: ReturnStatus::RmaCreated,
            reason: input.reason.trim().to_string(),
            notes: input.notes,
            recovery_value: None,
            refund_amount: None,
            created_by: identity.user_id,
            created_at: now,
            updated_at: now,
            received_at: None,
            inspected_at: None,
            completed_at: None,
        };
        uow.save_return(&rma).await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, rma = %rma.rma_number, order = %order.order_number, "Return created");
        Ok(rma)
    }

    pub async fn mark_awaiting_return(&self, identity: &Identity, id: Uuid) -> AppResult<ReturnRequest> {
        self.advance(identity, id, ReturnStatus::AwaitingReturn, |_| {})
            .await
    }

    pub async fn receive_return(&self, identity: &Identity, id: Uuid) -> AppResult<ReturnRequest> {
        self.advance(identity, id, ReturnStatus::Received, |rma| {
            rma.received_at = Some(Utc::now());
        })
        .await
    }

    pub async fn start_inspection(&self, identity: &Identity, id: Uuid) -> AppResult<ReturnRequest> {
        self.advance(identity, id, ReturnStatus::InInspection, |_| {})
            .await
    }

    /// Approves or rejects a received return
    pub async fn inspect_return(
        &self,
        identity: &Identity,
        id: Uuid,
        input: InspectInput,
    ) -> AppResult<ReturnRequest> {
        if input.recovery_value.is_some_and(|v| v < Decimal::ZERO) {
            return Err(AppError::validation(
                "recovery_value",
                "Recovery value cannot be negative",
            ));
        }

        self.advance(identity, id, input.outcome.into(), move |rma| {
            rma.inspected_at = Some(Utc::now());
            if input.recovery_value.is_some() {
                rma.recovery_value = input.recovery_value;
            }
            if input.notes.is_some() {
                rma.notes = input.notes;
            }
        })
        .await
    }

    pub async fn refund_return(
        &self,
        identity: &Identity,
        id: Uuid,
        input: RefundInput,
    ) -> AppResult<ReturnRequest> {
        if input.amount < Decimal::ZERO {
            return Err(AppError::validation("amount", "Refund amount cannot be negative"));
        }

        self.advance(identity, id, ReturnStatus::Refunded, move |rma| {
            rma.refund_amount = Some(input.amount);
        })
        .await
    }

    pub async fn close_return(&self, identity: &Identity, id: Uuid) -> AppResult<ReturnRequest> {
        self.advance(identity, id, ReturnStatus::Closed, |rma| {
            rma.completed_at = Some(Utc::now());
        })
        .await
    }

    /// Moves the RMA along its table and applies `apply` to the row
    async fn advance<F>(
        &self,
        identity: &Identity,
        id: Uuid,
        next: ReturnStatus,
        apply: F,
    ) -> AppResult<ReturnRequest>
    where
        F: FnOnce(&mut ReturnRequest) + Send,
    {
        authorize(identity, Action::ManageReturns)?;

        let mut uow = self.store.begin().await?;
        let mut rma = load(uow.as_mut(), identity.tenant_id, id).await?;

        rma.status = rma.status.transition(next)?;
        apply(&mut rma);
        rma.updated_at = Utc::now();
        uow.save_return(&rma).await?;
        uow.commit().await?;

        info!(tenant_id = %identity.tenant_id, rma = %rma.rma_number, status = %rma.status, "Return updated");
        Ok(rma)
    }

    pub async fn list_returns(&self, identity: &Identity) -> AppResult<Vec<ReturnRequest>> {
        authorize(identity, Action::ViewOperations)?;

        let mut uow = self.store.begin().await?;
        uow.returns(identity.tenant_id).await
    }

    pub async fn get_return(&self, identity: &Identity, id: Uuid) -> AppResult<ReturnRequest> {
        authorize(identity, Action::ViewOperations)?;

        let mut uow = self.store.begin().await?;
        load(uow.as_mut(), identity.tenant_id, id).await
    }
}
