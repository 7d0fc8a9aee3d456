//! Manual stock corrections

use chrono::Utc;
use serde::Deserialize;
use shared::{
    validate_quantity, validate_required_text, Action, AdjustmentStatus, AdjustmentType, Identity,
    InventoryAdjustment, Lifecycle, Movement, MovementType, SequenceKind,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::ledger::{self, Placement};
use super::{authorize, field_error, next_number};
use crate::error::{AppError, AppResult};
use crate::store::{Store, UnitOfWork};

#[derive(Clone)]
pub struct AdjustmentService {
    store: Arc<dyn Store>,
}

/// Input for creating an inventory adjustment
#[derive(Debug, Deserialize)]
pub struct CreateAdjustmentInput {
    pub product_id: Uuid,
    pub adjustment_type: AdjustmentType,
    pub quantity: i64,
    pub reason: String,
    pub notes: Option<String>,
    pub warehouse_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub batch_number: Option<String>,
}

/// One correction to apply inside an existing unit of work
pub(crate) struct AdjustmentRequest {
    pub product_id: Uuid,
    pub adjustment_type: AdjustmentType,
    pub quantity: i64,
    pub reason: String,
    pub notes: Option<String>,
    pub placement: Placement,
    pub batch_number: Option<String>,
    pub cycle_count_id: Option<Uuid>,
}

/// Records a PENDING adjustment, applies it to the ledger, writes the
/// ADJUST movement and completes the adjustment. Nothing is visible until
/// the caller commits.
pub(crate) async fn apply(
    uow: &mut dyn UnitOfWork,
    identity: &Identity,
    request: AdjustmentRequest,
) -> AppResult<InventoryAdjustment> {
    let tenant_id = identity.tenant_id;
    let reference_number = next_number(uow, tenant_id, SequenceKind::Adjustment).await?;

    let mut adjustment = InventoryAdjustment {
        id: Uuid::new_v4(),
        tenant_id,
        reference_number,
        adjustment_type: request.adjustment_type,
        product_id: request.product_id,
        warehouse_id: request.placement.warehouse_id,
        location_id: request.placement.location_id,
        stock_record_id: None,
        quantity: request.quantity,
        reason: request.reason,
        notes: request.notes,
        cycle_count_id: request.cycle_count_id,
        status: AdjustmentStatus::Pending,
        created_by: identity.user_id,
        created_at: Utc::now(),
        completed_at: None,
    };
    uow.save_adjustment(&adjustment).await?;

    let (record, movement) = match request.adjustment_type {
        AdjustmentType::Increase => {
            let key = ledger::resolve_destination(
                uow,
                tenant_id,
                request.product_id,
                request.placement,
                request.batch_number,
            )
            .await?;
            let record = ledger::credit(uow, &key, request.quantity).await?;
            let movement = Movement::new(
                tenant_id,
                MovementType::Adjust,
                request.product_id,
                request.quantity,
                identity.user_id,
            )
            .to(record.location_id);
            (record, movement)
        }
        AdjustmentType::Decrease => {
            let source = ledger::resolve_source(
                uow,
                tenant_id,
                request.product_id,
                request.placement,
                request.batch_number.as_deref(),
            )
            .await?
            .ok_or_else(|| {
                AppError::InsufficientStock(format!(
                    "requested {}, available 0",
                    request.quantity
                ))
            })?;
            let record = ledger::debit_record(uow, source, request.quantity).await?;
            let movement = Movement::new(
                tenant_id,
                MovementType::Adjust,
                request.product_id,
                request.quantity,
                identity.user_id,
            )
            .from(record.location_id);
            (record, movement)
        }
    };

    adjustment.stock_record_id = Some(record.id);
    adjustment.warehouse_id = Some(record.warehouse_id);
    adjustment.location_id = record.location_id;
    adjustment.status = adjustment.status.transition(AdjustmentStatus::Completed)?;
    adjustment.completed_at = Some(Utc::now());
    uow.save_adjustment(&adjustment).await?;

    let movement = movement
        .reason(adjustment.reason.clone())
        .notes(adjustment.notes.clone())
        .reference("adjustment", adjustment.id);
    uow.insert_movement(&movement).await?;

    Ok(adjustment)
}

impl AdjustmentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_adjustment(
        &self,
        identity: &Identity,
        input: CreateAdjustmentInput,
    ) -> AppResult<InventoryAdjustment> {
        authorize(identity, Action::AdjustStock)?;
        validate_quantity(input.quantity).map_err(field_error("quantity"))?;
        validate_required_text(&input.reason).map_err(field_error("reason"))?;

        let mut uow = self.store.begin().await?;
        uow.product(identity.tenant_id, input.product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

        let adjustment = apply(
            uow.as_mut(),
            identity,
            AdjustmentRequest {
                product_id: input.product_id,
                adjustment_type: input.adjustment_type,
                quantity: input.quantity,
                reason: input.reason,
                notes: input.notes,
                placement: Placement {
                    warehouse_id: input.warehouse_id,
                    location_id: input.location_id,
                },
                batch_number: input.batch_number,
                cycle_count_id: None,
            },
        )
        .await?;
        uow.commit().await?;

        info!(
            tenant_id = %identity.tenant_id,
            adjustment = %adjustment.reference_number,
            adjustment_type = %adjustment.adjustment_type,
            quantity = adjustment.quantity,
            "Adjustment completed"
        );
        Ok(adjustment)
    }

    pub async fn list_adjustments(&self, identity: &Identity) -> AppResult<Vec<InventoryAdjustment>> {
        authorize(identity, Action::ViewInventory)?;

        let mut uow = self.store.begin().await?;
        uow.adjustments(identity.tenant_id).await
    }

    pub async fn get_adjustment(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> AppResult<InventoryAdjustment> {
        authorize(identity, Action::ViewInventory)?;

        let mut uow = self.store.begin().await?;
        uow.adjustment(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Adjustment"))
    }
}
