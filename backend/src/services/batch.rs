//! Batch/lot tracking

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{Action, Batch, BatchStatus, Identity, Movement, MovementType, SequenceKind};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{authorize, ledger, next_number};
use crate::error::{AppError, AppResult};
use crate::store::{BatchFilter, Store};

#[derive(Clone)]
pub struct BatchService {
    store: Arc<dyn Store>,
}

/// Input for receiving a new batch
#[derive(Debug, Deserialize)]
pub struct CreateBatchInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Option<Uuid>,
    pub batch_number: Option<String>,
    pub quantity: i64,
    pub unit_cost: Option<Decimal>,
    pub received_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub manufacturing_date: Option<NaiveDate>,
    pub supplier_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Metadata edits; quantity belongs to the ledger
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBatchInput {
    pub unit_cost: Option<Decimal>,
    pub expiry_date: Option<NaiveDate>,
    pub manufacturing_date: Option<NaiveDate>,
    pub supplier_id: Option<Uuid>,
    pub status: Option<BatchStatus>,
    pub notes: Option<String>,
}

/// A batch with its computed availability
#[derive(Debug, Clone, Serialize)]
pub struct BatchView {
    #[serde(flatten)]
    pub batch: Batch,
    pub available_quantity: i64,
}

impl From<Batch> for BatchView {
    fn from(batch: Batch) -> Self {
        Self {
            available_quantity: batch.available_quantity(),
            batch,
        }
    }
}

fn check_dates(
    manufacturing_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
) -> AppResult<()> {
    if let (Some(made), Some(expires)) = (manufacturing_date, expiry_date) {
        if expires < made {
            return Err(AppError::validation(
                "expiry_date",
                "Expiry date cannot precede the manufacturing date",
            ));
        }
    }
    Ok(())
}

impl BatchService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates the batch and credits its quantity to the ledger
    pub async fn create_batch(
        &self,
        identity: &Identity,
        input: CreateBatchInput,
    ) -> AppResult<BatchView> {
        authorize(identity, Action::ManageStock)?;
        check_dates(input.manufacturing_date, input.expiry_date)?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;

        uow.product(tenant_id, input.product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

        let batch_number = match input.batch_number.as_deref().map(str::trim) {
            Some(number) if !number.is_empty() => number.to_string(),
            _ => next_number(uow.as_mut(), tenant_id, SequenceKind::Batch).await?,
        };

        if uow
            .batch_by_number(tenant_id, input.product_id, &batch_number)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(
                "batch_number",
                format!("Batch {} already exists for this product", batch_number),
            ));
        }

        let placement = ledger::Placement {
            warehouse_id: Some(input.warehouse_id),
            location_id: input.location_id,
        };
        let key = ledger::resolve_destination(
            uow.as_mut(),
            tenant_id,
            input.product_id,
            placement,
            Some(batch_number.clone()),
        )
        .await?;

        let now = Utc::now();
        let batch = Batch {
            id: Uuid::new_v4(),
            tenant_id,
            product_id: input.product_id,
            warehouse_id: key.warehouse_id,
            location_id: key.location_id,
            batch_number,
            quantity: 0,
            reserved: 0,
            unit_cost: input.unit_cost,
            received_date: input.received_date.unwrap_or_else(|| now.date_naive()),
            expiry_date: input.expiry_date,
            manufacturing_date: input.manufacturing_date,
            supplier_id: input.supplier_id,
            status: BatchStatus::Active,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };
        uow.save_batch(&batch).await?;

        ledger::credit(uow.as_mut(), &key, input.quantity).await?;

        let movement = Movement::new(
            tenant_id,
            MovementType::Receive,
            batch.product_id,
            input.quantity,
            identity.user_id,
        )
        .to(key.location_id)
        .batch(Some(batch.id))
        .reason("Batch received")
        .reference("batch", batch.id);
        uow.insert_movement(&movement).await?;

        let batch = uow
            .batch(tenant_id, batch.id)
            .await?
            .ok_or_else(|| AppError::Internal("batch vanished during creation".to_string()))?;
        uow.commit().await?;

        info!(
            tenant_id = %tenant_id,
            batch_id = %batch.id,
            batch_number = %batch.batch_number,
            quantity = batch.quantity,
            "Batch created"
        );
        Ok(batch.into())
    }

    pub async fn update_batch(
        &self,
        identity: &Identity,
        id: Uuid,
        input: UpdateBatchInput,
    ) -> AppResult<BatchView> {
        authorize(identity, Action::ManageStock)?;

        let mut uow = self.store.begin().await?;
        let mut batch = uow
            .batch(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Batch"))?;

        if let Some(status) = input.status {
            match status {
                BatchStatus::Depleted => {
                    return Err(AppError::validation(
                        "status",
                        "DEPLETED is set by the ledger when a batch runs out",
                    ))
                }
                BatchStatus::Active if batch.quantity == 0 => {
                    return Err(AppError::validation(
                        "status",
                        "An empty batch cannot be reactivated",
                    ))
                }
                _ => batch.status = status,
            }
        }

        if input.unit_cost.is_some() {
            batch.unit_cost = input.unit_cost;
        }
        if input.expiry_date.is_some() {
            batch.expiry_date = input.expiry_date;
        }
        if input.manufacturing_date.is_some() {
            batch.manufacturing_date = input.manufacturing_date;
        }
        if input.supplier_id.is_some() {
            batch.supplier_id = input.supplier_id;
        }
        if input.notes.is_some() {
            batch.notes = input.notes;
        }
        check_dates(batch.manufacturing_date, batch.expiry_date)?;

        batch.updated_at = Utc::now();
        uow.save_batch(&batch).await?;
        uow.commit().await?;

        info!(tenant_id = %identity.tenant_id, batch_id = %id, status = %batch.status, "Batch updated");
        Ok(batch.into())
    }

    pub async fn list_batches(
        &self,
        identity: &Identity,
        filter: BatchFilter,
    ) -> AppResult<Vec<BatchView>> {
        authorize(identity, Action::ViewInventory)?;

        let mut uow = self.store.begin().await?;
        let batches = uow.batches(identity.tenant_id, &filter).await?;
        Ok(batches.into_iter().map(BatchView::from).collect())
    }

    pub async fn get_batch(&self, identity: &Identity, id: Uuid) -> AppResult<BatchView> {
        authorize(identity, Action::ViewInventory)?;

        let mut uow = self.store.begin().await?;
        uow.batch(identity.tenant_id, id)
            .await?
            .map(BatchView::from)
            .ok_or_else(|| AppError::not_found("Batch"))
    }
}
