//! Stock queries, reservations and manual movements

use serde::{Deserialize, Serialize};
use shared::{Action, Identity, Movement, MovementType, StockRecord};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{authorize, ledger};
use crate::error::{AppError, AppResult};
use crate::store::{MovementFilter, StockFilter, Store};

#[derive(Clone)]
pub struct StockService {
    store: Arc<dyn Store>,
}

/// Input for a reservation or release
#[derive(Debug, Deserialize)]
pub struct QuantityInput {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct TotalQuery {
    pub product_id: Uuid,
    pub warehouse_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockTotal {
    pub product_id: Uuid,
    pub warehouse_ids: Option<Vec<Uuid>>,
    pub available: i64,
}

/// Input for recording a manual movement
#[derive(Debug, Deserialize)]
pub struct CreateMovementInput {
    pub movement_type: MovementType,
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub from_location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    pub quantity: i64,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl StockService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_stock(
        &self,
        identity: &Identity,
        filter: StockFilter,
    ) -> AppResult<Vec<StockRecord>> {
        authorize(identity, Action::ViewInventory)?;

        let mut uow = self.store.begin().await?;
        uow.stock_records(identity.tenant_id, &filter).await
    }

    pub async fn get_stock(&self, identity: &Identity, id: Uuid) -> AppResult<StockRecord> {
        authorize(identity, Action::ViewInventory)?;

        let mut uow = self.store.begin().await?;
        uow.stock_by_id_for_update(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Stock record"))
    }

    /// Commits `quantity` of a record's available stock
    pub async fn reserve(
        &self,
        identity: &Identity,
        id: Uuid,
        input: QuantityInput,
    ) -> AppResult<StockRecord> {
        authorize(identity, Action::ManageStock)?;

        let mut uow = self.store.begin().await?;
        let mut record = uow
            .stock_by_id_for_update(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Stock record"))?;

        record.reserve(input.quantity)?;
        ledger::persist(uow.as_mut(), &record).await?;
        uow.commit().await?;

        info!(
            tenant_id = %identity.tenant_id,
            stock_id = %id,
            quantity = input.quantity,
            "Stock reserved"
        );
        Ok(record)
    }

    pub async fn release(
        &self,
        identity: &Identity,
        id: Uuid,
        input: QuantityInput,
    ) -> AppResult<StockRecord> {
        authorize(identity, Action::ManageStock)?;

        let mut uow = self.store.begin().await?;
        let mut record = uow
            .stock_by_id_for_update(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Stock record"))?;

        record.release(input.quantity)?;
        ledger::persist(uow.as_mut(), &record).await?;
        uow.commit().await?;

        info!(
            tenant_id = %identity.tenant_id,
            stock_id = %id,
            quantity = input.quantity,
            "Stock released"
        );
        Ok(record)
    }

    pub async fn total_available(
        &self,
        identity: &Identity,
        product_id: Uuid,
        warehouse_ids: Option<Vec<Uuid>>,
    ) -> AppResult<StockTotal> {
        authorize(identity, Action::ViewInventory)?;

        let mut uow = self.store.begin().await?;
        uow.product(identity.tenant_id, product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

        let available = ledger::total_available(
            uow.as_mut(),
            identity.tenant_id,
            product_id,
            warehouse_ids.as_deref(),
        )
        .await?;

        Ok(StockTotal {
            product_id,
            warehouse_ids,
            available,
        })
    }

    /// Records a manual movement and applies it to the ledger.
    ///
    /// RECEIVE and RETURN credit the destination, PICK debits the source and
    /// TRANSFER does both. ADJUST goes through inventory adjustments.
    pub async fn create_movement(
        &self,
        identity: &Identity,
        input: CreateMovementInput,
    ) -> AppResult<Movement> {
        authorize(identity, Action::ManageStock)?;

        if input.movement_type == MovementType::Adjust {
            return Err(AppError::validation(
                "movement_type",
                "Use an inventory adjustment to record ADJUST movements",
            ));
        }

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;

        uow.product(tenant_id, input.product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

        let batch_number = match input.batch_id {
            Some(batch_id) => {
                let batch = uow
                    .batch(tenant_id, batch_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Batch"))?;
                if batch.product_id != input.product_id {
                    return Err(AppError::validation(
                        "batch_id",
                        "Batch belongs to a different product",
                    ));
                }
                Some(batch.batch_number)
            }
            None => None,
        };

        let source = match (input.movement_type.debits_source(), input.from_location_id) {
            (true, Some(location_id)) => Some(
                ledger::location_key(
                    uow.as_mut(),
                    tenant_id,
                    input.product_id,
                    location_id,
                    batch_number.clone(),
                )
                .await?,
            ),
            (true, None) => {
                return Err(AppError::validation(
                    "from_location_id",
                    "A source location is required",
                ))
            }
            (false, _) => None,
        };

        let destination = match (input.movement_type.credits_destination(), input.to_location_id)
        {
            (true, Some(location_id)) => Some(
                ledger::location_key(
                    uow.as_mut(),
                    tenant_id,
                    input.product_id,
                    location_id,
                    batch_number.clone(),
                )
                .await?,
            ),
            (true, None) => {
                return Err(AppError::validation(
                    "to_location_id",
                    "A destination location is required",
                ))
            }
            (false, _) => None,
        };

        match (&source, &destination) {
            (Some(from), Some(to)) => {
                ledger::transfer(uow.as_mut(), from, to, input.quantity).await?;
            }
            (Some(from), None) => {
                ledger::debit(uow.as_mut(), from, input.quantity).await?;
            }
            (None, Some(to)) => {
                ledger::credit(uow.as_mut(), to, input.quantity).await?;
            }
            (None, None) => {}
        }

        let mut movement = Movement::new(
            tenant_id,
            input.movement_type,
            input.product_id,
            input.quantity,
            identity.user_id,
        )
        .from(source.and_then(|k| k.location_id))
        .to(destination.and_then(|k| k.location_id))
        .batch(input.batch_id)
        .notes(input.notes);
        movement.reason = input.reason;

        uow.insert_movement(&movement).await?;
        uow.commit().await?;

        info!(
            tenant_id = %tenant_id,
            movement_id = %movement.id,
            movement_type = %movement.movement_type,
            quantity = movement.quantity,
            "Movement recorded"
        );
        Ok(movement)
    }

    pub async fn list_movements(
        &self,
        identity: &Identity,
        filter: MovementFilter,
    ) -> AppResult<Vec<Movement>> {
        authorize(identity, Action::ViewInventory)?;

        let mut uow = self.store.begin().await?;
        uow.movements(identity.tenant_id, &filter).await
    }

    pub async fn get_movement(&self, identity: &Identity, id: Uuid) -> AppResult<Movement> {
        authorize(identity, Action::ViewInventory)?;

        let mut uow = self.store.begin().await?;
        uow.movement(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Movement"))
    }
}
