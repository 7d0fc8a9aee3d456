//! Cycle counts and their reconciliation against the ledger

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    validate_required_text, Action, AdjustmentType, CycleCount, CycleCountLine, CycleCountStatus,
    CycleCountType, Identity, Lifecycle, SequenceKind, StockKey,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::adjustment::{self, AdjustmentRequest};
use super::ledger::{self, Placement};
use super::{authorize, field_error, next_number};
use crate::error::{AppError, AppResult};
use crate::store::Store;

#[derive(Clone)]
pub struct CycleCountService {
    store: Arc<dyn Store>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCycleCountInput {
    pub name: String,
    pub count_type: Option<CycleCountType>,
    pub location_id: Option<Uuid>,
    pub scheduled_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountedProduct {
    pub product_id: Uuid,
    pub counted_quantity: i64,
    pub batch_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompleteCycleCountInput {
    #[validate(length(min = 1))]
    pub products: Vec<CountedProduct>,
}

/// A count with its recorded lines
#[derive(Debug, Clone, Serialize)]
pub struct CycleCountDetail {
    #[serde(flatten)]
    pub count: CycleCount,
    pub lines: Vec<CycleCountLine>,
}

fn checked_items_count(len: usize) -> AppResult<i32> {
    i32::try_from(len).map_err(|_| AppError::validation("products", "Too many counted products"))
}

impl CycleCountService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_cycle_count(
        &self,
        identity: &Identity,
        input: CreateCycleCountInput,
    ) -> AppResult<CycleCount> {
        authorize(identity, Action::CountStock)?;
        validate_required_text(&input.name).map_err(field_error("name"))?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;

        if let Some(location_id) = input.location_id {
            uow.location(tenant_id, location_id)
                .await?
                .ok_or_else(|| AppError::not_found("Location"))?;
        }

        let count = CycleCount {
            id: Uuid::new_v4(),
            tenant_id,
            reference_number: next_number(uow.as_mut(), tenant_id, SequenceKind::CycleCount)
                .await?,
            name: input.name.trim().to_string(),
            count_type: input.count_type.unwrap_or(CycleCountType::Scheduled),
            location_id: input.location_id,
            scheduled_date: input.scheduled_date,
            status: CycleCountStatus::Pending,
            items_count: 0,
            discrepancies: 0,
            notes: input.notes,
            created_by: identity.user_id,
            counted_by: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        uow.save_cycle_count(&count).await?;
        uow.commit().await?;

        info!(tenant_id = %tenant_id, cycle_count = %count.reference_number, "Cycle count created");
        Ok(count)
    }

    pub async fn start_cycle_count(&self, identity: &Identity, id: Uuid) -> AppResult<CycleCount> {
        authorize(identity, Action::CountStock)?;

        let mut uow = self.store.begin().await?;
        let mut count = uow
            .cycle_count(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Cycle count"))?;

        count.status = count.status.transition(CycleCountStatus::InProgress)?;
        count.started_at = Some(Utc::now());
        uow.save_cycle_count(&count).await?;
        uow.commit().await?;

        info!(tenant_id = %identity.tenant_id, cycle_count = %count.reference_number, "Cycle count started");
        Ok(count)
    }

    /// Records counted quantities and, for a located count, adjusts the
    /// ledger to match. Uncounted products are left alone. Any failure
    /// leaves the count in its prior status with no adjustments.
    pub async fn complete_cycle_count(
        &self,
        identity: &Identity,
        id: Uuid,
        input: CompleteCycleCountInput,
    ) -> AppResult<CycleCountDetail> {
        authorize(identity, Action::ReconcileCount)?;
        input.validate()?;

        let tenant_id = identity.tenant_id;
        let mut uow = self.store.begin().await?;
        let mut count = uow
            .cycle_count(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Cycle count"))?;

        count.status = count.status.transition(CycleCountStatus::Completed)?;
        let items_count = checked_items_count(input.products.len())?;

        let mut lines = Vec::with_capacity(input.products.len());
        let mut discrepancies = 0;

        for counted in input.products {
            if counted.counted_quantity < 0 {
                return Err(AppError::validation(
                    "counted_quantity",
                    "Counted quantity cannot be negative",
                ));
            }
            uow.product(tenant_id, counted.product_id)
                .await?
                .ok_or_else(|| AppError::validation("products", "Unknown product in count"))?;

            let system_quantity = match count.location_id {
                Some(location_id) => {
                    let key: StockKey = ledger::location_key(
                        uow.as_mut(),
                        tenant_id,
                        counted.product_id,
                        location_id,
                        counted.batch_number.clone(),
                    )
                    .await?;
                    uow.stock_for_update(&key)
                        .await?
                        .map_or(0, |r| r.quantity)
                }
                None => uow
                    .stock_for_product(tenant_id, counted.product_id, None)
                    .await?
                    .iter()
                    .map(|r| r.quantity)
                    .sum(),
            };

            let variance = counted.counted_quantity - system_quantity;
            let mut adjustment_id = None;

            if let Some(adjustment_type) = AdjustmentType::for_variance(variance) {
                discrepancies += 1;

                if let Some(location_id) = count.location_id {
                    let adjustment = adjustment::apply(
                        uow.as_mut(),
                        identity,
                        AdjustmentRequest {
                            product_id: counted.product_id,
                            adjustment_type,
                            quantity: variance.abs(),
                            reason: format!("Cycle count {}", count.reference_number),
                            notes: None,
                            placement: Placement::location(location_id),
                            batch_number: counted.batch_number.clone(),
                            cycle_count_id: Some(count.id),
                        },
                    )
                    .await?;
                    adjustment_id = Some(adjustment.id);
                }
            }

            let line = CycleCountLine {
                id: Uuid::new_v4(),
                cycle_count_id: count.id,
                product_id: counted.product_id,
                batch_number: counted.batch_number,
                system_quantity,
                counted_quantity: counted.counted_quantity,
                variance,
                adjustment_id,
            };
            uow.insert_cycle_count_line(&line).await?;
            lines.push(line);
        }

        let now = Utc::now();
        count.items_count = items_count;
        count.discrepancies = discrepancies;
        count.counted_by = Some(identity.user_id);
        count.started_at.get_or_insert(now);
        count.completed_at = Some(now);
        uow.save_cycle_count(&count).await?;
        uow.commit().await?;

        info!(
            tenant_id = %tenant_id,
            cycle_count = %count.reference_number,
            items = count.items_count,
            discrepancies = count.discrepancies,
            "Cycle count completed"
        );
        Ok(CycleCountDetail { count, lines })
    }

    pub async fn list_cycle_counts(&self, identity: &Identity) -> AppResult<Vec<CycleCount>> {
        authorize(identity, Action::ViewInventory)?;

        let mut uow = self.store.begin().await?;
        uow.cycle_counts(identity.tenant_id).await
    }

    pub async fn get_cycle_count(
        &self,
        identity: &Identity,
        id: Uuid,
    ) -> AppResult<CycleCountDetail> {
        authorize(identity, Action::ViewInventory)?;

        let mut uow = self.store.begin().await?;
        let count = uow
            .cycle_count(identity.tenant_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Cycle count"))?;
        let lines = uow.cycle_count_lines(count.id).await?;

        Ok(CycleCountDetail { count, lines })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_count_fits_the_column() {
        assert_eq!(checked_items_count(3).unwrap(), 3);
        assert!(matches!(
            checked_items_count(usize::MAX),
            Err(AppError::Validation { .. })
        ));
    }
}
