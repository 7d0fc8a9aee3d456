//! Stock ledger
//!
//! The only code that changes `quantity` or `reserved` on a stock record.
//! Every function works inside the caller's unit of work; pairing a
//! mutation with its movement row is the caller's job and happens in the
//! same scope.
//!
//! Location resolution for callers that do not name an exact location
//! lives in [`resolve_destination`] and [`resolve_source`] and nowhere
//! else.

use serde::Deserialize;
use shared::{validate_quantity, StockKey, StockRecord};
use uuid::Uuid;

use super::field_error;
use crate::error::{AppError, AppResult};
use crate::store::UnitOfWork;

/// Where a caller wants stock to come from or go to
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Placement {
    pub warehouse_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

impl Placement {
    pub fn location(location_id: Uuid) -> Self {
        Self {
            warehouse_id: None,
            location_id: Some(location_id),
        }
    }

    pub fn warehouse(warehouse_id: Uuid) -> Self {
        Self {
            warehouse_id: Some(warehouse_id),
            location_id: None,
        }
    }
}

fn insufficient(requested: i64, available: i64) -> AppError {
    AppError::InsufficientStock(format!(
        "requested {}, available {}",
        requested, available
    ))
}

/// Key of the record at an exact location; the warehouse comes from the
/// location's zone
pub async fn location_key(
    uow: &mut dyn UnitOfWork,
    tenant_id: Uuid,
    product_id: Uuid,
    location_id: Uuid,
    batch_number: Option<String>,
) -> AppResult<StockKey> {
    let location = uow
        .location(tenant_id, location_id)
        .await?
        .ok_or_else(|| AppError::not_found("Location"))?;

    Ok(StockKey::new(tenant_id, product_id, location.warehouse_id)
        .at_location(Some(location.id))
        .with_batch(batch_number))
}

async fn ensure_warehouse(
    uow: &mut dyn UnitOfWork,
    tenant_id: Uuid,
    warehouse_id: Uuid,
) -> AppResult<()> {
    let owned = uow
        .warehouses(tenant_id)
        .await?
        .iter()
        .any(|w| w.id == warehouse_id);

    if owned {
        Ok(())
    } else {
        Err(AppError::not_found("Warehouse"))
    }
}

async fn exact_key(
    uow: &mut dyn UnitOfWork,
    tenant_id: Uuid,
    product_id: Uuid,
    placement: Placement,
    location_id: Uuid,
    batch_number: Option<String>,
) -> AppResult<StockKey> {
    let key = location_key(uow, tenant_id, product_id, location_id, batch_number).await?;
    if placement.warehouse_id.is_some_and(|w| w != key.warehouse_id) {
        return Err(AppError::validation(
            "location_id",
            "Location does not belong to the given warehouse",
        ));
    }
    Ok(key)
}

/// The tenant's default warehouse: the first one created
pub async fn default_warehouse(uow: &mut dyn UnitOfWork, tenant_id: Uuid) -> AppResult<Uuid> {
    uow.warehouses(tenant_id)
        .await?
        .first()
        .map(|w| w.id)
        .ok_or_else(|| AppError::validation("warehouse_id", "No warehouse is available"))
}

/// Picks the record a credit should land on.
///
/// An explicit location wins. Otherwise the explicit warehouse, else the
/// tenant's first warehouse, is searched for an existing record of the
/// product and batch; failing that a new record without a location is
/// keyed in that warehouse.
pub async fn resolve_destination(
    uow: &mut dyn UnitOfWork,
    tenant_id: Uuid,
    product_id: Uuid,
    placement: Placement,
    batch_number: Option<String>,
) -> AppResult<StockKey> {
    if let Some(location_id) = placement.location_id {
        return exact_key(uow, tenant_id, product_id, placement, location_id, batch_number).await;
    }

    let warehouse_id = match placement.warehouse_id {
        Some(id) => {
            ensure_warehouse(uow, tenant_id, id).await?;
            id
        }
        None => default_warehouse(uow, tenant_id).await?,
    };

    let existing = uow
        .stock_for_product(tenant_id, product_id, Some(std::slice::from_ref(&warehouse_id)))
        .await?
        .into_iter()
        .find(|r| r.batch_number == batch_number);

    Ok(match existing {
        Some(record) => record.key(),
        None => StockKey::new(tenant_id, product_id, warehouse_id).with_batch(batch_number),
    })
}

/// Picks the record a debit should come from.
///
/// An explicit location selects that exact record. Otherwise the first
/// record with available stock is taken, searching the given warehouse or
/// every tenant warehouse in order; if none has stock the first matching
/// record is returned so the caller reports the shortfall against it.
pub async fn resolve_source(
    uow: &mut dyn UnitOfWork,
    tenant_id: Uuid,
    product_id: Uuid,
    placement: Placement,
    batch_number: Option<&str>,
) -> AppResult<Option<StockRecord>> {
    if let Some(location_id) = placement.location_id {
        let key = exact_key(
            uow,
            tenant_id,
            product_id,
            placement,
            location_id,
            batch_number.map(str::to_string),
        )
        .await?;
        return uow.stock_for_update(&key).await;
    }

    if let Some(id) = placement.warehouse_id {
        ensure_warehouse(uow, tenant_id, id).await?;
    }
    let scope = placement.warehouse_id.map(|id| vec![id]);

    let candidates: Vec<StockRecord> = uow
        .stock_for_product(tenant_id, product_id, scope.as_deref())
        .await?
        .into_iter()
        .filter(|r| batch_number.map_or(true, |b| r.batch_number.as_deref() == Some(b)))
        .collect();

    let index = candidates
        .iter()
        .position(|r| r.available() > 0)
        .unwrap_or(0);

    Ok(candidates.into_iter().nth(index))
}

/// Writes the record and mirrors batch totals into its batch
pub async fn persist(uow: &mut dyn UnitOfWork, record: &StockRecord) -> AppResult<()> {
    uow.save_stock(record).await?;

    let Some(number) = record.batch_number.as_deref() else {
        return Ok(());
    };

    if let Some(mut batch) = uow
        .batch_by_number(record.tenant_id, record.product_id, number)
        .await?
    {
        let (quantity, reserved) = uow
            .stock_for_product(record.tenant_id, record.product_id, None)
            .await?
            .iter()
            .filter(|r| r.batch_number.as_deref() == Some(number))
            .fold((0, 0), |(q, r), s| (q + s.quantity, r + s.reserved));
        batch.mirror(quantity, reserved);
        uow.save_batch(&batch).await?;
    }

    Ok(())
}

/// Finds or creates the record at `key` and adds `qty`
pub async fn credit(uow: &mut dyn UnitOfWork, key: &StockKey, qty: i64) -> AppResult<StockRecord> {
    validate_quantity(qty).map_err(field_error("quantity"))?;

    let mut record = uow.stock_for_credit(key).await?;
    record.credit(qty)?;
    persist(uow, &record).await?;

    Ok(record)
}

/// Removes `qty` from the record at `key`; a missing record has nothing
/// available
pub async fn debit(uow: &mut dyn UnitOfWork, key: &StockKey, qty: i64) -> AppResult<StockRecord> {
    validate_quantity(qty).map_err(field_error("quantity"))?;

    let record = uow
        .stock_for_update(key)
        .await?
        .ok_or_else(|| insufficient(qty, 0))?;

    debit_record(uow, record, qty).await
}

/// Debits a record already locked by this unit of work
pub async fn debit_record(
    uow: &mut dyn UnitOfWork,
    mut record: StockRecord,
    qty: i64,
) -> AppResult<StockRecord> {
    record.debit(qty)?;
    persist(uow, &record).await?;
    Ok(record)
}

/// Moves `qty` between two records. Both sides commit or neither does.
pub async fn transfer(
    uow: &mut dyn UnitOfWork,
    from: &StockKey,
    to: &StockKey,
    qty: i64,
) -> AppResult<(StockRecord, StockRecord)> {
    if from == to {
        return Err(AppError::validation(
            "to_location_id",
            "Source and destination must differ",
        ));
    }

    let source = debit(uow, from, qty).await?;
    let destination = credit(uow, to, qty).await?;

    Ok((source, destination))
}

/// One record's share of a location-to-location move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drawn {
    pub batch_number: Option<String>,
    pub quantity: i64,
}

/// Moves `qty` of a product from one location to another, drawing the
/// source location's records in ledger order whatever their batch. Each
/// share lands on the destination under the same batch number. Fails
/// before writing anything when the source holds less than `qty`.
pub async fn transfer_between_locations(
    uow: &mut dyn UnitOfWork,
    tenant_id: Uuid,
    product_id: Uuid,
    from_location_id: Uuid,
    to_location_id: Uuid,
    qty: i64,
) -> AppResult<Vec<Drawn>> {
    validate_quantity(qty).map_err(field_error("quantity"))?;
    if from_location_id == to_location_id {
        return Err(AppError::validation(
            "to_location_id",
            "Source and destination must differ",
        ));
    }

    let from = uow
        .location(tenant_id, from_location_id)
        .await?
        .ok_or_else(|| AppError::not_found("Location"))?;
    let to = uow
        .location(tenant_id, to_location_id)
        .await?
        .ok_or_else(|| AppError::not_found("Location"))?;

    let records: Vec<StockRecord> = uow
        .stock_for_product(tenant_id, product_id, Some(std::slice::from_ref(&from.warehouse_id)))
        .await?
        .into_iter()
        .filter(|r| r.location_id == Some(from.id) && r.available() > 0)
        .collect();

    let available = shared::total_available(&records);
    if available < qty {
        return Err(insufficient(qty, available));
    }

    let mut remaining = qty;
    let mut drawn = Vec::new();
    for record in records {
        if remaining == 0 {
            break;
        }
        let taken = remaining.min(record.available());
        let batch_number = record.batch_number.clone();
        debit_record(uow, record, taken).await?;

        let key = StockKey::new(tenant_id, product_id, to.warehouse_id)
            .at_location(Some(to.id))
            .with_batch(batch_number.clone());
        credit(uow, &key, taken).await?;

        remaining -= taken;
        drawn.push(Drawn {
            batch_number,
            quantity: taken,
        });
    }

    Ok(drawn)
}

/// Available quantity of a product, optionally limited to a warehouse set
pub async fn total_available(
    uow: &mut dyn UnitOfWork,
    tenant_id: Uuid,
    product_id: Uuid,
    warehouse_ids: Option<&[Uuid]>,
) -> AppResult<i64> {
    let records = uow
        .stock_for_product(tenant_id, product_id, warehouse_ids)
        .await?;
    Ok(shared::total_available(&records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Store};
    use shared::LocationType;

    struct Fixture {
        store: MemoryStore,
        tenant: Uuid,
        product: Uuid,
        w1: Uuid,
        w2: Uuid,
        bin: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let w1 = store.seed_warehouse(tenant, "W1").await;
        let w2 = store.seed_warehouse(tenant, "W2").await;
        let zone = store.seed_zone(w2.id, "A").await;
        let bin = store.seed_location(&zone, "A-01", LocationType::Bulk, 1).await;
        let product = store.seed_product(tenant, "SKU-1").await;
        Fixture {
            store,
            tenant,
            product: product.id,
            w1: w1.id,
            w2: w2.id,
            bin: bin.id,
        }
    }

    #[tokio::test]
    async fn destination_defaults_to_first_warehouse() {
        let f = fixture().await;
        let mut uow = f.store.begin().await.unwrap();

        let key = resolve_destination(uow.as_mut(), f.tenant, f.product, Placement::default(), None)
            .await
            .unwrap();

        assert_eq!(key.warehouse_id, f.w1);
        assert_eq!(key.location_id, None);
    }

    #[tokio::test]
    async fn explicit_location_must_match_warehouse() {
        let f = fixture().await;
        let mut uow = f.store.begin().await.unwrap();

        let placement = Placement {
            warehouse_id: Some(f.w1),
            location_id: Some(f.bin),
        };
        let err = resolve_destination(uow.as_mut(), f.tenant, f.product, placement, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let key = resolve_destination(uow.as_mut(), f.tenant, f.product, Placement::location(f.bin), None)
            .await
            .unwrap();
        assert_eq!(key.warehouse_id, f.w2);
    }

    #[tokio::test]
    async fn source_prefers_records_with_stock() {
        let f = fixture().await;
        let empty = StockKey::new(f.tenant, f.product, f.w1);
        let stocked = StockKey::new(f.tenant, f.product, f.w2).at_location(Some(f.bin));
        f.store.seed_stock(&empty, 0).await;
        f.store.seed_stock(&stocked, 7).await;

        let mut uow = f.store.begin().await.unwrap();
        let record = resolve_source(uow.as_mut(), f.tenant, f.product, Placement::default(), None)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.key(), stocked);
    }

    #[tokio::test]
    async fn debit_without_record_is_insufficient() {
        let f = fixture().await;
        let mut uow = f.store.begin().await.unwrap();
        let key = StockKey::new(f.tenant, f.product, f.w1);

        let err = debit(uow.as_mut(), &key, 3).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock(_)));
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let f = fixture().await;
        let key = StockKey::new(f.tenant, f.product, f.w1);
        {
            let mut uow = f.store.begin().await.unwrap();
            credit(uow.as_mut(), &key, 5).await.unwrap();
        }

        let mut uow = f.store.begin().await.unwrap();
        let total = total_available(uow.as_mut(), f.tenant, f.product, None)
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn location_transfer_draws_every_batch() {
        let f = fixture().await;
        let zone = f.store.seed_zone(f.w2, "B").await;
        let shelf = f.store.seed_location(&zone, "B-01", LocationType::Pick, 1).await;
        let at_bin = StockKey::new(f.tenant, f.product, f.w2).at_location(Some(f.bin));
        f.store
            .seed_stock(&at_bin.clone().with_batch(Some("LOT-A".into())), 4)
            .await;
        f.store
            .seed_stock(&at_bin.clone().with_batch(Some("LOT-B".into())), 6)
            .await;

        let mut uow = f.store.begin().await.unwrap();
        let drawn =
            transfer_between_locations(uow.as_mut(), f.tenant, f.product, f.bin, shelf.id, 7)
                .await
                .unwrap();

        assert_eq!(drawn.iter().map(|d| d.quantity).sum::<i64>(), 7);
        assert_eq!(drawn.len(), 2);
        let moved: Vec<_> = uow
            .stock_for_product(f.tenant, f.product, None)
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.location_id == Some(shelf.id))
            .collect();
        assert_eq!(shared::total_available(&moved), 7);
        assert!(moved.iter().all(|r| r.batch_number.is_some()));
    }

    #[tokio::test]
    async fn location_transfer_short_source_writes_nothing() {
        let f = fixture().await;
        let zone = f.store.seed_zone(f.w2, "B").await;
        let shelf = f.store.seed_location(&zone, "B-01", LocationType::Pick, 1).await;
        let at_bin = StockKey::new(f.tenant, f.product, f.w2)
            .at_location(Some(f.bin))
            .with_batch(Some("LOT-A".into()));
        f.store.seed_stock(&at_bin, 4).await;

        let mut uow = f.store.begin().await.unwrap();
        let err = transfer_between_locations(uow.as_mut(), f.tenant, f.product, f.bin, shelf.id, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock(_)));

        let record = uow.stock_for_update(&at_bin).await.unwrap().unwrap();
        assert_eq!(record.quantity, 4);
    }

    #[tokio::test]
    async fn repeated_first_credits_share_one_record() {
        let f = fixture().await;
        let key = StockKey::new(f.tenant, f.product, f.w2).at_location(Some(f.bin));
        let mut uow = f.store.begin().await.unwrap();

        let first = credit(uow.as_mut(), &key, 3).await.unwrap();
        let second = credit(uow.as_mut(), &key, 4).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 7);
        let records = uow.stock_for_product(f.tenant, f.product, None).await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
