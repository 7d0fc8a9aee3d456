//! PostgreSQL store
//!
//! One `sqlx` transaction per unit of work. Aggregate reads take row locks
//! with `FOR UPDATE`; dropping the transaction without `commit` rolls back.

use async_trait::async_trait;
use shared::{
    Batch, CycleCount, CycleCountLine, GoodsReceipt, GoodsReceiptLine, InventoryAdjustment,
    Location, Movement, OrderItem, OrderStatus, PackingTask, PickList, PickListItem, Product,
    PurchaseOrder, PurchaseOrderLine, ReplenishmentConfig, ReplenishmentTask,
    ReplenishmentTaskStatus, ReturnRequest, SalesOrder, SequenceKind, Shipment, StockKey,
    StockRecord, User, Warehouse,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{BatchFilter, MovementFilter, StockFilter, Store, UnitOfWork};
use crate::error::{AppError, AppResult};

const STOCK_COLUMNS: &str = "id, tenant_id, product_id, warehouse_id, location_id, batch_number, \
     quantity, reserved, best_before_date, created_at, updated_at";

const MOVEMENT_COLUMNS: &str = "id, tenant_id, movement_type, product_id, batch_id, \
     from_location_id, to_location_id, quantity, reason, notes, reference_type, reference_id, \
     created_by, created_at";

const BATCH_COLUMNS: &str = "id, tenant_id, product_id, warehouse_id, location_id, batch_number, \
     quantity, reserved, unit_cost, received_date, expiry_date, manufacturing_date, supplier_id, \
     status, notes, created_at, updated_at";

const ADJUSTMENT_COLUMNS: &str = "id, tenant_id, reference_number, adjustment_type, product_id, \
     warehouse_id, location_id, stock_record_id, quantity, reason, notes, cycle_count_id, status, \
     created_by, created_at, completed_at";

const CYCLE_COUNT_COLUMNS: &str = "id, tenant_id, reference_number, name, count_type, \
     location_id, scheduled_date, status, items_count, discrepancies, notes, created_by, \
     counted_by, created_at, started_at, completed_at";

const CONFIG_COLUMNS: &str = "id, tenant_id, product_id, min_stock_level, max_stock_level, \
     reorder_point, reorder_quantity, auto_create_tasks, status, created_at, updated_at";

const TASK_COLUMNS: &str = "id, tenant_id, task_number, product_id, from_location_id, \
     to_location_id, quantity_needed, quantity_completed, priority, status, notes, created_by, \
     completed_by, created_at, updated_at, completed_at";

const PO_COLUMNS: &str = "id, tenant_id, po_number, supplier_id, status, total_amount, \
     expected_delivery, notes, created_by, approved_by, approved_at, created_at, updated_at";

const RECEIPT_COLUMNS: &str = "id, tenant_id, grn_number, purchase_order_id, status, \
     total_expected, total_received, notes, received_by, created_by, created_at, updated_at, \
     completed_at";

const ORDER_COLUMNS: &str = "id, tenant_id, order_number, customer_id, warehouse_id, status, \
     priority, order_date, required_date, sales_channel, reference, notes, total_amount, \
     created_by, created_at, updated_at";

const PICK_LIST_COLUMNS: &str = "id, tenant_id, order_id, warehouse_id, status, assigned_to, \
     started_at, completed_at, created_at, updated_at";

const PACKING_COLUMNS: &str = "id, tenant_id, order_id, pick_list_id, status, assigned_to, \
     notes, started_at, completed_at, created_at, updated_at";

const SHIPMENT_COLUMNS: &str = "id, tenant_id, order_id, packing_task_id, courier, \
     tracking_number, weight, dispatch_date, delivery_status, stock_deducted, created_by, \
     created_at, updated_at";

const RETURN_COLUMNS: &str = "id, tenant_id, rma_number, order_id, shipment_id, return_type, \
     status, reason, notes, recovery_value, refund_amount, created_by, created_at, updated_at, \
     received_at, inspected_at, completed_at";

const LOCATION_SELECT: &str = "SELECT l.id, l.zone_id, z.warehouse_id, l.code, l.location_type, \
     l.pick_sequence, l.capacity \
     FROM locations l \
     JOIN zones z ON z.id = l.zone_id \
     JOIN warehouses w ON w.id = z.warehouse_id";

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn product(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, sku, name, unit_of_measure, reorder_level, reorder_quantity,
                   batch_tracked, created_at
            FROM products
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(product)
    }

    async fn warehouses(&mut self, tenant_id: Uuid) -> AppResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(
            r#"
            SELECT id, tenant_id, code, name, created_at
            FROM warehouses
            WHERE tenant_id = $1
            ORDER BY created_at, code
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(warehouses)
    }

    async fn location(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(&format!(
            "{} WHERE l.id = $1 AND w.tenant_id = $2",
            LOCATION_SELECT
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(location)
    }

    async fn locations(&mut self, tenant_id: Uuid) -> AppResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(&format!(
            "{} WHERE w.tenant_id = $1 ORDER BY l.pick_sequence, l.code",
            LOCATION_SELECT
        ))
        .bind(tenant_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(locations)
    }

    async fn user(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, tenant_id, name, role, active FROM users WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn stock_for_update(&mut self, key: &StockKey) -> AppResult<Option<StockRecord>> {
        let record = sqlx::query_as::<_, StockRecord>(&format!(
            r#"
            SELECT {}
            FROM stock_records
            WHERE tenant_id = $1 AND product_id = $2 AND warehouse_id = $3
              AND location_id IS NOT DISTINCT FROM $4
              AND batch_number IS NOT DISTINCT FROM $5
            FOR UPDATE
            "#,
            STOCK_COLUMNS
        ))
        .bind(key.tenant_id)
        .bind(key.product_id)
        .bind(key.warehouse_id)
        .bind(key.location_id)
        .bind(&key.batch_number)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(record)
    }

    /// Two first credits to the same key race on the insert; the loser
    /// skips it and waits on the winner's row lock.
    async fn stock_for_credit(&mut self, key: &StockKey) -> AppResult<StockRecord> {
        let fresh = StockRecord::new(key);
        sqlx::query(
            r#"
            INSERT INTO stock_records (
                id, tenant_id, product_id, warehouse_id, location_id, batch_number,
                quantity, reserved, best_before_date, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, 0, 0, NULL, $7, $7)
            ON CONFLICT ON CONSTRAINT stock_key_unique DO NOTHING
            "#,
        )
        .bind(fresh.id)
        .bind(fresh.tenant_id)
        .bind(fresh.product_id)
        .bind(fresh.warehouse_id)
        .bind(fresh.location_id)
        .bind(&fresh.batch_number)
        .bind(fresh.created_at)
        .execute(&mut *self.tx)
        .await?;

        self.stock_for_update(key)
            .await?
            .ok_or_else(|| AppError::Internal("stock record vanished after insert".to_string()))
    }

    async fn stock_by_id_for_update(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<StockRecord>> {
        let record = sqlx::query_as::<_, StockRecord>(&format!(
            "SELECT {} FROM stock_records WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
            STOCK_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(record)
    }

    async fn stock_for_product(
        &mut self,
        tenant_id: Uuid,
        product_id: Uuid,
        warehouse_ids: Option<&[Uuid]>,
    ) -> AppResult<Vec<StockRecord>> {
        let records = sqlx::query_as::<_, StockRecord>(
            r#"
            SELECT s.id, s.tenant_id, s.product_id, s.warehouse_id, s.location_id,
                   s.batch_number, s.quantity, s.reserved, s.best_before_date,
                   s.created_at, s.updated_at
            FROM stock_records s
            JOIN warehouses w ON w.id = s.warehouse_id
            WHERE s.tenant_id = $1 AND s.product_id = $2
              AND ($3::uuid[] IS NULL OR s.warehouse_id = ANY($3))
            ORDER BY w.created_at, w.code, s.created_at, s.id
            FOR UPDATE OF s
            "#,
        )
        .bind(tenant_id)
        .bind(product_id)
        .bind(warehouse_ids.map(|ids| ids.to_vec()))
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(records)
    }

    async fn stock_records(
        &mut self,
        tenant_id: Uuid,
        filter: &StockFilter,
    ) -> AppResult<Vec<StockRecord>> {
        let records = sqlx::query_as::<_, StockRecord>(&format!(
            r#"
            SELECT {}
            FROM stock_records
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR product_id = $2)
              AND ($3::uuid IS NULL OR warehouse_id = $3)
              AND ($4::uuid IS NULL OR location_id = $4)
            ORDER BY created_at, id
            "#,
            STOCK_COLUMNS
        ))
        .bind(tenant_id)
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .bind(filter.location_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(records)
    }

    async fn save_stock(&mut self, record: &StockRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_records (
                id, tenant_id, product_id, warehouse_id, location_id, batch_number,
                quantity, reserved, best_before_date, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                reserved = EXCLUDED.reserved,
                best_before_date = EXCLUDED.best_before_date,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.id)
        .bind(record.tenant_id)
        .bind(record.product_id)
        .bind(record.warehouse_id)
        .bind(record.location_id)
        .bind(&record.batch_number)
        .bind(record.quantity)
        .bind(record.reserved)
        .bind(record.best_before_date)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_movement(&mut self, movement: &Movement) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO movements ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            MOVEMENT_COLUMNS
        ))
        .bind(movement.id)
        .bind(movement.tenant_id)
        .bind(movement.movement_type)
        .bind(movement.product_id)
        .bind(movement.batch_id)
        .bind(movement.from_location_id)
        .bind(movement.to_location_id)
        .bind(movement.quantity)
        .bind(&movement.reason)
        .bind(&movement.notes)
        .bind(&movement.reference_type)
        .bind(movement.reference_id)
        .bind(movement.created_by)
        .bind(movement.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn movements(
        &mut self,
        tenant_id: Uuid,
        filter: &MovementFilter,
    ) -> AppResult<Vec<Movement>> {
        let movements = sqlx::query_as::<_, Movement>(&format!(
            r#"
            SELECT {}
            FROM movements
            WHERE tenant_id = $1
              AND ($2::movement_type IS NULL OR movement_type = $2)
              AND ($3::uuid IS NULL OR product_id = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at <= $5)
            ORDER BY created_at DESC
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(tenant_id)
        .bind(filter.movement_type)
        .bind(filter.product_id)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(movements)
    }

    async fn movement(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Movement>> {
        let movement = sqlx::query_as::<_, Movement>(&format!(
            "SELECT {} FROM movements WHERE id = $1 AND tenant_id = $2",
            MOVEMENT_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(movement)
    }

    async fn save_batch(&mut self, batch: &Batch) -> AppResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO batches ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (id) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                reserved = EXCLUDED.reserved,
                unit_cost = EXCLUDED.unit_cost,
                expiry_date = EXCLUDED.expiry_date,
                manufacturing_date = EXCLUDED.manufacturing_date,
                supplier_id = EXCLUDED.supplier_id,
                status = EXCLUDED.status,
                notes = EXCLUDED.notes,
                updated_at = EXCLUDED.updated_at
            "#,
            BATCH_COLUMNS
        ))
        .bind(batch.id)
        .bind(batch.tenant_id)
        .bind(batch.product_id)
        .bind(batch.warehouse_id)
        .bind(batch.location_id)
        .bind(&batch.batch_number)
        .bind(batch.quantity)
        .bind(batch.reserved)
        .bind(batch.unit_cost)
        .bind(batch.received_date)
        .bind(batch.expiry_date)
        .bind(batch.manufacturing_date)
        .bind(batch.supplier_id)
        .bind(batch.status)
        .bind(&batch.notes)
        .bind(batch.created_at)
        .bind(batch.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn batch(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {} FROM batches WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
            BATCH_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(batch)
    }

    async fn batch_by_number(
        &mut self,
        tenant_id: Uuid,
        product_id: Uuid,
        batch_number: &str,
    ) -> AppResult<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {} FROM batches \
             WHERE tenant_id = $1 AND product_id = $2 AND batch_number = $3 FOR UPDATE",
            BATCH_COLUMNS
        ))
        .bind(tenant_id)
        .bind(product_id)
        .bind(batch_number)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(batch)
    }

    async fn batches(&mut self, tenant_id: Uuid, filter: &BatchFilter) -> AppResult<Vec<Batch>> {
        let batches = sqlx::query_as::<_, Batch>(&format!(
            r#"
            SELECT {}
            FROM batches
            WHERE tenant_id = $1
              AND ($2::batch_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR product_id = $3)
              AND ($4::uuid IS NULL OR warehouse_id = $4)
            ORDER BY received_date, created_at
            "#,
            BATCH_COLUMNS
        ))
        .bind(tenant_id)
        .bind(filter.status)
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(batches)
    }

    async fn save_adjustment(&mut self, adjustment: &InventoryAdjustment) -> AppResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO inventory_adjustments ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE SET
                stock_record_id = EXCLUDED.stock_record_id,
                warehouse_id = EXCLUDED.warehouse_id,
                location_id = EXCLUDED.location_id,
                status = EXCLUDED.status,
                completed_at = EXCLUDED.completed_at
            "#,
            ADJUSTMENT_COLUMNS
        ))
        .bind(adjustment.id)
        .bind(adjustment.tenant_id)
        .bind(&adjustment.reference_number)
        .bind(adjustment.adjustment_type)
        .bind(adjustment.product_id)
        .bind(adjustment.warehouse_id)
        .bind(adjustment.location_id)
        .bind(adjustment.stock_record_id)
        .bind(adjustment.quantity)
        .bind(&adjustment.reason)
        .bind(&adjustment.notes)
        .bind(adjustment.cycle_count_id)
        .bind(adjustment.status)
        .bind(adjustment.created_by)
        .bind(adjustment.created_at)
        .bind(adjustment.completed_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn adjustment(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<InventoryAdjustment>> {
        let adjustment = sqlx::query_as::<_, InventoryAdjustment>(&format!(
            "SELECT {} FROM inventory_adjustments WHERE id = $1 AND tenant_id = $2",
            ADJUSTMENT_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(adjustment)
    }

    async fn adjustments(&mut self, tenant_id: Uuid) -> AppResult<Vec<InventoryAdjustment>> {
        let adjustments = sqlx::query_as::<_, InventoryAdjustment>(&format!(
            "SELECT {} FROM inventory_adjustments WHERE tenant_id = $1 ORDER BY reference_number",
            ADJUSTMENT_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(adjustments)
    }

    async fn save_cycle_count(&mut self, count: &CycleCount) -> AppResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO cycle_counts ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                items_count = EXCLUDED.items_count,
                discrepancies = EXCLUDED.discrepancies,
                notes = EXCLUDED.notes,
                counted_by = EXCLUDED.counted_by,
                started_at = EXCLUDED.started_at,
                completed_at = EXCLUDED.completed_at
            "#,
            CYCLE_COUNT_COLUMNS
        ))
        .bind(count.id)
        .bind(count.tenant_id)
        .bind(&count.reference_number)
        .bind(&count.name)
        .bind(count.count_type)
        .bind(count.location_id)
        .bind(count.scheduled_date)
        .bind(count.status)
        .bind(count.items_count)
        .bind(count.discrepancies)
        .bind(&count.notes)
        .bind(count.created_by)
        .bind(count.counted_by)
        .bind(count.created_at)
        .bind(count.started_at)
        .bind(count.completed_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn cycle_count(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<CycleCount>> {
        let count = sqlx::query_as::<_, CycleCount>(&format!(
            "SELECT {} FROM cycle_counts WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
            CYCLE_COUNT_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(count)
    }

    async fn cycle_counts(&mut self, tenant_id: Uuid) -> AppResult<Vec<CycleCount>> {
        let counts = sqlx::query_as::<_, CycleCount>(&format!(
            "SELECT {} FROM cycle_counts WHERE tenant_id = $1 ORDER BY reference_number",
            CYCLE_COUNT_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(counts)
    }

    async fn insert_cycle_count_line(&mut self, line: &CycleCountLine) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cycle_count_lines (
                id, cycle_count_id, product_id, batch_number, system_quantity,
                counted_quantity, variance, adjustment_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(line.id)
        .bind(line.cycle_count_id)
        .bind(line.product_id)
        .bind(&line.batch_number)
        .bind(line.system_quantity)
        .bind(line.counted_quantity)
        .bind(line.variance)
        .bind(line.adjustment_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn cycle_count_lines(&mut self, cycle_count_id: Uuid) -> AppResult<Vec<CycleCountLine>> {
        let lines = sqlx::query_as::<_, CycleCountLine>(
            r#"
            SELECT id, cycle_count_id, product_id, batch_number, system_quantity,
                   counted_quantity, variance, adjustment_id
            FROM cycle_count_lines
            WHERE cycle_count_id = $1
            "#,
        )
        .bind(cycle_count_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(lines)
    }

    async fn save_replenishment_config(&mut self, config: &ReplenishmentConfig) -> AppResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO replenishment_configs ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                min_stock_level = EXCLUDED.min_stock_level,
                max_stock_level = EXCLUDED.max_stock_level,
                reorder_point = EXCLUDED.reorder_point,
                reorder_quantity = EXCLUDED.reorder_quantity,
                auto_create_tasks = EXCLUDED.auto_create_tasks,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
            CONFIG_COLUMNS
        ))
        .bind(config.id)
        .bind(config.tenant_id)
        .bind(config.product_id)
        .bind(config.min_stock_level)
        .bind(config.max_stock_level)
        .bind(config.reorder_point)
        .bind(config.reorder_quantity)
        .bind(config.auto_create_tasks)
        .bind(config.status)
        .bind(config.created_at)
        .bind(config.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn replenishment_config(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<ReplenishmentConfig>> {
        let config = sqlx::query_as::<_, ReplenishmentConfig>(&format!(
            "SELECT {} FROM replenishment_configs WHERE id = $1 AND tenant_id = $2",
            CONFIG_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(config)
    }

    async fn replenishment_config_for_product(
        &mut self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Option<ReplenishmentConfig>> {
        let config = sqlx::query_as::<_, ReplenishmentConfig>(&format!(
            "SELECT {} FROM replenishment_configs WHERE tenant_id = $1 AND product_id = $2",
            CONFIG_COLUMNS
        ))
        .bind(tenant_id)
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(config)
    }

    async fn replenishment_configs(
        &mut self,
        tenant_id: Uuid,
    ) -> AppResult<Vec<ReplenishmentConfig>> {
        let configs = sqlx::query_as::<_, ReplenishmentConfig>(&format!(
            "SELECT {} FROM replenishment_configs WHERE tenant_id = $1 ORDER BY created_at, id",
            CONFIG_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(configs)
    }

    async fn delete_replenishment_config(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM replenishment_configs WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn tenants_with_auto_replenishment(&mut self) -> AppResult<Vec<Uuid>> {
        let tenants = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT tenant_id
            FROM replenishment_configs
            WHERE auto_create_tasks AND status = 'ACTIVE'
            ORDER BY tenant_id
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(tenants)
    }

    async fn save_replenishment_task(&mut self, task: &ReplenishmentTask) -> AppResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO replenishment_tasks ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE SET
                quantity_needed = EXCLUDED.quantity_needed,
                quantity_completed = EXCLUDED.quantity_completed,
                priority = EXCLUDED.priority,
                status = EXCLUDED.status,
                notes = EXCLUDED.notes,
                completed_by = EXCLUDED.completed_by,
                updated_at = EXCLUDED.updated_at,
                completed_at = EXCLUDED.completed_at
            "#,
            TASK_COLUMNS
        ))
        .bind(task.id)
        .bind(task.tenant_id)
        .bind(&task.task_number)
        .bind(task.product_id)
        .bind(task.from_location_id)
        .bind(task.to_location_id)
        .bind(task.quantity_needed)
        .bind(task.quantity_completed)
        .bind(task.priority)
        .bind(task.status)
        .bind(&task.notes)
        .bind(task.created_by)
        .bind(task.completed_by)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(task.completed_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn replenishment_task(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<ReplenishmentTask>> {
        let task = sqlx::query_as::<_, ReplenishmentTask>(&format!(
            "SELECT {} FROM replenishment_tasks WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(task)
    }

    async fn replenishment_tasks(
        &mut self,
        tenant_id: Uuid,
        status: Option<ReplenishmentTaskStatus>,
    ) -> AppResult<Vec<ReplenishmentTask>> {
        let tasks = sqlx::query_as::<_, ReplenishmentTask>(&format!(
            r#"
            SELECT {}
            FROM replenishment_tasks
            WHERE tenant_id = $1
              AND ($2::replenishment_task_status IS NULL OR status = $2)
            ORDER BY task_number
            "#,
            TASK_COLUMNS
        ))
        .bind(tenant_id)
        .bind(status)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(tasks)
    }

    async fn save_purchase_order(&mut self, order: &PurchaseOrder) -> AppResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO purchase_orders ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                supplier_id = EXCLUDED.supplier_id,
                status = EXCLUDED.status,
                total_amount = EXCLUDED.total_amount,
                expected_delivery = EXCLUDED.expected_delivery,
                notes = EXCLUDED.notes,
                approved_by = EXCLUDED.approved_by,
                approved_at = EXCLUDED.approved_at,
                updated_at = EXCLUDED.updated_at
            "#,
            PO_COLUMNS
        ))
        .bind(order.id)
        .bind(order.tenant_id)
        .bind(&order.po_number)
        .bind(order.supplier_id)
        .bind(order.status)
        .bind(order.total_amount)
        .bind(order.expected_delivery)
        .bind(&order.notes)
        .bind(order.created_by)
        .bind(order.approved_by)
        .bind(order.approved_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn purchase_order(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<PurchaseOrder>> {
        let order = sqlx::query_as::<_, PurchaseOrder>(&format!(
            "SELECT {} FROM purchase_orders WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
            PO_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(order)
    }

    async fn purchase_orders(&mut self, tenant_id: Uuid) -> AppResult<Vec<PurchaseOrder>> {
        let orders = sqlx::query_as::<_, PurchaseOrder>(&format!(
            "SELECT {} FROM purchase_orders WHERE tenant_id = $1 ORDER BY length(po_number), po_number",
            PO_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(orders)
    }

    async fn replace_purchase_order_lines(
        &mut self,
        purchase_order_id: Uuid,
        lines: &[PurchaseOrderLine],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM purchase_order_lines WHERE purchase_order_id = $1")
            .bind(purchase_order_id)
            .execute(&mut *self.tx)
            .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO purchase_order_lines (
                    id, purchase_order_id, product_id, quantity, unit_price, line_total
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(line.id)
            .bind(purchase_order_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.line_total)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn purchase_order_lines(
        &mut self,
        purchase_order_id: Uuid,
    ) -> AppResult<Vec<PurchaseOrderLine>> {
        let lines = sqlx::query_as::<_, PurchaseOrderLine>(
            r#"
            SELECT id, purchase_order_id, product_id, quantity, unit_price, line_total
            FROM purchase_order_lines
            WHERE purchase_order_id = $1
            "#,
        )
        .bind(purchase_order_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(lines)
    }

    async fn delete_purchase_order(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM purchase_orders WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn save_goods_receipt(&mut self, receipt: &GoodsReceipt) -> AppResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO goods_receipts ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                total_expected = EXCLUDED.total_expected,
                total_received = EXCLUDED.total_received,
                notes = EXCLUDED.notes,
                received_by = EXCLUDED.received_by,
                updated_at = EXCLUDED.updated_at,
                completed_at = EXCLUDED.completed_at
            "#,
            RECEIPT_COLUMNS
        ))
        .bind(receipt.id)
        .bind(receipt.tenant_id)
        .bind(&receipt.grn_number)
        .bind(receipt.purchase_order_id)
        .bind(receipt.status)
        .bind(receipt.total_expected)
        .bind(receipt.total_received)
        .bind(&receipt.notes)
        .bind(receipt.received_by)
        .bind(receipt.created_by)
        .bind(receipt.created_at)
        .bind(receipt.updated_at)
        .bind(receipt.completed_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn goods_receipt(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<GoodsReceipt>> {
        let receipt = sqlx::query_as::<_, GoodsReceipt>(&format!(
            "SELECT {} FROM goods_receipts WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
            RECEIPT_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(receipt)
    }

    async fn goods_receipts(&mut self, tenant_id: Uuid) -> AppResult<Vec<GoodsReceipt>> {
        let receipts = sqlx::query_as::<_, GoodsReceipt>(&format!(
            "SELECT {} FROM goods_receipts WHERE tenant_id = $1 ORDER BY length(grn_number), grn_number",
            RECEIPT_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(receipts)
    }

    async fn save_goods_receipt_line(&mut self, line: &GoodsReceiptLine) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO goods_receipt_lines (
                id, goods_receipt_id, product_id, expected_quantity, received_quantity,
                quality_status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                received_quantity = EXCLUDED.received_quantity,
                quality_status = EXCLUDED.quality_status,
                notes = EXCLUDED.notes
            "#,
        )
        .bind(line.id)
        .bind(line.goods_receipt_id)
        .bind(line.product_id)
        .bind(line.expected_quantity)
        .bind(line.received_quantity)
        .bind(line.quality_status)
        .bind(&line.notes)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn goods_receipt_lines(&mut self, receipt_id: Uuid) -> AppResult<Vec<GoodsReceiptLine>> {
        let lines = sqlx::query_as::<_, GoodsReceiptLine>(
            r#"
            SELECT id, goods_receipt_id, product_id, expected_quantity, received_quantity,
                   quality_status, notes
            FROM goods_receipt_lines
            WHERE goods_receipt_id = $1
            ORDER BY product_id, id
            "#,
        )
        .bind(receipt_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(lines)
    }

    async fn delete_goods_receipt(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM goods_receipts WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn save_sales_order(&mut self, order: &SalesOrder) -> AppResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO sales_orders ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE SET
                customer_id = EXCLUDED.customer_id,
                warehouse_id = EXCLUDED.warehouse_id,
                status = EXCLUDED.status,
                priority = EXCLUDED.priority,
                required_date = EXCLUDED.required_date,
                sales_channel = EXCLUDED.sales_channel,
                reference = EXCLUDED.reference,
                notes = EXCLUDED.notes,
                total_amount = EXCLUDED.total_amount,
                updated_at = EXCLUDED.updated_at
            "#,
            ORDER_COLUMNS
        ))
        .bind(order.id)
        .bind(order.tenant_id)
        .bind(&order.order_number)
        .bind(order.customer_id)
        .bind(order.warehouse_id)
        .bind(order.status)
        .bind(order.priority)
        .bind(order.order_date)
        .bind(order.required_date)
        .bind(&order.sales_channel)
        .bind(&order.reference)
        .bind(&order.notes)
        .bind(order.total_amount)
        .bind(order.created_by)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn sales_order(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<SalesOrder>> {
        let order = sqlx::query_as::<_, SalesOrder>(&format!(
            "SELECT {} FROM sales_orders WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(order)
    }

    async fn sales_orders(
        &mut self,
        tenant_id: Uuid,
        status: Option<OrderStatus>,
    ) -> AppResult<Vec<SalesOrder>> {
        let orders = sqlx::query_as::<_, SalesOrder>(&format!(
            r#"
            SELECT {}
            FROM sales_orders
            WHERE tenant_id = $1 AND ($2::order_status IS NULL OR status = $2)
            ORDER BY order_number
            "#,
            ORDER_COLUMNS
        ))
        .bind(tenant_id)
        .bind(status)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(orders)
    }

    async fn replace_order_items(&mut self, order_id: Uuid, items: &[OrderItem]) -> AppResult<()> {
        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *self.tx)
            .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(item.id)
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.line_total)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn order_items(&mut self, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price, line_total
            FROM order_items
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(items)
    }

    async fn save_pick_list(&mut self, pick_list: &PickList) -> AppResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO pick_lists ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                warehouse_id = EXCLUDED.warehouse_id,
                status = EXCLUDED.status,
                assigned_to = EXCLUDED.assigned_to,
                started_at = EXCLUDED.started_at,
                completed_at = EXCLUDED.completed_at,
                updated_at = EXCLUDED.updated_at
            "#,
            PICK_LIST_COLUMNS
        ))
        .bind(pick_list.id)
        .bind(pick_list.tenant_id)
        .bind(pick_list.order_id)
        .bind(pick_list.warehouse_id)
        .bind(pick_list.status)
        .bind(pick_list.assigned_to)
        .bind(pick_list.started_at)
        .bind(pick_list.completed_at)
        .bind(pick_list.created_at)
        .bind(pick_list.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn pick_list(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<PickList>> {
        let pick_list = sqlx::query_as::<_, PickList>(&format!(
            "SELECT {} FROM pick_lists WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
            PICK_LIST_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(pick_list)
    }

    async fn pick_list_for_order(
        &mut self,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<Option<PickList>> {
        let pick_list = sqlx::query_as::<_, PickList>(&format!(
            "SELECT {} FROM pick_lists WHERE order_id = $1 AND tenant_id = $2 FOR UPDATE",
            PICK_LIST_COLUMNS
        ))
        .bind(order_id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(pick_list)
    }

    async fn pick_lists(
        &mut self,
        tenant_id: Uuid,
        assigned_to: Option<Uuid>,
    ) -> AppResult<Vec<PickList>> {
        let pick_lists = sqlx::query_as::<_, PickList>(&format!(
            r#"
            SELECT {}
            FROM pick_lists
            WHERE tenant_id = $1 AND ($2::uuid IS NULL OR assigned_to = $2)
            ORDER BY created_at, id
            "#,
            PICK_LIST_COLUMNS
        ))
        .bind(tenant_id)
        .bind(assigned_to)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(pick_lists)
    }

    async fn replace_pick_list_items(
        &mut self,
        pick_list_id: Uuid,
        items: &[PickListItem],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM pick_list_items WHERE pick_list_id = $1")
            .bind(pick_list_id)
            .execute(&mut *self.tx)
            .await?;

        for item in items {
            self.save_pick_list_item(item).await?;
        }

        Ok(())
    }

    async fn save_pick_list_item(&mut self, item: &PickListItem) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pick_list_items (
                id, pick_list_id, product_id, location_id, quantity_required, quantity_picked
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                location_id = EXCLUDED.location_id,
                quantity_required = EXCLUDED.quantity_required,
                quantity_picked = EXCLUDED.quantity_picked
            "#,
        )
        .bind(item.id)
        .bind(item.pick_list_id)
        .bind(item.product_id)
        .bind(item.location_id)
        .bind(item.quantity_required)
        .bind(item.quantity_picked)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn pick_list_items(&mut self, pick_list_id: Uuid) -> AppResult<Vec<PickListItem>> {
        let items = sqlx::query_as::<_, PickListItem>(
            r#"
            SELECT id, pick_list_id, product_id, location_id, quantity_required, quantity_picked
            FROM pick_list_items
            WHERE pick_list_id = $1
            ORDER BY product_id, id
            "#,
        )
        .bind(pick_list_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(items)
    }

    async fn delete_pick_list(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM pick_lists WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn save_packing_task(&mut self, task: &PackingTask) -> AppResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO packing_tasks ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                assigned_to = EXCLUDED.assigned_to,
                notes = EXCLUDED.notes,
                started_at = EXCLUDED.started_at,
                completed_at = EXCLUDED.completed_at,
                updated_at = EXCLUDED.updated_at
            "#,
            PACKING_COLUMNS
        ))
        .bind(task.id)
        .bind(task.tenant_id)
        .bind(task.order_id)
        .bind(task.pick_list_id)
        .bind(task.status)
        .bind(task.assigned_to)
        .bind(&task.notes)
        .bind(task.started_at)
        .bind(task.completed_at)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn packing_task(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<PackingTask>> {
        let task = sqlx::query_as::<_, PackingTask>(&format!(
            "SELECT {} FROM packing_tasks WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
            PACKING_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(task)
    }

    async fn packing_task_for_pick_list(
        &mut self,
        tenant_id: Uuid,
        pick_list_id: Uuid,
    ) -> AppResult<Option<PackingTask>> {
        let task = sqlx::query_as::<_, PackingTask>(&format!(
            "SELECT {} FROM packing_tasks WHERE pick_list_id = $1 AND tenant_id = $2 FOR UPDATE",
            PACKING_COLUMNS
        ))
        .bind(pick_list_id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(task)
    }

    async fn packing_tasks(
        &mut self,
        tenant_id: Uuid,
        assigned_to: Option<Uuid>,
    ) -> AppResult<Vec<PackingTask>> {
        let tasks = sqlx::query_as::<_, PackingTask>(&format!(
            r#"
            SELECT {}
            FROM packing_tasks
            WHERE tenant_id = $1 AND ($2::uuid IS NULL OR assigned_to = $2)
            ORDER BY created_at, id
            "#,
            PACKING_COLUMNS
        ))
        .bind(tenant_id)
        .bind(assigned_to)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(tasks)
    }

    async fn delete_packing_task(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM packing_tasks WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn save_shipment(&mut self, shipment: &Shipment) -> AppResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO shipments ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                courier = EXCLUDED.courier,
                tracking_number = EXCLUDED.tracking_number,
                weight = EXCLUDED.weight,
                dispatch_date = EXCLUDED.dispatch_date,
                delivery_status = EXCLUDED.delivery_status,
                stock_deducted = EXCLUDED.stock_deducted,
                updated_at = EXCLUDED.updated_at
            "#,
            SHIPMENT_COLUMNS
        ))
        .bind(shipment.id)
        .bind(shipment.tenant_id)
        .bind(shipment.order_id)
        .bind(shipment.packing_task_id)
        .bind(&shipment.courier)
        .bind(&shipment.tracking_number)
        .bind(shipment.weight)
        .bind(shipment.dispatch_date)
        .bind(shipment.delivery_status)
        .bind(shipment.stock_deducted)
        .bind(shipment.created_by)
        .bind(shipment.created_at)
        .bind(shipment.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn shipment(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Shipment>> {
        let shipment = sqlx::query_as::<_, Shipment>(&format!(
            "SELECT {} FROM shipments WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
            SHIPMENT_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(shipment)
    }

    async fn shipment_for_order(
        &mut self,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<Option<Shipment>> {
        let shipment = sqlx::query_as::<_, Shipment>(&format!(
            "SELECT {} FROM shipments WHERE order_id = $1 AND tenant_id = $2 FOR UPDATE",
            SHIPMENT_COLUMNS
        ))
        .bind(order_id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(shipment)
    }

    async fn shipments(&mut self, tenant_id: Uuid) -> AppResult<Vec<Shipment>> {
        let shipments = sqlx::query_as::<_, Shipment>(&format!(
            "SELECT {} FROM shipments WHERE tenant_id = $1 ORDER BY created_at DESC",
            SHIPMENT_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(shipments)
    }

    async fn save_return(&mut self, rma: &ReturnRequest) -> AppResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO returns ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                notes = EXCLUDED.notes,
                recovery_value = EXCLUDED.recovery_value,
                refund_amount = EXCLUDED.refund_amount,
                updated_at = EXCLUDED.updated_at,
                received_at = EXCLUDED.received_at,
                inspected_at = EXCLUDED.inspected_at,
                completed_at = EXCLUDED.completed_at
            "#,
            RETURN_COLUMNS
        ))
        .bind(rma.id)
        .bind(rma.tenant_id)
        .bind(&rma.rma_number)
        .bind(rma.order_id)
        .bind(rma.shipment_id)
        .bind(rma.return_type)
        .bind(rma.status)
        .bind(&rma.reason)
        .bind(&rma.notes)
        .bind(rma.recovery_value)
        .bind(rma.refund_amount)
        .bind(rma.created_by)
        .bind(rma.created_at)
        .bind(rma.updated_at)
        .bind(rma.received_at)
        .bind(rma.inspected_at)
        .bind(rma.completed_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn return_request(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<ReturnRequest>> {
        let rma = sqlx::query_as::<_, ReturnRequest>(&format!(
            "SELECT {} FROM returns WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
            RETURN_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(rma)
    }

    async fn returns(&mut self, tenant_id: Uuid) -> AppResult<Vec<ReturnRequest>> {
        let returns = sqlx::query_as::<_, ReturnRequest>(&format!(
            "SELECT {} FROM returns WHERE tenant_id = $1 ORDER BY rma_number",
            RETURN_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(returns)
    }

    async fn next_sequence(&mut self, tenant_id: Uuid, kind: SequenceKind) -> AppResult<i64> {
        let value = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO number_sequences (tenant_id, kind, last_value)
            VALUES ($1, $2, 1)
            ON CONFLICT (tenant_id, kind)
            DO UPDATE SET last_value = number_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(tenant_id)
        .bind(kind.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(value)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
