//! Persistence interface for the warehouse core
//!
//! Every operation runs inside one [`UnitOfWork`]: reads, writes and the
//! final `commit` share a transaction scope. Dropping a unit of work
//! without committing discards all of its writes.
//!
//! Single-entity reads of mutable aggregates (stock records, tasks,
//! orders, shipments) lock the row until the unit of work ends, so a
//! read-check-write sequence cannot lose an update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{
    Batch, BatchStatus, CycleCount, CycleCountLine, DateRange, GoodsReceipt, GoodsReceiptLine,
    InventoryAdjustment, Location, Movement, MovementType, OrderItem, OrderStatus, PackingTask,
    PickList, PickListItem, Product, PurchaseOrder, PurchaseOrderLine, ReplenishmentConfig,
    ReplenishmentTask, ReplenishmentTaskStatus, ReturnRequest, SalesOrder, SequenceKind, Shipment,
    StockKey, StockRecord, User, Warehouse,
};
use uuid::Uuid;

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Filter for ledger listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

impl StockFilter {
    pub fn matches(&self, record: &StockRecord) -> bool {
        self.product_id.map_or(true, |p| record.product_id == p)
            && self.warehouse_id.map_or(true, |w| record.warehouse_id == w)
            && self.location_id.map_or(true, |l| record.location_id == Some(l))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementFilter {
    pub movement_type: Option<MovementType>,
    pub product_id: Option<Uuid>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &Movement) -> bool {
        self.movement_type.map_or(true, |t| movement.movement_type == t)
            && self.product_id.map_or(true, |p| movement.product_id == p)
            && DateRange {
                from: self.from_date,
                to: self.to_date,
            }
            .contains(movement.created_at)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchFilter {
    pub status: Option<BatchStatus>,
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
}

impl BatchFilter {
    pub fn matches(&self, batch: &Batch) -> bool {
        self.status.map_or(true, |s| batch.status == s)
            && self.product_id.map_or(true, |p| batch.product_id == p)
            && self.warehouse_id.map_or(true, |w| batch.warehouse_id == w)
    }
}

/// Opens transaction scopes
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;

    /// Cheap liveness check for health endpoints
    async fn ping(&self) -> AppResult<()>;
}

/// One transaction scope over every entity the core owns or reads.
///
/// Reads are tenant-scoped: an entity owned by another tenant is reported
/// as absent.
#[async_trait]
pub trait UnitOfWork: Send {
    // Catalog (read-only)
    async fn product(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Product>>;
    /// Ordered by creation; the first entry is the tenant's default warehouse
    async fn warehouses(&mut self, tenant_id: Uuid) -> AppResult<Vec<Warehouse>>;
    async fn location(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Location>>;
    async fn locations(&mut self, tenant_id: Uuid) -> AppResult<Vec<Location>>;
    async fn user(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<User>>;

    // Ledger
    async fn stock_for_update(&mut self, key: &StockKey) -> AppResult<Option<StockRecord>>;
    /// The record at `key`, locked; an empty record when none exists yet
    async fn stock_for_credit(&mut self, key: &StockKey) -> AppResult<StockRecord> {
        Ok(self
            .stock_for_update(key)
            .await?
            .unwrap_or_else(|| StockRecord::new(key)))
    }
    async fn stock_by_id_for_update(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<StockRecord>>;
    /// Every record of a product, locked, optionally limited to a warehouse
    /// set, in warehouse order then creation order
    async fn stock_for_product(
        &mut self,
        tenant_id: Uuid,
        product_id: Uuid,
        warehouse_ids: Option<&[Uuid]>,
    ) -> AppResult<Vec<StockRecord>>;
    async fn stock_records(
        &mut self,
        tenant_id: Uuid,
        filter: &StockFilter,
    ) -> AppResult<Vec<StockRecord>>;
    async fn save_stock(&mut self, record: &StockRecord) -> AppResult<()>;

    // Movement log (append-only)
    async fn insert_movement(&mut self, movement: &Movement) -> AppResult<()>;
    async fn movements(
        &mut self,
        tenant_id: Uuid,
        filter: &MovementFilter,
    ) -> AppResult<Vec<Movement>>;
    async fn movement(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Movement>>;

    // Batches
    async fn save_batch(&mut self, batch: &Batch) -> AppResult<()>;
    async fn batch(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Batch>>;
    async fn batch_by_number(
        &mut self,
        tenant_id: Uuid,
        product_id: Uuid,
        batch_number: &str,
    ) -> AppResult<Option<Batch>>;
    async fn batches(&mut self, tenant_id: Uuid, filter: &BatchFilter) -> AppResult<Vec<Batch>>;

    // Adjustments
    async fn save_adjustment(&mut self, adjustment: &InventoryAdjustment) -> AppResult<()>;
    async fn adjustment(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<InventoryAdjustment>>;
    async fn adjustments(&mut self, tenant_id: Uuid) -> AppResult<Vec<InventoryAdjustment>>;

    // Cycle counts
    async fn save_cycle_count(&mut self, count: &CycleCount) -> AppResult<()>;
    async fn cycle_count(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<CycleCount>>;
    async fn cycle_counts(&mut self, tenant_id: Uuid) -> AppResult<Vec<CycleCount>>;
    async fn insert_cycle_count_line(&mut self, line: &CycleCountLine) -> AppResult<()>;
    async fn cycle_count_lines(&mut self, cycle_count_id: Uuid) -> AppResult<Vec<CycleCountLine>>;

    // Replenishment
    async fn save_replenishment_config(&mut self, config: &ReplenishmentConfig) -> AppResult<()>;
    async fn replenishment_config(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<ReplenishmentConfig>>;
    async fn replenishment_config_for_product(
        &mut self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Option<ReplenishmentConfig>>;
    async fn replenishment_configs(&mut self, tenant_id: Uuid)
        -> AppResult<Vec<ReplenishmentConfig>>;
    async fn delete_replenishment_config(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<bool>;
    /// Tenants owning at least one active config with auto task creation
    async fn tenants_with_auto_replenishment(&mut self) -> AppResult<Vec<Uuid>>;
    async fn save_replenishment_task(&mut self, task: &ReplenishmentTask) -> AppResult<()>;
    async fn replenishment_task(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<ReplenishmentTask>>;
    async fn replenishment_tasks(
        &mut self,
        tenant_id: Uuid,
        status: Option<ReplenishmentTaskStatus>,
    ) -> AppResult<Vec<ReplenishmentTask>>;

    // Purchase orders
    async fn save_purchase_order(&mut self, order: &PurchaseOrder) -> AppResult<()>;
    async fn purchase_order(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<PurchaseOrder>>;
    async fn purchase_orders(&mut self, tenant_id: Uuid) -> AppResult<Vec<PurchaseOrder>>;
    async fn replace_purchase_order_lines(
        &mut self,
        purchase_order_id: Uuid,
        lines: &[PurchaseOrderLine],
    ) -> AppResult<()>;
    async fn purchase_order_lines(
        &mut self,
        purchase_order_id: Uuid,
    ) -> AppResult<Vec<PurchaseOrderLine>>;
    async fn delete_purchase_order(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<()>;

    // Goods receipts
    async fn save_goods_receipt(&mut self, receipt: &GoodsReceipt) -> AppResult<()>;
    async fn goods_receipt(&mut self, tenant_id: Uuid, id: Uuid)
        -> AppResult<Option<GoodsReceipt>>;
    async fn goods_receipts(&mut self, tenant_id: Uuid) -> AppResult<Vec<GoodsReceipt>>;
    async fn save_goods_receipt_line(&mut self, line: &GoodsReceiptLine) -> AppResult<()>;
    async fn goods_receipt_lines(&mut self, receipt_id: Uuid) -> AppResult<Vec<GoodsReceiptLine>>;
    async fn delete_goods_receipt(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<()>;

    // Sales orders
    async fn save_sales_order(&mut self, order: &SalesOrder) -> AppResult<()>;
    async fn sales_order(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<SalesOrder>>;
    async fn sales_orders(
        &mut self,
        tenant_id: Uuid,
        status: Option<OrderStatus>,
    ) -> AppResult<Vec<SalesOrder>>;
    async fn replace_order_items(&mut self, order_id: Uuid, items: &[OrderItem]) -> AppResult<()>;
    async fn order_items(&mut self, order_id: Uuid) -> AppResult<Vec<OrderItem>>;

    // Pick lists
    async fn save_pick_list(&mut self, pick_list: &PickList) -> AppResult<()>;
    async fn pick_list(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<PickList>>;
    async fn pick_list_for_order(
        &mut self,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<Option<PickList>>;
    async fn pick_lists(
        &mut self,
        tenant_id: Uuid,
        assigned_to: Option<Uuid>,
    ) -> AppResult<Vec<PickList>>;
    async fn replace_pick_list_items(
        &mut self,
        pick_list_id: Uuid,
        items: &[PickListItem],
    ) -> AppResult<()>;
    async fn save_pick_list_item(&mut self, item: &PickListItem) -> AppResult<()>;
    async fn pick_list_items(&mut self, pick_list_id: Uuid) -> AppResult<Vec<PickListItem>>;
    /// Removes the pick list and its items
    async fn delete_pick_list(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<()>;

    // Packing tasks
    async fn save_packing_task(&mut self, task: &PackingTask) -> AppResult<()>;
    async fn packing_task(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<PackingTask>>;
    async fn packing_task_for_pick_list(
        &mut self,
        tenant_id: Uuid,
        pick_list_id: Uuid,
    ) -> AppResult<Option<PackingTask>>;
    async fn packing_tasks(
        &mut self,
        tenant_id: Uuid,
        assigned_to: Option<Uuid>,
    ) -> AppResult<Vec<PackingTask>>;
    async fn delete_packing_task(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<()>;

    // Shipments
    async fn save_shipment(&mut self, shipment: &Shipment) -> AppResult<()>;
    async fn shipment(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Shipment>>;
    async fn shipment_for_order(
        &mut self,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<Option<Shipment>>;
    async fn shipments(&mut self, tenant_id: Uuid) -> AppResult<Vec<Shipment>>;

    // Returns
    async fn save_return(&mut self, rma: &ReturnRequest) -> AppResult<()>;
    async fn return_request(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<ReturnRequest>>;
    async fn returns(&mut self, tenant_id: Uuid) -> AppResult<Vec<ReturnRequest>>;

    /// Next value of a per-tenant counter, starting at 1
    async fn next_sequence(&mut self, tenant_id: Uuid, kind: SequenceKind) -> AppResult<i64>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
