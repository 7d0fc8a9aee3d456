//! In-memory store
//!
//! The whole state sits behind one `tokio` mutex. A unit of work holds the
//! lock for its entire life and mutates a private copy, so units of work
//! are serialized; `commit` swaps the copy in and dropping discards it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    Batch, ConfigStatus, CycleCount, CycleCountLine, GoodsReceipt, GoodsReceiptLine,
    InventoryAdjustment, Location, LocationType, Movement, OrderItem, OrderStatus, PackingTask,
    PickList, PickListItem, Product, PurchaseOrder, PurchaseOrderLine, ReplenishmentConfig,
    ReplenishmentTask, ReplenishmentTaskStatus, ReturnRequest, Role, SalesOrder, SequenceKind,
    Shipment, StockKey, StockRecord, User, Warehouse, Zone,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{BatchFilter, MovementFilter, StockFilter, Store, UnitOfWork};
use crate::error::AppResult;

#[derive(Debug, Clone, Default)]
struct Tables {
    products: HashMap<Uuid, Product>,
    warehouses: HashMap<Uuid, Warehouse>,
    zones: HashMap<Uuid, Zone>,
    locations: HashMap<Uuid, Location>,
    users: HashMap<Uuid, User>,
    stock: HashMap<Uuid, StockRecord>,
    movements: Vec<Movement>,
    batches: HashMap<Uuid, Batch>,
    adjustments: HashMap<Uuid, InventoryAdjustment>,
    cycle_counts: HashMap<Uuid, CycleCount>,
    cycle_count_lines: Vec<CycleCountLine>,
    replenishment_configs: HashMap<Uuid, ReplenishmentConfig>,
    replenishment_tasks: HashMap<Uuid, ReplenishmentTask>,
    purchase_orders: HashMap<Uuid, PurchaseOrder>,
    purchase_order_lines: HashMap<Uuid, Vec<PurchaseOrderLine>>,
    goods_receipts: HashMap<Uuid, GoodsReceipt>,
    goods_receipt_lines: HashMap<Uuid, GoodsReceiptLine>,
    sales_orders: HashMap<Uuid, SalesOrder>,
    order_items: HashMap<Uuid, Vec<OrderItem>>,
    pick_lists: HashMap<Uuid, PickList>,
    pick_list_items: HashMap<Uuid, PickListItem>,
    packing_tasks: HashMap<Uuid, PackingTask>,
    shipments: HashMap<Uuid, Shipment>,
    returns: HashMap<Uuid, ReturnRequest>,
    sequences: HashMap<(Uuid, SequenceKind), i64>,
}

impl Tables {
    fn owns_warehouse(&self, tenant_id: Uuid, warehouse_id: Uuid) -> bool {
        self.warehouses
            .get(&warehouse_id)
            .is_some_and(|w| w.tenant_id == tenant_id)
    }

    fn ordered_warehouses(&self, tenant_id: Uuid) -> Vec<Warehouse> {
        let mut list: Vec<Warehouse> = self
            .warehouses
            .values()
            .filter(|w| w.tenant_id == tenant_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| (a.created_at, &a.code).cmp(&(b.created_at, &b.code)));
        list
    }
}

fn scoped<T: Clone>(
    map: &HashMap<Uuid, T>,
    id: Uuid,
    tenant_of: impl Fn(&T) -> Uuid,
    tenant_id: Uuid,
) -> Option<T> {
    map.get(&id).filter(|v| tenant_of(v) == tenant_id).cloned()
}

fn sorted_by<T, K: Ord>(mut list: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    list.sort_by_key(key);
    list
}

/// Store backed by process memory; used by the test-suite and local demos
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Catalog fixtures. The core only reads these entities.
    // ------------------------------------------------------------------

    pub async fn seed_warehouse(&self, tenant_id: Uuid, code: &str) -> Warehouse {
        let warehouse = Warehouse {
            id: Uuid::new_v4(),
            tenant_id,
            code: code.to_string(),
            name: format!("Warehouse {}", code),
            created_at: Utc::now(),
        };
        let mut state = self.state.lock().await;
        state.warehouses.insert(warehouse.id, warehouse.clone());
        warehouse
    }

    pub async fn seed_zone(&self, warehouse_id: Uuid, name: &str) -> Zone {
        let zone = Zone {
            id: Uuid::new_v4(),
            warehouse_id,
            name: name.to_string(),
        };
        let mut state = self.state.lock().await;
        state.zones.insert(zone.id, zone.clone());
        zone
    }

    pub async fn seed_location(
        &self,
        zone: &Zone,
        code: &str,
        location_type: LocationType,
        pick_sequence: i32,
    ) -> Location {
        let location = Location {
            id: Uuid::new_v4(),
            zone_id: zone.id,
            warehouse_id: zone.warehouse_id,
            code: code.to_string(),
            location_type,
            pick_sequence,
            capacity: None,
        };
        let mut state = self.state.lock().await;
        state.locations.insert(location.id, location.clone());
        location
    }

    pub async fn seed_product(&self, tenant_id: Uuid, sku: &str) -> Product {
        let product = Product {
            id: Uuid::new_v4(),
            tenant_id,
            sku: sku.to_string(),
            name: sku.to_string(),
            unit_of_measure: "EA".to_string(),
            reorder_level: 0,
            reorder_quantity: 0,
            batch_tracked: false,
            created_at: Utc::now(),
        };
        let mut state = self.state.lock().await;
        state.products.insert(product.id, product.clone());
        product
    }

    pub async fn seed_user(&self, tenant_id: Uuid, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            tenant_id,
            name: format!("{} user", role),
            role,
            active: true,
        };
        let mut state = self.state.lock().await;
        state.users.insert(user.id, user.clone());
        user
    }

    /// Loads an opening balance without a movement, as a data import would
    pub async fn seed_stock(&self, key: &StockKey, quantity: i64) -> StockRecord {
        let mut record = StockRecord::new(key);
        record.quantity = quantity;
        let mut state = self.state.lock().await;
        state.stock.insert(record.id, record.clone());
        record
    }

    /// Moves a tenant's document counter, as a migrated tenant would start
    pub async fn seed_sequence(&self, tenant_id: Uuid, kind: SequenceKind, last: i64) {
        let mut state = self.state.lock().await;
        state.sequences.insert((tenant_id, kind), last);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn product(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Product>> {
        Ok(scoped(&self.working.products, id, |p| p.tenant_id, tenant_id))
    }

    async fn warehouses(&mut self, tenant_id: Uuid) -> AppResult<Vec<Warehouse>> {
        Ok(self.working.ordered_warehouses(tenant_id))
    }

    async fn location(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Location>> {
        Ok(self
            .working
            .locations
            .get(&id)
            .filter(|l| self.working.owns_warehouse(tenant_id, l.warehouse_id))
            .cloned())
    }

    async fn locations(&mut self, tenant_id: Uuid) -> AppResult<Vec<Location>> {
        let list = self
            .working
            .locations
            .values()
            .filter(|l| self.working.owns_warehouse(tenant_id, l.warehouse_id))
            .cloned()
            .collect();
        Ok(sorted_by(list, |l: &Location| (l.pick_sequence, l.code.clone())))
    }

    async fn user(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<User>> {
        Ok(scoped(&self.working.users, id, |u| u.tenant_id, tenant_id))
    }

    async fn stock_for_update(&mut self, key: &StockKey) -> AppResult<Option<StockRecord>> {
        Ok(self.working.stock.values().find(|r| &r.key() == key).cloned())
    }

    async fn stock_by_id_for_update(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<StockRecord>> {
        Ok(scoped(&self.working.stock, id, |r| r.tenant_id, tenant_id))
    }

    async fn stock_for_product(
        &mut self,
        tenant_id: Uuid,
        product_id: Uuid,
        warehouse_ids: Option<&[Uuid]>,
    ) -> AppResult<Vec<StockRecord>> {
        let rank: HashMap<Uuid, usize> = self
            .working
            .ordered_warehouses(tenant_id)
            .into_iter()
            .enumerate()
            .map(|(i, w)| (w.id, i))
            .collect();
        let list = self
            .working
            .stock
            .values()
            .filter(|r| r.tenant_id == tenant_id && r.product_id == product_id)
            .filter(|r| warehouse_ids.map_or(true, |ids| ids.contains(&r.warehouse_id)))
            .cloned()
            .collect();
        Ok(sorted_by(list, |r: &StockRecord| {
            (
                rank.get(&r.warehouse_id).copied().unwrap_or(usize::MAX),
                r.created_at,
                r.id,
            )
        }))
    }

    async fn stock_records(
        &mut self,
        tenant_id: Uuid,
        filter: &StockFilter,
    ) -> AppResult<Vec<StockRecord>> {
        let list = self
            .working
            .stock
            .values()
            .filter(|r| r.tenant_id == tenant_id && filter.matches(r))
            .cloned()
            .collect();
        Ok(sorted_by(list, |r: &StockRecord| (r.created_at, r.id)))
    }

    async fn save_stock(&mut self, record: &StockRecord) -> AppResult<()> {
        self.working.stock.insert(record.id, record.clone());
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &Movement) -> AppResult<()> {
        self.working.movements.push(movement.clone());
        Ok(())
    }

    async fn movements(
        &mut self,
        tenant_id: Uuid,
        filter: &MovementFilter,
    ) -> AppResult<Vec<Movement>> {
        Ok(self
            .working
            .movements
            .iter()
            .rev()
            .filter(|m| m.tenant_id == tenant_id && filter.matches(m))
            .cloned()
            .collect())
    }

    async fn movement(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Movement>> {
        Ok(self
            .working
            .movements
            .iter()
            .find(|m| m.id == id && m.tenant_id == tenant_id)
            .cloned())
    }

    async fn save_batch(&mut self, batch: &Batch) -> AppResult<()> {
        self.working.batches.insert(batch.id, batch.clone());
        Ok(())
    }

    async fn batch(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Batch>> {
        Ok(scoped(&self.working.batches, id, |b| b.tenant_id, tenant_id))
    }

    async fn batch_by_number(
        &mut self,
        tenant_id: Uuid,
        product_id: Uuid,
        batch_number: &str,
    ) -> AppResult<Option<Batch>> {
        Ok(self
            .working
            .batches
            .values()
            .find(|b| {
                b.tenant_id == tenant_id
                    && b.product_id == product_id
                    && b.batch_number == batch_number
            })
            .cloned())
    }

    async fn batches(&mut self, tenant_id: Uuid, filter: &BatchFilter) -> AppResult<Vec<Batch>> {
        let list = self
            .working
            .batches
            .values()
            .filter(|b| b.tenant_id == tenant_id && filter.matches(b))
            .cloned()
            .collect();
        Ok(sorted_by(list, |b: &Batch| (b.received_date, b.created_at)))
    }

    async fn save_adjustment(&mut self, adjustment: &InventoryAdjustment) -> AppResult<()> {
        self.working
            .adjustments
            .insert(adjustment.id, adjustment.clone());
        Ok(())
    }

    async fn adjustment(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<InventoryAdjustment>> {
        Ok(scoped(&self.working.adjustments, id, |a| a.tenant_id, tenant_id))
    }

    async fn adjustments(&mut self, tenant_id: Uuid) -> AppResult<Vec<InventoryAdjustment>> {
        let list = self
            .working
            .adjustments
            .values()
            .filter(|a| a.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok(sorted_by(list, |a: &InventoryAdjustment| a.reference_number.clone()))
    }

    async fn save_cycle_count(&mut self, count: &CycleCount) -> AppResult<()> {
        self.working.cycle_counts.insert(count.id, count.clone());
        Ok(())
    }

    async fn cycle_count(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<CycleCount>> {
        Ok(scoped(&self.working.cycle_counts, id, |c| c.tenant_id, tenant_id))
    }

    async fn cycle_counts(&mut self, tenant_id: Uuid) -> AppResult<Vec<CycleCount>> {
        let list = self
            .working
            .cycle_counts
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok(sorted_by(list, |c: &CycleCount| c.reference_number.clone()))
    }

    async fn insert_cycle_count_line(&mut self, line: &CycleCountLine) -> AppResult<()> {
        self.working.cycle_count_lines.push(line.clone());
        Ok(())
    }

    async fn cycle_count_lines(&mut self, cycle_count_id: Uuid) -> AppResult<Vec<CycleCountLine>> {
        Ok(self
            .working
            .cycle_count_lines
            .iter()
            .filter(|l| l.cycle_count_id == cycle_count_id)
            .cloned()
            .collect())
    }

    async fn save_replenishment_config(&mut self, config: &ReplenishmentConfig) -> AppResult<()> {
        self.working
            .replenishment_configs
            .insert(config.id, config.clone());
        Ok(())
    }

    async fn replenishment_config(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<ReplenishmentConfig>> {
        Ok(scoped(
            &self.working.replenishment_configs,
            id,
            |c| c.tenant_id,
            tenant_id,
        ))
    }

    async fn replenishment_config_for_product(
        &mut self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Option<ReplenishmentConfig>> {
        Ok(self
            .working
            .replenishment_configs
            .values()
            .find(|c| c.tenant_id == tenant_id && c.product_id == product_id)
            .cloned())
    }

    async fn replenishment_configs(
        &mut self,
        tenant_id: Uuid,
    ) -> AppResult<Vec<ReplenishmentConfig>> {
        let list = self
            .working
            .replenishment_configs
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok(sorted_by(list, |c: &ReplenishmentConfig| (c.created_at, c.id)))
    }

    async fn delete_replenishment_config(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<bool> {
        let owned = self
            .working
            .replenishment_configs
            .get(&id)
            .is_some_and(|c| c.tenant_id == tenant_id);
        if owned {
            self.working.replenishment_configs.remove(&id);
        }
        Ok(owned)
    }

    async fn tenants_with_auto_replenishment(&mut self) -> AppResult<Vec<Uuid>> {
        let mut tenants: Vec<Uuid> = self
            .working
            .replenishment_configs
            .values()
            .filter(|c| c.auto_create_tasks && c.status == ConfigStatus::Active)
            .map(|c| c.tenant_id)
            .collect();
        tenants.sort();
        tenants.dedup();
        Ok(tenants)
    }

    async fn save_replenishment_task(&mut self, task: &ReplenishmentTask) -> AppResult<()> {
        self.working
            .replenishment_tasks
            .insert(task.id, task.clone());
        Ok(())
    }

    async fn replenishment_task(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<ReplenishmentTask>> {
        Ok(scoped(
            &self.working.replenishment_tasks,
            id,
            |t| t.tenant_id,
            tenant_id,
        ))
    }

    async fn replenishment_tasks(
        &mut self,
        tenant_id: Uuid,
        status: Option<ReplenishmentTaskStatus>,
    ) -> AppResult<Vec<ReplenishmentTask>> {
        let list = self
            .working
            .replenishment_tasks
            .values()
            .filter(|t| t.tenant_id == tenant_id && status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        Ok(sorted_by(list, |t: &ReplenishmentTask| t.task_number.clone()))
    }

    async fn save_purchase_order(&mut self, order: &PurchaseOrder) -> AppResult<()> {
        self.working.purchase_orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn purchase_order(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<PurchaseOrder>> {
        Ok(scoped(&self.working.purchase_orders, id, |p| p.tenant_id, tenant_id))
    }

    async fn purchase_orders(&mut self, tenant_id: Uuid) -> AppResult<Vec<PurchaseOrder>> {
        let list = self
            .working
            .purchase_orders
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok(sorted_by(list, |p: &PurchaseOrder| (p.po_number.len(), p.po_number.clone())))
    }

    async fn replace_purchase_order_lines(
        &mut self,
        purchase_order_id: Uuid,
        lines: &[PurchaseOrderLine],
    ) -> AppResult<()> {
        self.working
            .purchase_order_lines
            .insert(purchase_order_id, lines.to_vec());
        Ok(())
    }

    async fn purchase_order_lines(
        &mut self,
        purchase_order_id: Uuid,
    ) -> AppResult<Vec<PurchaseOrderLine>> {
        Ok(self
            .working
            .purchase_order_lines
            .get(&purchase_order_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_purchase_order(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<()> {
        if scoped(&self.working.purchase_orders, id, |p| p.tenant_id, tenant_id).is_some() {
            self.working.purchase_orders.remove(&id);
            self.working.purchase_order_lines.remove(&id);
        }
        Ok(())
    }

    async fn save_goods_receipt(&mut self, receipt: &GoodsReceipt) -> AppResult<()> {
        self.working
            .goods_receipts
            .insert(receipt.id, receipt.clone());
        Ok(())
    }

    async fn goods_receipt(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<GoodsReceipt>> {
        Ok(scoped(&self.working.goods_receipts, id, |g| g.tenant_id, tenant_id))
    }

    async fn goods_receipts(&mut self, tenant_id: Uuid) -> AppResult<Vec<GoodsReceipt>> {
        let list = self
            .working
            .goods_receipts
            .values()
            .filter(|g| g.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok(sorted_by(list, |g: &GoodsReceipt| (g.grn_number.len(), g.grn_number.clone())))
    }

    async fn save_goods_receipt_line(&mut self, line: &GoodsReceiptLine) -> AppResult<()> {
        self.working
            .goods_receipt_lines
            .insert(line.id, line.clone());
        Ok(())
    }

    async fn goods_receipt_lines(&mut self, receipt_id: Uuid) -> AppResult<Vec<GoodsReceiptLine>> {
        let list = self
            .working
            .goods_receipt_lines
            .values()
            .filter(|l| l.goods_receipt_id == receipt_id)
            .cloned()
            .collect();
        Ok(sorted_by(list, |l: &GoodsReceiptLine| (l.product_id, l.id)))
    }

    async fn delete_goods_receipt(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<()> {
        if scoped(&self.working.goods_receipts, id, |g| g.tenant_id, tenant_id).is_some() {
            self.working.goods_receipts.remove(&id);
            self.working
                .goods_receipt_lines
                .retain(|_, l| l.goods_receipt_id != id);
        }
        Ok(())
    }

    async fn save_sales_order(&mut self, order: &SalesOrder) -> AppResult<()> {
        self.working.sales_orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn sales_order(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<SalesOrder>> {
        Ok(scoped(&self.working.sales_orders, id, |o| o.tenant_id, tenant_id))
    }

    async fn sales_orders(
        &mut self,
        tenant_id: Uuid,
        status: Option<OrderStatus>,
    ) -> AppResult<Vec<SalesOrder>> {
        let list = self
            .working
            .sales_orders
            .values()
            .filter(|o| o.tenant_id == tenant_id && status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        Ok(sorted_by(list, |o: &SalesOrder| o.order_number.clone()))
    }

    async fn replace_order_items(&mut self, order_id: Uuid, items: &[OrderItem]) -> AppResult<()> {
        self.working.order_items.insert(order_id, items.to_vec());
        Ok(())
    }

    async fn order_items(&mut self, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
        Ok(self
            .working
            .order_items
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_pick_list(&mut self, pick_list: &PickList) -> AppResult<()> {
        self.working
            .pick_lists
            .insert(pick_list.id, pick_list.clone());
        Ok(())
    }

    async fn pick_list(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<PickList>> {
        Ok(scoped(&self.working.pick_lists, id, |p| p.tenant_id, tenant_id))
    }

    async fn pick_list_for_order(
        &mut self,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<Option<PickList>> {
        Ok(self
            .working
            .pick_lists
            .values()
            .find(|p| p.tenant_id == tenant_id && p.order_id == order_id)
            .cloned())
    }

    async fn pick_lists(
        &mut self,
        tenant_id: Uuid,
        assigned_to: Option<Uuid>,
    ) -> AppResult<Vec<PickList>> {
        let list = self
            .working
            .pick_lists
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .filter(|p| assigned_to.map_or(true, |u| p.assigned_to == Some(u)))
            .cloned()
            .collect();
        Ok(sorted_by(list, |p: &PickList| (p.created_at, p.id)))
    }

    async fn replace_pick_list_items(
        &mut self,
        pick_list_id: Uuid,
        items: &[PickListItem],
    ) -> AppResult<()> {
        self.working
            .pick_list_items
            .retain(|_, i| i.pick_list_id != pick_list_id);
        for item in items {
            self.working.pick_list_items.insert(item.id, item.clone());
        }
        Ok(())
    }

    async fn save_pick_list_item(&mut self, item: &PickListItem) -> AppResult<()> {
        self.working.pick_list_items.insert(item.id, item.clone());
        Ok(())
    }

    async fn pick_list_items(&mut self, pick_list_id: Uuid) -> AppResult<Vec<PickListItem>> {
        let list = self
            .working
            .pick_list_items
            .values()
            .filter(|i| i.pick_list_id == pick_list_id)
            .cloned()
            .collect();
        Ok(sorted_by(list, |i: &PickListItem| (i.product_id, i.id)))
    }

    async fn delete_pick_list(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<()> {
        if scoped(&self.working.pick_lists, id, |p| p.tenant_id, tenant_id).is_some() {
            self.working.pick_lists.remove(&id);
            self.working
                .pick_list_items
                .retain(|_, i| i.pick_list_id != id);
        }
        Ok(())
    }

    async fn save_packing_task(&mut self, task: &PackingTask) -> AppResult<()> {
        self.working.packing_tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn packing_task(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<PackingTask>> {
        Ok(scoped(&self.working.packing_tasks, id, |p| p.tenant_id, tenant_id))
    }

    async fn packing_task_for_pick_list(
        &mut self,
        tenant_id: Uuid,
        pick_list_id: Uuid,
    ) -> AppResult<Option<PackingTask>> {
        Ok(self
            .working
            .packing_tasks
            .values()
            .find(|p| p.tenant_id == tenant_id && p.pick_list_id == pick_list_id)
            .cloned())
    }

    async fn packing_tasks(
        &mut self,
        tenant_id: Uuid,
        assigned_to: Option<Uuid>,
    ) -> AppResult<Vec<PackingTask>> {
        let list = self
            .working
            .packing_tasks
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .filter(|p| assigned_to.map_or(true, |u| p.assigned_to == Some(u)))
            .cloned()
            .collect();
        Ok(sorted_by(list, |p: &PackingTask| (p.created_at, p.id)))
    }

    async fn delete_packing_task(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<()> {
        if scoped(&self.working.packing_tasks, id, |p| p.tenant_id, tenant_id).is_some() {
            self.working.packing_tasks.remove(&id);
        }
        Ok(())
    }

    async fn save_shipment(&mut self, shipment: &Shipment) -> AppResult<()> {
        self.working.shipments.insert(shipment.id, shipment.clone());
        Ok(())
    }

    async fn shipment(&mut self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Shipment>> {
        Ok(scoped(&self.working.shipments, id, |s| s.tenant_id, tenant_id))
    }

    async fn shipment_for_order(
        &mut self,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<Option<Shipment>> {
        Ok(self
            .working
            .shipments
            .values()
            .find(|s| s.tenant_id == tenant_id && s.order_id == order_id)
            .cloned())
    }

    async fn shipments(&mut self, tenant_id: Uuid) -> AppResult<Vec<Shipment>> {
        let list = self
            .working
            .shipments
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok(sorted_by(list, |s: &Shipment| (s.created_at, s.id)))
    }

    async fn save_return(&mut self, rma: &ReturnRequest) -> AppResult<()> {
        self.working.returns.insert(rma.id, rma.clone());
        Ok(())
    }

    async fn return_request(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<ReturnRequest>> {
        Ok(scoped(&self.working.returns, id, |r| r.tenant_id, tenant_id))
    }

    async fn returns(&mut self, tenant_id: Uuid) -> AppResult<Vec<ReturnRequest>> {
        let list = self
            .working
            .returns
            .values()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok(sorted_by(list, |r: &ReturnRequest| r.rma_number.clone()))
    }

    async fn next_sequence(&mut self, tenant_id: Uuid, kind: SequenceKind) -> AppResult<i64> {
        let counter = self
            .working
            .sequences
            .entry((tenant_id, kind))
            .or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
