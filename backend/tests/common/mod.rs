//! Shared fixture for the integration tests: one tenant with a warehouse,
//! a BULK and a PICK location and a product, all in a [`MemoryStore`].

#![allow(dead_code)]

use shared::{Identity, Location, LocationType, Product, Role, StockKey, Warehouse};
use std::sync::Arc;
use stockflow::store::{MemoryStore, Store};
use uuid::Uuid;

pub struct Site {
    pub store: Arc<MemoryStore>,
    pub tenant_id: Uuid,
    pub warehouse: Warehouse,
    pub bulk: Location,
    pub pick: Location,
    pub product: Product,
    pub admin: Identity,
}

impl Site {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let tenant_id = Uuid::new_v4();

        let warehouse = store.seed_warehouse(tenant_id, "WH-1").await;
        let zone = store.seed_zone(warehouse.id, "A").await;
        let bulk = store
            .seed_location(&zone, "A-BULK-01", LocationType::Bulk, 10)
            .await;
        let pick = store
            .seed_location(&zone, "A-PICK-01", LocationType::Pick, 1)
            .await;
        let product = store.seed_product(tenant_id, "SKU-001").await;
        let admin_user = store.seed_user(tenant_id, Role::CompanyAdmin).await;

        Self {
            admin: Identity::new(tenant_id, admin_user.id, Role::CompanyAdmin),
            store,
            tenant_id,
            warehouse,
            bulk,
            pick,
            product,
        }
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    /// Seeds a user with `role` and returns their identity
    pub async fn member(&self, role: Role) -> Identity {
        let user = self.store.seed_user(self.tenant_id, role).await;
        Identity::new(self.tenant_id, user.id, role)
    }

    pub fn key_at(&self, location: &Location) -> StockKey {
        StockKey::new(self.tenant_id, self.product.id, location.warehouse_id)
            .at_location(Some(location.id))
    }

    pub async fn stock_at(&self, location: &Location, quantity: i64) {
        self.store.seed_stock(&self.key_at(location), quantity).await;
    }

    /// Seeds `quantity` at `location` under `batch_number`
    pub async fn batch_at(&self, location: &Location, batch_number: &str, quantity: i64) {
        let key = self
            .key_at(location)
            .with_batch(Some(batch_number.to_string()));
        self.store.seed_stock(&key, quantity).await;
    }
}
