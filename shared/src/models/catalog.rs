//! Catalog data the core reads but never provisions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// Tenant-scoped catalog item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sku: String,
    pub name: String,
    pub unit_of_measure: String,
    pub reorder_level: i64,
    pub reorder_quantity: i64,
    pub batch_tracked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Warehouse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Zone {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub name: String,
}

closed_enum! {
    /// Storage role of a location
    pub enum LocationType: "location_type" {
        Bulk => "BULK",
        Pick => "PICK",
        Receiving => "RECEIVING",
        Staging => "STAGING",
        Shipping => "SHIPPING",
    }
}

/// A physical slot inside a zone. `warehouse_id` is resolved through the
/// zone when the row is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Location {
    pub id: Uuid,
    pub zone_id: Uuid,
    pub warehouse_id: Uuid,
    pub code: String,
    pub location_type: LocationType,
    pub pick_sequence: i32,
    pub capacity: Option<i64>,
}

/// A tenant member that work can be assigned to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub role: Role,
    pub active: bool,
}
