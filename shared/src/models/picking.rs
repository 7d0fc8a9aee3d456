//! Pick lists

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

closed_enum! {
    pub enum PickListStatus: "pick_list_status" {
        NotStarted => "NOT_STARTED",
        Assigned => "ASSIGNED",
        PartiallyPicked => "PARTIALLY_PICKED",
        Picked => "PICKED",
    }
}

// Assigned -> Assigned is a reassignment.
lifecycle!(PickListStatus, "pick list", {
    NotStarted => [Assigned, PartiallyPicked, Picked],
    Assigned => [Assigned, NotStarted, PartiallyPicked, Picked],
    PartiallyPicked => [Assigned, NotStarted, Picked],
    Picked => [],
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PickList {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub order_id: Uuid,
    pub warehouse_id: Uuid,
    pub status: PickListStatus,
    pub assigned_to: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PickListItem {
    pub id: Uuid,
    pub pick_list_id: Uuid,
    pub product_id: Uuid,
    pub location_id: Option<Uuid>,
    pub quantity_required: i64,
    pub quantity_picked: i64,
}

impl PickListItem {
    pub fn is_complete(&self) -> bool {
        self.quantity_picked >= self.quantity_required
    }
}
