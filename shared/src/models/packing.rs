//! Packing tasks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

closed_enum! {
    pub enum PackingStatus: "packing_status" {
        NotStarted => "NOT_STARTED",
        Assigned => "ASSIGNED",
        Packing => "PACKING",
        OnHold => "ON_HOLD",
        Packed => "PACKED",
    }
}

lifecycle!(PackingStatus, "packing task", {
    NotStarted => [Assigned, Packed],
    Assigned => [Assigned, NotStarted, Packing, OnHold, Packed],
    Packing => [NotStarted, OnHold, Packed],
    OnHold => [Packing],
    Packed => [],
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PackingTask {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub order_id: Uuid,
    pub pick_list_id: Uuid,
    pub status: PackingStatus,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
