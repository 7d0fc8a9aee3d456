//! Physical counts against a location

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

closed_enum! {
    pub enum CycleCountStatus: "cycle_count_status" {
        Pending => "PENDING",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
    }
}

lifecycle!(CycleCountStatus, "cycle count", {
    Pending => [InProgress, Completed],
    InProgress => [Completed],
    Completed => [],
});

closed_enum! {
    pub enum CycleCountType: "cycle_count_type" {
        Scheduled => "SCHEDULED",
        Blind => "BLIND",
        Spot => "SPOT",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CycleCount {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub reference_number: String,
    pub name: String,
    pub count_type: CycleCountType,
    pub location_id: Option<Uuid>,
    pub scheduled_date: Option<NaiveDate>,
    pub status: CycleCountStatus,
    pub items_count: i32,
    pub discrepancies: i32,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub counted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One counted product within a completed count
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CycleCountLine {
    pub id: Uuid,
    pub cycle_count_id: Uuid,
    pub product_id: Uuid,
    pub batch_number: Option<String>,
    pub system_quantity: i64,
    pub counted_quantity: i64,
    pub variance: i64,
    pub adjustment_id: Option<Uuid>,
}
