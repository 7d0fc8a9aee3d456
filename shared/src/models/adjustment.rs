//! Manual stock corrections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

closed_enum! {
    pub enum AdjustmentType: "adjustment_type" {
        Increase => "INCREASE",
        Decrease => "DECREASE",
    }
}

impl AdjustmentType {
    /// INCREASE for a positive variance, DECREASE for a negative one
    pub fn for_variance(variance: i64) -> Option<Self> {
        match variance {
            v if v > 0 => Some(AdjustmentType::Increase),
            v if v < 0 => Some(AdjustmentType::Decrease),
            _ => None,
        }
    }
}

closed_enum! {
    pub enum AdjustmentStatus: "adjustment_status" {
        Pending => "PENDING",
        Completed => "COMPLETED",
    }
}

lifecycle!(AdjustmentStatus, "adjustment", {
    Pending => [Completed],
    Completed => [],
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryAdjustment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub reference_number: String,
    pub adjustment_type: AdjustmentType,
    pub product_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub stock_record_id: Option<Uuid>,
    pub quantity: i64,
    pub reason: String,
    pub notes: Option<String>,
    pub cycle_count_id: Option<Uuid>,
    pub status: AdjustmentStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
