//! Reorder thresholds and bulk-to-pick transfer tasks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

closed_enum! {
    pub enum Priority: "task_priority" {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Urgent => "URGENT",
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

closed_enum! {
    pub enum ReplenishmentTaskStatus: "replenishment_task_status" {
        Pending => "PENDING",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
}

lifecycle!(ReplenishmentTaskStatus, "replenishment task", {
    Pending => [InProgress, Completed, Cancelled],
    InProgress => [Completed, Cancelled],
    Completed => [],
    Cancelled => [],
});

impl ReplenishmentTaskStatus {
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            ReplenishmentTaskStatus::Pending | ReplenishmentTaskStatus::InProgress
        )
    }
}

closed_enum! {
    pub enum ConfigStatus: "config_status" {
        Active => "ACTIVE",
        Inactive => "INACTIVE",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReplenishmentConfig {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub product_id: Uuid,
    pub min_stock_level: i64,
    pub max_stock_level: i64,
    pub reorder_point: i64,
    pub reorder_quantity: i64,
    pub auto_create_tasks: bool,
    pub status: ConfigStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReplenishmentConfig {
    /// Whether `available` has dropped below the reorder point
    pub fn is_triggered(&self, available: i64) -> bool {
        self.reorder_point > 0 && available < self.reorder_point
    }

    /// Transfer size for a suggestion: the configured reorder quantity,
    /// else enough to reach max, else enough to reach the reorder point.
    pub fn quantity_for(&self, available: i64) -> i64 {
        if self.reorder_quantity > 0 {
            return self.reorder_quantity;
        }
        let to_max = self.max_stock_level - available;
        if to_max > 0 {
            return to_max;
        }
        self.reorder_point - available
    }
}

/// Output of an evaluation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplenishmentSuggestion {
    pub product_id: Uuid,
    pub available: i64,
    pub reorder_point: i64,
    pub reorder_quantity: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReplenishmentTask {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub task_number: String,
    pub product_id: Uuid,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub quantity_needed: i64,
    pub quantity_completed: i64,
    pub priority: Priority,
    pub status: ReplenishmentTaskStatus,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub completed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Lifecycle;

    fn config(min: i64, max: i64, point: i64, qty: i64) -> ReplenishmentConfig {
        let now = Utc::now();
        ReplenishmentConfig {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            min_stock_level: min,
            max_stock_level: max,
            reorder_point: point,
            reorder_quantity: qty,
            auto_create_tasks: true,
            status: ConfigStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn zero_reorder_point_never_triggers() {
        assert!(!config(0, 0, 0, 10).is_triggered(-5));
        assert!(config(0, 0, 10, 10).is_triggered(9));
        assert!(!config(0, 0, 10, 10).is_triggered(10));
    }

    #[test]
    fn quantity_falls_back_through_thresholds() {
        assert_eq!(config(0, 100, 20, 30).quantity_for(5), 30);
        assert_eq!(config(0, 100, 20, 0).quantity_for(5), 95);
        assert_eq!(config(0, 0, 20, 0).quantity_for(5), 15);
    }

    #[test]
    fn finished_tasks_are_terminal() {
        assert!(ReplenishmentTaskStatus::Completed.is_terminal());
        assert!(ReplenishmentTaskStatus::Cancelled.is_terminal());
        assert!(ReplenishmentTaskStatus::Pending.can_become(ReplenishmentTaskStatus::Completed));
    }
}
