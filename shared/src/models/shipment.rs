//! Shipments and the pre/post-ship boundary that triggers deduction

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderStatus;

closed_enum! {
    pub enum DeliveryStatus: "delivery_status" {
        ReadyToShip => "READY_TO_SHIP",
        Shipped => "SHIPPED",
        InTransit => "IN_TRANSIT",
        Delivered => "DELIVERED",
        Failed => "FAILED",
        Returned => "RETURNED",
    }
}

lifecycle!(DeliveryStatus, "shipment", {
    ReadyToShip => [Shipped, InTransit, Delivered, Failed],
    Shipped => [InTransit, Delivered, Failed, Returned],
    InTransit => [Delivered, Failed, Returned],
    Delivered => [Returned],
    Failed => [ReadyToShip, Shipped, InTransit, Returned],
    Returned => [ReadyToShip],
});

impl DeliveryStatus {
    /// Goods have physically left the warehouse
    pub fn is_post_ship(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Shipped | DeliveryStatus::InTransit | DeliveryStatus::Delivered
        )
    }

    /// True only for a move from a pre-ship into a post-ship status
    pub fn crosses_into_post_ship(from: DeliveryStatus, to: DeliveryStatus) -> bool {
        !from.is_post_ship() && to.is_post_ship()
    }

    /// Order status implied by this delivery status, if any
    pub fn order_status(&self) -> Option<OrderStatus> {
        match self {
            DeliveryStatus::Shipped | DeliveryStatus::InTransit => Some(OrderStatus::Shipped),
            DeliveryStatus::Delivered => Some(OrderStatus::Delivered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Shipment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub order_id: Uuid,
    pub packing_task_id: Option<Uuid>,
    pub courier: Option<String>,
    pub tracking_number: Option<String>,
    pub weight: Option<Decimal>,
    pub dispatch_date: Option<NaiveDate>,
    pub delivery_status: DeliveryStatus,
    pub stock_deducted: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_is_one_way() {
        use DeliveryStatus::*;
        assert!(DeliveryStatus::crosses_into_post_ship(ReadyToShip, Shipped));
        assert!(DeliveryStatus::crosses_into_post_ship(Failed, InTransit));
        assert!(DeliveryStatus::crosses_into_post_ship(Returned, Delivered));
        assert!(!DeliveryStatus::crosses_into_post_ship(Shipped, InTransit));
        assert!(!DeliveryStatus::crosses_into_post_ship(Shipped, ReadyToShip));
    }

    #[test]
    fn order_follows_shipment() {
        assert_eq!(DeliveryStatus::InTransit.order_status(), Some(OrderStatus::Shipped));
        assert_eq!(DeliveryStatus::Delivered.order_status(), Some(OrderStatus::Delivered));
        assert_eq!(DeliveryStatus::Failed.order_status(), None);
    }
}
