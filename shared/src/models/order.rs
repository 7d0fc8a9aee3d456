//! Sales orders and their items

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Priority;

closed_enum! {
    pub enum OrderStatus: "order_status" {
        Draft => "DRAFT",
        Confirmed => "CONFIRMED",
        PickingInProgress => "PICKING_IN_PROGRESS",
        Picked => "PICKED",
        PackingInProgress => "PACKING_IN_PROGRESS",
        Packed => "PACKED",
        Shipped => "SHIPPED",
        Delivered => "DELIVERED",
        Cancelled => "CANCELLED",
    }
}

// Backward edges are the reject-assignment paths.
lifecycle!(OrderStatus, "order", {
    Draft => [Confirmed, Cancelled],
    Confirmed => [PickingInProgress, Picked, Cancelled],
    PickingInProgress => [Confirmed, Picked],
    Picked => [PackingInProgress, Packed],
    PackingInProgress => [Picked, Packed],
    Packed => [Shipped, Delivered],
    Shipped => [Delivered],
    Delivered => [],
    Cancelled => [],
});

impl OrderStatus {
    /// Items may still be replaced
    pub fn is_editable(&self) -> bool {
        matches!(self, OrderStatus::Draft | OrderStatus::Confirmed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalesOrder {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub order_number: String,
    pub customer_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub status: OrderStatus,
    pub priority: Priority,
    pub order_date: NaiveDate,
    pub required_date: Option<NaiveDate>,
    pub sales_channel: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub total_amount: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl OrderItem {
    pub fn new(order_id: Uuid, product_id: Uuid, quantity: i64, unit_price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            product_id,
            quantity,
            unit_price,
            line_total: unit_price * Decimal::from(quantity),
        }
    }
}

pub fn order_total(items: &[OrderItem]) -> Decimal {
    items.iter().map(|i| i.line_total).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Lifecycle;

    #[test]
    fn cancel_only_before_picking() {
        assert!(OrderStatus::Draft.can_become(OrderStatus::Cancelled));
        assert!(OrderStatus::Confirmed.can_become(OrderStatus::Cancelled));
        for status in [
            OrderStatus::PickingInProgress,
            OrderStatus::Picked,
            OrderStatus::Packed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            assert!(!status.can_become(OrderStatus::Cancelled), "{status}");
        }
    }

    #[test]
    fn shipped_cannot_go_back() {
        let err = OrderStatus::Shipped.transition(OrderStatus::Packed).unwrap_err();
        assert_eq!(err.from, "SHIPPED");
        assert_eq!(err.to, "PACKED");
    }

    #[test]
    fn total_sums_lines() {
        let order = Uuid::new_v4();
        let items = vec![
            OrderItem::new(order, Uuid::new_v4(), 2, Decimal::new(1050, 2)),
            OrderItem::new(order, Uuid::new_v4(), 1, Decimal::new(300, 2)),
        ];
        assert_eq!(order_total(&items), Decimal::new(2400, 2));
    }
}
