//! Purchase orders and goods receipts

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

closed_enum! {
    pub enum PurchaseOrderStatus: "purchase_order_status" {
        Draft => "draft",
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Received => "received",
    }
}

lifecycle!(PurchaseOrderStatus, "purchase order", {
    Draft => [Pending, Approved, Rejected],
    Pending => [Approved, Rejected],
    Approved => [Received],
    Rejected => [],
    Received => [],
});

impl PurchaseOrderStatus {
    /// Draft and pending orders may still be edited or deleted
    pub fn is_editable(&self) -> bool {
        matches!(self, PurchaseOrderStatus::Draft | PurchaseOrderStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub po_number: String,
    pub supplier_id: Uuid,
    pub status: PurchaseOrderStatus,
    pub total_amount: Decimal,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseOrderLine {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

closed_enum! {
    pub enum ReceiptStatus: "receipt_status" {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
    }
}

closed_enum! {
    pub enum QualityStatus: "quality_status" {
        Good => "GOOD",
        Damaged => "DAMAGED",
    }
}

impl Default for QualityStatus {
    fn default() -> Self {
        QualityStatus::Good
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GoodsReceipt {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub grn_number: String,
    pub purchase_order_id: Uuid,
    pub status: ReceiptStatus,
    pub total_expected: i64,
    pub total_received: i64,
    pub notes: Option<String>,
    pub received_by: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GoodsReceiptLine {
    pub id: Uuid,
    pub goods_receipt_id: Uuid,
    pub product_id: Uuid,
    pub expected_quantity: i64,
    pub received_quantity: i64,
    pub quality_status: QualityStatus,
    pub notes: Option<String>,
}

impl GoodsReceiptLine {
    pub fn is_fulfilled(&self) -> bool {
        self.received_quantity >= self.expected_quantity
    }
}

/// `completed` once every line is fulfilled, `pending` while nothing has
/// arrived, `in_progress` otherwise
pub fn receipt_status(lines: &[GoodsReceiptLine]) -> ReceiptStatus {
    if !lines.is_empty() && lines.iter().all(GoodsReceiptLine::is_fulfilled) {
        ReceiptStatus::Completed
    } else if lines.iter().all(|l| l.received_quantity == 0) {
        ReceiptStatus::Pending
    } else {
        ReceiptStatus::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(expected: i64, received: i64) -> GoodsReceiptLine {
        GoodsReceiptLine {
            id: Uuid::new_v4(),
            goods_receipt_id: Uuid::nil(),
            product_id: Uuid::new_v4(),
            expected_quantity: expected,
            received_quantity: received,
            quality_status: QualityStatus::Good,
            notes: None,
        }
    }

    #[test]
    fn receipt_status_follows_lines() {
        assert_eq!(receipt_status(&[line(10, 0), line(5, 0)]), ReceiptStatus::Pending);
        assert_eq!(receipt_status(&[line(10, 6), line(5, 0)]), ReceiptStatus::InProgress);
        assert_eq!(receipt_status(&[line(10, 10), line(5, 7)]), ReceiptStatus::Completed);
    }

    #[test]
    fn po_status_strings_are_lowercase() {
        assert_eq!(PurchaseOrderStatus::Approved.as_str(), "approved");
        assert_eq!("PENDING".parse::<PurchaseOrderStatus>().unwrap(), PurchaseOrderStatus::Pending);
    }
}
