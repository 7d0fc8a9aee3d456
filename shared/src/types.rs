//! Common types used across the platform

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-tenant counters behind human-readable document numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceKind {
    SalesOrder,
    PurchaseOrder,
    GoodsReceipt,
    ReplenishmentTask,
    Return,
    Adjustment,
    CycleCount,
    Batch,
}

impl SequenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceKind::SalesOrder => "sales_order",
            SequenceKind::PurchaseOrder => "purchase_order",
            SequenceKind::GoodsReceipt => "goods_receipt",
            SequenceKind::ReplenishmentTask => "replenishment_task",
            SequenceKind::Return => "return",
            SequenceKind::Adjustment => "adjustment",
            SequenceKind::CycleCount => "cycle_count",
            SequenceKind::Batch => "batch",
        }
    }

    /// Renders the `n`th number of this kind. Returns carry the year
    /// they were issued in.
    pub fn format(&self, n: i64, now: DateTime<Utc>) -> String {
        match self {
            SequenceKind::SalesOrder => format!("ORD-{:06}", n),
            SequenceKind::PurchaseOrder => format!("PO{:03}", n),
            SequenceKind::GoodsReceipt => format!("GRN{:03}", n),
            SequenceKind::ReplenishmentTask => format!("RPL-{:06}", n),
            SequenceKind::Return => format!("RMA-{}-{:04}", now.format("%Y"), n),
            SequenceKind::Adjustment => format!("ADJ-{:06}", n),
            SequenceKind::CycleCount => format!("CC-{:05}", n),
            SequenceKind::Batch => format!("BATCH-{:06}", n),
        }
    }
}

/// Inclusive date-time window for queries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |f| at >= f) && self.to.map_or(true, |t| at <= t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn document_numbers() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(SequenceKind::SalesOrder.format(1, now), "ORD-000001");
        assert_eq!(SequenceKind::PurchaseOrder.format(12, now), "PO012");
        assert_eq!(SequenceKind::GoodsReceipt.format(3, now), "GRN003");
        assert_eq!(SequenceKind::Return.format(7, now), "RMA-2024-0007");
        assert_eq!(SequenceKind::CycleCount.format(42, now), "CC-00042");
    }

    #[test]
    fn open_ended_ranges() {
        let now = Utc::now();
        assert!(DateRange::default().contains(now));
        let range = DateRange {
            from: Some(now),
            to: None,
        };
        assert!(!range.contains(now - chrono::Duration::seconds(1)));
    }
}
