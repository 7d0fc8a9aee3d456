//! Lot/expiry metadata mirrored from the ledger

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

closed_enum! {
    pub enum BatchStatus: "batch_status" {
        Active => "ACTIVE",
        Depleted => "DEPLETED",
        Expired => "EXPIRED",
        Quarantined => "QUARANTINED",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Batch {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Option<Uuid>,
    pub batch_number: String,
    pub quantity: i64,
    pub reserved: i64,
    pub unit_cost: Option<Decimal>,
    pub received_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub manufacturing_date: Option<NaiveDate>,
    pub supplier_id: Option<Uuid>,
    pub status: BatchStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    pub fn available_quantity(&self) -> i64 {
        self.quantity - self.reserved
    }

    /// Copies ledger quantities in. An active batch that reaches zero is
    /// depleted, and a depleted one that is restocked becomes active again.
    pub fn mirror(&mut self, quantity: i64, reserved: i64) {
        self.quantity = quantity;
        self.reserved = reserved;
        match self.status {
            BatchStatus::Active if quantity == 0 => self.status = BatchStatus::Depleted,
            BatchStatus::Depleted if quantity > 0 => self.status = BatchStatus::Active,
            _ => {}
        }
        self.updated_at = Utc::now();
    }

    pub fn is_expired_on(&self, day: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|d| d < day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> Batch {
        let now = Utc::now();
        Batch {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            location_id: None,
            batch_number: "BATCH-1".into(),
            quantity: 10,
            reserved: 0,
            unit_cost: None,
            received_date: now.date_naive(),
            expiry_date: None,
            manufacturing_date: None,
            supplier_id: None,
            status: BatchStatus::Active,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn mirror_depletes_and_reactivates() {
        let mut b = batch();
        b.mirror(0, 0);
        assert_eq!(b.status, BatchStatus::Depleted);
        b.mirror(4, 1);
        assert_eq!(b.status, BatchStatus::Active);
        assert_eq!(b.available_quantity(), 3);
    }

    #[test]
    fn quarantine_survives_mirroring() {
        let mut b = batch();
        b.status = BatchStatus::Quarantined;
        b.mirror(0, 0);
        assert_eq!(b.status, BatchStatus::Quarantined);
    }
}
