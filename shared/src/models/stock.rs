//! Stock records and the quantity/reservation arithmetic that guards them

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identity of a ledger row within a tenant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub tenant_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Option<Uuid>,
    pub batch_number: Option<String>,
}

impl StockKey {
    pub fn new(tenant_id: Uuid, product_id: Uuid, warehouse_id: Uuid) -> Self {
        Self {
            tenant_id,
            product_id,
            warehouse_id,
            location_id: None,
            batch_number: None,
        }
    }

    pub fn at_location(mut self, location_id: Option<Uuid>) -> Self {
        self.location_id = location_id;
        self
    }

    pub fn with_batch(mut self, batch_number: Option<String>) -> Self {
        self.batch_number = batch_number;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("cannot release {requested}, only {reserved} reserved")]
    InsufficientReserved { requested: i64, reserved: i64 },

    #[error("quantity overflow")]
    Overflow,
}

/// The ledger's unit: on-hand and reserved quantity for one
/// (product, warehouse, location, batch) tuple.
///
/// Invariant: `0 <= reserved <= quantity`. Every mutating method either
/// preserves it or returns an error leaving the record untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Option<Uuid>,
    pub batch_number: Option<String>,
    pub quantity: i64,
    pub reserved: i64,
    pub best_before_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn positive(qty: i64) -> Result<i64, StockError> {
    if qty > 0 {
        Ok(qty)
    } else {
        Err(StockError::NonPositiveQuantity(qty))
    }
}

impl StockRecord {
    /// An empty record at `key`
    pub fn new(key: &StockKey) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: key.tenant_id,
            product_id: key.product_id,
            warehouse_id: key.warehouse_id,
            location_id: key.location_id,
            batch_number: key.batch_number.clone(),
            quantity: 0,
            reserved: 0,
            best_before_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey {
            tenant_id: self.tenant_id,
            product_id: self.product_id,
            warehouse_id: self.warehouse_id,
            location_id: self.location_id,
            batch_number: self.batch_number.clone(),
        }
    }

    pub fn available(&self) -> i64 {
        self.quantity - self.reserved
    }

    pub fn is_consistent(&self) -> bool {
        0 <= self.reserved && self.reserved <= self.quantity
    }

    pub fn credit(&mut self, qty: i64) -> Result<(), StockError> {
        let qty = positive(qty)?;
        self.quantity = self.quantity.checked_add(qty).ok_or(StockError::Overflow)?;
        self.touch();
        Ok(())
    }

    /// Removes `qty` from on-hand stock. Requires `available >= qty`;
    /// reserved is clamped down to the new quantity.
    pub fn debit(&mut self, qty: i64) -> Result<(), StockError> {
        let qty = positive(qty)?;
        if self.available() < qty {
            return Err(StockError::InsufficientStock {
                requested: qty,
                available: self.available(),
            });
        }
        self.quantity -= qty;
        self.reserved = self.reserved.min(self.quantity);
        self.touch();
        Ok(())
    }

    /// Debits as much of `qty` as is available and returns the amount taken
    pub fn consume_up_to(&mut self, qty: i64) -> i64 {
        let take = qty.min(self.available()).max(0);
        if take > 0 {
            self.quantity -= take;
            self.reserved = self.reserved.min(self.quantity);
            self.touch();
        }
        take
    }

    pub fn reserve(&mut self, qty: i64) -> Result<(), StockError> {
        let qty = positive(qty)?;
        if self.available() < qty {
            return Err(StockError::InsufficientStock {
                requested: qty,
                available: self.available(),
            });
        }
        self.reserved += qty;
        self.touch();
        Ok(())
    }

    pub fn release(&mut self, qty: i64) -> Result<(), StockError> {
        let qty = positive(qty)?;
        if self.reserved < qty {
            return Err(StockError::InsufficientReserved {
                requested: qty,
                reserved: self.reserved,
            });
        }
        self.reserved -= qty;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Sum of available quantity across records
pub fn total_available<'a>(records: impl IntoIterator<Item = &'a StockRecord>) -> i64 {
    records.into_iter().map(StockRecord::available).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(quantity: i64, reserved: i64) -> StockRecord {
        let key = StockKey::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut r = StockRecord::new(&key);
        r.quantity = quantity;
        r.reserved = reserved;
        r
    }

    #[test]
    fn debit_clamps_reserved() {
        let mut r = record(10, 4);
        r.debit(6).unwrap();
        assert_eq!(r.quantity, 4);
        assert_eq!(r.reserved, 4);
        assert!(r.is_consistent());
    }

    #[test]
    fn debit_respects_reservations() {
        let mut r = record(10, 4);
        let err = r.debit(7).unwrap_err();
        assert_eq!(
            err,
            StockError::InsufficientStock {
                requested: 7,
                available: 6
            }
        );
        assert_eq!(r.quantity, 10);
    }

    #[test]
    fn zero_and_negative_quantities_rejected() {
        let mut r = record(10, 0);
        assert_eq!(r.credit(0), Err(StockError::NonPositiveQuantity(0)));
        assert_eq!(r.debit(-3), Err(StockError::NonPositiveQuantity(-3)));
    }

    #[test]
    fn consume_up_to_takes_what_is_available() {
        let mut r = record(5, 2);
        assert_eq!(r.consume_up_to(8), 3);
        assert_eq!(r.quantity, 2);
        assert_eq!(r.reserved, 2);
        assert_eq!(r.consume_up_to(1), 0);
    }

    #[test]
    fn release_more_than_reserved_fails() {
        let mut r = record(5, 2);
        assert!(r.release(3).is_err());
        r.release(2).unwrap();
        assert_eq!(r.reserved, 0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Credit(i64),
        Debit(i64),
        Reserve(i64),
        Release(i64),
        Consume(i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-5i64..200).prop_map(Op::Credit),
            (-5i64..200).prop_map(Op::Debit),
            (-5i64..200).prop_map(Op::Reserve),
            (-5i64..200).prop_map(Op::Release),
            (0i64..200).prop_map(Op::Consume),
        ]
    }

    proptest! {
        #[test]
        fn invariant_holds_under_any_sequence(ops in prop::collection::vec(op(), 0..60)) {
            let mut r = record(0, 0);
            for op in ops {
                let before = r.clone();
                let result = match op {
                    Op::Credit(q) => r.credit(q),
                    Op::Debit(q) => r.debit(q),
                    Op::Reserve(q) => r.reserve(q),
                    Op::Release(q) => r.release(q),
                    Op::Consume(q) => { r.consume_up_to(q); Ok(()) }
                };
                if result.is_err() {
                    prop_assert_eq!(r.quantity, before.quantity);
                    prop_assert_eq!(r.reserved, before.reserved);
                }
                prop_assert!(r.is_consistent());
            }
        }

        #[test]
        fn debit_beyond_available_never_applies(quantity in 0i64..1000, reserved_pct in 0i64..=100, extra in 1i64..500) {
            let reserved = quantity * reserved_pct / 100;
            let mut r = record(quantity, reserved);
            let available = r.available();
            prop_assert!(r.debit(available + extra).is_err());
            prop_assert_eq!(r.quantity, quantity);
            prop_assert_eq!(r.reserved, reserved);
        }
    }
}
