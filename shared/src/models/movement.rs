//! Immutable movement log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

closed_enum! {
    pub enum MovementType: "movement_type" {
        Receive => "RECEIVE",
        Pick => "PICK",
        Transfer => "TRANSFER",
        Adjust => "ADJUST",
        Return => "RETURN",
    }
}

impl MovementType {
    pub fn credits_destination(&self) -> bool {
        matches!(
            self,
            MovementType::Receive | MovementType::Return | MovementType::Transfer
        )
    }

    pub fn debits_source(&self) -> bool {
        matches!(self, MovementType::Pick | MovementType::Transfer)
    }
}

/// One stock-affecting event. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Movement {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub movement_type: MovementType,
    pub product_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub from_location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    pub quantity: i64,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Movement {
    pub fn new(
        tenant_id: Uuid,
        movement_type: MovementType,
        product_id: Uuid,
        quantity: i64,
        created_by: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            movement_type,
            product_id,
            batch_id: None,
            from_location_id: None,
            to_location_id: None,
            quantity,
            reason: None,
            notes: None,
            reference_type: None,
            reference_id: None,
            created_by,
            created_at: Utc::now(),
        }
    }

    pub fn from(mut self, location_id: Option<Uuid>) -> Self {
        self.from_location_id = location_id;
        self
    }

    pub fn to(mut self, location_id: Option<Uuid>) -> Self {
        self.to_location_id = location_id;
        self
    }

    pub fn batch(mut self, batch_id: Option<Uuid>) -> Self {
        self.batch_id = batch_id;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn reference(mut self, kind: &str, id: Uuid) -> Self {
        self.reference_type = Some(kind.to_string());
        self.reference_id = Some(id);
        self
    }
}
