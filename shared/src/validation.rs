//! Validation utilities shared by the backend and browser clients

use crate::models::ReplenishmentConfig;

// ============================================================================
// Quantity Validations
// ============================================================================

/// Quantities moved through the ledger must be strictly positive
pub fn validate_quantity(qty: i64) -> Result<(), &'static str> {
    if qty <= 0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// A picked quantity may range from zero up to what the item requires
pub fn validate_picked_quantity(picked: i64, required: i64) -> Result<(), &'static str> {
    if picked < 0 {
        return Err("Picked quantity cannot be negative");
    }
    if picked > required {
        return Err("Picked quantity cannot exceed the required quantity");
    }
    Ok(())
}

/// Received quantities only ever grow on a receipt line
pub fn validate_received_quantity(new: i64, previous: i64) -> Result<(), &'static str> {
    if new < 0 {
        return Err("Received quantity cannot be negative");
    }
    if new < previous {
        return Err("Received quantity cannot decrease");
    }
    Ok(())
}

// ============================================================================
// Replenishment Thresholds
// ============================================================================

/// Thresholds are non-negative and, when a max is set, min does not exceed it
pub fn validate_thresholds(
    min_stock_level: i64,
    max_stock_level: i64,
    reorder_point: i64,
    reorder_quantity: i64,
) -> Result<(), &'static str> {
    if min_stock_level < 0 || max_stock_level < 0 || reorder_point < 0 || reorder_quantity < 0 {
        return Err("Thresholds cannot be negative");
    }
    if max_stock_level > 0 && min_stock_level > max_stock_level {
        return Err("Minimum stock level cannot exceed maximum stock level");
    }
    Ok(())
}

pub fn validate_config(config: &ReplenishmentConfig) -> Result<(), &'static str> {
    validate_thresholds(
        config.min_stock_level,
        config.max_stock_level,
        config.reorder_point,
        config.reorder_quantity,
    )
}

// ============================================================================
// General Validations
// ============================================================================

/// Non-empty after trimming
pub fn validate_required_text(value: &str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("Value is required");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-4).is_err());
    }

    #[test]
    fn test_picked_quantity_bounds() {
        assert!(validate_picked_quantity(0, 5).is_ok());
        assert!(validate_picked_quantity(5, 5).is_ok());
        assert!(validate_picked_quantity(6, 5).is_err());
        assert!(validate_picked_quantity(-1, 5).is_err());
    }

    #[test]
    fn test_received_never_decreases() {
        assert!(validate_received_quantity(60, 0).is_ok());
        assert!(validate_received_quantity(100, 60).is_ok());
        assert!(validate_received_quantity(50, 60).is_err());
    }

    #[test]
    fn test_thresholds() {
        assert!(validate_thresholds(10, 100, 20, 50).is_ok());
        assert!(validate_thresholds(10, 0, 20, 50).is_ok());
        assert!(validate_thresholds(200, 100, 20, 50).is_err());
        assert!(validate_thresholds(0, 0, -1, 0).is_err());
    }

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("damaged pallet").is_ok());
        assert!(validate_required_text("   ").is_err());
    }
}
