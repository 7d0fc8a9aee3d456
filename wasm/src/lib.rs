//! WebAssembly module for Stockflow browser clients
//!
//! Provides client-side checks against the same tables the server enforces:
//! - Workflow transition checks for every status-carrying entity
//! - Available-quantity arithmetic for stock records
//! - Input validation before a request is sent

use std::str::FromStr;

use js_sys::Array;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

fn parse<S>(value: &str) -> Result<S, JsValue>
where
    S: FromStr,
    S::Err: std::fmt::Display,
{
    S::from_str(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn check<S>(from: &str, to: &str) -> Result<bool, JsValue>
where
    S: Lifecycle + FromStr,
    S::Err: std::fmt::Display,
{
    Ok(parse::<S>(from)?.can_become(parse::<S>(to)?))
}

fn successors<S>(from: &str) -> Result<Vec<&'static str>, JsValue>
where
    S: Lifecycle + FromStr,
    S::Err: std::fmt::Display,
{
    Ok(parse::<S>(from)?
        .successors()
        .iter()
        .map(|s| s.label())
        .collect())
}

/// Dispatches on the entity name used in API paths and error messages
macro_rules! by_entity {
    ($entity:expr, $f:ident, $($arg:expr),+) => {
        match $entity.trim().to_ascii_lowercase().replace(['-', '_'], " ").as_str() {
            "order" => $f::<OrderStatus>($($arg),+),
            "pick list" => $f::<PickListStatus>($($arg),+),
            "packing task" => $f::<PackingStatus>($($arg),+),
            "shipment" => $f::<DeliveryStatus>($($arg),+),
            "purchase order" => $f::<PurchaseOrderStatus>($($arg),+),
            "replenishment task" => $f::<ReplenishmentTaskStatus>($($arg),+),
            "adjustment" => $f::<AdjustmentStatus>($($arg),+),
            "cycle count" => $f::<CycleCountStatus>($($arg),+),
            "return" => $f::<ReturnStatus>($($arg),+),
            other => Err(JsValue::from_str(&format!("unknown entity: {}", other))),
        }
    };
}

/// Whether `entity` may move from `from` to `to`, e.g.
/// `can_transition("pick-list", "ASSIGNED", "PARTIALLY_PICKED")`
#[wasm_bindgen]
pub fn can_transition(entity: &str, from: &str, to: &str) -> Result<bool, JsValue> {
    by_entity!(entity, check, from, to)
}

/// Statuses reachable in one step from `from`
#[wasm_bindgen]
pub fn next_statuses(entity: &str, from: &str) -> Result<Array, JsValue> {
    let labels = by_entity!(entity, successors, from)?;
    Ok(labels.into_iter().map(JsValue::from_str).collect())
}

/// Whether a shipment moving between these statuses triggers the stock
/// deduction
#[wasm_bindgen]
pub fn shipment_deducts_stock(from: &str, to: &str) -> Result<bool, JsValue> {
    Ok(DeliveryStatus::crosses_into_post_ship(
        parse(from)?,
        parse(to)?,
    ))
}

/// Quantity that can still be reserved or picked
#[wasm_bindgen]
pub fn available_quantity(quantity: i64, reserved: i64) -> i64 {
    quantity - reserved
}

/// Returns the validation message for a picked quantity, if any
#[wasm_bindgen]
pub fn picked_quantity_error(picked: i64, required: i64) -> Option<String> {
    validate_picked_quantity(picked, required)
        .err()
        .map(str::to_string)
}

/// Returns the validation message for a set of replenishment thresholds
#[wasm_bindgen]
pub fn thresholds_error(
    min_stock_level: i64,
    max_stock_level: i64,
    reorder_point: i64,
    reorder_quantity: i64,
) -> Option<String> {
    validate_thresholds(min_stock_level, max_stock_level, reorder_point, reorder_quantity)
        .err()
        .map(str::to_string)
}
