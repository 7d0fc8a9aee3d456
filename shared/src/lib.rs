//! Shared types and models for the Stockflow warehouse core
//!
//! This crate contains the domain types shared between the backend and
//! browser clients (via WASM): entities, closed status enums with their
//! transition tables, and the stock arithmetic that guards the ledger.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
