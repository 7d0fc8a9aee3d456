//! HTTP request handlers
//!
//! Handlers are thin: extract the caller, the path and the body, then hand
//! off to the matching service.

pub mod adjustment;
pub mod batch;
pub mod cycle_count;
pub mod health;
pub mod orders;
pub mod packing;
pub mod picking;
pub mod purchasing;
pub mod receiving;
pub mod replenishment;
pub mod returns;
pub mod shipping;
pub mod stock;

pub use adjustment::*;
pub use batch::*;
pub use cycle_count::*;
pub use health::*;
pub use orders::*;
pub use packing::*;
pub use picking::*;
pub use purchasing::*;
pub use receiving::*;
pub use replenishment::*;
pub use returns::*;
pub use shipping::*;
pub use stock::*;
