//! Domain models for the Stockflow warehouse core
//!
//! Every status field is a closed enumeration. Workflow enums implement
//! [`Lifecycle`], whose successor table is the only place a legal
//! transition is defined.

/// Declares a closed, string-backed enum with `as_str`, `Display` and
/// `FromStr`. With the `sqlx` feature the enum maps onto a PostgreSQL
/// enum type of the given name.
macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $pg:tt {
            $($(#[$vmeta:meta])* $variant:ident => $text:tt),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
        #[cfg_attr(feature = "sqlx", sqlx(type_name = $pg))]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                #[cfg_attr(feature = "sqlx", sqlx(rename = $text))]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().replace('-', "_");
                $(
                    if normalized.eq_ignore_ascii_case($text) {
                        return Ok($name::$variant);
                    }
                )+
                Err($crate::models::UnknownVariant {
                    kind: stringify!($name),
                    value: s.to_string(),
                })
            }
        }
    };
}

/// Implements [`Lifecycle`] for a `closed_enum!` type from a successor table
macro_rules! lifecycle {
    ($name:ident, $entity:expr, { $($from:ident => [$($to:ident),*]),+ $(,)? }) => {
        impl $crate::models::Lifecycle for $name {
            const ENTITY: &'static str = $entity;

            fn successors(&self) -> &'static [Self] {
                match self {
                    $($name::$from => &[$($name::$to),*]),+
                }
            }

            fn label(&self) -> &'static str {
                self.as_str()
            }
        }
    };
}

mod adjustment;
mod batch;
mod catalog;
mod cycle_count;
mod identity;
mod lifecycle;
mod movement;
mod order;
mod packing;
mod picking;
mod purchasing;
mod replenishment;
mod rma;
mod shipment;
mod stock;

pub use adjustment::*;
pub use batch::*;
pub use catalog::*;
pub use cycle_count::*;
pub use identity::*;
pub use lifecycle::*;
pub use movement::*;
pub use order::*;
pub use packing::*;
pub use picking::*;
pub use purchasing::*;
pub use replenishment::*;
pub use rma::*;
pub use shipment::*;
pub use stock::*;

/// A string did not name any variant of a closed enum
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
