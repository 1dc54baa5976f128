//! Macro for implementing Display and FromStr for wire-named enums
//!
//! Several domain enums travel as lowercase strings (profile roles, session
//! change events). This macro keeps the mapping in one place and gives both
//! directions a single source of truth.
//!
//! # Example
//!
//! ```rust
//! use rentkenya_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum UnitStatus {
//!     Available,
//!     Occupied,
//! }
//!
//! impl_wire_name_conversions!(UnitStatus {
//!     Available => "available",
//!     Occupied => "occupied",
//! });
//! ```

/// Implements Display and FromStr traits for wire-named enums
///
/// - Display writes the wire name
/// - FromStr parses case-insensitively and reports the enum name on failure
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
