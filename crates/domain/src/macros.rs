//! Macro for implementing Display and FromStr for tag enums
//!
//! Entity kinds, sync actions and outbox statuses all travel as plain
//! strings (database columns, JSON envelopes, log fields). This macro gives
//! each of them a single source of truth for the string form.
//!
//! # Example
//!
//! ```rust
//! use adminsync_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum DeliveryState {
//!     Queued,
//!     Delivered,
//! }
//!
//! impl_domain_status_conversions!(DeliveryState {
//!     Queued => "QUEUED",
//!     Delivered => "DELIVERED",
//! });
//!
//! assert_eq!(DeliveryState::Queued.to_string(), "QUEUED");
//! assert_eq!("delivered".parse::<DeliveryState>(), Ok(DeliveryState::Delivered));
//! ```

/// Implements `as_str`, Display and FromStr for tag enums
///
/// Parsing is case-insensitive; Display and `as_str` always emit the
/// canonical spelling given in the mapping.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical string form.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}
