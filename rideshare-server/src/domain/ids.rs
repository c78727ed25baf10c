//! Entity identifier types.
//!
//! All entities are keyed by the store's integer row id. Wrapping them in
//! distinct types keeps a ride id from being passed where a station id is
//! expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw row id.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw row id.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

entity_id!(
    /// Identifier of a station. Stable for the lifetime of the station,
    /// since rides reference stations by id and stations are never deleted.
    StationId
);

entity_id!(
    /// Identifier of a published ride.
    RideId
);

entity_id!(
    /// Identifier of a passenger booking.
    BookingId
);

entity_id!(
    /// Identifier of a user, as resolved by the authentication layer.
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_number() {
        assert_eq!(StationId::new(42).to_string(), "42");
        assert_eq!(RideId::new(7).to_string(), "7");
    }

    #[test]
    fn debug_names_the_kind() {
        assert_eq!(format!("{:?}", StationId::new(42)), "StationId(42)");
        assert_eq!(format!("{:?}", UserId::new(3)), "UserId(3)");
    }

    #[test]
    fn ordering_follows_raw_value() {
        assert!(StationId::new(1) < StationId::new(2));
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&BookingId::new(9)).unwrap();
        assert_eq!(json, "9");
        let back: BookingId = serde_json::from_str("9").unwrap();
        assert_eq!(back, BookingId::new(9));
    }
}
