//! Domain types for the ridesharing marketplace.
//!
//! This module contains the core domain model types. All types enforce
//! their invariants at construction time, so code that receives these types
//! can trust their validity.

mod booking;
mod error;
mod geo;
mod ids;
mod ride;
mod route;
mod station;

pub use booking::{Booking, BookingStatus};
pub use error::DomainError;
pub use geo::{Coordinates, InvalidCoordinates};
pub use ids::{BookingId, RideId, StationId, UserId};
pub use ride::{NewRide, Recurrence, Ride, RideStatus};
pub use route::{PopularRoute, RoutePreference};
pub use station::{
    NewStation, RequesterContext, Station, StationCategory, StationStatus, fold_text,
    parse_aliases,
};
