//! Domain error types.
//!
//! These errors represent validation failures in the domain layer. They are
//! distinct from store and transport errors.

use super::ids::StationId;

/// Domain-level errors for validation and lifecycle rules.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// A stored or submitted enum value is not recognised
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    /// A required field is empty
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A ride must connect two different stations
    #[error("departure and arrival station must differ (both {0})")]
    SameStation(StationId),

    /// Seat counts must be positive
    #[error("seat count must be at least 1, got {0}")]
    InvalidSeats(i64),

    /// Prices cannot be negative
    #[error("price per seat must not be negative, got {0}")]
    InvalidPrice(f64),

    /// Arrival must not precede departure
    #[error("arrival is before departure")]
    ArrivalBeforeDeparture,

    /// A lifecycle transition that is not allowed
    #[error("cannot move {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },
}
