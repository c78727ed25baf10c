//! Web layer for the ridesharing backend.
//!
//! JSON endpoints for station autocomplete, ride search and bookings. The
//! caller's identity arrives in the `x-user-id` header, already resolved by
//! the authentication layer in front of this service.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, USER_HEADER, create_router};
pub use state::{AppState, Stations};
