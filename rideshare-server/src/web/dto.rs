//! Data transfer objects for web requests and responses.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Booking, NewRide, PopularRoute, Recurrence, Ride, RideId, RideStatus, Station, StationId,
    StationStatus, UserId,
};
use crate::search::{EmptyReason, RideListing, RideSearchCriteria, SearchOutcome};
use crate::stations::{NearbyStation, ScoredStation};

/// Request to autocomplete stations.
#[derive(Debug, Deserialize)]
pub struct StationSearchRequest {
    /// Free text typed by the user
    pub q: String,

    /// Maximum results (default 10, capped at 50)
    pub limit: Option<usize>,
}

/// Response for station autocomplete.
#[derive(Debug, Serialize)]
pub struct StationSearchResponse {
    /// Best matches first
    pub stations: Vec<ScoredStation>,
}

/// Request for stations around a point.
#[derive(Debug, Deserialize)]
pub struct NearbyRequest {
    pub lat: f64,
    pub lng: f64,

    /// Search radius, defaults to the configured radius
    pub radius_km: Option<f64>,

    pub limit: Option<usize>,
}

/// Response for nearby stations.
#[derive(Debug, Serialize)]
pub struct NearbyResponse {
    /// Nearest first
    pub stations: Vec<NearbyStation>,
}

/// A plain list of stations (city and university lookups).
#[derive(Debug, Serialize)]
pub struct StationListResponse {
    pub stations: Vec<Station>,
}

/// Request to hide, retire or reactivate a station.
#[derive(Debug, Deserialize)]
pub struct StationStatusRequest {
    pub status: StationStatus,
}

/// Request to search rides between two known stations.
#[derive(Debug, Default, Deserialize)]
pub struct RideSearchRequest {
    pub departure_station_id: Option<i64>,
    pub arrival_station_id: Option<i64>,

    /// Travel date (YYYY-MM-DD); past dates search from today
    pub date: Option<NaiveDate>,
}

impl From<RideSearchRequest> for RideSearchCriteria {
    fn from(req: RideSearchRequest) -> Self {
        RideSearchCriteria {
            departure: req.departure_station_id.map(StationId::new),
            arrival: req.arrival_station_id.map(StationId::new),
            date: req.date,
        }
    }
}

/// Request to search rides from free text on both sides.
#[derive(Debug, Deserialize)]
pub struct QuickSearchRequest {
    /// Departure text, e.g. "agdal"
    pub from: String,

    /// Arrival text, e.g. "casa"
    pub to: String,

    pub date: Option<NaiveDate>,
}

/// Response for both ride searches.
///
/// An empty search is still a success: `reason` says why nothing matched.
#[derive(Debug, Serialize)]
pub struct RideSearchResponse {
    /// Matching rides, earliest departure first
    pub rides: Vec<RideListing>,

    /// Number of rides returned
    pub count: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<EmptyReason>,

    /// Human readable explanation of `reason`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl From<SearchOutcome> for RideSearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        RideSearchResponse {
            count: outcome.rides.len(),
            message: outcome.reason.map(|r| r.message()),
            reason: outcome.reason,
            rides: outcome.rides,
        }
    }
}

/// Request to publish a ride; the driver is the caller.
#[derive(Debug, Deserialize)]
pub struct PublishRideRequest {
    pub departure_station_id: StationId,
    pub arrival_station_id: StationId,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub arrival_date: Option<NaiveDate>,
    pub arrival_time: Option<NaiveTime>,
    pub seats: i64,
    pub price_per_seat: f64,
    #[serde(default)]
    pub recurrence: Recurrence,
}

impl PublishRideRequest {
    pub fn into_new_ride(self, driver: UserId) -> NewRide {
        NewRide {
            driver,
            departure_station: self.departure_station_id,
            arrival_station: self.arrival_station_id,
            departure_date: self.departure_date,
            departure_time: self.departure_time,
            arrival_date: self.arrival_date,
            arrival_time: self.arrival_time,
            seats: self.seats,
            price_per_seat: self.price_per_seat,
            recurrence: self.recurrence,
        }
    }
}

/// Request to move a ride through its lifecycle.
#[derive(Debug, Deserialize)]
pub struct RideStatusRequest {
    pub status: RideStatus,
}

/// Response carrying a single ride.
#[derive(Debug, Serialize)]
pub struct RideResponse {
    pub ride: Ride,
}

/// Request carrying only an optional limit.
#[derive(Debug, Default, Deserialize)]
pub struct LimitRequest {
    pub limit: Option<usize>,
}

/// Response for personalised ride suggestions.
#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub rides: Vec<RideListing>,
}

/// Response for popular routes.
#[derive(Debug, Serialize)]
pub struct PopularRoutesResponse {
    /// Most searched first
    pub routes: Vec<PopularRoute>,
}

/// Request to book seats on a ride.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub ride_id: RideId,

    /// Seats to reserve (at least one)
    #[serde(default = "one_seat")]
    pub seats: i64,
}

fn one_seat() -> i64 {
    1
}

/// Response carrying a single booking.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub booking: Booking,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
