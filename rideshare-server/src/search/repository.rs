//! The ride persistence seam used by search.

use std::future::Future;

use chrono::NaiveDate;

use crate::domain::{PopularRoute, RoutePreference, StationId, UserId};
use crate::store::StoreError;

use super::types::RideListing;

/// Filter for bookable rides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RideFilter {
    pub departure: Option<StationId>,
    pub arrival: Option<StationId>,
    /// Only rides departing on or after this date.
    pub from_date: NaiveDate,
    pub limit: usize,
}

/// Read access to rides, plus the popular-route side effect.
///
/// Search never mutates rides or bookings; the only write is
/// [`record_route_search`](RideRepository::record_route_search).
pub trait RideRepository: Send + Sync {
    /// Active rides with free seats matching `filter`, ordered by departure.
    fn find_available(
        &self,
        filter: &RideFilter,
    ) -> impl Future<Output = Result<Vec<RideListing>, StoreError>> + Send;

    /// Most recently created bookable rides.
    fn recent_active(
        &self,
        from_date: NaiveDate,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<RideListing>, StoreError>> + Send;

    /// Bookable rides between two cities (case-insensitive), by departure.
    fn between_cities(
        &self,
        departure_city: &str,
        arrival_city: &str,
        from_date: NaiveDate,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<RideListing>, StoreError>> + Send;

    /// The user's most frequent stored route, if any.
    fn route_preference(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Option<RoutePreference>, StoreError>> + Send;

    /// Count a search on a station pair and refresh its live ride count.
    fn record_route_search(
        &self,
        departure: StationId,
        arrival: StationId,
    ) -> impl Future<Output = Result<PopularRoute, StoreError>> + Send;
}
