//! Ride search: station resolution, ride lookup and popular-route tracking.
//!
//! Explicit search takes station ids. Quick search takes free text on both
//! sides, resolves each to a handful of plausible stations, and queries
//! every distinct pair concurrently. Either way, a search with both ends
//! known bumps the popularity counter for that pair in the background;
//! a failure there is logged and never fails the search.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::domain::{RequesterContext, StationId};
use crate::stations::{MatchError, ScoredStation, StationMatcher, StationRepository};
use crate::store::StoreError;

use super::config::SearchConfig;
use super::rank::{bias_towards_route, dedupe_by_id, sort_by_departure};
use super::repository::{RideFilter, RideRepository};
use super::types::{
    EmptyReason, QuickSearchCriteria, RideListing, RideSearchCriteria, SearchOutcome,
    effective_date,
};

/// Error from ride search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Criteria that can never match anything
    #[error("invalid search request: {0}")]
    InvalidRequest(&'static str),

    /// Station resolution failed
    #[error(transparent)]
    Stations(#[from] MatchError),

    /// Ride lookup failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Ride search over a station matcher and a ride repository.
pub struct RideSearch<S, R> {
    stations: Arc<StationMatcher<S>>,
    rides: R,
    config: SearchConfig,
}

impl<S, R> RideSearch<S, R>
where
    S: StationRepository,
    R: RideRepository + Clone + 'static,
{
    /// Create a new search service.
    pub fn new(stations: Arc<StationMatcher<S>>, rides: R, config: SearchConfig) -> Self {
        Self {
            stations,
            rides,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Bookable rides for explicit station ids, earliest departure first.
    pub async fn search(
        &self,
        criteria: &RideSearchCriteria,
        today: NaiveDate,
    ) -> Result<SearchOutcome, SearchError> {
        match (criteria.departure, criteria.arrival) {
            (None, None) => {
                return Err(SearchError::InvalidRequest(
                    "a departure or arrival station is required",
                ));
            }
            (Some(dep), Some(arr)) if dep == arr => {
                return Err(SearchError::InvalidRequest(
                    "departure and arrival must differ",
                ));
            }
            _ => {}
        }

        let filter = RideFilter {
            departure: criteria.departure,
            arrival: criteria.arrival,
            from_date: effective_date(criteria.date, today),
            limit: self.config.max_results,
        };
        let rides = sort_by_departure(self.rides.find_available(&filter).await?);

        if let (Some(dep), Some(arr)) = (criteria.departure, criteria.arrival) {
            self.record_route(dep, arr);
        }

        debug!(
            departure = ?criteria.departure,
            arrival = ?criteria.arrival,
            from = %filter.from_date,
            found = rides.len(),
            "Ride search"
        );
        Ok(SearchOutcome::from_rides(rides, EmptyReason::NoRidesForPair))
    }

    /// Bookable rides between two free-text places.
    ///
    /// Each side resolves to at most `candidates_per_side` stations; every
    /// pair of distinct stations is searched and the results merged.
    pub async fn quick_search(
        &self,
        criteria: &QuickSearchCriteria,
        today: NaiveDate,
        requester: RequesterContext,
    ) -> Result<SearchOutcome, SearchError> {
        let per_side = self.config.candidates_per_side;
        let (departures, arrivals) = tokio::join!(
            self.stations.resolve(&criteria.from, per_side, requester),
            self.stations.resolve(&criteria.to, per_side, requester),
        );
        let (departures, arrivals) = (departures?, arrivals?);

        if departures.is_empty() {
            return Ok(SearchOutcome::empty(EmptyReason::NoDepartureMatch));
        }
        if arrivals.is_empty() {
            return Ok(SearchOutcome::empty(EmptyReason::NoArrivalMatch));
        }

        let pairs = candidate_pairs(&departures, &arrivals);
        let Some(&(best_dep, best_arr)) = pairs.first() else {
            // Both sides resolved to the same single station
            return Ok(SearchOutcome::empty(EmptyReason::NoRidesForPair));
        };

        let from_date = effective_date(criteria.date, today);
        let lookups = pairs.iter().map(|&(departure, arrival)| {
            let filter = RideFilter {
                departure: Some(departure),
                arrival: Some(arrival),
                from_date,
                limit: self.config.max_results,
            };
            async move { self.rides.find_available(&filter).await }
        });
        let per_pair = try_join_all(lookups).await?;

        let merged: Vec<RideListing> = per_pair.into_iter().flatten().collect();
        let mut rides = sort_by_departure(dedupe_by_id(merged));
        rides.truncate(self.config.max_results);

        self.record_route(best_dep, best_arr);

        debug!(
            from = %criteria.from,
            to = %criteria.to,
            departures = departures.len(),
            arrivals = arrivals.len(),
            pairs = pairs.len(),
            found = rides.len(),
            "Quick ride search"
        );
        Ok(SearchOutcome::from_rides(rides, EmptyReason::NoRidesForPair))
    }

    /// Rides to show before the user has searched.
    ///
    /// Recent rides, with rides on the user's most frequent route merged in
    /// and moved to the front.
    pub async fn suggestions(
        &self,
        requester: RequesterContext,
        today: NaiveDate,
        limit: usize,
    ) -> Result<Vec<RideListing>, SearchError> {
        let limit = limit.clamp(1, self.config.max_results.max(1));

        let preference = match requester.user {
            Some(user) => self.rides.route_preference(user).await?,
            None => None,
        };
        let recent = self.rides.recent_active(today, limit).await?;

        let Some(preference) = preference else {
            return Ok(recent);
        };

        let mut merged = self
            .rides
            .between_cities(&preference.departure_city, &preference.arrival_city, today, limit)
            .await?;
        merged.extend(recent);

        let mut rides = bias_towards_route(dedupe_by_id(merged), &preference);
        rides.truncate(limit);
        Ok(rides)
    }

    /// Bump the popularity of a station pair without blocking the caller.
    fn record_route(&self, departure: StationId, arrival: StationId) {
        let rides = self.rides.clone();
        tokio::spawn(async move {
            if let Err(e) = rides.record_route_search(departure, arrival).await {
                warn!(
                    departure = %departure,
                    arrival = %arrival,
                    error = %e,
                    "Failed to record popular route"
                );
            }
        });
    }
}

/// Distinct station pairs, best combined score first.
fn candidate_pairs(
    departures: &[ScoredStation],
    arrivals: &[ScoredStation],
) -> Vec<(StationId, StationId)> {
    let mut pairs: Vec<(f64, StationId, StationId)> = departures
        .iter()
        .flat_map(|d| arrivals.iter().map(move |a| (d, a)))
        .filter(|(d, a)| d.station.id != a.station.id)
        .map(|(d, a)| (d.score + a.score, d.station.id, a.station.id))
        .collect();

    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));
    pairs.into_iter().map(|(_, dep, arr)| (dep, arr)).collect()
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
