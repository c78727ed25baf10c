//! Ride ordering for search results.
//!
//! Search merges rides from several queries (one per station pair, or
//! recent plus preferred for suggestions). These helpers put the merged
//! list back into a presentable order.

use std::collections::HashSet;

use crate::domain::RoutePreference;

use super::types::RideListing;

/// Sort rides by departure, earliest first.
///
/// Ties are broken by ride id so the order is deterministic.
pub fn sort_by_departure(mut rides: Vec<RideListing>) -> Vec<RideListing> {
    rides.sort_by_key(|r| (r.ride.departs_at(), r.ride.id));
    rides
}

/// Drop repeated rides, keeping the first occurrence of each id.
pub fn dedupe_by_id(rides: Vec<RideListing>) -> Vec<RideListing> {
    let mut seen = HashSet::with_capacity(rides.len());
    rides
        .into_iter()
        .filter(|r| seen.insert(r.ride.id))
        .collect()
}

/// Move rides on the user's preferred city pair to the front.
///
/// Relative order inside each half is preserved.
pub fn bias_towards_route(rides: Vec<RideListing>, preference: &RoutePreference) -> Vec<RideListing> {
    let (mut preferred, others): (Vec<_>, Vec<_>) = rides
        .into_iter()
        .partition(|r| preference.matches(&r.departure.city, &r.arrival.city));
    preferred.extend(others);
    preferred
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

    use crate::domain::{Recurrence, Ride, RideId, RideStatus, StationId, UserId};
    use crate::search::types::{RideListing, StationSummary};

    pub fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
    }

    pub fn summary(id: i64, city: &str) -> StationSummary {
        StationSummary {
            id: StationId::new(id),
            name: format!("Station {id}"),
            city: city.to_string(),
        }
    }

    /// An active ride with free seats between two stations.
    pub fn listing(
        id: i64,
        (dep, dep_city): (i64, &str),
        (arr, arr_city): (i64, &str),
        day: u32,
        hhmm: (u32, u32),
    ) -> RideListing {
        let ride = Ride {
            id: RideId::new(id),
            driver: UserId::new(100),
            departure_station: StationId::new(dep),
            arrival_station: StationId::new(arr),
            departure_date: date(day),
            departure_time: NaiveTime::from_hms_opt(hhmm.0, hhmm.1, 0).unwrap(),
            arrival_date: None,
            arrival_time: None,
            total_seats: 4,
            available_seats: 4,
            price_per_seat: 50.0,
            status: RideStatus::Active,
            recurrence: Recurrence::None,
            created_at: Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap(),
        };
        RideListing {
            ride,
            departure: summary(dep, dep_city),
            arrival: summary(arr, arr_city),
        }
    }
}
