//! Popular routes and per-user route preferences.
//!
//! `popular_routes` is a derived table: search counts come from searches,
//! ride counts from the rides table, and the whole thing can be rebuilt.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::{PopularRoute, RideId, RoutePreference, StationId, UserId, fold_text};

use super::Store;
use super::error::StoreError;

/// Rides offered on the pair that were not cancelled.
const RIDE_COUNT: &str = "SELECT COUNT(*) FROM rides
     WHERE departure_station_id = ? AND arrival_station_id = ? AND status <> 'cancelled'";

#[derive(sqlx::FromRow)]
struct PopularRouteRow {
    departure_station_id: i64,
    arrival_station_id: i64,
    search_count: i64,
    ride_count: i64,
    last_searched_at: Option<DateTime<Utc>>,
}

impl From<PopularRouteRow> for PopularRoute {
    fn from(row: PopularRouteRow) -> Self {
        PopularRoute {
            departure: StationId::new(row.departure_station_id),
            arrival: StationId::new(row.arrival_station_id),
            search_count: row.search_count,
            ride_count: row.ride_count,
            last_searched_at: row.last_searched_at,
        }
    }
}

impl Store {
    /// Count one search on a station pair.
    ///
    /// Creates the route on first search; the ride count is refreshed every
    /// time.
    pub async fn record_route_search(
        &self,
        departure: StationId,
        arrival: StationId,
    ) -> Result<PopularRoute, StoreError> {
        let row: PopularRouteRow = sqlx::query_as(&format!(
            "INSERT INTO popular_routes
                 (departure_station_id, arrival_station_id, search_count, ride_count,
                  last_searched_at)
             VALUES (?, ?, 1, ({RIDE_COUNT}), ?)
             ON CONFLICT (departure_station_id, arrival_station_id) DO UPDATE SET
                 search_count = search_count + 1,
                 ride_count = excluded.ride_count,
                 last_searched_at = excluded.last_searched_at
             RETURNING departure_station_id, arrival_station_id, search_count, ride_count,
                       last_searched_at"
        ))
        .bind(departure.get())
        .bind(arrival.get())
        .bind(departure.get())
        .bind(arrival.get())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Most searched routes first.
    pub async fn popular_routes(&self, limit: usize) -> Result<Vec<PopularRoute>, StoreError> {
        let rows: Vec<PopularRouteRow> = sqlx::query_as(
            "SELECT departure_station_id, arrival_station_id, search_count, ride_count,
                    last_searched_at
             FROM popular_routes
             ORDER BY search_count DESC, ride_count DESC, last_searched_at DESC
             LIMIT ?",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PopularRoute::from).collect())
    }

    /// Recompute every ride count from the rides table.
    ///
    /// Pairs that have rides but were never searched are added with a
    /// search count of zero. Returns the number of routes afterwards.
    pub async fn rebuild_popular_routes(&self) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE popular_routes SET ride_count = 0")
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO popular_routes
                 (departure_station_id, arrival_station_id, search_count, ride_count)
             SELECT departure_station_id, arrival_station_id, 0, COUNT(*)
             FROM rides
             WHERE status <> 'cancelled'
             GROUP BY departure_station_id, arrival_station_id
             ON CONFLICT (departure_station_id, arrival_station_id) DO UPDATE SET
                 ride_count = excluded.ride_count",
        )
        .execute(&mut *tx)
        .await?;
        let routes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM popular_routes")
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(routes, "Popular routes rebuilt");
        Ok(routes)
    }

    /// Count one trip by `user` between two cities.
    ///
    /// Cities are stored folded with [`fold_text`], so spellings that differ
    /// only by case (accented letters included) count as one route.
    pub async fn set_route_preference(
        &self,
        user: UserId,
        departure_city: &str,
        arrival_city: &str,
    ) -> Result<RoutePreference, StoreError> {
        let (departure_city, arrival_city, frequency): (String, String, i64) = sqlx::query_as(
            "INSERT INTO route_preferences (user_id, departure_city, arrival_city, frequency)
             VALUES (?, ?, ?, 1)
             ON CONFLICT (user_id, departure_city, arrival_city) DO UPDATE SET
                 frequency = frequency + 1
             RETURNING departure_city, arrival_city, frequency",
        )
        .bind(user.get())
        .bind(fold_text(departure_city))
        .bind(fold_text(arrival_city))
        .fetch_one(&self.pool)
        .await?;

        Ok(RoutePreference {
            departure_city,
            arrival_city,
            frequency,
        })
    }

    /// Count a booked ride towards the passenger's route preference.
    ///
    /// Returns `None` when the ride does not exist.
    pub async fn record_booked_route(
        &self,
        user: UserId,
        ride: RideId,
    ) -> Result<Option<RoutePreference>, StoreError> {
        let cities: Option<(String, String)> = sqlx::query_as(
            "SELECT d.city, a.city FROM rides r
             JOIN stations d ON d.id = r.departure_station_id
             JOIN stations a ON a.id = r.arrival_station_id
             WHERE r.id = ?",
        )
        .bind(ride.get())
        .fetch_optional(&self.pool)
        .await?;

        let Some((departure_city, arrival_city)) = cities else {
            return Ok(None);
        };
        self.set_route_preference(user, &departure_city, &arrival_city)
            .await
            .map(Some)
    }

    /// The user's most frequent route.
    pub async fn route_preference(&self, user: UserId) -> Result<Option<RoutePreference>, StoreError> {
        let row: Option<(String, String, i64)> = sqlx::query_as(
            "SELECT departure_city, arrival_city, frequency
             FROM route_preferences
             WHERE user_id = ?
             ORDER BY frequency DESC, departure_city, arrival_city
             LIMIT 1",
        )
        .bind(user.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(departure_city, arrival_city, frequency)| RoutePreference {
            departure_city,
            arrival_city,
            frequency,
        }))
    }
}
