//! Ride lifecycle and availability queries.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::info;

use crate::domain::{
    DomainError, NewRide, PopularRoute, Ride, RideId, RideStatus, RoutePreference, StationId,
    UserId, fold_text,
};
use crate::search::{RideFilter, RideListing, RideRepository, StationSummary};

use super::Store;
use super::error::StoreError;

/// Errors from ride lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum RideError {
    #[error("ride not found: {0}")]
    RideNotFound(RideId),

    /// Only the driver may change a ride
    #[error("ride {0} belongs to another driver")]
    NotDriver(RideId),

    /// Referenced station is missing or not active
    #[error("unknown station: {0}")]
    UnknownStation(StationId),

    /// Cancellation is blocked while passengers hold seats
    #[error("ride has {0} active booking(s) and cannot be cancelled")]
    HasActiveBookings(i64),

    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for RideError {
    fn from(e: sqlx::Error) -> Self {
        RideError::Store(e.into())
    }
}

const RIDE_COLUMNS: &str = "r.id, r.driver_id, r.departure_station_id, \
     r.arrival_station_id, r.departure_date, r.departure_time, r.arrival_date, r.arrival_time, \
     r.total_seats, r.available_seats, r.price_per_seat, r.status, r.recurrence, r.created_at";

const LISTING_FROM: &str = "FROM rides r
     JOIN stations d ON d.id = r.departure_station_id
     JOIN stations a ON a.id = r.arrival_station_id";

/// Active, not full, and not departed before the given date.
const BOOKABLE: &str = "r.status = 'active' AND r.available_seats > 0 AND r.departure_date >= ";

const BY_DEPARTURE: &str = " ORDER BY r.departure_date, r.departure_time, r.id";

#[derive(sqlx::FromRow)]
struct RideRow {
    id: i64,
    driver_id: i64,
    departure_station_id: i64,
    arrival_station_id: i64,
    departure_date: NaiveDate,
    departure_time: NaiveTime,
    arrival_date: Option<NaiveDate>,
    arrival_time: Option<NaiveTime>,
    total_seats: i64,
    available_seats: i64,
    price_per_seat: f64,
    status: String,
    recurrence: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RideRow> for Ride {
    type Error = StoreError;

    fn try_from(row: RideRow) -> Result<Self, Self::Error> {
        let corrupt = || StoreError::corrupt("rides");
        Ok(Ride {
            id: RideId::new(row.id),
            driver: UserId::new(row.driver_id),
            departure_station: StationId::new(row.departure_station_id),
            arrival_station: StationId::new(row.arrival_station_id),
            departure_date: row.departure_date,
            departure_time: row.departure_time,
            arrival_date: row.arrival_date,
            arrival_time: row.arrival_time,
            total_seats: row.total_seats,
            available_seats: row.available_seats,
            price_per_seat: row.price_per_seat,
            status: row.status.parse().map_err(corrupt())?,
            recurrence: row.recurrence.parse().map_err(corrupt())?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    ride: RideRow,
    departure_name: String,
    departure_city: String,
    arrival_name: String,
    arrival_city: String,
}

impl TryFrom<ListingRow> for RideListing {
    type Error = StoreError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let ride = Ride::try_from(row.ride)?;
        Ok(RideListing {
            departure: StationSummary {
                id: ride.departure_station,
                name: row.departure_name,
                city: row.departure_city,
            },
            arrival: StationSummary {
                id: ride.arrival_station,
                name: row.arrival_name,
                city: row.arrival_city,
            },
            ride,
        })
    }
}

fn listing_query() -> QueryBuilder<'static, Sqlite> {
    QueryBuilder::new(format!(
        "SELECT {RIDE_COLUMNS}, d.name AS departure_name, d.city AS departure_city, \
         a.name AS arrival_name, a.city AS arrival_city {LISTING_FROM} WHERE "
    ))
}

async fn fetch_listings(
    store: &Store,
    mut qb: QueryBuilder<'_, Sqlite>,
) -> Result<Vec<RideListing>, StoreError> {
    let rows: Vec<ListingRow> = qb.build_query_as().fetch_all(&store.pool).await?;
    rows.into_iter().map(RideListing::try_from).collect()
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Load a ride inside an open transaction.
pub(super) async fn ride_in(
    conn: &mut SqliteConnection,
    id: RideId,
) -> Result<Option<Ride>, StoreError> {
    let row: Option<RideRow> =
        sqlx::query_as(&format!("SELECT {RIDE_COLUMNS} FROM rides r WHERE r.id = ?"))
            .bind(id.get())
            .fetch_optional(conn)
            .await?;
    row.map(Ride::try_from).transpose()
}

impl Store {
    /// Publish a ride. It starts `pending` with every seat available.
    pub async fn create_ride(&self, ride: &NewRide) -> Result<Ride, RideError> {
        ride.validate()?;

        for station in [ride.departure_station, ride.arrival_station] {
            let active: Option<String> =
                sqlx::query_scalar("SELECT status FROM stations WHERE id = ?")
                    .bind(station.get())
                    .fetch_optional(&self.pool)
                    .await?;
            if active.as_deref() != Some("active") {
                return Err(RideError::UnknownStation(station));
            }
        }

        let row: RideRow = sqlx::query_as(
            "INSERT INTO rides
                 (driver_id, departure_station_id, arrival_station_id, departure_date,
                  departure_time, arrival_date, arrival_time, total_seats, available_seats,
                  price_per_seat, status, recurrence, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)
             RETURNING id, driver_id, departure_station_id, arrival_station_id, departure_date,
                       departure_time, arrival_date, arrival_time, total_seats, available_seats,
                       price_per_seat, status, recurrence, created_at",
        )
        .bind(ride.driver.get())
        .bind(ride.departure_station.get())
        .bind(ride.arrival_station.get())
        .bind(ride.departure_date)
        .bind(ride.departure_time)
        .bind(ride.arrival_date)
        .bind(ride.arrival_time)
        .bind(ride.seats)
        .bind(ride.seats)
        .bind(ride.price_per_seat)
        .bind(ride.recurrence.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let ride = Ride::try_from(row)?;
        info!(
            ride = %ride.id,
            driver = %ride.driver,
            departure = %ride.departure_station,
            arrival = %ride.arrival_station,
            date = %ride.departure_date,
            "Ride created"
        );
        Ok(ride)
    }

    pub async fn get_ride(&self, id: RideId) -> Result<Option<Ride>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        ride_in(&mut conn, id).await
    }

    /// Move a ride along its lifecycle on behalf of its driver.
    ///
    /// Cancelling is refused while any pending or confirmed booking holds
    /// seats on the ride.
    pub async fn transition_ride(
        &self,
        id: RideId,
        driver: UserId,
        next: RideStatus,
    ) -> Result<Ride, RideError> {
        let mut tx = self.pool.begin().await?;

        let ride = ride_in(&mut tx, id)
            .await?
            .ok_or(RideError::RideNotFound(id))?;
        if ride.driver != driver {
            return Err(RideError::NotDriver(id));
        }
        ride.status.check_transition(next)?;

        if next == RideStatus::Cancelled {
            let active: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM bookings
                 WHERE ride_id = ? AND status IN ('pending', 'confirmed')",
            )
            .bind(id.get())
            .fetch_one(&mut *tx)
            .await?;
            if active > 0 {
                return Err(RideError::HasActiveBookings(active));
            }
        }

        sqlx::query("UPDATE rides SET status = ? WHERE id = ?")
            .bind(next.as_str())
            .bind(id.get())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(ride = %id, from = %ride.status, to = %next, "Ride status changed");
        Ok(Ride {
            status: next,
            ..ride
        })
    }
}

impl RideRepository for Store {
    async fn find_available(&self, filter: &RideFilter) -> Result<Vec<RideListing>, StoreError> {
        let mut qb = listing_query();
        qb.push(BOOKABLE);
        qb.push_bind(filter.from_date);
        if let Some(departure) = filter.departure {
            qb.push(" AND r.departure_station_id = ");
            qb.push_bind(departure.get());
        }
        if let Some(arrival) = filter.arrival {
            qb.push(" AND r.arrival_station_id = ");
            qb.push_bind(arrival.get());
        }
        qb.push(BY_DEPARTURE);
        qb.push(" LIMIT ");
        qb.push_bind(sql_limit(filter.limit));

        fetch_listings(self, qb).await
    }

    async fn recent_active(
        &self,
        from_date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<RideListing>, StoreError> {
        let mut qb = listing_query();
        qb.push(BOOKABLE);
        qb.push_bind(from_date);
        qb.push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ");
        qb.push_bind(sql_limit(limit));

        fetch_listings(self, qb).await
    }

    async fn between_cities(
        &self,
        departure_city: &str,
        arrival_city: &str,
        from_date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<RideListing>, StoreError> {
        let mut qb = listing_query();
        qb.push(BOOKABLE);
        qb.push_bind(from_date);
        qb.push(" AND d.city_key = ");
        qb.push_bind(fold_text(departure_city));
        qb.push(" AND a.city_key = ");
        qb.push_bind(fold_text(arrival_city));
        qb.push(BY_DEPARTURE);
        qb.push(" LIMIT ");
        qb.push_bind(sql_limit(limit));

        fetch_listings(self, qb).await
    }

    async fn route_preference(&self, user: UserId) -> Result<Option<RoutePreference>, StoreError> {
        Store::route_preference(self, user).await
    }

    async fn record_route_search(
        &self,
        departure: StationId,
        arrival: StationId,
    ) -> Result<PopularRoute, StoreError> {
        Store::record_route_search(self, departure, arrival).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BookingStatus;
    use crate::store::testing::{
        DRIVER, PASSENGER, active_ride, date, new_ride, new_station, seeded,
    };

    const RABAT_AGDAL: StationId = StationId::new(1);
    const RABAT_VILLE: StationId = StationId::new(2);
    const CASA: StationId = StationId::new(3);

    fn ids(rides: &[RideListing]) -> Vec<i64> {
        rides.iter().map(|r| r.ride.id.get()).collect()
    }

    fn filter(departure: Option<StationId>, arrival: Option<StationId>, day: u32) -> RideFilter {
        RideFilter {
            departure,
            arrival,
            from_date: date(day),
            limit: 100,
        }
    }

    #[tokio::test]
    async fn created_ride_is_pending_with_all_seats() {
        let store = seeded().await;
        let ride = store.create_ride(&new_ride(RABAT_AGDAL, CASA, 20, 3, 45.0)).await.unwrap();

        assert_eq!(ride.status, RideStatus::Pending);
        assert_eq!(ride.total_seats, 3);
        assert_eq!(ride.available_seats, 3);
        assert_eq!(store.get_ride(ride.id).await.unwrap(), Some(ride));
    }

    #[tokio::test]
    async fn create_rejects_same_station_and_unknown_station() {
        let store = seeded().await;

        let err = store.create_ride(&new_ride(CASA, CASA, 20, 3, 45.0)).await.unwrap_err();
        assert!(matches!(err, RideError::Invalid(DomainError::SameStation(_))));

        let err = store
            .create_ride(&new_ride(CASA, StationId::new(77), 20, 3, 45.0))
            .await
            .unwrap_err();
        assert!(matches!(err, RideError::UnknownStation(id) if id == StationId::new(77)));
    }

    #[tokio::test]
    async fn only_driver_moves_ride_forward() {
        let store = seeded().await;
        let ride = store.create_ride(&new_ride(RABAT_AGDAL, CASA, 20, 3, 45.0)).await.unwrap();

        let err = store
            .transition_ride(ride.id, PASSENGER, RideStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, RideError::NotDriver(_)));

        let active = store.transition_ride(ride.id, DRIVER, RideStatus::Active).await.unwrap();
        assert_eq!(active.status, RideStatus::Active);

        let err = store
            .transition_ride(ride.id, DRIVER, RideStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, RideError::Invalid(DomainError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn cancel_blocked_by_active_booking() {
        let store = seeded().await;
        let ride = active_ride(&store, new_ride(RABAT_AGDAL, CASA, 20, 3, 45.0)).await;
        let booking = store.create_booking(ride.id, PASSENGER, 1).await.unwrap();

        let err = store
            .transition_ride(ride.id, DRIVER, RideStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, RideError::HasActiveBookings(1)));

        let cancelled = store.cancel_booking(booking.id, PASSENGER).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        let ride = store
            .transition_ride(ride.id, DRIVER, RideStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(ride.status, RideStatus::Cancelled);
    }

    #[tokio::test]
    async fn find_available_only_returns_bookable_rides() {
        let store = seeded().await;
        let first = active_ride(&store, new_ride(RABAT_AGDAL, CASA, 20, 3, 45.0)).await;
        let earlier = active_ride(&store, new_ride(RABAT_AGDAL, CASA, 18, 3, 45.0)).await;
        // Still pending
        store.create_ride(&new_ride(RABAT_AGDAL, CASA, 19, 3, 45.0)).await.unwrap();
        // Departed before the search date
        active_ride(&store, new_ride(RABAT_AGDAL, CASA, 10, 3, 45.0)).await;
        // Full
        let full = active_ride(&store, new_ride(RABAT_AGDAL, CASA, 21, 1, 45.0)).await;
        store.create_booking(full.id, PASSENGER, 1).await.unwrap();
        // Other pair
        active_ride(&store, new_ride(RABAT_VILLE, CASA, 20, 3, 45.0)).await;

        let found = store
            .find_available(&filter(Some(RABAT_AGDAL), Some(CASA), 16))
            .await
            .unwrap();

        assert_eq!(ids(&found), vec![earlier.id.get(), first.id.get()]);
        assert!(found.iter().all(|l| l.ride.is_bookable()));
        assert_eq!(found[0].departure.name, "Gare Rabat Agdal");
        assert_eq!(found[0].arrival.city, "Casablanca");
    }

    #[tokio::test]
    async fn find_available_with_one_side() {
        let store = seeded().await;
        active_ride(&store, new_ride(RABAT_AGDAL, CASA, 20, 3, 45.0)).await;
        active_ride(&store, new_ride(RABAT_VILLE, CASA, 20, 3, 45.0)).await;
        active_ride(&store, new_ride(CASA, RABAT_VILLE, 20, 3, 45.0)).await;

        let to_casa = store.find_available(&filter(None, Some(CASA), 16)).await.unwrap();
        assert_eq!(to_casa.len(), 2);

        let from_casa = store.find_available(&filter(Some(CASA), None, 16)).await.unwrap();
        assert_eq!(from_casa.len(), 1);
    }

    #[tokio::test]
    async fn recent_active_newest_first() {
        let store = seeded().await;
        let a = active_ride(&store, new_ride(RABAT_AGDAL, CASA, 20, 3, 45.0)).await;
        let b = active_ride(&store, new_ride(CASA, RABAT_VILLE, 25, 3, 45.0)).await;

        let recent = store.recent_active(date(16), 10).await.unwrap();
        assert_eq!(ids(&recent), vec![b.id.get(), a.id.get()]);

        let limited = store.recent_active(date(16), 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn between_cities_ignores_case() {
        let store = seeded().await;
        let ride = active_ride(&store, new_ride(RABAT_VILLE, CASA, 20, 3, 45.0)).await;
        active_ride(&store, new_ride(CASA, RABAT_AGDAL, 20, 3, 45.0)).await;

        let found = store
            .between_cities("RABAT", "casablanca", date(16), 10)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![ride.id.get()]);
    }

    #[tokio::test]
    async fn between_cities_folds_accented_capitals() {
        let store = seeded().await;
        let fes = store
            .create_station(&new_station("Gare de Fès", "Fès", ""))
            .await
            .unwrap();
        let sale = store
            .create_station(&new_station("Gare de Salé", "Salé", ""))
            .await
            .unwrap();
        let ride = active_ride(&store, new_ride(fes.id, sale.id, 20, 3, 45.0)).await;

        let found = store
            .between_cities("FÈS", "SALÉ", date(16), 10)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![ride.id.get()]);
    }
}
