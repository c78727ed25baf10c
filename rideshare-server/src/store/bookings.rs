//! Seat bookings.
//!
//! Every operation runs in one transaction. The seat counter on the ride and
//! the booking rows change together or not at all: any rejection or failure
//! drops the transaction, which rolls it back.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::domain::{Booking, BookingId, BookingStatus, RideId, RideStatus, UserId};

use super::Store;
use super::error::StoreError;
use super::rides::ride_in;

/// Why a booking operation was refused.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("ride not found: {0}")]
    RideNotFound(RideId),

    #[error("ride {0} is not open for booking")]
    RideNotActive(RideId),

    #[error("drivers cannot book their own ride")]
    OwnRide,

    #[error("only {available} seat(s) left, {requested} requested")]
    InsufficientSeats { requested: i64, available: i64 },

    /// The passenger already holds a pending or confirmed booking
    #[error("ride already booked by this passenger")]
    AlreadyBooked,

    #[error("booking not found: {0}")]
    BookingNotFound(BookingId),

    /// Only the driver of the booked ride may confirm
    #[error("only the driver of ride {0} can confirm its bookings")]
    NotDriver(RideId),

    #[error("booking is {0} and cannot be cancelled")]
    NotCancellable(BookingStatus),

    #[error("booking cannot move from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("seat count must be at least 1, got {0}")]
    InvalidSeats(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for BookingError {
    fn from(e: sqlx::Error) -> Self {
        BookingError::Store(e.into())
    }
}

impl BookingError {
    /// Business-rule rejections, as opposed to store failures.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, BookingError::Store(_))
    }
}

const BOOKING_COLUMNS: &str =
    "id, ride_id, passenger_id, seats, status, total_price, created_at, cancelled_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    ride_id: i64,
    passenger_id: i64,
    seats: i64,
    status: String,
    total_price: f64,
    created_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: BookingId::new(row.id),
            ride: RideId::new(row.ride_id),
            passenger: UserId::new(row.passenger_id),
            seats: row.seats,
            status: row.status.parse().map_err(StoreError::corrupt("bookings"))?,
            total_price: row.total_price,
            created_at: row.created_at,
            cancelled_at: row.cancelled_at,
        })
    }
}

async fn booking_in(
    conn: &mut SqliteConnection,
    id: BookingId,
) -> Result<Option<Booking>, StoreError> {
    let row: Option<BookingRow> =
        sqlx::query_as(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?"))
            .bind(id.get())
            .fetch_optional(conn)
            .await?;
    row.map(Booking::try_from).transpose()
}

/// Work out why the conditional seat decrement matched no row.
async fn explain_rejection(
    conn: &mut SqliteConnection,
    ride: RideId,
    passenger: UserId,
    seats: i64,
) -> Result<BookingError, StoreError> {
    let Some(found) = ride_in(conn, ride).await? else {
        return Ok(BookingError::RideNotFound(ride));
    };
    let rejection = if found.driver == passenger {
        BookingError::OwnRide
    } else if found.status != RideStatus::Active {
        BookingError::RideNotActive(ride)
    } else {
        BookingError::InsufficientSeats {
            requested: seats,
            available: found.available_seats,
        }
    };
    Ok(rejection)
}

impl Store {
    /// Reserve `seats` on a ride for `passenger`.
    ///
    /// The booking starts `pending` and is priced at the ride's current
    /// per-seat price.
    pub async fn create_booking(
        &self,
        ride: RideId,
        passenger: UserId,
        seats: i64,
    ) -> Result<Booking, BookingError> {
        if seats < 1 {
            return Err(BookingError::InvalidSeats(seats));
        }

        let mut tx = self.pool.begin().await?;

        // Take the seats first so concurrent bookings serialize on the ride row
        let price: Option<f64> = sqlx::query_scalar(
            "UPDATE rides SET available_seats = available_seats - ?1
             WHERE id = ?2 AND status = 'active' AND available_seats >= ?1 AND driver_id <> ?3
             RETURNING price_per_seat",
        )
        .bind(seats)
        .bind(ride.get())
        .bind(passenger.get())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(price) = price else {
            let rejection = explain_rejection(&mut tx, ride, passenger, seats).await?;
            debug!(ride = %ride, passenger = %passenger, seats, reason = %rejection, "Booking refused");
            return Err(rejection);
        };

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM bookings
             WHERE ride_id = ? AND passenger_id = ? AND status IN ('pending', 'confirmed')",
        )
        .bind(ride.get())
        .bind(passenger.get())
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(BookingError::AlreadyBooked);
        }

        let inserted = sqlx::query_as::<_, BookingRow>(&format!(
            "INSERT INTO bookings (ride_id, passenger_id, seats, status, total_price, created_at)
             VALUES (?, ?, ?, 'pending', ?, ?)
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(ride.get())
        .bind(passenger.get())
        .bind(seats)
        .bind(price * seats as f64)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(BookingError::AlreadyBooked);
            }
            Err(e) => return Err(e.into()),
        };
        let booking = Booking::try_from(row)?;
        tx.commit().await?;

        info!(
            booking = %booking.id,
            ride = %ride,
            passenger = %passenger,
            seats,
            total_price = booking.total_price,
            "Booking created"
        );
        Ok(booking)
    }

    pub async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        booking_in(&mut conn, id).await
    }

    /// Confirm a pending booking on behalf of the ride's driver.
    pub async fn confirm_booking(
        &self,
        id: BookingId,
        driver: UserId,
    ) -> Result<Booking, BookingError> {
        let mut tx = self.pool.begin().await?;

        let booking = booking_in(&mut tx, id)
            .await?
            .ok_or(BookingError::BookingNotFound(id))?;
        let ride = ride_in(&mut tx, booking.ride)
            .await?
            .ok_or(BookingError::RideNotFound(booking.ride))?;
        if ride.driver != driver {
            return Err(BookingError::NotDriver(ride.id));
        }
        if !booking.status.can_transition_to(BookingStatus::Confirmed) {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Confirmed,
            });
        }

        sqlx::query("UPDATE bookings SET status = 'confirmed' WHERE id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(booking = %id, "Booking confirmed");
        Ok(Booking {
            status: BookingStatus::Confirmed,
            ..booking
        })
    }

    /// Cancel a passenger's booking and give its seats back to the ride.
    ///
    /// Bookings of other passengers are reported as not found.
    pub async fn cancel_booking(
        &self,
        id: BookingId,
        passenger: UserId,
    ) -> Result<Booking, BookingError> {
        let mut tx = self.pool.begin().await?;

        let booking = booking_in(&mut tx, id)
            .await?
            .filter(|b| b.passenger == passenger)
            .ok_or(BookingError::BookingNotFound(id))?;
        if !booking.status.is_active() {
            return Err(BookingError::NotCancellable(booking.status));
        }

        let cancelled_at = Utc::now();
        let updated = sqlx::query(
            "UPDATE bookings SET status = 'cancelled', cancelled_at = ?
             WHERE id = ? AND status IN ('pending', 'confirmed')",
        )
        .bind(cancelled_at)
        .bind(id.get())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() != 1 {
            return Err(BookingError::NotCancellable(BookingStatus::Cancelled));
        }

        sqlx::query("UPDATE rides SET available_seats = available_seats + ? WHERE id = ?")
            .bind(booking.seats)
            .bind(booking.ride.get())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(booking = %id, ride = %booking.ride, seats = booking.seats, "Booking cancelled");
        Ok(Booking {
            status: BookingStatus::Cancelled,
            cancelled_at: Some(cancelled_at),
            ..booking
        })
    }
}
