//! Ride types and lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::ids::{RideId, StationId, UserId};

/// Lifecycle status of a ride.
///
/// ```text
/// pending ──► active ──► completed
///    │           │
///    └───────────┴──► cancelled
/// ```
///
/// Completed and cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Active => "active",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    /// Whether a ride in this status may move to `next`.
    pub fn can_transition_to(&self, next: RideStatus) -> bool {
        matches!(
            (self, next),
            (RideStatus::Pending, RideStatus::Active)
                | (RideStatus::Active, RideStatus::Completed)
                | (RideStatus::Pending, RideStatus::Cancelled)
                | (RideStatus::Active, RideStatus::Cancelled)
        )
    }

    /// Check a transition, returning the error to report if it is invalid.
    pub fn check_transition(&self, next: RideStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                entity: "ride",
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

impl FromStr for RideStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RideStatus::Pending),
            "active" => Ok(RideStatus::Active),
            "completed" => Ok(RideStatus::Completed),
            "cancelled" => Ok(RideStatus::Cancelled),
            other => Err(DomainError::UnknownVariant {
                kind: "ride status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a ride repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekdays,
    Weekly,
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recurrence::None => "none",
            Recurrence::Daily => "daily",
            Recurrence::Weekdays => "weekdays",
            Recurrence::Weekly => "weekly",
        }
    }
}

impl FromStr for Recurrence {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Recurrence::None),
            "daily" => Ok(Recurrence::Daily),
            "weekdays" => Ok(Recurrence::Weekdays),
            "weekly" => Ok(Recurrence::Weekly),
            other => Err(DomainError::UnknownVariant {
                kind: "recurrence",
                value: other.to_string(),
            }),
        }
    }
}

/// A driver-offered trip between two stations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ride {
    pub id: RideId,
    pub driver: UserId,
    pub departure_station: StationId,
    pub arrival_station: StationId,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub arrival_date: Option<NaiveDate>,
    pub arrival_time: Option<NaiveTime>,
    pub total_seats: i64,
    pub available_seats: i64,
    pub price_per_seat: f64,
    pub status: RideStatus,
    pub recurrence: Recurrence,
    pub created_at: DateTime<Utc>,
}

impl Ride {
    /// Departure as a single sortable timestamp.
    pub fn departs_at(&self) -> NaiveDateTime {
        self.departure_date.and_time(self.departure_time)
    }

    /// Whether passengers can currently book this ride.
    pub fn is_bookable(&self) -> bool {
        self.status == RideStatus::Active && self.available_seats > 0
    }
}

/// Driver input for publishing a ride.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRide {
    pub driver: UserId,
    pub departure_station: StationId,
    pub arrival_station: StationId,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub arrival_date: Option<NaiveDate>,
    pub arrival_time: Option<NaiveTime>,
    pub seats: i64,
    pub price_per_seat: f64,
    #[serde(default)]
    pub recurrence: Recurrence,
}

impl NewRide {
    /// Validate the ride invariants that do not need the store.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.departure_station == self.arrival_station {
            return Err(DomainError::SameStation(self.departure_station));
        }
        if self.seats < 1 {
            return Err(DomainError::InvalidSeats(self.seats));
        }
        if !self.price_per_seat.is_finite() || self.price_per_seat < 0.0 {
            return Err(DomainError::InvalidPrice(self.price_per_seat));
        }
        if let Some(arrival_time) = self.arrival_time {
            let arrival_date = self.arrival_date.unwrap_or(self.departure_date);
            let departs = self.departure_date.and_time(self.departure_time);
            if arrival_date.and_time(arrival_time) < departs {
                return Err(DomainError::ArrivalBeforeDeparture);
            }
        } else if self
            .arrival_date
            .is_some_and(|date| date < self.departure_date)
        {
            return Err(DomainError::ArrivalBeforeDeparture);
        }
        Ok(())
    }
}
