//! Ride search criteria and results.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{Ride, StationId};
use crate::stations::SearchText;

/// Search by explicit station ids. At least one side must be given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RideSearchCriteria {
    pub departure: Option<StationId>,
    pub arrival: Option<StationId>,
    /// Earliest departure date; today when absent or in the past.
    pub date: Option<NaiveDate>,
}

/// Search by free-text station names on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickSearchCriteria {
    pub from: SearchText,
    pub to: SearchText,
    pub date: Option<NaiveDate>,
}

/// The earliest departure date a search may return.
///
/// A requested date in the past is clamped to today.
pub fn effective_date(requested: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
    requested.map_or(today, |date| date.max(today))
}

/// Minimal station details shown with a ride.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationSummary {
    pub id: StationId,
    pub name: String,
    pub city: String,
}

/// A ride with the stations it connects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RideListing {
    #[serde(flatten)]
    pub ride: Ride,
    pub departure: StationSummary,
    pub arrival: StationSummary,
}

/// Why a search returned nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    NoDepartureMatch,
    NoArrivalMatch,
    NoRidesForPair,
}

impl EmptyReason {
    pub fn message(&self) -> &'static str {
        match self {
            EmptyReason::NoDepartureMatch => "no station matches the departure",
            EmptyReason::NoArrivalMatch => "no station matches the arrival",
            EmptyReason::NoRidesForPair => "no rides available between these stations",
        }
    }
}

/// Result of a ride search.
///
/// An empty search is still a success; `reason` then says which step came
/// up empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub rides: Vec<RideListing>,
    pub reason: Option<EmptyReason>,
}

impl SearchOutcome {
    pub fn empty(reason: EmptyReason) -> Self {
        Self {
            rides: Vec::new(),
            reason: Some(reason),
        }
    }

    /// Wrap `rides`, attaching `reason_if_empty` when there are none.
    pub fn from_rides(rides: Vec<RideListing>, reason_if_empty: EmptyReason) -> Self {
        let reason = rides.is_empty().then_some(reason_if_empty);
        Self { rides, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn effective_date_clamps_to_today() {
        assert_eq!(effective_date(None, date(16)), date(16));
        assert_eq!(effective_date(Some(date(20)), date(16)), date(20));
        assert_eq!(effective_date(Some(date(1)), date(16)), date(16));
    }

    #[test]
    fn outcome_reason_only_when_empty() {
        let outcome = SearchOutcome::from_rides(Vec::new(), EmptyReason::NoRidesForPair);
        assert_eq!(outcome.reason, Some(EmptyReason::NoRidesForPair));

        let outcome = SearchOutcome::empty(EmptyReason::NoArrivalMatch);
        assert!(outcome.rides.is_empty());
        assert_eq!(
            outcome.reason.map(|r| r.message()),
            Some("no station matches the arrival")
        );
    }

    #[test]
    fn reason_serializes_snake_case() {
        let json = serde_json::to_string(&EmptyReason::NoDepartureMatch).unwrap();
        assert_eq!(json, "\"no_departure_match\"");
    }
}
