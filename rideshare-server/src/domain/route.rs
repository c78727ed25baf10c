//! Route aggregates and preferences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::StationId;
use super::station::fold_text;

/// Search and ride counts for a (departure, arrival) station pair.
///
/// Derived data used only to bias ranking; it can be rebuilt from ride
/// history at any time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularRoute {
    pub departure: StationId,
    pub arrival: StationId,
    pub search_count: i64,
    /// Active rides currently published on this pair.
    pub ride_count: i64,
    pub last_searched_at: Option<DateTime<Utc>>,
}

/// A user's stored frequent route, expressed as a city pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePreference {
    pub departure_city: String,
    pub arrival_city: String,
    pub frequency: i64,
}

impl RoutePreference {
    /// Whether a ride between these cities follows the preferred route.
    /// City names compare case-insensitively, accents included.
    pub fn matches(&self, departure_city: &str, arrival_city: &str) -> bool {
        fold_text(&self.departure_city) == fold_text(departure_city)
            && fold_text(&self.arrival_city) == fold_text(arrival_city)
    }
}
