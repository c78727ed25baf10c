//! Search configuration for station matching and ride search.

use serde::Deserialize;

/// Configuration parameters for station and ride search.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Raw station candidates fetched per text query before scoring.
    pub candidate_pool: usize,

    /// Stations considered per side of a quick search.
    pub candidates_per_side: usize,

    /// Autocomplete results when the caller gives no limit.
    pub autocomplete_limit: usize,

    /// Upper bound on any caller-supplied autocomplete limit.
    pub max_autocomplete_limit: usize,

    /// Default radius for nearby lookups (km).
    pub nearby_radius_km: f64,

    /// Maximum number of rides returned by one search.
    pub max_results: usize,

    /// Rides returned by suggestions when the caller gives no limit.
    pub suggestion_limit: usize,
}

impl SearchConfig {
    /// Clamp a requested autocomplete limit into `1..=max_autocomplete_limit`.
    pub fn autocomplete_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.autocomplete_limit)
            .clamp(1, self.max_autocomplete_limit.max(1))
    }

    /// Clamp a requested suggestion count into `1..=max_results`.
    pub fn suggestion_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.suggestion_limit)
            .clamp(1, self.max_results.max(1))
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            candidate_pool: 50,
            candidates_per_side: 5,
            autocomplete_limit: 10,
            max_autocomplete_limit: 50,
            nearby_radius_km: 10.0,
            max_results: 100,
            suggestion_limit: 10,
        }
    }
}
