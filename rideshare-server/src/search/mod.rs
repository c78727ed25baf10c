//! Ride search.
//!
//! Answers "which rides can take me from here to there?", either from
//! station ids picked in the UI or from free text typed on both sides.
//! Also serves the suggestion feed shown before any search.

mod config;
mod rank;
mod repository;
mod service;
mod types;

pub use config::SearchConfig;
#[cfg(test)]
pub(crate) use rank::fixtures;
pub use rank::{bias_towards_route, dedupe_by_id, sort_by_departure};
pub use repository::{RideFilter, RideRepository};
pub use service::{RideSearch, SearchError};
pub use types::{
    EmptyReason, QuickSearchCriteria, RideListing, RideSearchCriteria, SearchOutcome,
    StationSummary, effective_date,
};
