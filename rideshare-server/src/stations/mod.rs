//! Station matching: free-text autocomplete over the station gazetteer.
//!
//! A query flows through the repository (lexical candidates), the scorer
//! (relevance per candidate) and the deduplicator (one canonical station
//! per physical place).

mod cache;
mod dedupe;
mod error;
mod matcher;
mod query;
mod repository;
mod score;
#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheConfig, CachedStations};
pub use dedupe::{collapse_by_identity, dedupe, rank_and_dedupe};
pub use error::MatchError;
pub use matcher::StationMatcher;
pub use query::{InvalidQuery, MIN_QUERY_CHARS, SearchText};
pub use repository::{NearbyStation, StationRepository};
pub use score::{ScoredStation, rank, score, scoring_token};
