//! Station lookup: repository candidates, scored and deduplicated.

use tracing::debug;

use crate::domain::{Coordinates, RequesterContext, Station, StationId};

use super::dedupe::{collapse_by_identity, dedupe, rank_and_dedupe};
use super::error::MatchError;
use super::query::SearchText;
use super::repository::{NearbyStation, StationRepository};
use super::score::ScoredStation;

/// Resolves free text and places to canonical stations.
///
/// Every multi-row lookup is deduplicated before it is returned.
pub struct StationMatcher<R> {
    repo: R,
    /// How many raw candidates to fetch before scoring.
    candidate_pool: usize,
}

impl<R: StationRepository> StationMatcher<R> {
    /// Create a matcher fetching up to `candidate_pool` rows per text query.
    pub fn new(repo: R, candidate_pool: usize) -> Self {
        Self {
            repo,
            candidate_pool: candidate_pool.max(1),
        }
    }

    /// The underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Best canonical stations for a free-text query, best first.
    pub async fn autocomplete(
        &self,
        text: &SearchText,
        limit: usize,
        requester: RequesterContext,
    ) -> Result<Vec<ScoredStation>, MatchError> {
        let pool = self.candidate_pool.max(limit);
        let candidates = self.repo.find_by_text(text, pool, requester).await?;
        let fetched = candidates.len();

        let mut ranked = rank_and_dedupe(candidates, text.as_str());
        ranked.truncate(limit);

        debug!(
            query = %text,
            candidates = fetched,
            returned = ranked.len(),
            "Station autocomplete"
        );
        Ok(ranked)
    }

    /// The `top_n` most plausible stations for one side of a quick search.
    pub async fn resolve(
        &self,
        text: &SearchText,
        top_n: usize,
        requester: RequesterContext,
    ) -> Result<Vec<ScoredStation>, MatchError> {
        self.autocomplete(text, top_n, requester).await
    }

    /// Canonical stations within `radius_km` of `center`, nearest first.
    pub async fn nearby(
        &self,
        center: Coordinates,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<NearbyStation>, MatchError> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(MatchError::InvalidRadius(radius_km));
        }
        let pool = self.candidate_pool.max(limit);
        let found = self.repo.find_nearby(center, radius_km, pool).await?;

        let mut nearby = collapse_by_identity(found, |n| &n.station);
        nearby.truncate(limit);
        Ok(nearby)
    }

    /// Canonical stations of a city.
    pub async fn by_city(&self, city: &str) -> Result<Vec<Station>, MatchError> {
        let stations = self.repo.find_by_city(city).await?;
        Ok(dedupe(stations, None))
    }

    /// Canonical stations attached to a university.
    pub async fn by_university(&self, university: StationId) -> Result<Vec<Station>, MatchError> {
        let stations = self.repo.find_by_university(university).await?;
        Ok(dedupe(stations, None))
    }

    /// Record that a suggested station was picked by the user.
    pub async fn accept(&self, id: StationId) -> Result<Station, MatchError> {
        let station = self
            .repo
            .get(id)
            .await?
            .filter(|s| s.status.is_searchable())
            .ok_or(MatchError::UnknownStation(id))?;

        self.repo.record_hit(id).await?;
        debug!(station = %id, "Station suggestion accepted");
        Ok(station)
    }
}
