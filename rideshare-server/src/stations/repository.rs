//! The station persistence seam.

use std::future::Future;

use serde::Serialize;

use crate::domain::{Coordinates, RequesterContext, Station, StationId};
use crate::store::StoreError;

use super::query::SearchText;

/// A station with its distance from a search centre.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyStation {
    #[serde(flatten)]
    pub station: Station,
    pub distance_km: f64,
}

/// Read access to the station gazetteer.
///
/// This abstraction lets the matcher run against the SQLite store, the
/// caching wrapper, or in-memory data in tests. Every read returns active
/// stations only; an empty result is never an error.
pub trait StationRepository: Send + Sync {
    /// Lexical candidates for a free-text query.
    ///
    /// Matches the whole query, and each word longer than two characters,
    /// case-insensitively against name, city, address and aliases. The
    /// requester's favourite stations come first, then the most searched.
    fn find_by_text(
        &self,
        query: &SearchText,
        limit: usize,
        requester: RequesterContext,
    ) -> impl Future<Output = Result<Vec<Station>, StoreError>> + Send;

    /// Stations within `radius_km` of `center`, nearest first.
    fn find_nearby(
        &self,
        center: Coordinates,
        radius_km: f64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<NearbyStation>, StoreError>> + Send;

    /// Stations in a city (case-insensitive), ordered by name.
    fn find_by_city(
        &self,
        city: &str,
    ) -> impl Future<Output = Result<Vec<Station>, StoreError>> + Send;

    /// Stations attached to a university, ordered by name.
    fn find_by_university(
        &self,
        university: StationId,
    ) -> impl Future<Output = Result<Vec<Station>, StoreError>> + Send;

    /// A single station by id, whatever its status.
    fn get(
        &self,
        id: StationId,
    ) -> impl Future<Output = Result<Option<Station>, StoreError>> + Send;

    /// Increment the search-hit counter of a station.
    fn record_hit(&self, id: StationId) -> impl Future<Output = Result<(), StoreError>> + Send;
}
