//! In-memory station repository for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{Coordinates, RequesterContext, Station, StationId, fold_text};
use crate::store::StoreError;

use super::query::SearchText;
use super::repository::{NearbyStation, StationRepository};

pub(crate) use super::score::fixtures::station;

/// Serves a fixed station list with the same matching rules as the store.
#[derive(Default)]
pub struct InMemoryStations {
    stations: Vec<Station>,
    hits: Mutex<HashMap<StationId, i64>>,
    text_calls: Mutex<usize>,
}

impl InMemoryStations {
    pub fn new(stations: Vec<Station>) -> Self {
        Self {
            stations,
            ..Self::default()
        }
    }

    pub fn hits(&self, id: StationId) -> i64 {
        self.hits.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    pub fn text_calls(&self) -> usize {
        *self.text_calls.lock().unwrap()
    }

    fn active(&self) -> impl Iterator<Item = &Station> {
        self.stations.iter().filter(|s| s.status.is_searchable())
    }
}

fn matches(station: &Station, needle: &str) -> bool {
    fold_text(&station.name).contains(needle)
        || fold_text(&station.city).contains(needle)
        || fold_text(&station.address).contains(needle)
        || station.aliases.iter().any(|a| a.contains(needle))
}

impl StationRepository for InMemoryStations {
    async fn find_by_text(
        &self,
        query: &SearchText,
        limit: usize,
        _requester: RequesterContext,
    ) -> Result<Vec<Station>, StoreError> {
        *self.text_calls.lock().unwrap() += 1;
        let whole = query.normalized();
        let tokens = query.tokens();
        Ok(self
            .active()
            .filter(|s| matches(s, &whole) || tokens.iter().any(|t| matches(s, t)))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_nearby(
        &self,
        center: Coordinates,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<NearbyStation>, StoreError> {
        let mut nearby: Vec<NearbyStation> = self
            .active()
            .filter_map(|s| {
                let distance_km = center.distance_km(&s.coordinates?);
                (distance_km <= radius_km).then(|| NearbyStation {
                    station: s.clone(),
                    distance_km,
                })
            })
            .collect();
        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        nearby.truncate(limit);
        Ok(nearby)
    }

    async fn find_by_city(&self, city: &str) -> Result<Vec<Station>, StoreError> {
        Ok(self
            .active()
            .filter(|s| fold_text(&s.city) == fold_text(city))
            .cloned()
            .collect())
    }

    async fn find_by_university(&self, university: StationId) -> Result<Vec<Station>, StoreError> {
        Ok(self
            .active()
            .filter(|s| s.university == Some(university))
            .cloned()
            .collect())
    }

    async fn get(&self, id: StationId) -> Result<Option<Station>, StoreError> {
        Ok(self.stations.iter().find(|s| s.id == id).cloned())
    }

    async fn record_hit(&self, id: StationId) -> Result<(), StoreError> {
        *self.hits.lock().unwrap().entry(id).or_insert(0) += 1;
        Ok(())
    }
}
