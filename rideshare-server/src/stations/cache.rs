//! Read-through cache for station text lookups.
//!
//! Autocomplete fires a query per keystroke, and most prefixes repeat across
//! users. Candidate lists are cached briefly, keyed by the normalized query,
//! the pool size and the requester (favourites change the ordering).
//! Everything except `find_by_text` goes straight to the inner repository.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::domain::{Coordinates, RequesterContext, Station, StationId, UserId};
use crate::store::StoreError;

use super::query::SearchText;
use super::repository::{NearbyStation, StationRepository};

/// Cache key for text lookups: (normalized query, limit, requester).
type TextKey = (String, usize, Option<UserId>);

/// Cached candidate list.
type TextEntry = Arc<Vec<Station>>;

/// Configuration for the station cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            max_capacity: 10_000,
        }
    }
}

/// A [`StationRepository`] that caches text lookups of an inner repository.
pub struct CachedStations<R> {
    inner: R,
    texts: MokaCache<TextKey, TextEntry>,
}

impl<R: StationRepository> CachedStations<R> {
    /// Wrap `inner` with a cache configured by `config`.
    pub fn new(inner: R, config: &CacheConfig) -> Self {
        let texts = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .build();

        Self { inner, texts }
    }

    /// The wrapped repository.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Drop all cached entries.
    pub fn invalidate_all(&self) {
        self.texts.invalidate_all();
    }
}

impl<R: StationRepository> StationRepository for CachedStations<R> {
    async fn find_by_text(
        &self,
        query: &SearchText,
        limit: usize,
        requester: RequesterContext,
    ) -> Result<Vec<Station>, StoreError> {
        let key = (query.normalized(), limit, requester.user);
        if let Some(hit) = self.texts.get(&key).await {
            return Ok(hit.as_ref().clone());
        }

        let stations = self.inner.find_by_text(query, limit, requester).await?;
        self.texts.insert(key, Arc::new(stations.clone())).await;
        Ok(stations)
    }

    async fn find_nearby(
        &self,
        center: Coordinates,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<NearbyStation>, StoreError> {
        self.inner.find_nearby(center, radius_km, limit).await
    }

    async fn find_by_city(&self, city: &str) -> Result<Vec<Station>, StoreError> {
        self.inner.find_by_city(city).await
    }

    async fn find_by_university(&self, university: StationId) -> Result<Vec<Station>, StoreError> {
        self.inner.find_by_university(university).await
    }

    async fn get(&self, id: StationId) -> Result<Option<Station>, StoreError> {
        self.inner.get(id).await
    }

    async fn record_hit(&self, id: StationId) -> Result<(), StoreError> {
        self.inner.record_hit(id).await
    }
}
