//! Application state for the web layer.

use std::sync::Arc;

use crate::search::{RideSearch, SearchConfig};
use crate::stations::{CacheConfig, CachedStations, StationMatcher};
use crate::store::Store;

/// Station lookups as served over HTTP: the store behind a text cache.
pub type Stations = CachedStations<Store>;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Persistence for bookings and routes
    pub store: Store,

    /// Station autocomplete and lookups
    pub stations: Arc<StationMatcher<Stations>>,

    /// Ride search and suggestions
    pub search: Arc<RideSearch<Stations, Store>>,

    /// Search limits and defaults
    pub config: Arc<SearchConfig>,
}

impl AppState {
    /// Create a new app state.
    ///
    /// Station matching is shared between the station endpoints and ride
    /// search so both go through the same cache.
    pub fn new(store: Store, config: SearchConfig, cache: &CacheConfig) -> Self {
        let stations = Arc::new(StationMatcher::new(
            CachedStations::new(store.clone(), cache),
            config.candidate_pool,
        ));
        let search = RideSearch::new(Arc::clone(&stations), store.clone(), config.clone());

        Self {
            store,
            stations,
            search: Arc::new(search),
            config: Arc::new(config),
        }
    }
}
