//! Fixtures for store tests.

use chrono::{NaiveDate, NaiveTime};

use crate::domain::{
    NewRide, NewStation, Recurrence, Ride, RideStatus, StationCategory, StationId, UserId,
};

use super::Store;

pub const DRIVER: UserId = UserId::new(1);
pub const PASSENGER: UserId = UserId::new(2);

pub fn new_station(name: &str, city: &str, address: &str) -> NewStation {
    NewStation {
        name: name.to_string(),
        city: city.to_string(),
        address: address.to_string(),
        category: StationCategory::TrainStation,
        coordinates: None,
        university: None,
        aliases: Vec::new(),
    }
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
}

pub fn new_ride(departure: StationId, arrival: StationId, day: u32, seats: i64, price: f64) -> NewRide {
    NewRide {
        driver: DRIVER,
        departure_station: departure,
        arrival_station: arrival,
        departure_date: date(day),
        departure_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        arrival_date: None,
        arrival_time: None,
        seats,
        price_per_seat: price,
        recurrence: Recurrence::None,
    }
}

/// An in-memory store with three stations: 1 and 2 in Rabat, 3 in Casablanca.
pub async fn seeded() -> Store {
    let store = Store::in_memory().await.unwrap();
    seed_stations(&store).await;
    store
}

/// Add the three stations of [`seeded`] to an empty store.
pub async fn seed_stations(store: &Store) {
    for (name, city) in [
        ("Gare Rabat Agdal", "Rabat"),
        ("Gare Rabat Ville", "Rabat"),
        ("Gare Casa Voyageurs", "Casablanca"),
    ] {
        store.create_station(&new_station(name, city, "")).await.unwrap();
    }
}

/// Publish and activate a ride.
pub async fn active_ride(store: &Store, ride: NewRide) -> Ride {
    let created = store.create_ride(&ride).await.unwrap();
    store
        .transition_ride(created.id, ride.driver, RideStatus::Active)
        .await
        .unwrap()
}
