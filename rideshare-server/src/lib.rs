//! Ridesharing backend.
//!
//! Drivers publish rides between stations, passengers find and book them.
//! The interesting part is search: turning "agdal" or "casa voyageurs" into
//! the right stations, and stations into bookable rides.

pub mod config;
pub mod domain;
pub mod search;
pub mod stations;
pub mod store;
pub mod web;
