//! Schoolmap - a small school catalog that ranks schools by distance
//!
//! This library provides the catalog, geolocation fallback, proximity ranking,
//! storage backends and HTTP routes used by the `server` binary.

pub mod catalog;
pub mod config;
pub mod error;
pub mod geolocation;
pub mod models;
pub mod proximity;
pub mod routes;
pub mod state;
pub mod store;
pub mod views;

pub use models::{GeoPoint, RankedSchool, School};
