//! Core data models for the school catalog.

pub mod point;
pub mod school;

pub use point::{great_circle_km, GeoPoint, EARTH_RADIUS_KM, MAX_LATITUDE, MAX_LONGITUDE};
pub use school::{RankedSchool, School};
