//! School rows as stored and as returned by ranked listings.

use serde::{Deserialize, Serialize};

use super::GeoPoint;

/// A persisted school.
///
/// The `id` is a UUID v4 in text form, assigned once by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct School {
    pub id: String,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl School {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// A school annotated with its distance from the ranking origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RankedSchool {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub school: School,
    pub distance_km: f64,
}
