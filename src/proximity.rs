//! Distance-ranked listing.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::error::StoreError;
use crate::models::{GeoPoint, RankedSchool};
use crate::store::SchoolStore;

pub struct ProximityQuery {
    store: Arc<dyn SchoolStore>,
}

impl ProximityQuery {
    pub fn new(store: Arc<dyn SchoolStore>) -> Self {
        Self { store }
    }

    /// Every school with its distance from `origin`, nearest first.
    ///
    /// A single store read; any failure is returned whole, never a partial list.
    pub async fn rank_by_distance(&self, origin: GeoPoint) -> Result<Vec<RankedSchool>, StoreError> {
        let started = Instant::now();
        let ranked = self.store.rank_by_distance(origin).await?;

        debug!(
            "Ranked {} schools from {} in {} ms",
            ranked.len(),
            origin,
            started.elapsed().as_millis()
        );
        Ok(ranked)
    }
}
