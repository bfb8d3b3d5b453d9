//! School persistence.
//!
//! Handlers never reach for a global pool: the store is built once at startup
//! and injected as `Arc<dyn SchoolStore>`.

mod memory;
mod mysql;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{GeoPoint, RankedSchool, School};

pub use memory::MemorySchoolStore;
pub use mysql::{MySqlSchoolStore, RANK_BY_DISTANCE_SQL};

#[async_trait]
pub trait SchoolStore: Send + Sync {
    async fn insert(&self, school: &School) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<School>, StoreError>;

    /// All schools in storage order
    async fn list(&self) -> Result<Vec<School>, StoreError>;

    /// All schools with their great-circle distance from `origin`, nearest first
    async fn rank_by_distance(&self, origin: GeoPoint) -> Result<Vec<RankedSchool>, StoreError>;

    /// Cheap liveness check
    async fn ping(&self) -> Result<(), StoreError>;

    /// Release connections at shutdown
    async fn close(&self) {}
}
