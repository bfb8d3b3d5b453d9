use async_trait::async_trait;
use tokio::sync::RwLock;

use super::SchoolStore;
use crate::error::StoreError;
use crate::models::{great_circle_km, GeoPoint, RankedSchool, School};

/// In-process store for local runs and tests.
#[derive(Default)]
pub struct MemorySchoolStore {
    schools: RwLock<Vec<School>>,
}

impl MemorySchoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schools(schools: Vec<School>) -> Self {
        Self {
            schools: RwLock::new(schools),
        }
    }

    pub async fn len(&self) -> usize {
        self.schools.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.schools.read().await.is_empty()
    }
}

#[async_trait]
impl SchoolStore for MemorySchoolStore {
    async fn insert(&self, school: &School) -> Result<(), StoreError> {
        let mut schools = self.schools.write().await;
        if schools.iter().any(|s| s.id == school.id) {
            return Err(StoreError::Duplicate(school.id.clone()));
        }
        schools.push(school.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<School>, StoreError> {
        Ok(self
            .schools
            .read()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<School>, StoreError> {
        Ok(self.schools.read().await.clone())
    }

    async fn rank_by_distance(&self, origin: GeoPoint) -> Result<Vec<RankedSchool>, StoreError> {
        let mut ranked: Vec<RankedSchool> = self
            .schools
            .read()
            .await
            .iter()
            .map(|school| RankedSchool {
                distance_km: great_circle_km(origin, school.location()),
                school: school.clone(),
            })
            .collect();

        ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        Ok(ranked)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
