use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tracing::info;

use super::SchoolStore;
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::models::{GeoPoint, RankedSchool, School};

/// Per-row distance in km from the bound origin `(lat, lon, lat)`.
///
/// The cosine sum is clamped into [-1, 1] so a school sitting exactly on the
/// origin gets 0 instead of NULL from `ACOS`.
pub const RANK_BY_DISTANCE_SQL: &str = "SELECT id, name, address, latitude, longitude,
        6371 * ACOS(LEAST(1.0, GREATEST(-1.0,
            COS(RADIANS(?)) * COS(RADIANS(latitude)) * COS(RADIANS(longitude) - RADIANS(?))
            + SIN(RADIANS(?)) * SIN(RADIANS(latitude))
        ))) AS distance_km
     FROM school
     ORDER BY distance_km ASC";

#[derive(Clone)]
pub struct MySqlSchoolStore {
    pool: MySqlPool,
}

impl MySqlSchoolStore {
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        info!(
            "Connecting to MySQL at {}:{}/{} (pool size {})...",
            config.host, config.port, config.database, config.pool_size
        );

        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .database(&config.database);
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool_size)
            .connect_with(options)
            .await?;

        let store = Self::from_pool(pool);
        if config.create_schema {
            store.init_schema().await?;
        }
        Ok(store)
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS school (
                id CHAR(36) PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                address VARCHAR(255) NOT NULL,
                latitude DOUBLE NOT NULL,
                longitude DOUBLE NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SchoolStore for MySqlSchoolStore {
    async fn insert(&self, school: &School) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO school (id, name, address, latitude, longitude) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&school.id)
        .bind(&school.name)
        .bind(&school.address)
        .bind(school.latitude)
        .bind(school.longitude)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<School>, StoreError> {
        let school = sqlx::query_as::<_, School>(
            "SELECT id, name, address, latitude, longitude FROM school WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(school)
    }

    async fn list(&self) -> Result<Vec<School>, StoreError> {
        let schools = sqlx::query_as::<_, School>(
            "SELECT id, name, address, latitude, longitude FROM school",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(schools)
    }

    async fn rank_by_distance(&self, origin: GeoPoint) -> Result<Vec<RankedSchool>, StoreError> {
        let ranked = sqlx::query_as::<_, RankedSchool>(RANK_BY_DISTANCE_SQL)
            .bind(origin.lat)
            .bind(origin.lon)
            .bind(origin.lat)
            .fetch_all(&self.pool)
            .await?;
        Ok(ranked)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.pool.is_closed() {
            return Err(StoreError::Unavailable("connection pool is closed".to_string()));
        }
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        info!("Closing MySQL pool...");
        self.pool.close().await;
    }
}
