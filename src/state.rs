use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::SchoolCatalog;
use crate::config::{Config, GeolocationConfig, StoreBackend};
use crate::geolocation::{IpApiProvider, LocationProvider, LocationResolver};
use crate::proximity::ProximityQuery;
use crate::store::{MemorySchoolStore, MySqlSchoolStore, SchoolStore};
use crate::views::Views;

/// Application state shared across handlers
pub struct AppState {
    pub catalog: SchoolCatalog,
    pub proximity: ProximityQuery,
    pub resolver: LocationResolver,
    pub views: Views,
    pub store: Arc<dyn SchoolStore>,
    /// Cancelled on server shutdown; each request resolves under a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SchoolStore>,
        provider: Arc<dyn LocationProvider>,
        geolocation: &GeolocationConfig,
        shutdown: CancellationToken,
    ) -> Result<Arc<Self>> {
        let views = Views::new().context("Failed to compile templates")?;

        Ok(Arc::new(Self {
            catalog: SchoolCatalog::new(store.clone()),
            proximity: ProximityQuery::new(store.clone()),
            resolver: LocationResolver::new(
                provider,
                geolocation.retry_policy(),
                geolocation.presence,
            ),
            views,
            store,
            shutdown,
        }))
    }

    pub async fn from_config(config: &Config, shutdown: CancellationToken) -> Result<Arc<Self>> {
        let store: Arc<dyn SchoolStore> = match config.store.backend {
            StoreBackend::Mysql => Arc::new(
                MySqlSchoolStore::connect(&config.store)
                    .await
                    .context("Failed to connect to MySQL")?,
            ),
            StoreBackend::Memory => {
                warn!("Using the in-memory store; schools are lost on restart");
                Arc::new(MemorySchoolStore::new())
            }
        };

        info!(
            "Geolocation fallback via {} ({} retries, {} ms initial backoff, {:?} presence)",
            config.geolocation.endpoint,
            config.geolocation.max_retries,
            config.geolocation.initial_backoff_ms,
            config.geolocation.presence
        );
        let provider = IpApiProvider::new(
            config.geolocation.endpoint.clone(),
            config.geolocation.request_timeout(),
        )
        .context("Failed to build geolocation client")?;

        Self::new(store, Arc::new(provider), &config.geolocation, shutdown)
    }
}
