//! IP geolocation HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::LocationFetchError;
use crate::models::GeoPoint;

/// A single lookup of the caller's approximate position.
///
/// Implementations make exactly one attempt; retrying is the resolver's job.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn locate(&self) -> Result<GeoPoint, LocationFetchError>;
}

/// Client for ipapi.co style endpoints (`GET` returning `{latitude, longitude, ...}`)
pub struct IpApiProvider {
    client: Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    /// ipapi.co reports some failures with a 200 and `"error": true`
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

impl IpApiProvider {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, LocationFetchError> {
        let client = Client::builder()
            .user_agent(concat!("schoolmap/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(LocationFetchError::Transport)?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl LocationProvider for IpApiProvider {
    async fn locate(&self) -> Result<GeoPoint, LocationFetchError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(LocationFetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            debug!("Geolocation endpoint answered {}", status);
            return Err(LocationFetchError::Status {
                status: status.as_u16(),
            });
        }

        let body: IpApiResponse = response
            .json()
            .await
            .map_err(|e| LocationFetchError::Decode(e.to_string()))?;

        if body.error {
            return Err(LocationFetchError::Provider {
                reason: body.reason.unwrap_or_else(|| "unknown".to_string()),
            });
        }

        match (body.latitude, body.longitude) {
            (Some(lat), Some(lon)) => Ok(GeoPoint::new(lat, lon)),
            _ => Err(LocationFetchError::Decode(
                "response is missing latitude/longitude".to_string(),
            )),
        }
    }
}
