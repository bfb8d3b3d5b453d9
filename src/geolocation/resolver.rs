//! Effective coordinate resolution with rate-limit backoff.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::LocationProvider;
use crate::error::LocationFetchError;
use crate::models::GeoPoint;

/// How client-supplied coordinates are judged present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresencePolicy {
    /// Both fields supplied. Zero is a real coordinate.
    #[default]
    Explicit,
    /// Both fields supplied and non-zero; 0 and NaN count as missing.
    ///
    /// Applied to the parsed values, so a form-posted `"0"` is missing here
    /// too, not only a JSON numeric 0. This is a deliberate simplification:
    /// the policy never sees whether a value arrived as text or as a number.
    Truthy,
}

impl PresencePolicy {
    /// The client's own point, if this policy accepts it
    pub fn client_point(self, lat: Option<f64>, lon: Option<f64>) -> Option<GeoPoint> {
        let (lat, lon) = (lat?, lon?);
        match self {
            PresencePolicy::Explicit => Some(GeoPoint::new(lat, lon)),
            PresencePolicy::Truthy if is_truthy(lat) && is_truthy(lon) => {
                Some(GeoPoint::new(lat, lon))
            }
            PresencePolicy::Truthy => None,
        }
    }
}

fn is_truthy(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

/// Backoff schedule for rate-limited lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    /// Overall budget for one resolution, backoff included
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1000),
            deadline: None,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): initial, 2x, 4x, ...
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff.saturating_mul(1u32 << retry.min(31))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSource {
    Client,
    Geolocation,
}

/// The point a ranking request is measured from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveCoordinate {
    pub point: GeoPoint,
    pub source: CoordinateSource,
}

pub struct LocationResolver {
    provider: Arc<dyn LocationProvider>,
    policy: RetryPolicy,
    presence: PresencePolicy,
}

impl LocationResolver {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        policy: RetryPolicy,
        presence: PresencePolicy,
    ) -> Self {
        Self {
            provider,
            policy,
            presence,
        }
    }

    /// Resolve the coordinate to rank from.
    ///
    /// Client coordinates accepted by the presence policy are returned untouched
    /// and no request leaves the process. Otherwise the provider is queried,
    /// retrying only on HTTP 429. `cancel` aborts a pending request or backoff.
    pub async fn resolve(
        &self,
        lat: Option<f64>,
        lon: Option<f64>,
        cancel: &CancellationToken,
    ) -> Result<EffectiveCoordinate, LocationFetchError> {
        if let Some(point) = self.presence.client_point(lat, lon) {
            debug!("Using client coordinate {}", point);
            return Ok(EffectiveCoordinate {
                point,
                source: CoordinateSource::Client,
            });
        }

        let point = match self.policy.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.fetch_with_retry(cancel))
                .await
                .map_err(|_| {
                    error!("Error fetching location: no answer within {:?}", deadline);
                    LocationFetchError::DeadlineExceeded(deadline)
                })??,
            None => self.fetch_with_retry(cancel).await?,
        };

        debug!("Using geolocated coordinate {}", point);
        Ok(EffectiveCoordinate {
            point,
            source: CoordinateSource::Geolocation,
        })
    }

    async fn fetch_with_retry(
        &self,
        cancel: &CancellationToken,
    ) -> Result<GeoPoint, LocationFetchError> {
        let mut retries = 0;

        loop {
            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(LocationFetchError::Cancelled),
                result = self.provider.locate() => result,
            };

            match attempt {
                Ok(point) => return Ok(point),
                Err(e) if e.is_rate_limited() && retries < self.policy.max_retries => {
                    let delay = self.policy.backoff(retries);
                    retries += 1;
                    warn!(
                        "Rate limit exceeded. Retrying in {} ms (retry {}/{})",
                        delay.as_millis(),
                        retries,
                        self.policy.max_retries
                    );

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            error!("Error fetching location: cancelled during backoff");
                            return Err(LocationFetchError::Cancelled);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) if e.is_rate_limited() => {
                    error!(
                        "Error fetching location: still rate limited after {} retries",
                        retries
                    );
                    return Err(LocationFetchError::RetriesExhausted { retries });
                }
                Err(e) => {
                    error!("Error fetching location: {}", e);
                    return Err(e);
                }
            }
        }
    }
}
