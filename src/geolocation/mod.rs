//! Coordinate resolution: client input first, IP geolocation as fallback.

mod provider;
mod resolver;

pub use provider::{IpApiProvider, LocationProvider};
pub use resolver::{
    CoordinateSource, EffectiveCoordinate, LocationResolver, PresencePolicy, RetryPolicy,
};
