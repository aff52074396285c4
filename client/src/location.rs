//! Best-effort device location attached to submissions.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use birdia_common::config::Config;

use crate::error::ApiError;

/// Text sent as `localizacion` when no position is known.
pub const LOCATION_UNAVAILABLE: &str = "Ubicación no disponible";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn label(&self) -> String {
        format!("Lat: {}, Lon: {}", self.latitude, self.longitude)
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn locate(&self) -> Result<GeoPoint, ApiError>;
}

/// Position taken from configuration.
pub struct FixedLocation(pub GeoPoint);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn locate(&self) -> Result<GeoPoint, ApiError> {
        Ok(self.0)
    }
}

/// No source configured.
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn locate(&self) -> Result<GeoPoint, ApiError> {
        Err(ApiError::validation("no location source configured"))
    }
}

/// Coarse position from an IP geolocation service answering JSON with
/// `lat`/`lon` or `latitude`/`longitude`.
pub struct GeoIpLocation {
    http: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct GeoIpAnswer {
    #[serde(default, alias = "latitude")]
    lat: Option<f64>,
    #[serde(default, alias = "longitude")]
    lon: Option<f64>,
}

impl GeoIpLocation {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl LocationProvider for GeoIpLocation {
    async fn locate(&self) -> Result<GeoPoint, ApiError> {
        let answer: GeoIpAnswer = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        match (answer.lat, answer.lon) {
            (Some(lat), Some(lon)) => Ok(GeoPoint::new(lat, lon)),
            _ => Err(ApiError::Decode {
                path: self.url.clone(),
                message: "no coordinates in answer".to_string(),
            }),
        }
    }
}

/// Fixed coordinates win over the lookup service.
pub fn provider_from_config(config: &Config) -> Box<dyn LocationProvider> {
    if let Some((lat, lon)) = config.fixed_location() {
        return Box::new(FixedLocation(GeoPoint::new(lat, lon)));
    }
    if let Some(url) = &config.geolocation_url {
        match GeoIpLocation::new(url, config.geolocation_timeout()) {
            Ok(p) => return Box::new(p),
            Err(e) => warn!("Cannot set up geolocation lookup: {e}"),
        }
    }
    Box::new(NoLocation)
}

/// Ask the provider within `timeout`; any failure just means no location.
pub async fn locate_best_effort(provider: &dyn LocationProvider, timeout: Duration) -> Option<GeoPoint> {
    match tokio::time::timeout(timeout, provider.locate()).await {
        Ok(Ok(point)) => Some(point),
        Ok(Err(e)) => {
            debug!("Location unavailable: {e}");
            None
        }
        Err(_) => {
            debug!("Location lookup timed out after {timeout:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    #[async_trait]
    impl LocationProvider for Slow {
        async fn locate(&self) -> Result<GeoPoint, ApiError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(GeoPoint::new(1.0, 1.0))
        }
    }

    #[tokio::test]
    async fn test_best_effort_swallows_failures() {
        let fixed = FixedLocation(GeoPoint::new(-2.19, -79.88));
        assert_eq!(
            locate_best_effort(&fixed, Duration::from_secs(1)).await,
            Some(GeoPoint::new(-2.19, -79.88))
        );
        assert_eq!(locate_best_effort(&NoLocation, Duration::from_secs(1)).await, None);
        assert_eq!(locate_best_effort(&Slow, Duration::from_millis(20)).await, None);
    }

    #[test]
    fn test_label() {
        assert_eq!(GeoPoint::new(-2.5, -79.0).label(), "Lat: -2.5, Lon: -79");
    }

    #[test]
    fn test_geoip_answer_shapes() {
        let a: GeoIpAnswer = serde_json::from_str(r#"{"lat":1.5,"lon":2.5}"#).unwrap();
        assert_eq!((a.lat, a.lon), (Some(1.5), Some(2.5)));
        let b: GeoIpAnswer = serde_json::from_str(r#"{"latitude":3.0,"longitude":4.0}"#).unwrap();
        assert_eq!((b.lat, b.lon), (Some(3.0), Some(4.0)));
    }
}
