use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoLocation;

/// Referer recorded when the request carries none
pub const DIRECT_REFERER: &str = "Direct";

/// Source tag stored with browser-submitted coordinates
pub const PRECISE_LOCATION_SOURCE: &str = "browser_geolocation";

/// One captured hit against a link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub user_agent: Option<String>,
    pub referer: String,
    pub headers: RequestHeaders,
    /// IP-derived location, filled in once the lookup settles
    pub location: Option<GeoLocation>,
    /// Device-reported location, filled in by the interstitial page
    pub precise_location: Option<PreciseLocation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestHeaders {
    pub accept_language: Option<String>,
    pub accept_encoding: Option<String>,
}

/// Raw coordinates reported by the visitor's browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreciseLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters
    pub accuracy: f64,
    pub altitude: Option<f64>,
    pub altitude_accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub source: String,
    pub offset_applied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationRequest {
    pub link_id: String,
    #[serde(default)]
    pub tracking_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub altitude_accuracy: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
}

impl UpdateLocationRequest {
    /// Browser coordinates are stored as submitted, without any correction
    pub fn to_precise_location(&self) -> PreciseLocation {
        PreciseLocation {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            altitude: self.altitude,
            altitude_accuracy: self.altitude_accuracy,
            heading: self.heading,
            speed: self.speed,
            source: PRECISE_LOCATION_SOURCE.to_string(),
            offset_applied: false,
        }
    }
}
